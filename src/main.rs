use crm_nexus::config::Config;
use crm_nexus::db::CrmStorage;
use crm_nexus::router::{CrmState, crm_router};
use crm_nexus::service::reminder_actor;
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database.url,
        listen_addr = %cfg.basic.listen_addr,
        loglevel = %cfg.basic.loglevel,
        reminders = cfg.reminders.enabled,
    );
    if cfg.basic.crm_key == "change-me" {
        warn!("CRM_BASIC__CRM_KEY is still the default, set a real API key");
    }

    let storage = CrmStorage::connect(&cfg.database).await?;
    if cfg.basic.seed_demo && storage.seed_demo().await? {
        info!("demo data seeded into empty database");
    }

    let reminders = reminder_actor::spawn(storage.clone(), cfg.reminders.clone()).await?;

    // Build axum router and serve
    let state = CrmState::new(storage, reminders.clone(), &cfg);
    let app = crm_router(state);

    let listener = TcpListener::bind(&cfg.basic.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.basic.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    reminders.stop();
    Ok(())
}

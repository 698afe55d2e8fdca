use crate::config::DatabaseConfig;
use crate::db::schema::SQLITE_INIT;
use crate::error::CrmError;
use crate::types::status::{ActivityAction, EntityKind};
use crate::validation::ValidationErrors;
use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

pub type SqlitePool = Pool<Sqlite>;

/// Handle to the CRM database. Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct CrmStorage {
    pool: SqlitePool,
}

impl CrmStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open the pool (retrying with backoff) and make sure the schema exists.
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self, CrmError> {
        let connect_opts = SqliteConnectOptions::from_str(&cfg.url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(3))
            .with_max_times(cfg.connect_retries)
            .with_jitter();

        let pool = (|| async {
            SqlitePoolOptions::new()
                .max_connections(cfg.max_connections.max(1))
                .connect_with(connect_opts.clone())
                .await
        })
        .retry(retry_policy)
        .notify(|err, dur: Duration| {
            warn!(error = %err, "database connect failed, retrying in {:?}", dur);
        })
        .await?;

        let storage = Self::new(pool);
        storage.init_schema().await?;
        info!(database_url = %cfg.url, "database ready");
        Ok(storage)
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), CrmError> {
        // execute multiple statements one by one (sqlx::query runs a single statement)
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }
}

/// Append one row to the activity log on the caller's connection or transaction.
pub(crate) async fn log_activity(
    conn: &mut SqliteConnection,
    entity: EntityKind,
    entity_id: i64,
    action: ActivityAction,
    summary: impl AsRef<str>,
) -> Result<(), CrmError> {
    sqlx::query(
        r#"INSERT INTO activity_logs (entity, entity_id, action, summary, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(entity)
    .bind(entity_id)
    .bind(action)
    .bind(summary.as_ref())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Reject a form whose parent record (`client_id`, ...) does not exist.
pub(crate) async fn ensure_parent(
    conn: &mut SqliteConnection,
    entity: EntityKind,
    field: &str,
    id: i64,
) -> Result<(), CrmError> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?", table_of(entity));
    let (count,): (i64,) = sqlx::query_as(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    if count == 0 {
        return Err(ValidationErrors::single(field, format!("unknown {entity} {id}")).into());
    }
    Ok(())
}

pub(crate) fn table_of(entity: EntityKind) -> &'static str {
    match entity {
        EntityKind::Client => "clients",
        EntityKind::Proposal => "proposals",
        EntityKind::Project => "projects",
        EntityKind::Task => "project_tasks",
        EntityKind::FollowUp => "follow_ups",
        EntityKind::Note => "notes",
    }
}

/// Delete one row by id and log it. `NotFound` when nothing was deleted.
pub(crate) async fn delete_logged(
    pool: &SqlitePool,
    entity: EntityKind,
    id: i64,
    summary: impl AsRef<str>,
) -> Result<(), CrmError> {
    let mut tx = pool.begin().await?;
    let sql = format!("DELETE FROM {} WHERE id = ?", table_of(entity));
    let done = sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
    if done.rows_affected() == 0 {
        return Err(CrmError::NotFound { entity, id });
    }
    log_activity(&mut tx, entity, id, ActivityAction::Deleted, summary).await?;
    tx.commit().await?;
    Ok(())
}

/// Trim, and map blank strings to `None`.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

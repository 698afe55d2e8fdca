use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;

use crate::config::{Config, DashboardConfig, ExportConfig};
use crate::db::CrmStorage;
use crate::handlers::{
    activity, clients, dashboard, follow_ups, health, notes, projects, proposals,
};
use crate::middleware::{RequireKeyAuth, trace::trace_requests};
use crate::service::reminder_actor::ReminderHandle;

#[derive(Clone)]
pub struct CrmState {
    pub storage: CrmStorage,
    pub reminders: ReminderHandle,
    pub api_key: Arc<str>,
    pub dashboard: DashboardConfig,
    pub export: ExportConfig,
    pub body_limit: usize,
}

impl CrmState {
    pub fn new(storage: CrmStorage, reminders: ReminderHandle, cfg: &Config) -> Self {
        Self {
            storage,
            reminders,
            api_key: Arc::from(cfg.basic.crm_key.as_str()),
            dashboard: cfg.dashboard.clone(),
            export: cfg.export.clone(),
            body_limit: cfg.basic.body_limit_bytes,
        }
    }
}

pub fn crm_router(state: CrmState) -> Router {
    let api = Router::new()
        .route(
            "/clientes",
            get(clients::list_clients).post(clients::create_client),
        )
        .route(
            "/clientes/{id}",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route(
            "/propuestas",
            get(proposals::list_proposals).post(proposals::create_proposal),
        )
        .route(
            "/propuestas/{id}",
            get(proposals::get_proposal)
                .put(proposals::update_proposal)
                .delete(proposals::delete_proposal),
        )
        .route(
            "/propuestas/{id}/estado",
            post(proposals::change_proposal_status),
        )
        .route(
            "/propuestas/{id}/convertir",
            post(proposals::convert_proposal),
        )
        .route("/propuestas/{id}/export", get(proposals::export_proposal))
        .route(
            "/proyectos",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/proyectos/{id}",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/proyectos/{id}/estado",
            post(projects::change_project_status),
        )
        .route(
            "/proyectos/{id}/tareas",
            get(projects::list_tasks).post(projects::create_task),
        )
        .route(
            "/tareas/{id}",
            axum::routing::put(projects::update_task).delete(projects::delete_task),
        )
        .route("/tareas/{id}/toggle", post(projects::toggle_task))
        .route(
            "/seguimientos",
            get(follow_ups::list_follow_ups).post(follow_ups::create_follow_up),
        )
        .route(
            "/seguimientos/recordatorios",
            post(follow_ups::scan_reminders),
        )
        .route(
            "/seguimientos/{id}",
            get(follow_ups::get_follow_up)
                .put(follow_ups::update_follow_up)
                .delete(follow_ups::delete_follow_up),
        )
        .route(
            "/seguimientos/{id}/completar",
            post(follow_ups::complete_follow_up),
        )
        .route("/notas", get(notes::list_notes).post(notes::create_note))
        .route(
            "/notas/{id}",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        .route("/actividad", get(activity::list_activity))
        .route("/dashboard", get(dashboard::dashboard))
        .route_layer(axum::middleware::from_extractor_with_state::<
            RequireKeyAuth,
            CrmState,
        >(state.clone()));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .layer(DefaultBodyLimit::max(state.body_limit))
        .layer(axum::middleware::from_fn(trace_requests))
        .with_state(state)
}

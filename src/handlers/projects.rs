use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;

use crate::db::models::{Project, ProjectTask};
use crate::middleware::{ApiPath, ApiQuery, ValidatedJson};
use crate::types::forms::{ProjectForm, ProjectQuery, ProjectStatusChange, TaskForm};
use crate::types::views::ProjectDetail;
use crate::{CrmError, router::CrmState};

pub async fn list_projects(
    State(state): State<CrmState>,
    WithRejection(Query(query), _): ApiQuery<ProjectQuery>,
) -> Result<Json<Vec<Project>>, CrmError> {
    Ok(Json(state.storage.list_projects(&query).await?))
}

/// Project with its tasks and completion progress.
pub async fn get_project(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> Result<Json<ProjectDetail>, CrmError> {
    Ok(Json(state.storage.project_detail(id).await?))
}

pub async fn create_project(
    State(state): State<CrmState>,
    ValidatedJson(form): ValidatedJson<ProjectForm>,
) -> Result<(StatusCode, Json<Project>), CrmError> {
    let project = state.storage.create_project(&form).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn update_project(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
    ValidatedJson(form): ValidatedJson<ProjectForm>,
) -> Result<Json<Project>, CrmError> {
    Ok(Json(state.storage.update_project(id, &form).await?))
}

pub async fn change_project_status(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
    ValidatedJson(change): ValidatedJson<ProjectStatusChange>,
) -> Result<Json<Project>, CrmError> {
    Ok(Json(
        state.storage.change_project_status(id, change.status).await?,
    ))
}

pub async fn delete_project(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> Result<StatusCode, CrmError> {
    state.storage.delete_project(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tasks(
    State(state): State<CrmState>,
    WithRejection(Path(project_id), _): ApiPath<i64>,
) -> Result<Json<Vec<ProjectTask>>, CrmError> {
    Ok(Json(state.storage.list_tasks(project_id).await?))
}

pub async fn create_task(
    State(state): State<CrmState>,
    WithRejection(Path(project_id), _): ApiPath<i64>,
    ValidatedJson(form): ValidatedJson<TaskForm>,
) -> Result<(StatusCode, Json<ProjectTask>), CrmError> {
    let task = state.storage.create_task(project_id, &form).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
    ValidatedJson(form): ValidatedJson<TaskForm>,
) -> Result<Json<ProjectTask>, CrmError> {
    Ok(Json(state.storage.update_task(id, &form).await?))
}

pub async fn toggle_task(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> Result<Json<ProjectTask>, CrmError> {
    Ok(Json(state.storage.toggle_task(id).await?))
}

pub async fn delete_task(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> Result<StatusCode, CrmError> {
    state.storage.delete_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

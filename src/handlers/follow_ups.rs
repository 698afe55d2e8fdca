use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;

use crate::db::models::FollowUp;
use crate::middleware::{ApiPath, ApiQuery, ValidatedJson};
use crate::types::forms::{FollowUpForm, FollowUpQuery};
use crate::types::views::ReminderScan;
use crate::{CrmError, router::CrmState};

pub async fn list_follow_ups(
    State(state): State<CrmState>,
    WithRejection(Query(query), _): ApiQuery<FollowUpQuery>,
) -> Result<Json<Vec<FollowUp>>, CrmError> {
    Ok(Json(state.storage.list_follow_ups(&query).await?))
}

pub async fn get_follow_up(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> Result<Json<FollowUp>, CrmError> {
    Ok(Json(state.storage.get_follow_up(id).await?))
}

pub async fn create_follow_up(
    State(state): State<CrmState>,
    ValidatedJson(form): ValidatedJson<FollowUpForm>,
) -> Result<(StatusCode, Json<FollowUp>), CrmError> {
    let follow_up = state.storage.create_follow_up(&form).await?;
    Ok((StatusCode::CREATED, Json(follow_up)))
}

pub async fn update_follow_up(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
    ValidatedJson(form): ValidatedJson<FollowUpForm>,
) -> Result<Json<FollowUp>, CrmError> {
    Ok(Json(state.storage.update_follow_up(id, &form).await?))
}

pub async fn complete_follow_up(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> Result<Json<FollowUp>, CrmError> {
    Ok(Json(state.storage.complete_follow_up(id).await?))
}

pub async fn delete_follow_up(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> Result<StatusCode, CrmError> {
    state.storage.delete_follow_up(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Ask the reminder actor to scan right away instead of waiting for its tick.
pub async fn scan_reminders(
    State(state): State<CrmState>,
) -> Result<Json<ReminderScan>, CrmError> {
    let fired = state.reminders.scan_now().await?;
    Ok(Json(ReminderScan { fired }))
}

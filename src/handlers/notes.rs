use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;

use crate::db::models::Note;
use crate::middleware::{ApiPath, ApiQuery, ValidatedJson};
use crate::types::forms::{NoteForm, NoteQuery};
use crate::{CrmError, router::CrmState};

pub async fn list_notes(
    State(state): State<CrmState>,
    WithRejection(Query(query), _): ApiQuery<NoteQuery>,
) -> Result<Json<Vec<Note>>, CrmError> {
    Ok(Json(state.storage.list_notes(&query).await?))
}

pub async fn get_note(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> Result<Json<Note>, CrmError> {
    Ok(Json(state.storage.get_note(id).await?))
}

pub async fn create_note(
    State(state): State<CrmState>,
    ValidatedJson(form): ValidatedJson<NoteForm>,
) -> Result<(StatusCode, Json<Note>), CrmError> {
    let note = state.storage.create_note(&form).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn update_note(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
    ValidatedJson(form): ValidatedJson<NoteForm>,
) -> Result<Json<Note>, CrmError> {
    Ok(Json(state.storage.update_note(id, &form).await?))
}

pub async fn delete_note(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> Result<StatusCode, CrmError> {
    state.storage.delete_note(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

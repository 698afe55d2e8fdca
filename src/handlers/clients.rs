use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;

use crate::db::models::Client;
use crate::middleware::{ApiPath, ApiQuery, ValidatedJson};
use crate::types::forms::{ClientForm, ClientQuery};
use crate::types::views::ClientDetail;
use crate::{CrmError, router::CrmState};

pub async fn list_clients(
    State(state): State<CrmState>,
    WithRejection(Query(query), _): ApiQuery<ClientQuery>,
) -> Result<Json<Vec<Client>>, CrmError> {
    Ok(Json(state.storage.list_clients(&query).await?))
}

/// Client with its proposals, projects, follow-ups and notes.
pub async fn get_client(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> Result<Json<ClientDetail>, CrmError> {
    Ok(Json(state.storage.client_detail(id).await?))
}

pub async fn create_client(
    State(state): State<CrmState>,
    ValidatedJson(form): ValidatedJson<ClientForm>,
) -> Result<(StatusCode, Json<Client>), CrmError> {
    let client = state.storage.create_client(&form).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update_client(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
    ValidatedJson(form): ValidatedJson<ClientForm>,
) -> Result<Json<Client>, CrmError> {
    Ok(Json(state.storage.update_client(id, &form).await?))
}

pub async fn delete_client(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> Result<StatusCode, CrmError> {
    state.storage.delete_client(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;

use crate::db::models::Proposal;
use crate::middleware::{ApiPath, ApiQuery, ValidatedJson};
use crate::service::proposal_export::ProposalDocument;
use crate::types::forms::{ProposalForm, ProposalQuery, ProposalStatusChange};
use crate::types::views::Conversion;
use crate::{CrmError, router::CrmState};

pub async fn list_proposals(
    State(state): State<CrmState>,
    WithRejection(Query(query), _): ApiQuery<ProposalQuery>,
) -> Result<Json<Vec<Proposal>>, CrmError> {
    Ok(Json(state.storage.list_proposals(&query).await?))
}

pub async fn get_proposal(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> Result<Json<Proposal>, CrmError> {
    Ok(Json(state.storage.get_proposal(id).await?))
}

pub async fn create_proposal(
    State(state): State<CrmState>,
    ValidatedJson(form): ValidatedJson<ProposalForm>,
) -> Result<(StatusCode, Json<Proposal>), CrmError> {
    let proposal = state.storage.create_proposal(&form).await?;
    Ok((StatusCode::CREATED, Json(proposal)))
}

pub async fn update_proposal(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
    ValidatedJson(form): ValidatedJson<ProposalForm>,
) -> Result<Json<Proposal>, CrmError> {
    Ok(Json(state.storage.update_proposal(id, &form).await?))
}

pub async fn change_proposal_status(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
    ValidatedJson(change): ValidatedJson<ProposalStatusChange>,
) -> Result<Json<Proposal>, CrmError> {
    Ok(Json(
        state
            .storage
            .change_proposal_status(id, change.status)
            .await?,
    ))
}

pub async fn delete_proposal(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> Result<StatusCode, CrmError> {
    state.storage.delete_proposal(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Turn an approved proposal into a project.
pub async fn convert_proposal(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> Result<(StatusCode, Json<Conversion>), CrmError> {
    let conversion = state.storage.convert_proposal(id).await?;
    Ok((StatusCode::CREATED, Json(conversion)))
}

/// Download the proposal as a Markdown attachment.
pub async fn export_proposal(
    State(state): State<CrmState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> Result<Response, CrmError> {
    let (proposal, client) = state.storage.proposal_with_client(id).await?;
    let body = ProposalDocument::new(&state.export).render(&proposal, &client);
    let disposition = format!(
        "attachment; filename=\"{}\"",
        ProposalDocument::file_name(&proposal)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

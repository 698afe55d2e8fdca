use axum::{
    Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;

use crate::db::models::ActivityLog;
use crate::middleware::ApiQuery;
use crate::types::forms::ActivityQuery;
use crate::{CrmError, router::CrmState};

/// Most recent activity first, optionally narrowed to one entity kind.
pub async fn list_activity(
    State(state): State<CrmState>,
    WithRejection(Query(query), _): ApiQuery<ActivityQuery>,
) -> Result<Json<Vec<ActivityLog>>, CrmError> {
    Ok(Json(state.storage.list_activity(&query).await?))
}

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::{CrmError, router::CrmState};

/// Liveness plus a round trip to the database.
pub async fn health(State(state): State<CrmState>) -> Result<Json<Value>, CrmError> {
    sqlx::query("SELECT 1").execute(state.storage.pool()).await?;
    Ok(Json(json!({ "status": "ok" })))
}

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use std::collections::BTreeMap;
use thiserror::Error as ThisError;
use tracing::error;

use crate::types::status::EntityKind;
use crate::validation::ValidationErrors;

#[derive(Debug, ThisError)]
pub enum CrmError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: i64 },

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: EntityKind,
        from: String,
        to: String,
    },

    #[error("{entity} {id} is locked in status {status}")]
    Locked {
        entity: EntityKind,
        id: i64,
        status: String,
    },

    #[error("proposal {proposal_id} was already converted into project {project_id}")]
    AlreadyConverted { proposal_id: i64, project_id: i64 },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("Configuration error: {0}")]
    ConfigError(#[from] figment::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Ractor error: {0}")]
    RactorError(String),
}

impl From<QueryRejection> for CrmError {
    fn from(rejection: QueryRejection) -> Self {
        CrmError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for CrmError {
    fn from(rejection: PathRejection) -> Self {
        CrmError::BadRequest(rejection.body_text())
    }
}

impl From<ValidationErrors> for CrmError {
    fn from(errors: ValidationErrors) -> Self {
        CrmError::Validation(errors)
    }
}

impl IntoResponse for CrmError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            CrmError::NotFound { .. } => (
                StatusCode::NOT_FOUND,
                ApiErrorBody::new("NOT_FOUND", self.to_string()),
            ),
            CrmError::Validation(errors) => {
                let body = ApiErrorBody {
                    code: "VALIDATION_FAILED".to_string(),
                    message: "The given data was invalid.".to_string(),
                    fields: Some(errors.fields().clone()),
                };
                (StatusCode::UNPROCESSABLE_ENTITY, body)
            }
            CrmError::InvalidTransition { .. } => (
                StatusCode::CONFLICT,
                ApiErrorBody::new("INVALID_TRANSITION", self.to_string()),
            ),
            CrmError::Locked { .. } => (
                StatusCode::CONFLICT,
                ApiErrorBody::new("LOCKED", self.to_string()),
            ),
            CrmError::AlreadyConverted { .. } => (
                StatusCode::CONFLICT,
                ApiErrorBody::new("ALREADY_CONVERTED", self.to_string()),
            ),
            CrmError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiErrorBody::new("BAD_REQUEST", msg))
            }
            CrmError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ApiErrorBody::new("PAYLOAD_TOO_LARGE", self.to_string()),
            ),
            CrmError::DatabaseError(_)
            | CrmError::ConfigError(_)
            | CrmError::IoError(_)
            | CrmError::RactorError(_) => {
                error!(error = %self, "request failed with internal error");
                let body = ApiErrorBody::new(
                    "INTERNAL_ERROR",
                    "An internal server error occurred.",
                );
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}

impl ApiErrorBody {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            fields: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

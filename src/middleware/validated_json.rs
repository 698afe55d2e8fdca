use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
};
use serde::de::DeserializeOwned;

use crate::error::CrmError;
use crate::validation::Validate;

/// JSON body that has been parsed and passed `Validate`.
///
/// Malformed JSON is a 400 and an oversized body a 413; well-formed JSON with
/// bad fields is a 422 listing every failing field.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = CrmError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => CrmError::PayloadTooLarge,
                _ => CrmError::BadRequest(rejection.body_text()),
            })?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

use axum::Json;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{HeaderMap, StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use axum_extra::TypedHeader;
use headers::Authorization;
use headers::authorization::Bearer;
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::router::CrmState;

fn key_matches(candidate: &str, expected: &str) -> bool {
    bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()))
}

/// Ensure the inbound request carries the API key.
/// Accepts either:
/// - Header: `Authorization: Bearer <key>`
/// - Header: `x-api-key: <key>`
/// - Query string: `?key=...`
pub fn ensure_authorized(
    expected: &str,
    bearer: Option<&str>,
    headers: &HeaderMap,
    query: Option<&str>,
) -> Result<(), Response> {
    // 1) Authorization: Bearer <key>
    if let Some(token) = bearer
        && key_matches(token, expected)
    {
        return Ok(());
    }

    // 2) header: x-api-key
    if let Some(hv) = headers.get("x-api-key").and_then(|v| v.to_str().ok())
        && key_matches(hv.trim(), expected)
    {
        return Ok(());
    }

    // 3) query: key=...
    if let Some(qs) = query {
        for (k, v) in url::form_urlencoded::parse(qs.as_bytes()) {
            if k == "key" && key_matches(&v, expected) {
                return Ok(());
            }
        }
    }

    Err((
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": {"code": "UNAUTHORIZED", "message": "invalid or missing API key"}
        })),
    )
        .into_response())
}

#[derive(Debug, Clone, Copy)]
pub struct RequireKeyAuth;

impl<S> FromRequestParts<S> for RequireKeyAuth
where
    CrmState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let crm = CrmState::from_ref(state);
        let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok();
        let token = bearer.as_ref().map(|TypedHeader(auth)| auth.token());

        ensure_authorized(&crm.api_key, token, &parts.headers, parts.uri.query()).inspect_err(
            |_| debug!(path = %parts.uri.path(), "rejected request without valid API key"),
        )?;
        Ok(Self)
    }
}

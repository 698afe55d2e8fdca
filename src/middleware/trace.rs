use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{Instrument, info, info_span, warn};

/// Log one line per request with method, path, status and latency.
pub async fn trace_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let span = info_span!("http", %method, %path);

    async move {
        let started = Instant::now();
        let resp = next.run(req).await;
        let status = resp.status();
        let latency_ms = started.elapsed().as_millis() as u64;
        if status.is_server_error() {
            warn!(status = status.as_u16(), latency_ms, "request failed");
        } else {
            info!(status = status.as_u16(), latency_ms, "request served");
        }
        resp
    }
    .instrument(span)
    .await
}

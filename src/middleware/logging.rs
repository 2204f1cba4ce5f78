//! Request id generation and per-request logging

use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

/// Generates a UUID v4 for every request lacking an `x-request-id`.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Logs method, path, status and latency, inside a span tagged with the request id.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let started = Instant::now();
        let response = next.run(request).await;
        let status = response.status();
        let latency_ms = started.elapsed().as_millis() as u64;

        if status.is_server_error() {
            error!(status = status.as_u16(), latency_ms, "request failed");
        } else if status.is_client_error() && status != StatusCode::NOT_FOUND {
            warn!(status = status.as_u16(), latency_ms, "request rejected");
        } else {
            info!(status = status.as_u16(), latency_ms, "request completed");
        }

        response
    }
    .instrument(span)
    .await
}

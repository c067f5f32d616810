//! Request identification.
//!
//! # Design Decisions
//! - Request ID is assigned by the outermost layer so every span carries it
//! - Incoming `x-request-id` headers are kept, not replaced

use axum::body::Body;
use axum::http::{HeaderName, Request};
use tracing::Span;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Root span for one HTTP request.
pub fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id
    )
}

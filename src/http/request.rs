//! Request intake.
//!
//! # Responsibilities
//! - Buffer the inbound request into a [`RequestContext`]
//! - Read the request ID assigned by the middleware stack
//!
//! # Design Decisions
//! - Request IDs are set by `SetRequestIdLayer` before any handler runs
//! - Bodies are buffered up to a configured limit; handlers see plain bytes

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, Request};

use crate::vhosts::RequestContext;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// The request ID, or `"unknown"` when none was assigned.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Buffer `request` (body capped at `body_limit` bytes) into a handler context.
pub async fn context_from_request(
    request: Request<Body>,
    body_limit: usize,
) -> Result<RequestContext, axum::Error> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, body_limit).await?;
    Ok(RequestContext::new(parts.method, parts.uri, parts.headers, body))
}

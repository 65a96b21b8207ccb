//! Request handler capabilities and the context they operate on.
//!
//! # Responsibilities
//! - Define the request context handed to every vhost handler
//! - Define handler / error handler capability types
//! - Provide the placeholder handlers for unlinked vhosts
//! - Hold the tag → handler catalog used to re-attach handlers after a load
//!
//! # Design Decisions
//! - Handlers are plain `Arc<dyn Fn>` values: cheap to clone into every binding
//! - Handlers never touch the wire; they write into a buffered response that
//!   the HTTP layer turns into a real response afterwards
//! - Handlers are never serialized; they are looked up again by tag

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Body returned by the placeholder handler of an unlinked vhost.
pub const NOT_LINKED_BODY: &str = "😎 Just chillin', hostname not linked yet. Try again later.";

/// Status returned by the placeholder handler of an unlinked vhost.
pub const NOT_LINKED_STATUS: u16 = 420;

/// Failure reported by a handler or error handler.
#[derive(Debug, Clone, Error)]
#[error("{status}: {message}")]
pub struct HandlerError {
    /// Status the failure maps to when nothing else handles it.
    pub status: StatusCode,
    pub message: String,
}

impl HandlerError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// A 500 failure with the given message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

/// Request-handling capability bound to a vhost.
pub type Handler = Arc<dyn Fn(&mut RequestContext) -> Result<(), HandlerError> + Send + Sync>;

/// Error-handling capability, invoked with the failure of a [`Handler`].
pub type ErrorHandler =
    Arc<dyn Fn(&mut RequestContext, HandlerError) -> Result<(), HandlerError> + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut RequestContext) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as an [`ErrorHandler`].
pub fn error_handler<F>(f: F) -> ErrorHandler
where
    F: Fn(&mut RequestContext, HandlerError) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Placeholder handler for vhosts whose path is not linked to anything.
pub fn default_handler() -> Handler {
    handler(|ctx| {
        let status = StatusCode::from_u16(NOT_LINKED_STATUS).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
        ctx.status(status).send_string(NOT_LINKED_BODY)
    })
}

/// Placeholder error handler: a bare internal error response.
pub fn default_error_handler() -> ErrorHandler {
    error_handler(|ctx, _err| {
        ctx.status(StatusCode::INTERNAL_SERVER_ERROR)
            .send_string("Internal Server Error")
    })
}

/// A handler paired with its error handler, as supplied to bulk initialization.
#[derive(Clone)]
pub struct HandlerPair {
    pub handler: Handler,
    pub error_handler: ErrorHandler,
}

impl HandlerPair {
    pub fn new(handler: Handler, error_handler: ErrorHandler) -> Self {
        Self {
            handler,
            error_handler,
        }
    }
}

impl fmt::Debug for HandlerPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HandlerPair { .. }")
    }
}

/// Tag-keyed handlers used by `reload_handlers` to re-attach behavior.
#[derive(Clone, Default)]
pub struct HandlerCatalog {
    handlers: HashMap<String, Handler>,
    error_handlers: HashMap<String, ErrorHandler>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_handler(&mut self, tag: impl Into<String>, handler: Handler) {
        self.handlers.insert(tag.into(), handler);
    }

    pub fn insert_error_handler(&mut self, tag: impl Into<String>, error_handler: ErrorHandler) {
        self.error_handlers.insert(tag.into(), error_handler);
    }

    pub fn handler(&self, tag: &str) -> Option<Handler> {
        self.handlers.get(tag).cloned()
    }

    pub fn error_handler(&self, tag: &str) -> Option<ErrorHandler> {
        self.error_handlers.get(tag).cloned()
    }

    pub fn remove_handler(&mut self, tag: &str) -> Option<Handler> {
        self.handlers.remove(tag)
    }

    pub fn remove_error_handler(&mut self, tag: &str) -> Option<ErrorHandler> {
        self.error_handlers.remove(tag)
    }

    /// Number of registered (handler, error handler) entries.
    pub fn counts(&self) -> (usize, usize) {
        (self.handlers.len(), self.error_handlers.len())
    }
}

impl fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handlers: Vec<_> = self.handlers.keys().collect();
        let mut error_handlers: Vec<_> = self.error_handlers.keys().collect();
        handlers.sort();
        error_handlers.sort();
        f.debug_struct("HandlerCatalog")
            .field("handlers", &handlers)
            .field("error_handlers", &error_handlers)
            .finish()
    }
}

/// Vhost metadata exposed to handlers for the duration of one request.
#[derive(Clone)]
pub struct VhostInfo {
    pub hostname: String,
    pub website_id: String,
    pub error_handler: ErrorHandler,
}

impl fmt::Debug for VhostInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VhostInfo")
            .field("hostname", &self.hostname)
            .field("website_id", &self.website_id)
            .finish_non_exhaustive()
    }
}

/// Buffered response written by handlers.
#[derive(Debug)]
struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }
}

/// Request-scoped context passed to handlers.
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    hostname: String,
    headers: HeaderMap,
    body: Bytes,
    vhost: Option<VhostInfo>,
    response: ResponseWriter,
}

impl RequestContext {
    /// Build a context from already-buffered request parts.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        let hostname = request_hostname(&uri, &headers);
        Self {
            method,
            uri,
            hostname,
            headers,
            body,
            vhost: None,
            response: ResponseWriter::default(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Hostname the request was addressed to, without port.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Metadata of the vhost this request was dispatched to.
    pub fn vhost(&self) -> Option<&VhostInfo> {
        self.vhost.as_ref()
    }

    pub(crate) fn set_vhost(&mut self, info: VhostInfo) {
        self.vhost = Some(info);
    }

    /// Discard the buffered status, headers and body.
    pub(crate) fn reset_response(&mut self) {
        self.response = ResponseWriter::default();
    }

    /// Set the response status.
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.response.status = status;
        self
    }

    /// Set a response header.
    pub fn set_header(&mut self, name: header::HeaderName, value: HeaderValue) -> &mut Self {
        self.response.headers.insert(name, value);
        self
    }

    /// Replace the response body with a plain-text string.
    pub fn send_string(&mut self, body: impl Into<String>) -> Result<(), HandlerError> {
        self.response
            .headers
            .entry(header::CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("text/plain; charset=utf-8"));
        self.response.body = body.into().into_bytes();
        Ok(())
    }

    /// Replace the response body with raw bytes.
    pub fn send_bytes(&mut self, body: impl Into<Vec<u8>>) -> Result<(), HandlerError> {
        self.response.body = body.into();
        Ok(())
    }

    /// Set the status and use its canonical reason as body.
    pub fn send_status(&mut self, status: StatusCode) -> Result<(), HandlerError> {
        self.status(status);
        self.send_string(status.canonical_reason().unwrap_or_default())
    }

    pub fn response_status(&self) -> StatusCode {
        self.response.status
    }

    pub fn response_body(&self) -> &[u8] {
        &self.response.body
    }

    /// Turn the buffered response into an HTTP response.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.response.body));
        *response.status_mut() = self.response.status;
        *response.headers_mut() = self.response.headers;
        response
    }
}

/// Host the request targets: URI authority first, then the Host header.
fn request_hostname(uri: &Uri, headers: &HeaderMap) -> String {
    if let Some(host) = uri.host() {
        return host.to_string();
    }
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(strip_port)
        .unwrap_or_default()
}

fn strip_port(host: &str) -> String {
    if let Some(rest) = host.strip_prefix('[') {
        // IPv6 literal
        return match rest.split_once(']') {
            Some((addr, _)) => format!("[{}]", addr),
            None => host.to_string(),
        };
    }
    match host.rsplit_once(':') {
        Some((name, _port)) => name.to_string(),
        None => host.to_string(),
    }
}

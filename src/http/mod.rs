//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, tracing)
//!     → request.rs (buffer into a RequestContext)
//!     → dispatch.rs (hostname → vhost handler / error handler)
//!     → server.rs (404 on miss, buffered response otherwise)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod request;
pub mod server;

pub use dispatch::{dispatch, DispatchError};
pub use request::{context_from_request, request_id, X_REQUEST_ID};
pub use server::{AppState, HttpServer};

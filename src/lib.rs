//! Hostname-based request routing registry.
//!
//! A [`Vhosts`] registry maps request hostnames to handlers. The HTTP layer
//! resolves each request's hostname through it and runs the bound handler,
//! falling back to the vhost's error handler on failure and to a 404 when no
//! vhost matches.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod vhosts;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use vhosts::{Vhost, VhostError, Vhosts};

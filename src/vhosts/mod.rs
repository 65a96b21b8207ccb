//! Virtual host registry subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound hostname
//!     → registry.rs (exact hostname lookup under a read lock)
//!     → Vhost { handler, error_handler, website_id } or not found
//!
//! Persistence:
//!     save: registry.rs → hash.rs (fingerprint) → store.rs (write file)
//!     load: store.rs (read + verify) → registry.rs (replace and re-attach
//!           catalog handlers by path under one write lock)
//!
//! Hot reload:
//!     watcher.rs (data file changed) → load
//! ```
//!
//! # Design Decisions
//! - The registry is an explicitly constructed value shared via `Arc`
//! - Data persists; handlers re-attach by stable tag
//! - Missing hostnames are `None` / `VhostError::NotFound`, never a generic error

pub mod binding;
pub mod error;
pub mod handler;
pub mod hash;
pub mod registry;
pub mod store;
pub mod watcher;

pub use binding::Vhost;
pub use error::{VhostError, VhostResult};
pub use handler::{
    default_error_handler, default_handler, error_handler, handler, ErrorHandler, Handler,
    HandlerCatalog, HandlerError, HandlerPair, RequestContext, VhostInfo,
};
pub use hash::{fingerprint, Checksum};
pub use registry::{vhostnames, InitializeSummary, ReloadSummary, Vhosts};
pub use watcher::VhostFileWatcher;

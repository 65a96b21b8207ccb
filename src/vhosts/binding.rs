//! The virtual host binding.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::vhosts::handler::{default_error_handler, default_handler, ErrorHandler, Handler};

/// Seconds since the Unix epoch.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// One routable virtual host.
#[derive(Clone)]
pub struct Vhost {
    /// Exact, case-sensitive lookup key.
    pub hostname: String,
    /// Catalog tag used by `reload_handlers`; empty means unlinked.
    pub path: String,
    /// Opaque owner identifier, not interpreted by the registry.
    pub website_id: String,
    pub handler: Handler,
    pub error_handler: ErrorHandler,
    /// Creation / last touch time (seconds since epoch).
    pub last_modified: i64,
}

impl Vhost {
    /// Create a new vhost stamped with the current time.
    pub fn new(
        hostname: impl Into<String>,
        path: impl Into<String>,
        website_id: impl Into<String>,
        handler: Handler,
        error_handler: ErrorHandler,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            path: path.into(),
            website_id: website_id.into(),
            handler,
            error_handler,
            last_modified: unix_now(),
        }
    }

    /// Create a vhost bound to the placeholder handlers.
    pub fn unlinked(
        hostname: impl Into<String>,
        path: impl Into<String>,
        website_id: impl Into<String>,
    ) -> Self {
        Self::new(
            hostname,
            path,
            website_id,
            default_handler(),
            default_error_handler(),
        )
    }

    /// True when the vhost has no catalog tag.
    pub fn is_unlinked(&self) -> bool {
        self.path.is_empty()
    }
}

impl fmt::Debug for Vhost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vhost")
            .field("hostname", &self.hostname)
            .field("path", &self.path)
            .field("website_id", &self.website_id)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}

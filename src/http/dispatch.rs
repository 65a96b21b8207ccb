//! Hostname dispatch.
//!
//! # Responsibilities
//! - Resolve the request hostname through the registry
//! - Expose vhost metadata to the handler via the request context
//! - Route handler failures to the vhost's error handler
//!
//! # Design Decisions
//! - A miss is `DispatchError::NotFound`; mapping it to a 404 is the server's job
//! - Only a failing error handler surfaces as an error; handler failures do not
//! - The error handler starts from an empty response; partial output of the
//!   failed handler is dropped

use std::time::Instant;
use thiserror::Error;

use crate::observability::metrics;
use crate::vhosts::{HandlerError, RequestContext, VhostInfo, Vhosts};

/// Errors that can occur while dispatching a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No vhost is bound to the request hostname.
    #[error("no vhost bound to hostname {0:?}")]
    NotFound(String),

    /// The handler failed and so did the vhost's error handler.
    #[error("vhost error handler failed: {0}")]
    ErrorHandler(HandlerError),
}

/// Resolve `ctx`'s hostname and run the bound handler against it.
pub fn dispatch(vhosts: &Vhosts, ctx: &mut RequestContext) -> Result<(), DispatchError> {
    let start_time = Instant::now();
    let hostname = ctx.hostname().to_string();

    let Some(vhost) = vhosts.get(&hostname) else {
        metrics::record_dispatch("not_found", start_time);
        return Err(DispatchError::NotFound(hostname));
    };

    ctx.set_vhost(VhostInfo {
        hostname: hostname.clone(),
        website_id: vhost.website_id.clone(),
        error_handler: vhost.error_handler.clone(),
    });

    let err = match (vhost.handler)(ctx) {
        Ok(()) => {
            metrics::record_dispatch("hit", start_time);
            return Ok(());
        }
        Err(err) => err,
    };

    tracing::warn!(hostname = %hostname, error = %err, "Vhost handler failed, running error handler");
    ctx.reset_response();
    match (vhost.error_handler)(ctx, err) {
        Ok(()) => {
            metrics::record_dispatch("handler_error", start_time);
            Ok(())
        }
        Err(err) => {
            metrics::record_dispatch("error_handler_failed", start_time);
            Err(DispatchError::ErrorHandler(err))
        }
    }
}

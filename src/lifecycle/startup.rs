//! Startup orchestration.
//!
//! # Responsibilities
//! - Register configured handlers in the registry catalog
//! - Load the vhost data file, or seed vhosts from config when it is absent
//! - Re-attach handlers to seeded vhosts (loading re-attaches on its own)
//!
//! # Design Decisions
//! - Fail fast: a corrupt data file is a startup error, not a silent reset
//! - A missing data file is normal on first start; any other stat failure is fatal

use axum::http::{header, HeaderValue, StatusCode};
use std::sync::Arc;

use crate::config::{ServiceConfig, StaticHandlerConfig};
use crate::vhosts::store::file_exists;
use crate::vhosts::{handler, Handler, Vhost, VhostResult, Vhosts};

/// Build a handler answering with the configured static response.
pub fn static_handler(config: &StaticHandlerConfig) -> Handler {
    let status = StatusCode::from_u16(config.status).unwrap_or(StatusCode::OK);
    let content_type = HeaderValue::from_str(&config.content_type)
        .unwrap_or(HeaderValue::from_static("text/plain; charset=utf-8"));
    let body = config.body.clone();

    handler(move |ctx| {
        ctx.status(status)
            .set_header(header::CONTENT_TYPE, content_type.clone());
        ctx.send_bytes(body.clone())
    })
}

/// Build the registry described by `config`.
pub fn bootstrap_registry(config: &ServiceConfig) -> VhostResult<Arc<Vhosts>> {
    let vhosts = Arc::new(Vhosts::new());

    for handler_config in &config.handlers {
        vhosts.add_handler(handler_config.tag.clone(), static_handler(handler_config));
    }

    match &config.registry.data_file {
        Some(path) if file_exists(path)? => {
            vhosts.load(path)?;
        }
        data_file => {
            if let Some(path) = data_file {
                tracing::info!(path = %path.display(), "No vhost data file yet, seeding from config");
            }
            for vhost in &config.vhosts {
                vhosts.add(Vhost::unlinked(
                    vhost.hostname.clone(),
                    vhost.path.clone(),
                    vhost.website_id.clone(),
                ))?;
            }
            vhosts.reload_handlers();
        }
    }

    tracing::info!(vhosts = vhosts.number_of_vhosts(), "Vhost registry ready");
    Ok(vhosts)
}

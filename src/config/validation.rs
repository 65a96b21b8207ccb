//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (vhost paths reference existing handler tags)
//! - Validate value ranges (timeouts > 0, addresses parse, statuses valid)
//! - Detect duplicate hostnames and tags
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),

    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,

    #[error("vhost #{0} has an empty hostname")]
    EmptyHostname(usize),

    #[error("duplicate vhost hostname {0:?}")]
    DuplicateHostname(String),

    #[error("handler #{0} has an empty tag")]
    EmptyHandlerTag(usize),

    #[error("duplicate handler tag {0:?}")]
    DuplicateHandlerTag(String),

    #[error("handler {tag:?} has invalid status {status}")]
    InvalidStatus { tag: String, status: u16 },

    #[error("vhost {hostname:?} references unknown handler tag {path:?}")]
    UnknownHandlerTag { hostname: String, path: String },
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    let mut tags = HashSet::new();
    for (i, handler) in config.handlers.iter().enumerate() {
        if handler.tag.is_empty() {
            errors.push(ValidationError::EmptyHandlerTag(i));
        } else if !tags.insert(handler.tag.as_str()) {
            errors.push(ValidationError::DuplicateHandlerTag(handler.tag.clone()));
        }
        if !(100..=999).contains(&handler.status) {
            errors.push(ValidationError::InvalidStatus {
                tag: handler.tag.clone(),
                status: handler.status,
            });
        }
    }

    let mut hostnames = HashSet::new();
    for (i, vhost) in config.vhosts.iter().enumerate() {
        if vhost.hostname.is_empty() {
            errors.push(ValidationError::EmptyHostname(i));
            continue;
        }
        if !hostnames.insert(vhost.hostname.as_str()) {
            errors.push(ValidationError::DuplicateHostname(vhost.hostname.clone()));
        }
        if !vhost.path.is_empty() && !tags.contains(vhost.path.as_str()) {
            errors.push(ValidationError::UnknownHandlerTag {
                hostname: vhost.hostname.clone(),
                path: vhost.path.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

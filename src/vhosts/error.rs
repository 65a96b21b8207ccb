//! Registry error definitions.

use std::path::PathBuf;
use thiserror::Error;

use crate::vhosts::hash::Checksum;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum VhostError {
    /// A vhost with this hostname is already bound.
    #[error("vhost already exists: {0}")]
    AlreadyExists(String),

    /// No vhost is bound to this hostname.
    #[error("vhost not found: {0}")]
    NotFound(String),

    /// The data file to load does not exist.
    #[error("vhost data file does not exist: {}", .0.display())]
    FileNotFound(PathBuf),

    /// No handler or error handler is registered under this tag.
    #[error("handler not registered: {0}")]
    HandlerNotFound(String),

    /// The stored checksum does not match the loaded vhosts.
    #[error("vhosts checksum mismatch: stored {stored}, computed {computed}")]
    IntegrityMismatch { stored: Checksum, computed: Checksum },

    /// Underlying storage failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The payload could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    /// The file is not a vhost data file this build understands.
    #[error("invalid vhost data file: {0}")]
    Format(String),
}

impl VhostError {
    /// True for a missing hostname or a missing data file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VhostError::NotFound(_) | VhostError::FileNotFound(_))
    }

    /// True when the data file was readable but failed verification.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, VhostError::IntegrityMismatch { .. })
    }
}

/// Result type for registry operations.
pub type VhostResult<T> = Result<T, VhostError>;

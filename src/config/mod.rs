//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → lifecycle::startup builds the vhost registry from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the vhost data file is hot-reloaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ListenerConfig, LogFormat, ObservabilityConfig, RegistryConfig, ServiceConfig,
    StaticHandlerConfig, TimeoutConfig, VhostConfig,
};
pub use validation::{validate_config, ValidationError};

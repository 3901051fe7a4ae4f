//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → environment.rs (closed-set environment, parsed once)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → handed to App, which owns it for the process lifetime
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod environment;
pub mod loader;
pub mod schema;
pub mod validation;

pub use environment::{EnvironmentError, EnvironmentMode, RunMode};
pub use loader::{load_config, parse_config, ConfigError};
pub use schema::AppConfig;
pub use schema::{
    AccessLogConfig, CorsConfig, HealthConfig, ListenerConfig, MetricsConfig, RecoveryConfig,
};

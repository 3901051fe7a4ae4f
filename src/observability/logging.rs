//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Map the deployment environment onto a sensible default
//! - Reject unsupported output formats at configuration time
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, console format for development
//! - Log level configurable via config and `RUST_LOG`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::environment::EnvironmentMode;

/// Errors raised while configuring the logging backend.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("wrong log format {0:?}, only accept value: console or json")]
    UnsupportedFormat(String),

    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("failed to install subscriber: {0}")]
    Init(String),
}

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogFormat {
    #[default]
    Console,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "console" => Ok(LogFormat::Console),
            "json" => Ok(LogFormat::Json),
            other => Err(LoggingError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl TryFrom<String> for LogFormat {
    type Error = LoggingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LogFormat> for String {
    fn from(format: LogFormat) -> Self {
        format.to_string()
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Console => f.write_str("console"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,

    /// EnvFilter directive, e.g. "info" or "service_scaffold=debug,tower_http=warn".
    pub level: String,

    /// Include file and line of each event.
    pub development: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Console,
            level: "info".to_string(),
            development: false,
        }
    }
}

impl LogConfig {
    /// Production gets JSON at info; every other environment gets console at debug.
    pub fn for_environment(env: EnvironmentMode) -> Self {
        if env.is_production() {
            Self {
                format: LogFormat::Json,
                level: "info".to_string(),
                development: false,
            }
        } else {
            Self {
                format: LogFormat::Console,
                level: "debug".to_string(),
                development: true,
            }
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, takes precedence over the configured level.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| LoggingError::InvalidLevel(format!("{}: {}", config.level, e)))?,
    };

    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_file(config.development)
                    .with_line_number(config.development),
            )
            .try_init(),
        LogFormat::Console => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(config.development)
                    .with_line_number(config.development),
            )
            .try_init(),
    }
    .map_err(|e| LoggingError::Init(e.to_string()))
}

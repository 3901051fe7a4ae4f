//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::config::environment::EnvironmentMode;
use crate::observability::logging::LogConfig;

/// Root configuration for a service process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, drain deadline).
    pub listener: ListenerConfig,

    /// Deployment environment; drives run mode and logging defaults.
    pub environment: EnvironmentMode,

    /// Logging backend settings. Falls back to the environment default.
    pub logging: Option<LogConfig>,

    /// Access log middleware.
    pub access_log: AccessLogConfig,

    /// Panic recovery middleware.
    pub recovery: RecoveryConfig,

    /// Prometheus exposition.
    pub metrics: MetricsConfig,

    /// Cross-origin headers.
    pub cors: CorsConfig,

    /// Storage health endpoint.
    pub health: HealthConfig,
}

impl AppConfig {
    /// Logging settings in effect: explicit section, or the environment default.
    pub fn log_config(&self) -> LogConfig {
        self.logging
            .clone()
            .unwrap_or_else(|| self.environment.default_log_config())
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// How long in-flight requests may run after a termination signal.
    pub shutdown_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            shutdown_timeout_secs: 10,
        }
    }
}

/// Access log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessLogConfig {
    /// Log the request body as text.
    pub capture_body: bool,

    /// Bodies larger than this are passed through uncaptured.
    pub max_body_bytes: usize,

    /// Exact paths that never produce an access line.
    pub skip_paths: Vec<String>,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            capture_body: true,
            max_body_bytes: 1024 * 1024,
            skip_paths: vec!["/healthz".to_string(), "/metrics".to_string()],
        }
    }
}

/// Recovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Include the request body in panic reports.
    pub capture_body: bool,

    /// Upper bound for the buffered body.
    pub max_body_bytes: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            capture_body: true,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and mount the scrape endpoint.
    pub enabled: bool,

    /// Metric name prefix.
    pub namespace: String,

    /// Second prefix segment.
    pub subsystem: String,

    /// Scrape endpoint path on the root group.
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            namespace: "service".to_string(),
            subsystem: String::new(),
            path: "/metrics".to_string(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
}

/// Health endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Mount the endpoint on the root group.
    pub enabled: bool,

    pub path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/healthz".to_string(),
        }
    }
}

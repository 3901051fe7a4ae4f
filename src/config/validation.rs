//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that configured paths are absolute
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {:?}", config.listener.bind_address),
        ));
    }

    if config.listener.shutdown_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "listener.shutdown_timeout_secs",
            "must be greater than zero",
        ));
    }

    if config.access_log.max_body_bytes == 0 {
        errors.push(ValidationError::new("access_log.max_body_bytes", "must be greater than zero"));
    }

    if config.recovery.max_body_bytes == 0 {
        errors.push(ValidationError::new("recovery.max_body_bytes", "must be greater than zero"));
    }

    for (i, path) in config.access_log.skip_paths.iter().enumerate() {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(
                format!("access_log.skip_paths[{}]", i),
                format!("path must start with '/': {:?}", path),
            ));
        }
    }

    if config.metrics.enabled && !config.metrics.path.starts_with('/') {
        errors.push(ValidationError::new(
            "metrics.path",
            format!("path must start with '/': {:?}", config.metrics.path),
        ));
    }

    if config.health.enabled && !config.health.path.starts_with('/') {
        errors.push(ValidationError::new(
            "health.path",
            format!("path must start with '/': {:?}", config.health.path),
        ));
    }

    if config.metrics.enabled && config.health.enabled && config.metrics.path == config.health.path {
        errors.push(ValidationError::new(
            "metrics.path",
            "collides with health.path",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "localhost".to_string();
        config.listener.shutdown_timeout_secs = 0;
        config.access_log.skip_paths.push("health".to_string());

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "listener.shutdown_timeout_secs",
                "access_log.skip_paths[2]",
            ]
        );
    }

    #[test]
    fn metrics_path_checked_only_when_enabled() {
        let mut config = AppConfig::default();
        config.metrics.path = "metrics".to_string();
        assert!(validate_config(&config).is_ok());

        config.metrics.enabled = true;
        assert!(validate_config(&config).is_err());
    }
}

//! Deployment environment.
//!
//! # Responsibilities
//! - Parse the configured environment exactly once, at the config boundary
//! - Reject anything outside the closed set instead of coercing it
//! - Derive run-mode defaults (verbose vs. terse) for downstream subsystems

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced when an environment value is outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvironmentError {
    #[error("wrong env value: {0}")]
    Invalid(String),
}

/// Where the process is deployed.
///
/// Codes match the numbering used in existing config files (1..=5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawEnvironment", into = "String")]
pub enum EnvironmentMode {
    #[default]
    Development,
    Online,
    Qa,
    PreRelease,
    Local,
}

/// Router verbosity derived from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Route table is printed at startup, logs default to debug.
    Debug,
    /// Terse output for production traffic.
    Release,
}

impl EnvironmentMode {
    pub const ALL: [EnvironmentMode; 5] = [
        EnvironmentMode::Development,
        EnvironmentMode::Online,
        EnvironmentMode::Qa,
        EnvironmentMode::PreRelease,
        EnvironmentMode::Local,
    ];

    /// Numeric code of this environment.
    pub fn code(self) -> i64 {
        match self {
            EnvironmentMode::Development => 1,
            EnvironmentMode::Online => 2,
            EnvironmentMode::Qa => 3,
            EnvironmentMode::PreRelease => 4,
            EnvironmentMode::Local => 5,
        }
    }

    /// Canonical short name.
    pub fn as_str(self) -> &'static str {
        match self {
            EnvironmentMode::Development => "dev",
            EnvironmentMode::Online => "online",
            EnvironmentMode::Qa => "qa",
            EnvironmentMode::PreRelease => "pl",
            EnvironmentMode::Local => "local",
        }
    }

    /// Only `Online` runs the router in release mode.
    pub fn run_mode(self) -> RunMode {
        match self {
            EnvironmentMode::Online => RunMode::Release,
            _ => RunMode::Debug,
        }
    }

    pub fn is_production(self) -> bool {
        self == EnvironmentMode::Online
    }

    /// Logging defaults for this environment.
    pub fn default_log_config(self) -> crate::observability::logging::LogConfig {
        crate::observability::logging::LogConfig::for_environment(self)
    }
}

impl fmt::Display for EnvironmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvironmentMode {
    type Err = EnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(EnvironmentMode::Development),
            "online" | "production" | "prod" => Ok(EnvironmentMode::Online),
            "qa" => Ok(EnvironmentMode::Qa),
            "pl" | "staging" | "pre-release" | "prerelease" => Ok(EnvironmentMode::PreRelease),
            "local" => Ok(EnvironmentMode::Local),
            _ => Err(EnvironmentError::Invalid(s.to_string())),
        }
    }
}

impl TryFrom<i64> for EnvironmentMode {
    type Error = EnvironmentError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|env| env.code() == code)
            .ok_or_else(|| EnvironmentError::Invalid(code.to_string()))
    }
}

impl From<EnvironmentMode> for String {
    fn from(env: EnvironmentMode) -> Self {
        env.as_str().to_string()
    }
}

/// Wire shape accepted in config files: a name or a numeric code.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEnvironment {
    Code(i64),
    Name(String),
}

impl TryFrom<RawEnvironment> for EnvironmentMode {
    type Error = EnvironmentError;

    fn try_from(raw: RawEnvironment) -> Result<Self, Self::Error> {
        match raw {
            RawEnvironment::Code(code) => EnvironmentMode::try_from(code),
            RawEnvironment::Name(name) => name.parse(),
        }
    }
}

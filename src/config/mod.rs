//! Connector configuration
//!
//! Process settings and per-provider credentials, resolved from the
//! environment. Blank variables count as unset.

pub mod providers;

pub use providers::*;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logging::{LogFormat, LoggingConfig};

/// Read an environment variable, trimming it and treating blank as unset.
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a required environment variable.
pub fn require_env(name: &str) -> Result<String> {
    env_var(name).ok_or_else(|| Error::config(format!("Missing environment variable: {}", name)))
}

/// Process-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Deployment environment name
    #[serde(default = "default_env")]
    pub env: String,
    /// `tracing` filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_env() -> String {
    "dev".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: default_env(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl Settings {
    /// Load settings from `CONNECTORS_ENV`, `CONNECTORS_LOG_LEVEL` and
    /// `CONNECTORS_LOG_FORMAT`.
    pub fn from_env() -> Result<Self> {
        let log_format = match env_var("CONNECTORS_LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(Error::config)?,
            None => LogFormat::default(),
        };
        Ok(Self {
            env: env_var("CONNECTORS_ENV").unwrap_or_else(default_env),
            log_level: env_var("CONNECTORS_LOG_LEVEL").unwrap_or_else(default_log_level),
            log_format,
        })
    }

    /// Logging configuration derived from these settings.
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            enabled: true,
            service_name: format!("connectors-{}", self.env),
            log_level: self.log_level.clone(),
            format: self.log_format,
        }
    }
}

mod api;
mod assistant;
mod observability;
mod polling;
mod threads;

pub use api::*;
pub use assistant::*;
pub use observability::*;
pub use polling::*;
pub use threads::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub threads: ThreadsConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Controller
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ControllerConfig {
    /// Hold a per-channel lock for the whole append → run → poll → extract
    /// sequence. Off by default: concurrent messages on one channel may
    /// interleave, and two first messages may each create a remote thread.
    #[serde(default)]
    pub serialize_channels: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.api.base_url.is_empty() {
            errors.push(ConfigError::error("api.base_url", "base_url must not be empty"));
        } else if !self.api.base_url.starts_with("https://")
            && !self.api.base_url.starts_with("http://")
        {
            errors.push(ConfigError::error(
                "api.base_url",
                "base_url must start with http:// or https://",
            ));
        } else if self.api.base_url.starts_with("http://") {
            errors.push(ConfigError::warning(
                "api.base_url",
                "plain http sends the API key unencrypted",
            ));
        }

        if self.api.timeout_ms == 0 {
            errors.push(ConfigError::error("api.timeout_ms", "timeout must be greater than 0"));
        }

        if self.api.auth.key.is_some() {
            errors.push(ConfigError::warning(
                "api.auth.key",
                "plaintext API key in config; prefer `env` or keychain",
            ));
        }

        let has_id = self.assistant.id.as_deref().is_some_and(|id| !id.is_empty());
        if !has_id && self.assistant.name.is_empty() {
            errors.push(ConfigError::error(
                "assistant",
                "either assistant.id or assistant.name must be set",
            ));
        }
        if !has_id && self.assistant.model.is_empty() {
            errors.push(ConfigError::warning(
                "assistant.model",
                "no model set; creating the assistant will fail if it does not exist yet",
            ));
        }

        let p = &self.polling;
        if p.initial_interval_ms == 0 {
            errors.push(ConfigError::error(
                "polling.initial_interval_ms",
                "initial interval must be greater than 0",
            ));
        }
        if p.max_interval_ms < p.initial_interval_ms {
            errors.push(ConfigError::error(
                "polling.max_interval_ms",
                "max interval must be >= initial interval",
            ));
        }
        if !(p.multiplier >= 1.0 && p.multiplier.is_finite()) {
            errors.push(ConfigError::error(
                "polling.multiplier",
                "multiplier must be a finite number >= 1.0",
            ));
        }
        if p.timeout_ms == 0 {
            errors.push(ConfigError::error(
                "polling.timeout_ms",
                "timeout must be greater than 0",
            ));
        } else if p.timeout_ms < p.initial_interval_ms {
            errors.push(ConfigError::warning(
                "polling.timeout_ms",
                "timeout is shorter than one polling interval",
            ));
        }

        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            errors.push(ConfigError::error(
                "observability.sample_rate",
                "sample_rate must be between 0.0 and 1.0",
            ));
        }

        errors
    }
}

//! Engine configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CoreError;

/// Who may claim an open escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimPolicy {
    /// Whoever reproduces the commitment from the factors may claim.
    #[default]
    AnyHolder,
    /// The caller must also be the recipient identity bound into the commitment.
    RecipientOnly,
}

/// Configuration for an escrow engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowConfig {
    /// Seconds after a deposit before its depositor may refund it.
    #[serde(default = "default_refund_window_secs")]
    pub refund_window_secs: u64,

    /// Claim authorization policy.
    #[serde(default)]
    pub claim_policy: ClaimPolicy,

    /// Capacity of the live event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_refund_window_secs() -> u64 {
    86_400
}
fn default_event_capacity() -> usize {
    1024
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            refund_window_secs: default_refund_window_secs(),
            claim_policy: ClaimPolicy::default(),
            event_capacity: default_event_capacity(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl EscrowConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<EscrowConfig>(&contents)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.refund_window_secs == 0 {
            return Err(CoreError::InvalidConfig(
                "refund_window_secs must be greater than zero".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(CoreError::InvalidConfig(
                "event_capacity must be greater than zero".into(),
            ));
        }
        match self.logging.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(CoreError::InvalidConfig(format!(
                "unknown log format: {}",
                other
            ))),
        }
    }

    /// The refund window as a chrono duration.
    pub fn refund_window(&self) -> chrono::Duration {
        window_from_secs(self.refund_window_secs)
    }
}

/// Convert a window in seconds to a chrono duration, saturating at the
/// largest representable duration.
pub fn window_from_secs(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}

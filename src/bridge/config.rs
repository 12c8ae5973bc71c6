//! Bridge configuration.
//!
//! Loaded from YAML (or built in code) and optionally overridden from the
//! environment:
//!
//! ```yaml
//! handle_prefix: "obj-"
//! registry_soft_limit: 50000
//! log_metrics: true
//! pretty_dump: false
//! ```
//!
//! # Environment Variables
//!
//! - `TESTKIT_HANDLE_PREFIX`: prefix of minted handles
//! - `TESTKIT_REGISTRY_SOFT_LIMIT`: entry count that triggers a warning
//! - `TESTKIT_LOG_METRICS`: `true`/`false`, per-command metric records

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{BridgeError, BridgeResult};
use super::handle::DEFAULT_HANDLE_PREFIX;

/// Runtime settings of a [`Bridge`](super::Bridge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Prefix of every minted handle.
    pub handle_prefix: String,
    /// Registry size past which a warning is logged. Nothing is evicted.
    pub registry_soft_limit: Option<usize>,
    /// Emit one metric record per command.
    pub log_metrics: bool,
    /// Pretty-print `dump` output.
    pub pretty_dump: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            handle_prefix: DEFAULT_HANDLE_PREFIX.to_string(),
            registry_soft_limit: None,
            log_metrics: true,
            pretty_dump: false,
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document; missing keys keep their defaults.
    pub fn from_yaml_str(content: &str) -> BridgeResult<Self> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&content)
    }

    /// Apply `TESTKIT_*` environment overrides.
    pub fn with_env_overrides(self) -> BridgeResult<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> BridgeResult<Self> {
        if let Some(prefix) = lookup("TESTKIT_HANDLE_PREFIX") {
            self.handle_prefix = prefix;
        }
        if let Some(limit) = lookup("TESTKIT_REGISTRY_SOFT_LIMIT") {
            let limit = limit.trim();
            self.registry_soft_limit = if limit.is_empty() {
                None
            } else {
                Some(limit.parse().map_err(|_| {
                    BridgeError::Config(format!("TESTKIT_REGISTRY_SOFT_LIMIT is not a number: {limit}"))
                })?)
            };
        }
        if let Some(flag) = lookup("TESTKIT_LOG_METRICS") {
            self.log_metrics = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(BridgeError::Config(format!(
                        "TESTKIT_LOG_METRICS must be a boolean, got {other:?}"
                    )))
                }
            };
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.handle_prefix.is_empty() {
            return Err(BridgeError::Config("handle_prefix must not be empty".into()));
        }
        if self.handle_prefix.contains('"') {
            return Err(BridgeError::Config(
                "handle_prefix must not contain quotes".into(),
            ));
        }
        Ok(())
    }
}

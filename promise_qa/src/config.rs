//! # Adapter Configuration
//!
//! Settings are plain data with serde defaults, so an empty TOML document (or
//! `AdapterConfig::default()`) gives the standard behaviour:
//!
//! ```toml
//! completion_param_names = ["done"]
//! log_level = "info"
//! log_to_file = false
//!
//! [bypass]
//! it = true
//! catch_it = true
//! before = true
//! after = true
//! before_each = true
//! after_each = true
//!
//! [runner]
//! timeout_ms = 2000
//! bail = false
//! ```
//!
//! - **`completion_param_names`**: parameter names that mark a textual
//!   signature as callback-shaped (see [`crate::shape`]).
//! - **`bypass`**: per entry point, whether a callback-shaped function is
//!   registered raw. When `false` the adapter still intervenes and maps what
//!   the function signals through the entry point's mode.
//! - **`runner`**: settings for the reference [`crate::suite::Suite`] runner.

use crate::error::BridgeError;
use crate::runner::{EntryPoint, HookKind};
use crate::shape::DEFAULT_COMPLETION_PARAM;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterConfig {
    #[serde(default = "default_completion_param_names")]
    pub completion_param_names: Vec<String>,
    #[serde(default)]
    pub bypass: BypassPolicy,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_to_file: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            completion_param_names: default_completion_param_names(),
            bypass: BypassPolicy::default(),
            runner: RunnerConfig::default(),
            log_level: default_log_level(),
            log_to_file: false,
        }
    }
}

impl AdapterConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, BridgeError> {
        Ok(toml::from_str(contents)?)
    }

    /// Reads and parses a TOML configuration file.
    pub fn load_from_file(path: &Path) -> Result<Self, BridgeError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| BridgeError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!("Loaded adapter configuration from {}", path.display());
        Ok(config)
    }
}

/// Whether callback-shaped functions skip adaptation, per entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BypassPolicy {
    #[serde(default = "default_true")]
    pub it: bool,
    #[serde(default = "default_true")]
    pub catch_it: bool,
    #[serde(default = "default_true")]
    pub before: bool,
    #[serde(default = "default_true")]
    pub after: bool,
    #[serde(default = "default_true")]
    pub before_each: bool,
    #[serde(default = "default_true")]
    pub after_each: bool,
}

impl Default for BypassPolicy {
    fn default() -> Self {
        Self::all(true)
    }
}

impl BypassPolicy {
    pub fn all(enabled: bool) -> Self {
        Self {
            it: enabled,
            catch_it: enabled,
            before: enabled,
            after: enabled,
            before_each: enabled,
            after_each: enabled,
        }
    }

    pub fn applies_to(&self, entry: EntryPoint) -> bool {
        match entry {
            EntryPoint::It => self.it,
            EntryPoint::CatchIt => self.catch_it,
            EntryPoint::Hook(HookKind::Before) => self.before,
            EntryPoint::Hook(HookKind::After) => self.after,
            EntryPoint::Hook(HookKind::BeforeEach) => self.before_each,
            EntryPoint::Hook(HookKind::AfterEach) => self.after_each,
        }
    }
}

/// Settings for the reference runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Per-body timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Stop after the first failing test
    #[serde(default)]
    pub bail: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            bail: false,
        }
    }
}

impl RunnerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_completion_param_names() -> Vec<String> {
    vec![DEFAULT_COMPLETION_PARAM.to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = AdapterConfig::from_toml_str("").unwrap();
        assert_eq!(config, AdapterConfig::default());
        assert_eq!(config.completion_param_names, vec!["done".to_string()]);
        assert_eq!(config.runner.timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_bypass_table() {
        let config = AdapterConfig::from_toml_str("[bypass]\ncatch_it = false\n").unwrap();
        assert!(config.bypass.applies_to(EntryPoint::It));
        assert!(!config.bypass.applies_to(EntryPoint::CatchIt));
        assert!(config.bypass.applies_to(EntryPoint::Hook(HookKind::AfterEach)));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = AdapterConfig::from_toml_str("retries = 3\n").unwrap_err();
        assert!(matches!(err, BridgeError::ConfigParse(_)));
    }

    #[test]
    fn test_bypass_all_disabled() {
        let policy = BypassPolicy::all(false);
        assert!(!policy.applies_to(EntryPoint::Hook(HookKind::Before)));
    }
}

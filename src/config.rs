//! Harness configuration
//!
//! Built once per process before any test runs, then shared read-only
//! (usually behind an `Arc`) by the executor and the overlays.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Wrapper program prepended to every command when wrapper mode is on
pub const DEFAULT_WRAPPER_ARGV: [&str; 4] =
    ["valgrind", "--quiet", "--error-exitcode=1", "--tool=memcheck"];

/// Stdout text that marks a spurious, environment-induced failure
pub const DEFAULT_RETRY_MARKER: &str = "Got spurious window resize";

/// Environment variable that disables every timeout when truthy
pub const ENV_NO_TIMEOUT: &str = "EXECTEST_NO_TIMEOUT";

/// Environment variable that turns wrapper mode on or off
pub const ENV_WRAPPER: &str = "EXECTEST_WRAPPER";

const DEFAULT_GRACE_PERIOD_MS: u64 = 500;

/// Read-only settings consulted while building and running tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Timeout for commands that do not carry their own
    pub default_timeout_secs: Option<u64>,
    /// Disable all timeouts, e.g. while debugging a test under gdb
    pub no_timeout: bool,
    /// Interval between SIGTERM and SIGKILL when a test times out
    pub grace_period_ms: u64,
    pub wrapper: WrapperConfig,
    pub retry: RetryConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: None,
            no_timeout: false,
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            wrapper: WrapperConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Diagnostic wrapper (memory checker) settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrapperConfig {
    pub enabled: bool,
    /// Wrapper program and its fixed flags
    pub argv: Vec<String>,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            argv: DEFAULT_WRAPPER_ARGV.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Retry-on-artifact settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub marker: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_RETRY_MARKER.to_string(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from TOML text; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: HarnessConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.wrapper.enabled && self.wrapper.argv.is_empty() {
            anyhow::bail!("wrapper.argv must not be empty when the wrapper is enabled");
        }
        if self.retry.marker.is_empty() {
            anyhow::bail!("retry.marker must not be empty");
        }
        Ok(())
    }

    /// Apply `EXECTEST_*` overrides from the process environment
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_NO_TIMEOUT) {
            self.no_timeout = is_truthy(&value);
        }
        if let Some(value) = lookup(ENV_WRAPPER) {
            self.wrapper.enabled = is_truthy(&value);
        }
        self
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_secs.map(Duration::from_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

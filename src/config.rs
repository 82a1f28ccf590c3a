//! Fanout Configuration Module
//!
//! Engine defaults loaded from a TOML file, overridable from the environment.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`FANOUT_MAX_CONCURRENCY`)
//! 2. Config file (e.g. `fanout.toml`)
//! 3. Defaults (unbounded)
//!
//! ```toml
//! # fanout.toml
//! max_concurrency = 8
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::Bound;
use crate::error::{FanoutError, Result};

/// Environment variable overriding `max_concurrency`
pub const ENV_MAX_CONCURRENCY: &str = "FANOUT_MAX_CONCURRENCY";

/// Engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FanoutConfig {
    /// Maximum operations in flight per traversal; absent means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
}

impl FanoutConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FanoutError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })
    }

    /// Load configuration from file
    ///
    /// Returns default config if file doesn't exist.
    /// Returns error if file exists but is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| FanoutError::ConfigError {
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        Self::from_toml_str(&content)
    }

    /// Apply `FANOUT_MAX_CONCURRENCY` if set.
    ///
    /// Accepts a positive integer or `unbounded`.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(raw) = std::env::var(ENV_MAX_CONCURRENCY) {
            self.max_concurrency = parse_max_concurrency(&raw)?;
        }
        Ok(self)
    }

    /// Concurrency bound described by this config
    pub fn bound(&self) -> Result<Bound> {
        match self.max_concurrency {
            None => Ok(Bound::Unbounded),
            Some(n) => Bound::limited(n),
        }
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| FanoutError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })
    }
}

fn parse_max_concurrency(raw: &str) -> Result<Option<usize>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("unbounded") {
        return Ok(None);
    }

    match raw.parse::<usize>() {
        Ok(0) => Err(FanoutError::InvalidConfig {
            key: ENV_MAX_CONCURRENCY.to_string(),
            reason: "must be at least 1".to_string(),
        }),
        Ok(n) => Ok(Some(n)),
        Err(e) => Err(FanoutError::InvalidConfig {
            key: ENV_MAX_CONCURRENCY.to_string(),
            reason: format!("'{}' is not a count: {}", raw, e),
        }),
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Runtime configuration.
//!
//! Every setting has a default, so an absent file is a valid configuration. A file is
//! looked up from the explicit path first, then from `CLUSTERWAIT_CONFIG`.
//!
//! ```yaml
//! backend: oc
//! ocBinary: /usr/local/bin/oc
//! asAdmin: true
//! poll:
//!   intervalSecs: 15
//!   timeoutSecs: 600
//! singleNodeTimeoutMultiplier: 3
//! ```

use crate::constants::{
    CONFIG_PATH_ENV, DEFAULT_MACHINE_API_NAMESPACE, DEFAULT_OC_BINARY, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_POLL_TIMEOUT_SECS, DEFAULT_SINGLE_NODE_TIMEOUT_MULTIPLIER, DEFAULT_STABLE_DELAY_SECS,
};
use crate::errors::ConfigError;
use crate::poll::PollSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Which [`crate::client::ClusterClient`] implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Shell out to the `oc` binary
    #[default]
    Oc,
    /// Talk to the API server directly
    Kube,
}

/// Poll defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollConfig {
    /// Seconds between samples
    pub interval_secs: u64,
    /// Overall budget in seconds
    pub timeout_secs: u64,
    /// Stability re-check delay in seconds, used when a caller asks for one
    pub stable_delay_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            stable_delay_secs: DEFAULT_STABLE_DELAY_SECS,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Client backend
    pub backend: Backend,
    /// `oc` executable for the `oc` backend
    pub oc_binary: String,
    /// Kubeconfig override; the ambient configuration is used when unset
    pub kubeconfig: Option<PathBuf>,
    /// Run `oc` with `--as=system:admin`
    pub as_admin: bool,
    /// Namespace of the machine API components
    pub machine_api_namespace: String,
    /// Poll defaults
    pub poll: PollConfig,
    /// Timeout multiplier on single-node clusters
    pub single_node_timeout_multiplier: u32,
    /// Whether to probe topology and apply the multiplier
    pub scale_timeout_on_single_node: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            oc_binary: DEFAULT_OC_BINARY.to_string(),
            kubeconfig: None,
            as_admin: false,
            machine_api_namespace: DEFAULT_MACHINE_API_NAMESPACE.to_string(),
            poll: PollConfig::default(),
            single_node_timeout_multiplier: DEFAULT_SINGLE_NODE_TIMEOUT_MULTIPLIER,
            scale_timeout_on_single_node: true,
        }
    }
}

impl Config {
    /// Load and validate configuration from `path`, or from `CLUSTERWAIT_CONFIG`, or
    /// fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, or when a value
    /// is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let config = match path.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path)?,
            None => {
                debug!("No configuration file given, using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML file without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let shown = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: shown.clone(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: shown.clone(),
            source,
        })?;
        debug!(path = %shown, "Loaded configuration file");
        Ok(config)
    }

    /// Check the poll invariants and the multiplier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll.intervalSecs must be greater than zero".to_string(),
            ));
        }
        if self.poll.timeout_secs <= self.poll.interval_secs {
            return Err(ConfigError::Invalid(format!(
                "poll.timeoutSecs ({}) must be greater than poll.intervalSecs ({})",
                self.poll.timeout_secs, self.poll.interval_secs
            )));
        }
        if self.single_node_timeout_multiplier == 0 {
            return Err(ConfigError::Invalid(
                "singleNodeTimeoutMultiplier must be at least 1".to_string(),
            ));
        }
        if self.oc_binary.trim().is_empty() {
            return Err(ConfigError::Invalid("ocBinary must not be empty".to_string()));
        }
        Ok(())
    }

    /// The default [`PollSpec`], without stability re-check.
    #[must_use]
    pub fn poll_spec(&self) -> PollSpec {
        PollSpec::from_secs(self.poll.interval_secs, self.poll.timeout_secs)
    }

    /// The stability re-check delay.
    #[must_use]
    pub fn stable_delay(&self) -> Duration {
        Duration::from_secs(self.poll.stable_delay_secs)
    }

    /// The multiplier to apply on single-node clusters, 1 when scaling is disabled.
    #[must_use]
    pub fn timeout_multiplier(&self) -> u32 {
        if self.scale_timeout_on_single_node {
            self.single_node_timeout_multiplier
        } else {
            1
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

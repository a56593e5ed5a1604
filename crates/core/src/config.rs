// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node configuration
//!
//! Loaded from an optional TOML file; durations use humantime notation
//! (`"5s"`, `"500ms"`). Command-line flags are layered on top by the daemon.

use crate::id::{NodeId, PeerId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Timeouts for outbound protocol calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Bound on each outbound `RequestAccess`; expiry counts as a grant
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Bound on each outbound `ReleaseAccess`; failures are only logged
    #[serde(with = "humantime_serde")]
    pub release_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            release_timeout: Duration::from_secs(2),
        }
    }
}

impl CoordinatorConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_release_timeout(mut self, timeout: Duration) -> Self {
        self.release_timeout = timeout;
        self
    }
}

/// Pacing of the acquire/use/release loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    #[serde(with = "humantime_serde")]
    pub min_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub max_interval: Duration,
    /// Simulated usage time after the resource answers, before release
    #[serde(with = "humantime_serde")]
    pub hold_time: Duration,
    #[serde(with = "humantime_serde")]
    pub resource_timeout: Duration,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(3),
            max_interval: Duration::from_secs(8),
            hold_time: Duration::from_millis(500),
            resource_timeout: Duration::from_secs(10),
        }
    }
}

impl CycleConfig {
    pub fn with_interval(mut self, min: Duration, max: Duration) -> Self {
        self.min_interval = min;
        self.max_interval = max;
        self
    }

    pub fn with_hold_time(mut self, hold_time: Duration) -> Self {
        self.hold_time = hold_time;
        self
    }

    pub fn with_resource_timeout(mut self, timeout: Duration) -> Self {
        self.resource_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_interval < self.min_interval {
            return Err(ConfigError::Invalid(format!(
                "max_interval ({:?}) is shorter than min_interval ({:?})",
                self.max_interval, self.min_interval
            )));
        }
        Ok(())
    }
}

/// Static configuration of one node, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: Option<NodeId>,
    /// Listen address for the mutual-exclusion surface
    pub listen: Option<String>,
    /// Address of the external resource service
    pub resource: Option<String>,
    #[serde(default)]
    pub peers: Vec<PeerId>,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    /// Cap on concurrently served inbound connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_max_connections() -> usize {
    64
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            id: None,
            listen: None,
            resource: None,
            peers: Vec::new(),
            coordinator: CoordinatorConfig::default(),
            cycle: CycleConfig::default(),
            max_connections: default_max_connections(),
        }
    }
}

impl NodeConfig {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Check that every required field is present and consistent
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.is_none() {
            return Err(ConfigError::Invalid("node id is required".to_string()));
        }
        if self.listen.is_none() {
            return Err(ConfigError::Invalid("listen address is required".to_string()));
        }
        if self.resource.is_none() {
            return Err(ConfigError::Invalid(
                "resource service address is required".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if let Some(listen) = &self.listen {
            if self.peers.iter().any(|p| p.as_str() == listen) {
                return Err(ConfigError::Invalid(format!(
                    "peer list contains this node's own address {}",
                    listen
                )));
            }
        }
        self.cycle.validate()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

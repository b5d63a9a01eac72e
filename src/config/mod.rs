//! Service configuration loading

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime configuration for the service
///
/// Every field has a default, so an empty config file (or none at all) is a
/// working setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the server binds to
    pub bind_addr: String,

    /// Timeout imposed on each identity-verification call, in milliseconds
    pub verify_timeout_ms: u64,

    /// Timeout imposed on the live admin-count query, in milliseconds
    pub admin_count_timeout_ms: u64,

    /// How long verified identities stay cached, in seconds
    pub identity_cache_ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            verify_timeout_ms: 5_000,
            admin_count_timeout_ms: 2_000,
            identity_cache_ttl_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }

    pub fn admin_count_timeout(&self) -> Duration {
        Duration::from_millis(self.admin_count_timeout_ms)
    }

    pub fn identity_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.identity_cache_ttl_secs)
    }
}

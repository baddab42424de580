//! Configuration types.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::labels::{DEFAULT_LABEL_PREFIX, normalize_prefix};

const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;
const DEFAULT_DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Label namespace prefix workloads use to request sync
    #[serde(default = "default_label_prefix")]
    pub label_prefix: String,

    /// Seconds between full reconcile passes
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,

    /// Path to the container runtime socket
    #[serde(default = "default_docker_socket")]
    pub docker_socket: String,

    /// Configured providers
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            label_prefix: default_label_prefix(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
            docker_socket: default_docker_socket(),
            providers: Vec::new(),
        }
    }
}

impl Config {
    /// Override settings from `DOCKDNS_*` environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("DOCKDNS_LABEL_PREFIX")
            && !value.is_empty()
        {
            self.label_prefix = value;
        }

        if let Ok(value) = std::env::var("DOCKDNS_RECONCILE_INTERVAL_SECS")
            && !value.is_empty()
        {
            self.reconcile_interval_secs = value.parse().map_err(|_| {
                Error::config(format!(
                    "invalid DOCKDNS_RECONCILE_INTERVAL_SECS value {value:?}"
                ))
            })?;
        }

        if let Ok(value) = std::env::var("DOCKDNS_DOCKER_SOCKET")
            && !value.is_empty()
        {
            self.docker_socket = value;
        }

        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if normalize_prefix(&self.label_prefix).is_empty() {
            return Err(Error::config("label_prefix must not be empty"));
        }
        if self.reconcile_interval_secs == 0 {
            return Err(Error::config("reconcile_interval_secs must be positive"));
        }
        if self.docker_socket.trim().is_empty() {
            return Err(Error::config("docker_socket must not be empty"));
        }

        let mut seen = HashSet::new();
        for (index, provider) in self.providers.iter().enumerate() {
            provider
                .validate()
                .map_err(|e| Error::config(format!("provider[{index}]: {e}")))?;
            if !seen.insert(provider.name.clone()) {
                return Err(Error::config(format!(
                    "duplicate provider name {:?}",
                    provider.name
                )));
            }
        }

        Ok(())
    }
}

/// Configuration for one named provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider name workloads reference in labels
    pub name: String,

    /// Provider type tag ("cloudflare", ...)
    #[serde(rename = "type")]
    pub kind: String,

    /// Zones this provider may mutate, most general first
    #[serde(default)]
    pub zone_filters: Vec<String>,

    /// Default TTL in seconds applied to records that carry none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,

    /// Default proxied flag for address records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,

    /// API token credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Controller URL for self-hosted providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_url: Option<String>,

    /// Username credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProviderConfig {
    /// Validate one provider entry.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("missing name"));
        }
        if self.kind.trim().is_empty() {
            return Err(Error::config(format!("provider {:?} missing type", self.name)));
        }
        if self.zone_filters.is_empty() {
            return Err(Error::config(format!(
                "provider {:?} requires at least one zone filter",
                self.name
            )));
        }
        if self.ttl == Some(0) {
            return Err(Error::config(format!(
                "provider {:?} ttl must be positive",
                self.name
            )));
        }
        Ok(())
    }
}

fn default_label_prefix() -> String {
    DEFAULT_LABEL_PREFIX.to_string()
}

fn default_reconcile_interval_secs() -> u64 {
    DEFAULT_RECONCILE_INTERVAL_SECS
}

fn default_docker_socket() -> String {
    DEFAULT_DOCKER_SOCKET.to_string()
}

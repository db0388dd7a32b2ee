//! Configuration document and environment surface for Beacon.
//!
//! A single YAML document describes both services and is read once at
//! startup; the process treats it as immutable afterwards. Secrets and
//! concrete channel identifiers never live in the document — they come from
//! the environment, keyed by the names the document declares.
//!
//! # Configuration File Format
//!
//! ```yaml
//! org:
//!   name: sovereign-lab
//!
//! gateway:
//!   auth:
//!     header: X-Sig
//!   endpoints:
//!     - path: /event
//!       channel: "#dev-feed"
//!       allowed_services: ["api-*", "worker"]
//!     - path: /alert
//!       channel: "#alerts"
//!     - path: /git
//!       channel: "#prs"
//!       routes:
//!         - event: push
//!           branches: ["main", "release-*"]
//!           channel: "#prs"
//!
//! orchestrator:
//!   phase_delays_secs: [2, 5, 8, 12]
//!   retention_secs: 3600
//!
//! # logical channel name -> environment variable holding the destination id
//! channels:
//!   "#dev-feed": CH_DEV_FEED_ID
//!   "#alerts": CH_ALERTS_ID
//!   "#prs": CH_PRS_ID
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::gateway::routes::EndpointConfig;

/// Environment variable holding the HMAC signing secret. Unset or empty
/// disables signature verification (local/dev escape hatch, logged loudly).
pub const SIGNING_SECRET_ENV: &str = "EVENTS_HMAC_KEY";

/// Environment variable overriding the configuration document path.
pub const CONFIG_PATH_ENV: &str = "BEACON_CONFIG";

fn default_signature_header() -> String {
    "X-Sig".to_string()
}

fn default_phase_delays() -> [u64; 4] {
    [2, 5, 8, 12]
}

fn default_retention_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub org: OrgConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Logical channel name -> environment variable carrying the concrete
    /// destination identifier.
    #[serde(default)]
    pub channels: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgConfig {
    #[serde(default = "OrgConfig::default_name")]
    pub name: String,
}

impl OrgConfig {
    fn default_name() -> String {
        "beacon".to_string()
    }
}

impl Default for OrgConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Header the caller supplies the hex HMAC digest in.
    #[serde(default = "default_signature_header")]
    pub header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            header: default_signature_header(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Relative deadlines (seconds since creation) for the four phase
    /// transitions: analyzing, architecting, implementing, completed.
    #[serde(default = "default_phase_delays")]
    pub phase_delays_secs: [u64; 4],
    /// How long a completed request stays queryable before eviction.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// How often the eviction sweeper runs.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            phase_delays_secs: default_phase_delays(),
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Load the configuration document from `path`.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: AppConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

impl AppConfig {
    /// Validate the document. Hard errors make the config unusable;
    /// the returned strings are non-fatal warnings worth surfacing.
    pub fn validate(&self) -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        let mut seen_paths = Vec::new();
        for endpoint in &self.gateway.endpoints {
            if endpoint.path.is_empty() {
                anyhow::bail!("endpoint with empty path");
            }
            if seen_paths.contains(&endpoint.path.as_str()) {
                anyhow::bail!("duplicate endpoint path {}", endpoint.path);
            }
            seen_paths.push(endpoint.path.as_str());

            for route in endpoint.routes.as_deref().unwrap_or(&[]) {
                if route.event.is_empty() {
                    anyhow::bail!("route with empty event under {}", endpoint.path);
                }
            }
        }

        for channel in self.referenced_channels() {
            if !self.channels.contains_key(channel) {
                warnings.push(format!(
                    "channel {} is referenced by an endpoint but missing from the channels table",
                    channel
                ));
            }
        }

        let delays = &self.orchestrator.phase_delays_secs;
        if !delays.windows(2).all(|w| w[0] < w[1]) {
            anyhow::bail!("phase_delays_secs must be strictly increasing, got {:?}", delays);
        }

        Ok(warnings)
    }

    /// Every logical channel name any endpoint or route can resolve to.
    pub fn referenced_channels(&self) -> impl Iterator<Item = &str> {
        self.gateway.endpoints.iter().flat_map(|endpoint| {
            std::iter::once(endpoint.channel.as_str()).chain(
                endpoint
                    .routes
                    .as_deref()
                    .unwrap_or(&[])
                    .iter()
                    .map(|route| route.channel.as_str()),
            )
        })
    }
}

/// Resolved logical-channel-name -> destination-identifier table.
///
/// Built once at startup from the config's `channels` table and the
/// environment. Absence of a mapping is a recoverable condition for callers.
#[derive(Debug, Clone, Default)]
pub struct ChannelMap {
    inner: HashMap<String, String>,
}

impl ChannelMap {
    pub fn new(inner: HashMap<String, String>) -> Self {
        Self { inner }
    }

    /// Resolve each declared channel through its environment variable.
    /// Unset or empty variables leave the channel unmapped.
    pub fn from_env(table: &HashMap<String, String>) -> Self {
        let inner = table
            .iter()
            .filter_map(|(name, var)| {
                let id = std::env::var(var).ok().filter(|v| !v.is_empty())?;
                Some((name.clone(), id))
            })
            .collect();
        Self { inner }
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.inner.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Read the signing secret from the environment. Empty counts as unset.
pub fn signing_secret() -> Option<String> {
    std::env::var(SIGNING_SECRET_ENV).ok().filter(|s| !s.is_empty())
}

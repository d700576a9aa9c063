//! Engine configuration with per-field defaults and a TOML loader.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub probe: ProbeSpec,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

/// What one probe checks and how long it may take.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeSpec {
    /// Windows service name checked by the probe script.
    #[serde(default = "default_service")]
    pub service: String,
    /// Monitored TCP ports, in composite-status priority order: the first
    /// port is the primary signal, the second the fallback.
    #[serde(default = "default_ports")]
    pub ports: Vec<u16>,
    /// Reply deadline for one dispatched command.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Result cache tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// How long a cached status stays fresh.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

/// Periodic sweep tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Interval between sweeps of all connected agents.
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

fn default_service() -> String {
    "OneDriveCheckService".to_string()
}

fn default_ports() -> Vec<u16> {
    vec![20707, 20773]
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_ttl_secs() -> u64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for ProbeSpec {
    fn default() -> Self {
        Self {
            service: default_service(),
            ports: default_ports(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl ProbeSpec {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CacheConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl SweepConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }
}

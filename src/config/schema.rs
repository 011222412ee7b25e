//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the probe.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::wallet::Chain;

/// Operating mode. Test is the default; live traffic requires an explicit
/// opt-in and can never be enabled after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Deterministic mock responses, no network connection is constructible.
    #[default]
    Test,
    /// Real balance lookups against the configured services.
    Live,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "test" | "safe" | "true" => Ok(Mode::Test),
            "live" | "real" | "false" => Ok(Mode::Live),
            other => Err(format!("unknown mode '{}', expected test or live", other)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Test => write!(f, "test"),
            Mode::Live => write!(f, "live"),
        }
    }
}

/// Root configuration for the probe.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProbeConfig {
    /// Operating mode (test / live).
    pub mode: Mode,

    /// Scan run settings.
    pub scan: ScanConfig,

    /// Upstream balance service settings.
    pub services: ServicesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Scan run configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Number of candidates to drive to completion.
    pub target_scans: usize,

    /// Maximum in-flight balance queries system-wide, independent of
    /// per-service pacing.
    pub max_concurrent: usize,

    /// Optional wall-clock deadline for the whole run, in seconds.
    /// When hit, in-flight candidates are cancelled and a partial
    /// report is returned.
    pub run_deadline_secs: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target_scans: 100,
            max_concurrent: 15,
            run_deadline_secs: None,
        }
    }
}

/// Settings shared by all upstream services plus per-service sections.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Bitcoin balance service.
    pub btc: ServiceConfig,

    /// Ethereum balance service.
    pub eth: ServiceConfig,

    /// How long an acquire may wait for a free pooled connection.
    pub acquire_timeout_ms: u64,

    /// Total request deadline in seconds.
    pub request_timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Ceiling for the adaptive inter-request delay, in milliseconds.
    pub delay_ceiling_ms: u64,

    /// Moving-average latency above which pacing backs off, in milliseconds.
    pub latency_high_water_ms: u64,

    /// Number of recent request latencies kept per service.
    pub latency_window: usize,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            btc: ServiceConfig {
                endpoint: "https://blockchain.info/balance".to_string(),
                min_delay_ms: 500,
                pool_size: 4,
            },
            eth: ServiceConfig {
                endpoint: "https://api.etherscan.io/api".to_string(),
                min_delay_ms: 300,
                pool_size: 4,
            },
            acquire_timeout_ms: 5_000,
            request_timeout_secs: 15,
            connect_timeout_secs: 10,
            delay_ceiling_ms: 30_000,
            latency_high_water_ms: 2_000,
            latency_window: 16,
        }
    }
}

impl ServicesConfig {
    /// Per-service section for the given chain.
    pub fn for_chain(&self, chain: Chain) -> &ServiceConfig {
        match chain {
            Chain::Btc => &self.btc,
            Chain::Eth => &self.eth,
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// A single upstream balance service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base endpoint URL; the query for a specific address is appended.
    pub endpoint: String,

    /// Minimum (floor) delay between consecutive requests, in milliseconds.
    /// Different upstreams tolerate different rates, so this is per service.
    pub min_delay_ms: u64,

    /// Maximum concurrently open connections to this service.
    pub pool_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            min_delay_ms: 500,
            pool_size: 4,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

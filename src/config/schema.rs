//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the tap.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration for the request tap.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TapConfig {
    /// Listener configuration (primary and observer bind addresses).
    pub listener: ListenerConfig,

    /// Request body ingestion limits.
    pub body: BodyConfig,

    /// Live-tail observer settings.
    pub observer: ObserverConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Startup and shutdown settings.
    pub lifecycle: LifecycleConfig,

    /// Static assets served with precomputed encodings.
    pub assets: Vec<AssetConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Primary bind address (e.g., "0.0.0.0:9991").
    pub bind_address: String,

    /// Observer bind address. Defaults to the primary address with port + 1.
    pub observer_bind_address: Option<String>,

    /// Maximum concurrent connections per listener (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9991".to_string(),
            observer_bind_address: None,
            max_connections: 10_000,
        }
    }
}

impl ListenerConfig {
    /// Resolve the observer address.
    ///
    /// An ephemeral primary port (0) yields an ephemeral observer port.
    pub fn observer_address(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        if let Some(addr) = &self.observer_bind_address {
            return addr.parse();
        }
        let mut addr: SocketAddr = self.bind_address.parse()?;
        if addr.port() != 0 {
            addr.set_port(addr.port().saturating_add(1));
        }
        Ok(addr)
    }
}

/// Body ingestion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Hard ceiling on accumulated request body bytes.
    pub max_bytes: usize,

    /// Abandon a body that stalls this long between chunks. 0 disables.
    pub idle_timeout_secs: u64,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            max_bytes: 1_000_000,
            idle_timeout_secs: 0,
        }
    }
}

/// Observer channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// Events buffered per observer before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self { queue_capacity: 256 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "request_tap=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9000".to_string(),
        }
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long to wait for in-flight connections on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_secs: 5,
        }
    }
}

/// A statically registered asset.
///
/// Exactly one of `file` and `content` must be set.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetConfig {
    /// Request path without the leading slash (e.g., "robots.txt").
    pub path: String,

    /// File to read the asset bytes from at startup.
    #[serde(default)]
    pub file: Option<String>,

    /// Inline asset text.
    #[serde(default)]
    pub content: Option<String>,

    /// Content-Type sent with the asset.
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Status code sent with the asset.
    #[serde(default = "default_status_code")]
    pub status_code: u16,
}

fn default_content_type() -> String {
    "text/plain".to_string()
}

fn default_status_code() -> u16 {
    200
}

impl AssetConfig {
    /// Inline text asset with default content type and status.
    pub fn inline(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file: None,
            content: Some(content.into()),
            content_type: default_content_type(),
            status_code: default_status_code(),
        }
    }
}

/// Assets registered when the config file names none.
pub fn default_assets() -> Vec<AssetConfig> {
    vec![AssetConfig::inline("robots.txt", "User-agent: *\nDisallow: /\n")]
}

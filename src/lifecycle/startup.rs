//! Startup orchestration.
//!
//! # Responsibilities
//! - Load every configured asset source
//! - Build the asset cache (compression happens here, once)
//! - Bind the primary and observer listeners
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners bind last (traffic only when ready)

use crate::assets::{load_entries, AssetCache, AssetError};
use crate::config::TapConfig;
use crate::http::server::TapServer;
use crate::net::ListenerError;

/// Errors that abort startup.
#[derive(Debug)]
pub enum StartupError {
    Asset(AssetError),
    Listener(ListenerError),
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartupError::Asset(e) => write!(f, "Asset error: {}", e),
            StartupError::Listener(e) => write!(f, "Listener error: {}", e),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<AssetError> for StartupError {
    fn from(e: AssetError) -> Self {
        StartupError::Asset(e)
    }
}

impl From<ListenerError> for StartupError {
    fn from(e: ListenerError) -> Self {
        StartupError::Listener(e)
    }
}

/// Build the asset cache and bind the server described by `config`.
pub async fn start(config: &TapConfig) -> Result<TapServer, StartupError> {
    let entries = load_entries(&config.assets)?;
    let cache = AssetCache::build(entries)?;

    let server = TapServer::bind(config, cache).await?;

    tracing::info!(
        primary = ?server.primary_addr().ok(),
        observer = ?server.observer_addr().ok(),
        "Server ready"
    );
    Ok(server)
}

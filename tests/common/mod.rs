//! Shared utilities for router-level and end-to-end tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::response::Response;
use request_tap::assets::{load_entries, AssetCache};
use request_tap::config::{AssetConfig, TapConfig};
use request_tap::observers::{DebugEvent, Subscription};
use request_tap::{AppState, Shutdown};

pub const ROBOTS: &str = "User-agent: *\nDisallow: /private\nDisallow: /tmp\n";

/// Config bound to ephemeral loopback ports with one compressible asset.
pub fn test_config() -> TapConfig {
    let mut config = TapConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.lifecycle.shutdown_grace_secs = 1;
    config.assets = vec![AssetConfig::inline("robots.txt", ROBOTS.repeat(8))];
    config
}

/// Handler state built the same way startup builds it.
pub fn test_state(config: &TapConfig) -> AppState {
    let entries = load_entries(&config.assets).expect("assets load");
    let cache = AssetCache::build(entries).expect("assets compress");
    AppState::new(config, cache)
}

pub async fn body_bytes(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body")
}

/// Next event for this observer, failing the test after a second.
pub async fn next_event(subscription: &mut Subscription) -> DebugEvent {
    let frame = tokio::time::timeout(Duration::from_secs(1), subscription.recv())
        .await
        .expect("event within timeout")
        .expect("subscription open");
    serde_json::from_str(&frame).expect("event json")
}

/// Assert nothing arrives for a short while.
pub async fn assert_no_event(subscription: &mut Subscription) {
    let waited = tokio::time::timeout(Duration::from_millis(100), subscription.recv()).await;
    assert!(waited.is_err(), "unexpected broadcast");
}

/// A running server on ephemeral ports.
pub struct RunningTap {
    pub primary: SocketAddr,
    pub observer: SocketAddr,
    pub state: AppState,
    pub shutdown: Arc<Shutdown>,
}

impl RunningTap {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.primary, path)
    }

    pub fn observer_url(&self, scheme: &str, path: &str) -> String {
        format!("{}://{}{}", scheme, self.observer, path)
    }

    /// Poll until the registry reports `count` observers.
    pub async fn wait_for_observers(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while self.state.observers().len() != count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "expected {} observers, have {}",
                count,
                self.state.observers().len()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for RunningTap {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_tap(config: TapConfig) -> RunningTap {
    let server = request_tap::lifecycle::start(&config)
        .await
        .expect("server starts");
    let primary = server.primary_addr().unwrap();
    let observer = server.observer_addr().unwrap();
    let state = server.state().clone();

    let shutdown = Arc::new(Shutdown::new());
    let run_shutdown = Arc::clone(&shutdown);
    tokio::spawn(async move {
        server.run(&run_shutdown).await;
    });

    RunningTap {
        primary,
        observer,
        state,
        shutdown,
    }
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the primary router (dispatcher) and the observer router
//! - Run one accept loop per listener, sharing assets and observers
//! - Serve each connection with hyper directly so `Date` can be
//!   suppressed and keep-alive disabled on the primary port
//! - Stop accepting on shutdown, close observer sockets, and drain
//!   in-flight connections

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::assets::AssetCache;
use crate::config::TapConfig;
use crate::http::body::BodyLimits;
use crate::http::dispatch::dispatch;
use crate::http::websocket::observer_entry;
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::observers::{Broadcaster, ObserverRegistry};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub assets: Arc<AssetCache>,
    pub broadcaster: Broadcaster,
    pub limits: BodyLimits,
}

impl AppState {
    pub fn new(config: &TapConfig, assets: AssetCache) -> Self {
        let registry = Arc::new(ObserverRegistry::new(config.observer.queue_capacity));
        Self {
            assets: Arc::new(assets),
            broadcaster: Broadcaster::new(registry),
            limits: BodyLimits::from(&config.body),
        }
    }

    pub fn observers(&self) -> &Arc<ObserverRegistry> {
        self.broadcaster.registry()
    }
}

/// Which listener a connection arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Primary,
    Observer,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Observer => "observer",
        }
    }

    /// Observer connections must outlive the handshake response.
    fn keep_alive(&self) -> bool {
        matches!(self, Role::Observer)
    }
}

/// HTTP server for the request tap.
pub struct TapServer {
    state: AppState,
    primary: Listener,
    observer: Listener,
    shutdown_grace: Duration,
}

impl TapServer {
    /// Bind both listeners.
    pub async fn bind(config: &TapConfig, assets: AssetCache) -> Result<Self, ListenerError> {
        let primary_addr: SocketAddr = config
            .listener
            .bind_address
            .parse()
            .map_err(ListenerError::InvalidAddress)?;
        let observer_addr = config
            .listener
            .observer_address()
            .map_err(ListenerError::InvalidAddress)?;

        let primary = Listener::bind(primary_addr, config.listener.max_connections).await?;
        let observer = Listener::bind(observer_addr, config.listener.max_connections).await?;

        Ok(Self {
            state: AppState::new(config, assets),
            primary,
            observer,
            shutdown_grace: Duration::from_secs(config.lifecycle.shutdown_grace_secs),
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn primary_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.primary.local_addr()
    }

    pub fn observer_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.observer.local_addr()
    }

    /// Router for the primary port: everything goes through the dispatcher.
    pub fn primary_router(state: AppState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Router for the observer port.
    pub fn observer_router(state: AppState) -> Router {
        Router::new()
            .fallback(observer_entry)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Run both accept loops until `shutdown` fires, then drain.
    pub async fn run(self, shutdown: &Shutdown) {
        let tracker = ConnectionTracker::new();

        tracing::info!(
            primary = ?self.primary.local_addr().ok(),
            observer = ?self.observer.local_addr().ok(),
            assets = self.state.assets.len(),
            "HTTP server starting"
        );

        tokio::join!(
            accept_loop(
                self.primary,
                Self::primary_router(self.state.clone()),
                Role::Primary,
                tracker.clone(),
                shutdown.subscribe(),
            ),
            accept_loop(
                self.observer,
                Self::observer_router(self.state.clone()),
                Role::Observer,
                tracker.clone(),
                shutdown.subscribe(),
            ),
        );

        self.state.observers().close_all();

        let mut tracker = tracker;
        if tokio::time::timeout(self.shutdown_grace, tracker.wait_for_shutdown())
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = tracker.active_count(),
                "Shutdown grace period elapsed with open connections"
            );
        }

        tracing::info!("HTTP server stopped");
    }
}

async fn accept_loop(
    listener: Listener,
    router: Router,
    role: Role,
    tracker: ConnectionTracker,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.recv() => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer_addr, permit) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(listener = role.as_str(), error = %e, "Accept failed");
                tokio::time::sleep(Duration::from_millis(50)).await;
                continue;
            }
        };

        let service = TowerToHyperService::new(router.clone());
        let guard = tracker.track();

        tokio::spawn(async move {
            let _permit = permit;
            let mut builder = http1::Builder::new();
            builder.keep_alive(role.keep_alive()).auto_date_header(false);

            let connection = builder
                .serve_connection(TokioIo::new(stream), service)
                .with_upgrades();

            if let Err(e) = connection.await {
                tracing::debug!(
                    connection_id = %guard.id(),
                    listener = role.as_str(),
                    peer_addr = %peer_addr,
                    error = %e,
                    "Connection ended with error"
                );
            }
        });
    }

    tracing::info!(listener = role.as_str(), "Listener stopped accepting");
}

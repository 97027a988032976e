//! Observer-port endpoint.
//!
//! # Responsibilities
//! - Upgrade WebSocket handshakes on any path into a live-tail observer
//! - Serve registered assets exactly like the primary port
//! - Redirect every other path to the default asset (404 if none exist)
//!
//! # Data Flow
//! ```text
//! Broadcaster ──try_send──▶ observer queue ──▶ text frame ──▶ Observer
//! ```
//!
//! Observers only listen. Client text or binary frames are ignored, pings
//! are answered, and a close frame or socket error ends the subscription.
//! When the registry closes the queue on shutdown, the observer gets a
//! `1001 Going Away` close frame.

use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket};
use axum::extract::{FromRequestParts, Request, State, WebSocketUpgrade};
use axum::http::header::UPGRADE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::http::dispatch::serve_asset;
use crate::http::response::ResponseSpec;
use crate::http::server::AppState;
use crate::observers::ObserverRegistry;

/// Fallback handler for every request on the observer port.
pub async fn observer_entry(State(state): State<AppState>, request: Request) -> Response {
    let (mut parts, _body) = request.into_parts();

    if parts.headers.contains_key(UPGRADE) {
        return match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
            Ok(ws) => {
                let registry = Arc::clone(state.broadcaster.registry());
                ws.on_upgrade(move |socket| stream_events(socket, registry))
            }
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "Observer upgrade rejected");
                rejection.into_response()
            }
        };
    }

    if let Some(asset) = state.assets.find(parts.uri.path()) {
        return serve_asset(&parts.headers, asset);
    }

    match state.assets.default_asset() {
        Some(asset) => ResponseSpec::redirect(asset.route()).into_response(),
        None => ResponseSpec::text(StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

/// Forward every broadcast frame to the socket until either side goes away.
async fn stream_events(mut socket: WebSocket, registry: Arc<ObserverRegistry>) {
    let mut subscription = registry.subscribe();
    let id = subscription.id();

    loop {
        tokio::select! {
            frame = subscription.recv() => {
                let Some(frame) = frame else {
                    tracing::debug!(observer = %id, "Observer queue closed");
                    let close = CloseFrame {
                        code: close_code::AWAY,
                        reason: Utf8Bytes::from_static("server shutting down"),
                    };
                    let _ = socket.send(Message::Close(Some(close))).await;
                    return;
                };
                if socket.send(Message::Text(frame.to_string().into())).await.is_err() {
                    tracing::debug!(observer = %id, "Observer disconnected (send failed)");
                    return;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(observer = %id, "Observer closed connection");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            tracing::debug!(observer = %id, "Observer disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::debug!(observer = %id, error = %e, "Observer socket error");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}

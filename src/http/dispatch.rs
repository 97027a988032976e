//! Primary-port request dispatcher.
//!
//! # State Machine
//! ```text
//! RouteLookup ──asset hit──▶ AssetHit (negotiate + write, no broadcast)
//!      │
//!      └──▶ MethodBranch
//!             ├─ POST/PUT  ─▶ collect body ─┬─ Completed ─▶ 200 OK
//!             │                             └─ Rejected  ─▶ 413
//!             ├─ GET/HEAD  ─▶ 200 OK
//!             └─ other     ─▶ 501
//! ```
//!
//! Every MethodBranch terminal broadcasts exactly once. A body that aborts
//! or stalls abandons the request without a broadcast.

use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::assets::Asset;
use crate::error::TapError;
use crate::http::body::{collect, is_form_urlencoded};
use crate::http::negotiate::negotiate;
use crate::http::response::ResponseSpec;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::observers::event::{capture_headers, DebugEvent, Outcome};

/// How a method is handled once no asset matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodClass {
    /// POST, PUT: body is collected.
    Payload,
    /// GET, HEAD: nothing to collect.
    Safe,
    Unsupported,
}

impl MethodClass {
    pub fn of(method: &Method) -> Self {
        match *method {
            Method::POST | Method::PUT => MethodClass::Payload,
            Method::GET | Method::HEAD => MethodClass::Safe,
            _ => MethodClass::Unsupported,
        }
    }
}

/// Per-request context threaded through collection, broadcast and response.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    pub started: Instant,
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts) -> Self {
        let url = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        Self {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            started: Instant::now(),
            method: parts.method.clone(),
            url,
            headers: parts.headers.clone(),
        }
    }

    /// Snapshot this request for observers.
    pub fn event(&self, status: StatusCode, outcome: Outcome, payload: Option<String>) -> DebugEvent {
        DebugEvent {
            id: self.id,
            timestamp: self.received_at,
            method: self.method.to_string(),
            url: self.url.clone(),
            headers: capture_headers(&self.headers),
            payload,
            status: status.as_u16(),
            outcome,
        }
    }
}

/// Fallback handler for every request on the primary port.
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let ctx = RequestContext::from_parts(&parts);

    if let Some(asset) = state.assets.find(parts.uri.path()) {
        let response = serve_asset(&ctx.headers, asset);
        metrics::record_request(ctx.method.as_str(), response.status().as_u16(), ctx.started);
        return response;
    }

    let (outcome, payload, response) = match handle_method(&state, &ctx, body).await {
        Ok(handled) => handled,
        Err(err) => {
            tracing::debug!(
                request_id = %ctx.id,
                method = %ctx.method,
                url = %ctx.url,
                error = %err,
                "Request abandoned"
            );
            let response = err.into_response();
            metrics::record_request(ctx.method.as_str(), response.status().as_u16(), ctx.started);
            return response;
        }
    };

    let event = ctx.event(response.status(), outcome, payload);
    let report = state.broadcaster.broadcast(&event);

    tracing::info!(
        request_id = %ctx.id,
        method = %ctx.method,
        url = %ctx.url,
        status = response.status().as_u16(),
        payload_bytes = event.payload.as_ref().map(|p| p.len()).unwrap_or(0),
        observers = report.delivered,
        dropped = report.dropped,
        "Request captured"
    );
    metrics::record_request(ctx.method.as_str(), response.status().as_u16(), ctx.started);

    response
}

/// Method branch. `Err` means the request is abandoned without a broadcast.
async fn handle_method(
    state: &AppState,
    ctx: &RequestContext,
    body: Body,
) -> Result<(Outcome, Option<String>, Response), TapError> {
    let ok = || ResponseSpec::text(StatusCode::OK, "OK").into_response();

    match MethodClass::of(&ctx.method) {
        MethodClass::Payload => {
            let form = is_form_urlencoded(&ctx.headers);
            match collect(body, state.limits, form).await {
                Ok(payload) => Ok((Outcome::Completed, Some(payload), ok())),
                Err(err @ TapError::PayloadTooLarge { limit }) => {
                    tracing::warn!(
                        request_id = %ctx.id,
                        method = %ctx.method,
                        url = %ctx.url,
                        limit,
                        "Request entity too large"
                    );
                    Ok((Outcome::PayloadTooLarge, None, err.into_response()))
                }
                Err(err) => Err(err),
            }
        }
        MethodClass::Safe => Ok((Outcome::Completed, None, ok())),
        MethodClass::Unsupported => {
            let err = TapError::UnsupportedMethod;
            Ok((Outcome::NotImplemented, None, err.into_response()))
        }
    }
}

/// Negotiate and write a cached asset.
pub fn serve_asset(headers: &HeaderMap, asset: &Asset) -> Response {
    match negotiate(headers, asset) {
        Ok(negotiated) => {
            tracing::debug!(
                path = %asset.route(),
                encoding = %negotiated.encoding,
                bytes = negotiated.body.len(),
                "Serving asset"
            );
            ResponseSpec::asset(asset, negotiated).into_response()
        }
        Err(err) => {
            tracing::warn!(path = %asset.route(), error = %err, "Asset negotiation failed");
            err.into_response()
        }
    }
}

//! Response writing.
//!
//! # Responsibilities
//! - Turn a [`ResponseSpec`] into a transport-independent axum response
//! - `Content-Length` always equals the bytes actually sent
//! - `Connection: close` on every response (one request per connection)
//! - `Content-Encoding` + `Vary` only for compressed representations
//! - `Location` only on redirects
//!
//! The automatic `Date` header is disabled at the connection level in
//! `server.rs`, not here.

use axum::body::{Body, Bytes};
use axum::http::header::{
    CONNECTION, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, LOCATION, VARY,
};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::assets::Asset;
use crate::http::negotiate::{Encoding, Negotiated};

const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Everything needed to write one response.
#[derive(Debug, Clone)]
pub struct ResponseSpec {
    pub status: StatusCode,
    pub content: Bytes,
    pub content_type: Option<String>,
    pub encoding: Encoding,
    pub location: Option<String>,
}

impl ResponseSpec {
    /// Plain-text response.
    pub fn text(status: StatusCode, content: impl Into<Bytes>) -> Self {
        Self {
            status,
            content: content.into(),
            content_type: None,
            encoding: Encoding::Identity,
            location: None,
        }
    }

    /// Response with no body at all.
    pub fn empty(status: StatusCode) -> Self {
        Self::text(status, Bytes::new())
    }

    /// 302 pointing at `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            ..Self::empty(StatusCode::FOUND)
        }
    }

    /// A cached asset in its negotiated representation.
    pub fn asset(asset: &Asset, negotiated: Negotiated) -> Self {
        Self {
            status: asset.status_code(),
            content: negotiated.body,
            content_type: Some(asset.content_type().to_string()),
            encoding: negotiated.encoding,
            location: None,
        }
    }
}

impl IntoResponse for ResponseSpec {
    fn into_response(self) -> Response {
        let content_type = self
            .content_type
            .as_deref()
            .and_then(|ct| HeaderValue::from_str(ct).ok())
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        let length = self.content.len();

        let mut response = Response::new(Body::from(self.content));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, content_type);
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        if self.encoding != Encoding::Identity {
            headers.insert(VARY, HeaderValue::from_static("Accept-Encoding"));
            headers.insert(
                CONTENT_ENCODING,
                HeaderValue::from_static(self.encoding.as_str()),
            );
        }

        if self.status.is_redirection() {
            if let Some(location) = self
                .location
                .as_deref()
                .and_then(|l| HeaderValue::from_str(l).ok())
            {
                headers.insert(LOCATION, location);
            }
        }

        response
    }
}

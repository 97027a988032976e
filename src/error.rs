//! Request-scoped error kinds.
//!
//! None of these is fatal to the process. Each maps to the response the
//! client sees, except [`DeliveryError`], which never reaches a client.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc::error::TrySendError;

use crate::http::response::ResponseSpec;

/// Errors that end a single request early.
#[derive(Debug, thiserror::Error)]
pub enum TapError {
    /// The body crossed the configured ceiling.
    #[error("Request entity too large")]
    PayloadTooLarge { limit: usize },

    /// The method is neither payload-bearing nor safe.
    #[error("Not Implemented")]
    UnsupportedMethod,

    /// `Accept-Encoding` was repeated or not visible ASCII.
    #[error("malformed Accept-Encoding header")]
    MalformedAcceptEncoding,

    /// The connection failed while the body was streaming in.
    #[error("request body aborted: {0}")]
    BodyAborted(#[source] axum::Error),

    /// No body chunk arrived within the idle timeout.
    #[error("request body idle for {0:?}")]
    BodyIdleTimeout(Duration),
}

impl TapError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMethod => StatusCode::NOT_IMPLEMENTED,
            Self::MalformedAcceptEncoding => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BodyAborted(_) => StatusCode::BAD_REQUEST,
            Self::BodyIdleTimeout(_) => StatusCode::REQUEST_TIMEOUT,
        }
    }
}

impl IntoResponse for TapError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::PayloadTooLarge { .. } | Self::UnsupportedMethod => {
                ResponseSpec::text(status, self.to_string()).into_response()
            }
            Self::MalformedAcceptEncoding | Self::BodyAborted(_) | Self::BodyIdleTimeout(_) => {
                ResponseSpec::empty(status).into_response()
            }
        }
    }
}

/// Why an event did not reach one observer. Always swallowed.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("observer queue full")]
    QueueFull,

    #[error("observer channel closed")]
    Closed,

    #[error("event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl<T> From<TrySendError<T>> for DeliveryError {
    fn from(err: TrySendError<T>) -> Self {
        match err {
            TrySendError::Full(_) => Self::QueueFull,
            TrySendError::Closed(_) => Self::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_error_kinds() {
        assert_eq!(
            TapError::PayloadTooLarge { limit: 1 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            TapError::UnsupportedMethod.status(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            TapError::MalformedAcceptEncoding.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn client_visible_messages() {
        assert_eq!(
            TapError::PayloadTooLarge { limit: 1 }.to_string(),
            "Request entity too large"
        );
        assert_eq!(
            TapError::UnsupportedMethod.to_string(),
            "Not Implemented"
        );
    }

    #[test]
    fn try_send_errors_map_to_delivery_errors() {
        let full: TrySendError<()> = TrySendError::Full(());
        assert!(matches!(DeliveryError::from(full), DeliveryError::QueueFull));
        let closed: TrySendError<()> = TrySendError::Closed(());
        assert!(matches!(DeliveryError::from(closed), DeliveryError::Closed));
    }
}

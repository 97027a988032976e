//! Bounded request body ingestion.
//!
//! # State Machine
//! ```text
//! Idle ──first chunk──▶ Collecting ──end──▶ Completed
//!   │                      │
//!   └───── over limit ─────┴──────────────▶ Rejected
//! ```
//!
//! Terminal states are final. A rejected collector drops what it had
//! accumulated and ignores further chunks; the caller answers 413 without
//! draining the rest of the stream.

use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use futures_util::StreamExt;
use percent_encoding::percent_decode_str;

use crate::config::schema::BodyConfig;
use crate::error::TapError;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Body ingestion limits, shared by every payload request.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimits {
    pub max_bytes: usize,
    pub idle_timeout: Option<Duration>,
}

impl From<&BodyConfig> for BodyLimits {
    fn from(config: &BodyConfig) -> Self {
        Self {
            max_bytes: config.max_bytes,
            idle_timeout: (config.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(config.idle_timeout_secs)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Idle,
    Collecting,
    Completed,
    Rejected,
}

/// Per-request body accumulator.
#[derive(Debug)]
pub struct BodyCollector {
    buffer: Vec<u8>,
    limit: usize,
    state: CollectorState,
}

impl BodyCollector {
    pub fn new(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            limit,
            state: CollectorState::Idle,
        }
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn accumulated(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one chunk. Fails once the ceiling would be crossed.
    pub fn on_data(&mut self, chunk: &[u8]) -> Result<(), TapError> {
        match self.state {
            CollectorState::Rejected => {
                return Err(TapError::PayloadTooLarge { limit: self.limit })
            }
            CollectorState::Completed => return Ok(()),
            CollectorState::Idle | CollectorState::Collecting => {}
        }

        if self.buffer.len() + chunk.len() > self.limit {
            self.state = CollectorState::Rejected;
            self.buffer = Vec::new();
            return Err(TapError::PayloadTooLarge { limit: self.limit });
        }

        self.state = CollectorState::Collecting;
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    /// Finish the body and produce the captured payload text.
    pub fn on_end(&mut self, form_encoded: bool) -> Result<String, TapError> {
        if self.state == CollectorState::Rejected {
            return Err(TapError::PayloadTooLarge { limit: self.limit });
        }
        self.state = CollectorState::Completed;

        let text = String::from_utf8_lossy(&std::mem::take(&mut self.buffer)).into_owned();
        if form_encoded {
            Ok(decode_form(&text))
        } else {
            Ok(text)
        }
    }
}

/// Drive a [`BodyCollector`] over a streaming request body.
///
/// Returns as soon as the ceiling is crossed; the remainder is never read.
pub async fn collect(body: Body, limits: BodyLimits, form_encoded: bool) -> Result<String, TapError> {
    let mut collector = BodyCollector::new(limits.max_bytes);
    let mut stream = body.into_data_stream();

    loop {
        let next = match limits.idle_timeout {
            Some(idle) => tokio::time::timeout(idle, stream.next())
                .await
                .map_err(|_| TapError::BodyIdleTimeout(idle))?,
            None => stream.next().await,
        };

        match next {
            Some(Ok(chunk)) => collector.on_data(&chunk)?,
            Some(Err(e)) => return Err(TapError::BodyAborted(e)),
            None => return collector.on_end(form_encoded),
        }
    }
}

/// True when the request declares a form-urlencoded body.
pub fn is_form_urlencoded(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case(FORM_URLENCODED))
        .unwrap_or(false)
}

/// `+` is a space in form encoding; everything else is percent-decoded.
pub fn decode_form(text: &str) -> String {
    percent_decode_str(&text.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn collects_until_end() {
        let mut collector = BodyCollector::new(10);
        assert_eq!(collector.state(), CollectorState::Idle);

        collector.on_data(b"hello").unwrap();
        assert_eq!(collector.state(), CollectorState::Collecting);
        collector.on_data(b" you").unwrap();
        assert_eq!(collector.accumulated(), 9);

        assert_eq!(collector.on_end(false).unwrap(), "hello you");
        assert_eq!(collector.state(), CollectorState::Completed);
    }

    #[test]
    fn exactly_at_limit_is_accepted() {
        let mut collector = BodyCollector::new(4);
        collector.on_data(b"abcd").unwrap();
        assert_eq!(collector.on_end(false).unwrap(), "abcd");
    }

    #[test]
    fn crossing_limit_rejects_and_stays_rejected() {
        let mut collector = BodyCollector::new(4);
        collector.on_data(b"abc").unwrap();

        let err = collector.on_data(b"de").unwrap_err();
        assert!(matches!(err, TapError::PayloadTooLarge { limit: 4 }));
        assert_eq!(collector.state(), CollectorState::Rejected);
        assert_eq!(collector.accumulated(), 0);

        assert!(collector.on_data(b"").is_err());
        assert!(collector.on_end(false).is_err());
        assert_eq!(collector.state(), CollectorState::Rejected);
    }

    #[test]
    fn form_payload_is_decoded() {
        let mut collector = BodyCollector::new(100);
        collector.on_data(b"name=J%C3%BCrgen+M&x=%2F").unwrap();
        assert_eq!(collector.on_end(true).unwrap(), "name=Jürgen M&x=/");
    }

    #[test]
    fn detects_form_content_type() {
        let mut headers = HeaderMap::new();
        assert!(!is_form_urlencoded(&headers));

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("Application/X-WWW-Form-Urlencoded; charset=utf-8"),
        );
        assert!(is_form_urlencoded(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(!is_form_urlencoded(&headers));
    }

    #[test]
    fn limits_from_config() {
        let limits = BodyLimits::from(&BodyConfig::default());
        assert_eq!(limits.max_bytes, 1_000_000);
        assert!(limits.idle_timeout.is_none());

        let limits = BodyLimits::from(&BodyConfig {
            max_bytes: 5,
            idle_timeout_secs: 3,
        });
        assert_eq!(limits.idle_timeout, Some(Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn collect_streams_body() {
        let limits = BodyLimits {
            max_bytes: 16,
            idle_timeout: None,
        };
        let payload = collect(Body::from("a=1+2"), limits, true).await.unwrap();
        assert_eq!(payload, "a=1 2");
    }

    #[tokio::test]
    async fn collect_rejects_oversized_body() {
        let limits = BodyLimits {
            max_bytes: 1_000_000,
            idle_timeout: None,
        };
        let body = Body::from(vec![b'x'; 1_000_001]);
        let err = collect(body, limits, false).await.unwrap_err();
        assert!(matches!(err, TapError::PayloadTooLarge { .. }));
    }
}

//! Content negotiation for cached assets.
//!
//! # Algorithm (first match wins)
//! 1. `Accept-Encoding` absent or empty → identity
//! 2. token `gzip` present and gzip variant non-empty → gzip
//! 3. token `deflate` present and deflate variant non-empty → deflate
//! 4. identity
//!
//! Tokens match on word boundaries, so `x-gzip2` does not select gzip.
//! Repeated `Accept-Encoding` lines are rejected rather than merged.

use std::sync::LazyLock;

use axum::body::Bytes;
use axum::http::header::ACCEPT_ENCODING;
use axum::http::HeaderMap;
use regex::Regex;

use crate::assets::Asset;
use crate::error::TapError;

static GZIP_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bgzip\b").expect("gzip token pattern is valid"));
static DEFLATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdeflate\b").expect("deflate token pattern is valid"));

/// A content coding the tap can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Gzip,
    Deflate,
    Identity,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
            Encoding::Identity => "identity",
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The representation chosen for one response.
#[derive(Debug, Clone)]
pub struct Negotiated {
    pub encoding: Encoding,
    pub body: Bytes,
}

/// Pick a representation of `asset` for the request carrying `headers`.
pub fn negotiate(headers: &HeaderMap, asset: &Asset) -> Result<Negotiated, TapError> {
    let mut values = headers.get_all(ACCEPT_ENCODING).iter();
    let accept = match (values.next(), values.next()) {
        (None, _) => None,
        (Some(value), None) => Some(
            value
                .to_str()
                .map_err(|_| TapError::MalformedAcceptEncoding)?,
        ),
        (Some(_), Some(_)) => return Err(TapError::MalformedAcceptEncoding),
    };

    Ok(select(accept, asset))
}

/// Negotiation on an already-extracted header value.
pub fn select(accept_encoding: Option<&str>, asset: &Asset) -> Negotiated {
    let accept = match accept_encoding {
        Some(accept) if !accept.trim().is_empty() => accept,
        _ => return identity(asset),
    };

    if GZIP_TOKEN.is_match(accept) {
        if asset.gzip_len() > 0 {
            return Negotiated {
                encoding: Encoding::Gzip,
                body: asset.gzip().clone(),
            };
        }
    } else if DEFLATE_TOKEN.is_match(accept) && asset.deflate_len() > 0 {
        return Negotiated {
            encoding: Encoding::Deflate,
            body: asset.deflate().clone(),
        };
    }

    identity(asset)
}

fn identity(asset: &Asset) -> Negotiated {
    Negotiated {
        encoding: Encoding::Identity,
        body: asset.raw().clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetEntry;
    use axum::http::{HeaderValue, StatusCode};

    fn asset(gzip: &'static [u8], deflate: &'static [u8]) -> Asset {
        Asset::from_parts(
            AssetEntry {
                path: "robots.txt".into(),
                raw_content: Bytes::from_static(b"raw"),
                content_type: "text/plain".into(),
                status_code: StatusCode::OK,
            },
            Bytes::from_static(gzip),
            Bytes::from_static(deflate),
        )
    }

    #[test]
    fn absent_or_empty_header_is_identity() {
        let asset = asset(b"gz", b"df");
        assert_eq!(select(None, &asset).encoding, Encoding::Identity);
        assert_eq!(select(Some(""), &asset).encoding, Encoding::Identity);
        assert_eq!(select(Some("  "), &asset).encoding, Encoding::Identity);
    }

    #[test]
    fn gzip_preferred_over_deflate() {
        let asset = asset(b"gz", b"df");
        let chosen = select(Some("deflate, gzip;q=0.5"), &asset);
        assert_eq!(chosen.encoding, Encoding::Gzip);
        assert_eq!(&chosen.body[..], b"gz");
    }

    #[test]
    fn deflate_when_gzip_not_accepted() {
        let asset = asset(b"gz", b"df");
        let chosen = select(Some("deflate"), &asset);
        assert_eq!(chosen.encoding, Encoding::Deflate);
        assert_eq!(chosen.body.len(), 2);
    }

    #[test]
    fn token_must_be_whole_word() {
        let asset = asset(b"gz", b"df");
        assert_eq!(select(Some("xgzip"), &asset).encoding, Encoding::Identity);
        assert_eq!(select(Some("gzipped"), &asset).encoding, Encoding::Identity);
        assert_eq!(select(Some("x-gzip"), &asset).encoding, Encoding::Gzip);
    }

    #[test]
    fn unsupported_token_is_identity() {
        let asset = asset(b"gz", b"df");
        let chosen = select(Some("br"), &asset);
        assert_eq!(chosen.encoding, Encoding::Identity);
        assert_eq!(&chosen.body[..], b"raw");
    }

    #[test]
    fn empty_variant_falls_back_to_raw() {
        let asset = asset(b"", b"df");
        // gzip accepted but unavailable: no fall-through to deflate
        assert_eq!(select(Some("gzip, deflate"), &asset).encoding, Encoding::Identity);
        let asset = self::asset(b"gz", b"");
        assert_eq!(select(Some("deflate"), &asset).encoding, Encoding::Identity);
    }

    #[test]
    fn repeated_header_is_malformed() {
        let asset = asset(b"gz", b"df");
        let mut headers = HeaderMap::new();
        headers.append(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        headers.append(ACCEPT_ENCODING, HeaderValue::from_static("deflate"));

        assert!(matches!(
            negotiate(&headers, &asset),
            Err(TapError::MalformedAcceptEncoding)
        ));
    }

    #[test]
    fn non_ascii_header_is_malformed() {
        let asset = asset(b"gz", b"df");
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_ENCODING,
            HeaderValue::from_bytes(b"gzip\xff").unwrap(),
        );
        assert!(negotiate(&headers, &asset).is_err());
    }

    #[test]
    fn single_header_negotiates() {
        let asset = asset(b"gz", b"df");
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, br"));
        assert_eq!(negotiate(&headers, &asset).unwrap().encoding, Encoding::Gzip);
    }
}

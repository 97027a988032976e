//! Asset cache with precomputed encodings.
//!
//! Every variant is computed once in [`AssetCache::build`]. Request handling
//! only ever reads the stored bytes.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::StatusCode;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

use super::AssetError;

/// Raw material for one asset, handed over by the loader.
#[derive(Debug, Clone)]
pub struct AssetEntry {
    /// Path without the leading slash.
    pub path: String,
    pub raw_content: Bytes,
    pub content_type: String,
    pub status_code: StatusCode,
}

/// An immutable cached asset.
///
/// Lengths are derived from the stored buffers so they always match the
/// bytes actually sent. An empty compressed variant means "serve raw".
#[derive(Debug, Clone)]
pub struct Asset {
    path: String,
    raw: Bytes,
    content_type: String,
    status_code: StatusCode,
    gzip: Bytes,
    deflate: Bytes,
}

impl Asset {
    /// Build an asset from already-encoded parts.
    pub fn from_parts(
        entry: AssetEntry,
        gzip: impl Into<Bytes>,
        deflate: impl Into<Bytes>,
    ) -> Self {
        Self {
            path: entry.path,
            raw: entry.raw_content,
            content_type: entry.content_type,
            status_code: entry.status_code,
            gzip: gzip.into(),
            deflate: deflate.into(),
        }
    }

    /// Request path this asset answers, including the leading slash.
    pub fn route(&self) -> String {
        format!("/{}", self.path)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }

    pub fn gzip(&self) -> &Bytes {
        &self.gzip
    }

    pub fn gzip_len(&self) -> usize {
        self.gzip.len()
    }

    pub fn deflate(&self) -> &Bytes {
        &self.deflate
    }

    pub fn deflate_len(&self) -> usize {
        self.deflate.len()
    }
}

/// Read-only lookup table of assets keyed by request path.
#[derive(Debug, Default)]
pub struct AssetCache {
    assets: Vec<Arc<Asset>>,
    by_route: HashMap<String, usize>,
}

impl AssetCache {
    /// Compress every entry at maximum level and index it by route.
    pub fn build(entries: Vec<AssetEntry>) -> Result<Self, AssetError> {
        let mut cache = Self::default();

        for mut entry in entries {
            entry.path = entry.path.trim_start_matches('/').to_string();

            let (gzipped, deflated) = gzip(&entry.raw_content)
                .and_then(|gz| Ok((gz, deflate(&entry.raw_content)?)))
                .map_err(|source| AssetError::Compress {
                    path: entry.path.clone(),
                    source,
                })?;

            let asset = Asset::from_parts(entry, gzipped, deflated);
            tracing::debug!(
                path = %asset.route(),
                raw_len = asset.raw_len(),
                gzip_len = asset.gzip_len(),
                deflate_len = asset.deflate_len(),
                "Asset cached"
            );
            cache.insert(asset);
        }

        Ok(cache)
    }

    /// Register an asset. A later asset with the same route replaces the earlier one.
    pub fn insert(&mut self, asset: Asset) {
        let route = asset.route();
        let asset = Arc::new(asset);
        match self.by_route.get(&route) {
            Some(&index) => self.assets[index] = asset,
            None => {
                self.by_route.insert(route, self.assets.len());
                self.assets.push(asset);
            }
        }
    }

    /// Exact match against a request path (query already stripped).
    pub fn find(&self, path: &str) -> Option<&Arc<Asset>> {
        self.by_route.get(path).map(|&index| &self.assets[index])
    }

    /// The first registered asset.
    pub fn default_asset(&self) -> Option<&Arc<Asset>> {
        self.assets.first()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

fn gzip(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(raw)?;
    encoder.finish()
}

/// HTTP `deflate` is the zlib container, not raw deflate.
fn deflate(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(raw)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::{GzDecoder, ZlibDecoder};
    use std::io::Read;

    fn entry(path: &str, content: &str) -> AssetEntry {
        AssetEntry {
            path: path.to_string(),
            raw_content: Bytes::from(content.to_string()),
            content_type: "text/plain".to_string(),
            status_code: StatusCode::OK,
        }
    }

    #[test]
    fn build_precomputes_both_variants() {
        let body = "User-agent: *\nDisallow: /\n".repeat(20);
        let cache = AssetCache::build(vec![entry("robots.txt", &body)]).unwrap();
        let asset = cache.find("/robots.txt").unwrap();

        assert_eq!(asset.raw_len(), body.len());
        assert_eq!(asset.gzip_len(), asset.gzip().len());
        assert!(asset.gzip_len() > 0);
        assert!(asset.deflate_len() > 0);

        let mut unzipped = String::new();
        GzDecoder::new(&asset.gzip()[..])
            .read_to_string(&mut unzipped)
            .unwrap();
        assert_eq!(unzipped, body);

        let mut inflated = String::new();
        ZlibDecoder::new(&asset.deflate()[..])
            .read_to_string(&mut inflated)
            .unwrap();
        assert_eq!(inflated, body);
    }

    #[test]
    fn find_is_exact() {
        let cache = AssetCache::build(vec![entry("/robots.txt", "x")]).unwrap();

        assert!(cache.find("/robots.txt").is_some());
        assert!(cache.find("robots.txt").is_none());
        assert!(cache.find("/robots").is_none());
        assert!(cache.find("/robots.txt/").is_none());
        assert!(cache.find("/").is_none());
    }

    #[test]
    fn default_asset_is_first_registered() {
        let cache =
            AssetCache::build(vec![entry("index.html", "a"), entry("robots.txt", "b")]).unwrap();
        assert_eq!(cache.default_asset().unwrap().path(), "index.html");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn empty_cache_has_no_default() {
        let cache = AssetCache::build(Vec::new()).unwrap();
        assert!(cache.is_empty());
        assert!(cache.default_asset().is_none());
    }
}

//! Resolve configured asset sources into raw bytes.

use axum::body::Bytes;
use axum::http::StatusCode;

use super::{AssetEntry, AssetError};
use crate::config::AssetConfig;

/// Read every configured asset once.
pub fn load_entries(configs: &[AssetConfig]) -> Result<Vec<AssetEntry>, AssetError> {
    configs.iter().map(load_entry).collect()
}

fn load_entry(config: &AssetConfig) -> Result<AssetEntry, AssetError> {
    let path = config.path.trim_start_matches('/').to_string();

    let raw_content = match (&config.file, &config.content) {
        (Some(file), _) => std::fs::read(file)
            .map(Bytes::from)
            .map_err(|source| AssetError::Read {
                path: path.clone(),
                file: file.clone(),
                source,
            })?,
        (None, Some(content)) => Bytes::from(content.clone()),
        (None, None) => Bytes::new(),
    };

    let status_code =
        StatusCode::from_u16(config.status_code).map_err(|_| AssetError::InvalidStatus {
            path: path.clone(),
            code: config.status_code,
        })?;

    tracing::info!(path = %path, bytes = raw_content.len(), "Asset loaded");

    Ok(AssetEntry {
        path,
        raw_content,
        content_type: config.content_type.clone(),
        status_code,
    })
}

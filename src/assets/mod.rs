//! Static asset subsystem.
//!
//! # Data Flow
//! ```text
//! [[assets]] config entries
//!     → loader.rs (read file or take inline text)
//!     → cache.rs (precompute gzip + deflate once)
//!     → Arc<AssetCache> shared read-only by both listeners
//! ```

pub mod cache;
pub mod loader;

pub use cache::{Asset, AssetCache, AssetEntry};
pub use loader::load_entries;

/// Errors raised while building the asset cache at startup.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// An asset source file could not be read.
    #[error("failed to read asset '{path}' from {file}: {source}")]
    Read {
        path: String,
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// Compressing an asset variant failed.
    #[error("failed to compress asset '{path}': {source}")]
    Compress {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configured status code is not a valid HTTP status.
    #[error("asset '{path}' has invalid status code {code}")]
    InvalidStatus { path: String, code: u16 },
}

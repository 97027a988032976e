//! Request tap library: static assets plus a live tail of every request.

pub mod assets;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod observers;

pub use config::schema::TapConfig;
pub use error::TapError;
pub use http::{AppState, TapServer};
pub use lifecycle::Shutdown;

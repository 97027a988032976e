//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! primary port connection
//!     → server.rs (hyper connection, no keep-alive, no Date)
//!     → dispatch.rs (asset lookup, method branch)
//!         → negotiate.rs (asset representation)
//!         → body.rs (bounded body collection)
//!         → observers::Broadcaster (live tail)
//!     → response.rs (status, headers, body)
//!
//! observer port connection
//!     → server.rs
//!     → websocket.rs (upgrade → observer, asset, or redirect)
//! ```

pub mod body;
pub mod dispatch;
pub mod negotiate;
pub mod response;
pub mod server;
pub mod websocket;

pub use negotiate::{negotiate, Encoding, Negotiated};
pub use response::ResponseSpec;
pub use server::{AppState, TapServer};

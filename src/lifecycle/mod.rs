//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Load assets → Build cache → Bind both listeners
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Close observers → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: assets first, listeners last (traffic only when ready)
//! - Upgraded observer sockets leave the connection tracker; shutdown closes
//!   them through the registry instead
//! - Draining has a deadline (`lifecycle.shutdown_grace_secs`)

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, StartupError};

//! Live-tail observer subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher builds DebugEvent
//!     → broadcast.rs (serialize once, try_send to a registry snapshot)
//!     → registry.rs (one bounded queue per connected observer)
//!     → http/websocket.rs (drains the queue into text frames)
//! ```
//!
//! # Design Decisions
//! - Delivery never awaits: a slow observer loses events, requests never wait
//! - No buffering for absent observers; events with no audience are dropped
//! - Observers remove themselves when their socket task ends

pub mod broadcast;
pub mod event;
pub mod registry;

pub use broadcast::{Broadcaster, DeliveryReport};
pub use event::{DebugEvent, Outcome};
pub use registry::{ObserverId, ObserverRegistry, Subscription};

//! Best-effort fan-out of captured requests.

use std::sync::Arc;

use crate::error::DeliveryError;
use crate::observability::metrics;
use crate::observers::event::DebugEvent;
use crate::observers::registry::{Frame, ObserverRegistry};

/// Outcome of one broadcast across all observers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Pushes events to every registered observer without waiting on any of them.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<ObserverRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ObserverRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ObserverRegistry> {
        &self.registry
    }

    /// Serialize once, then `try_send` to a snapshot of the registry.
    ///
    /// Per-observer failures are counted and swallowed.
    pub fn broadcast(&self, event: &DebugEvent) -> DeliveryReport {
        let frame: Frame = match serde_json::to_string(event) {
            Ok(json) => json.into(),
            Err(e) => {
                let err = DeliveryError::from(e);
                tracing::warn!(event_id = %event.id, error = %err, "Dropping event");
                return DeliveryReport::default();
            }
        };

        let mut report = DeliveryReport::default();
        for (id, tx) in self.registry.snapshot() {
            match tx.try_send(Arc::clone(&frame)) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.dropped += 1;
                    tracing::debug!(
                        observer = %id,
                        event_id = %event.id,
                        reason = %DeliveryError::from(e),
                        "Event not delivered"
                    );
                }
            }
        }

        metrics::record_broadcast(report.delivered, report.dropped);
        report
    }
}

//! Typed broadcast event bus.
//!
//! The engine announces registrations, slashings and relayed messages to
//! whoever is listening; delivery is best-effort fan-out and the protocol
//! never depends on it (idempotent duplicate classification is the
//! defense against redelivery, not the bus).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rln_types::events::ProtocolEvent;
use tokio::sync::broadcast;

/// Broadcast bus for protocol events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ProtocolEvent>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a bus with the given per-subscriber buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: ProtocolEvent) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    /// Subscribe to events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<ProtocolEvent> {
        self.sender.subscribe()
    }

    /// Total events emitted.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

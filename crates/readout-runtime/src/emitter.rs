//! Broadcast fan-out for [`AppEvent`]s.

use readout_core::{AppEvent, AppEventEmitter};
use tokio::sync::broadcast;
use tracing::trace;

/// Default channel capacity. Slow subscribers lag rather than block emitters.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// `AppEventEmitter` backed by a tokio broadcast channel.
///
/// Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct BroadcastEmitter {
    sender: broadcast::Sender<AppEvent>,
}

impl BroadcastEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl AppEventEmitter for BroadcastEmitter {
    fn emit(&self, event: AppEvent) {
        trace!(event = event.event_name(), "Emitting event");
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    fn clone_box(&self) -> Box<dyn AppEventEmitter> {
        Box::new(self.clone())
    }
}

//! Event emitter trait for broadcasting orchestration events.
//!
//! Implementations handle transport details (broadcast channels, host
//! runtime messaging, logging).

use crate::events::AppEvent;

/// Trait for emitting application events.
///
/// # Implementations
///
/// - `NoopEmitter` - For tests and contexts without listeners
/// - `BroadcastEmitter` (runtime) - tokio broadcast fan-out
pub trait AppEventEmitter: Send + Sync {
    /// Emit an event. Must not block.
    fn emit(&self, event: AppEvent);

    /// Clone this emitter into a boxed trait object.
    fn clone_box(&self) -> Box<dyn AppEventEmitter>;
}

/// A no-op event emitter.
#[derive(Debug, Clone, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    /// Create a new no-op emitter.
    pub const fn new() -> Self {
        Self
    }
}

impl AppEventEmitter for NoopEmitter {
    fn emit(&self, _event: AppEvent) {}

    fn clone_box(&self) -> Box<dyn AppEventEmitter> {
        Box::new(self.clone())
    }
}

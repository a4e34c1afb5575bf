//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from the host.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No browser/platform API types in any signature
//! - Cross-boundary calls are `async` and return typed errors
//! - Timeouts are applied by the caller (the runtime link), not the port

pub mod counterpart;
pub mod event_emitter;
pub mod menu;
pub mod notifier;
pub mod storage;

pub use counterpart::{ChannelError, CounterpartPort};
pub use event_emitter::{AppEventEmitter, NoopEmitter};
pub use menu::{MenuSurface, MenuSurfaceError};
pub use notifier::{NoopNotifier, Notification, Notifier, Severity};
pub use storage::{PreferenceStorage, StorageError};

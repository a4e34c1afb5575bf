//! Core domain types and port definitions for readout.
//!
//! This crate is pure: no runtime, no I/O, no timers. It defines
//!
//! - the session, selection, tab and progress domain types,
//! - the clamped preference stores (speed and volume),
//! - the wire protocol spoken with the control surface and the tab-side
//!   counterpart,
//! - the canonical event union,
//! - the ports (traits) that adapters implement,
//! - the error taxonomy and runtime configuration.
//!
//! Stateful services live in `readout-runtime`.

#![deny(unused_crate_dependencies)]

pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod ports;
pub mod preferences;
pub mod protocol;

// Re-export commonly used types for convenience
pub use config::{ConfigError, LogLevel, ReadoutConfig};
pub use domain::{
    BoundaryEvent, BoundaryKind, ProgressSnapshot, RecoveryOutcome, Selection, Session, SessionId,
    SessionSnapshot, SessionState, StopReason, TabId, origin_of,
};
pub use error::{ErrorKind, ErrorPayload, ReadoutError};
pub use events::AppEvent;
pub use ports::{
    AppEventEmitter, ChannelError, CounterpartPort, MenuSurface, NoopEmitter, NoopNotifier,
    Notification, Notifier, PreferenceStorage, Severity, StorageError,
};
pub use preferences::{FadeConfig, FadePlan, OriginOverrides, SpeedSetting, VolumePreset, VolumeSetting};
pub use protocol::{Instruction, Message, RemoteState, Response, SourceContext, SourceKind};

//! Domain types shared across the core and runtime.
//!
//! # Structure
//!
//! - `session` - The single speech session, its state machine and snapshots
//! - `selection` - The most recent text selection
//! - `tab` - Tab identity, origins and recovery outcomes
//! - `progress` - Boundary events and derived progress snapshots

mod progress;
mod selection;
mod session;
mod tab;

pub use progress::{BoundaryEvent, BoundaryKind, ProgressSnapshot};
pub use selection::Selection;
pub use session::{Session, SessionId, SessionSnapshot, SessionState, StopReason};
pub use tab::{RecoveryOutcome, TabId, is_restricted_url, origin_of};

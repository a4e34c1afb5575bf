//! Stateful services for readout.
//!
//! Everything here runs on tokio and talks to the outside world only through
//! the ports defined in `readout-core`:
//!
//! - [`orchestrator`]: the single-session state machine;
//! - [`dispatcher`] and [`handlers`]: the serialized inbound message queue;
//! - [`preferences`]: speed and volume stores with persistence and fades;
//! - [`selection`], [`progress`], [`recovery`], [`menu`]: supporting
//!   trackers;
//! - [`context`]: the composition root that wires it all together.

#![deny(unused_crate_dependencies)]

pub mod context;
pub mod dispatcher;
pub mod emitter;
pub mod handlers;
pub mod link;
pub mod menu;
pub mod orchestrator;
pub mod preferences;
pub mod progress;
pub mod recovery;
pub mod selection;
pub mod storage;

pub use context::{AppContext, ContextError, HostPorts};
pub use dispatcher::{CommandHandler, Dispatcher, DispatcherConfig, HandlerRegistry};
pub use emitter::BroadcastEmitter;
pub use link::CounterpartLink;
pub use menu::{MenuReflector, MenuState};
pub use orchestrator::{
    ForceStopOutcome, OrchestratorConfig, OrchestratorDeps, SessionOrchestrator, StartRequest,
};
pub use preferences::{SpeedService, VolumeService};
pub use progress::ProgressTracker;
pub use recovery::{RecoveryConfig, RecoveryMonitor, TabLinkState};
pub use selection::SelectionTracker;
pub use storage::{JsonFileStorage, MemoryStorage};

// Used by the integration tests only
#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tokio_test as _;

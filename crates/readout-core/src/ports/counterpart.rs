//! Port for the tab-side counterpart that drives the speech engine.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::TabId;
use crate::protocol::Instruction;

/// Failure of a cross-boundary call to a tab.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// Nothing answered on the other side.
    #[error("Tab unreachable: {0}")]
    Unreachable(String),

    /// The counterpart answered but the engine refused the instruction.
    #[error("Instruction rejected: {0}")]
    Rejected(String),

    /// The tab cannot host a counterpart (browser-internal page, store page).
    #[error("Restricted page: {0}")]
    Restricted(String),

    /// The messaging channel itself is gone.
    #[error("Messaging channel closed")]
    Closed,
}

/// Messaging channel to the per-tab counterpart.
///
/// Implementations wrap the host's callback-style messaging API. Callers
/// never see host types; every call resolves to an acknowledgement or a
/// [`ChannelError`].
#[async_trait]
pub trait CounterpartPort: Send + Sync {
    /// Deliver an instruction and wait for the counterpart's acknowledgement.
    async fn send(&self, tab_id: TabId, instruction: Instruction) -> Result<(), ChannelError>;

    /// Lightweight reachability probe (ping → pong).
    async fn probe(&self, tab_id: TabId) -> Result<(), ChannelError>;

    /// Reinstall the counterpart into the tab.
    async fn reinstall(&self, tab_id: TabId) -> Result<(), ChannelError>;
}

//! Canonical event union for everything the core broadcasts.
//!
//! The menu reflector, progress listeners and any UI subscribe to these.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag:
//!
//! ```json
//! { "type": "session_transition", "from": "starting", "to": "speaking", ... }
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{
    ProgressSnapshot, RecoveryOutcome, SessionId, SessionSnapshot, SessionState, StopReason, TabId,
};
use crate::error::ErrorPayload;

/// Events emitted by the orchestration core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// The orchestrator changed state.
    SessionTransition {
        from: SessionState,
        to: SessionState,
        /// Snapshot after the transition.
        session: SessionSnapshot,
        /// Set when the transition ends a session.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<StopReason>,
    },

    /// The tracked selection was replaced or cleared.
    SelectionChanged {
        present: bool,
        #[serde(rename = "tabId", skip_serializing_if = "Option::is_none")]
        tab_id: Option<TabId>,
    },

    /// Progress re-estimated.
    ProgressUpdated {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
        progress: ProgressSnapshot,
    },

    /// Global speed changed.
    SpeedChanged { speed: f32 },

    /// Volume or mute state changed.
    VolumeChanged {
        #[serde(rename = "effectiveVolume")]
        effective_volume: u8,
        #[serde(rename = "isMuted")]
        is_muted: bool,
    },

    /// A recovery attempt finished for a tab.
    TabRecovery {
        #[serde(rename = "tabId")]
        tab_id: TabId,
        outcome: RecoveryOutcome,
    },

    /// A recoverable error was handled.
    ErrorReported {
        error: ErrorPayload,
        #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },
}

impl AppEvent {
    /// Stable event name for host transports.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::SessionTransition { .. } => "readout:session-transition",
            Self::SelectionChanged { .. } => "readout:selection-changed",
            Self::ProgressUpdated { .. } => "readout:progress",
            Self::SpeedChanged { .. } => "readout:speed-changed",
            Self::VolumeChanged { .. } => "readout:volume-changed",
            Self::TabRecovery { .. } => "readout:tab-recovery",
            Self::ErrorReported { .. } => "readout:error",
        }
    }

    /// Whether this event can change what the menu shows.
    #[must_use]
    pub const fn affects_menu(&self) -> bool {
        matches!(
            self,
            Self::SessionTransition { .. } | Self::SelectionChanged { .. }
        )
    }
}

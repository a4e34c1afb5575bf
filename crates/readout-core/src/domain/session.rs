//! The speech session and its state machine.
//!
//! ```text
//!   Idle → Starting → Speaking ⇄ Paused → Stopping → Idle
//!     ▲                                                 │
//!     └────────── force stop / tab loss (any state) ────┘
//! ```
//!
//! Exactly one session exists at a time. It is owned by the orchestrator in
//! `readout-runtime`; everything else only sees [`SessionSnapshot`] copies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TabId;

/// Generation number of a session.
///
/// Strictly increasing for the lifetime of the orchestrator. Responses and
/// counterpart events carrying an older id are stale and get discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl SessionId {
    /// The id following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No session.
    #[default]
    Idle,

    /// Begin-speech sent, waiting for the counterpart acknowledgement.
    Starting,

    /// Counterpart is speaking.
    Speaking,

    /// Counterpart is paused mid-utterance.
    Paused,

    /// End-speech sent, teardown in progress.
    Stopping,
}

impl SessionState {
    /// Whether a session exists in this state.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Whether the orchestrator may move from `self` to `next`.
    ///
    /// Any state may drop straight to `Idle` (forced cleanup).
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (_, Self::Idle)
                | (Self::Idle, Self::Starting)
                | (Self::Starting, Self::Speaking | Self::Stopping)
                | (Self::Speaking, Self::Paused | Self::Stopping)
                | (Self::Paused, Self::Speaking | Self::Stopping)
        )
    }

    /// Lowercase label used in logs and menus.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Speaking => "speaking",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Explicit stop command.
    User,
    /// A new `start` replaced the running session.
    Replaced,
    /// The auto-stop ceiling elapsed.
    Timeout,
    /// The counterpart reported the utterance ended.
    Finished,
    /// The hosting tab was closed.
    TabClosed,
    /// The hosting tab navigated away.
    Navigated,
    /// The hosting tab stopped answering and was abandoned.
    Unreachable,
    /// The speech engine rejected the request.
    EngineFailure,
    /// Escape-hatch force stop.
    ForceStop,
    /// Host shutdown.
    Shutdown,
}

impl StopReason {
    /// Parse a free-form reason string from a stop command.
    ///
    /// Unknown or missing reasons map to [`StopReason::User`].
    #[must_use]
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some("timeout") => Self::Timeout,
            Some("finished") => Self::Finished,
            Some("tab_closed" | "tab-closed") => Self::TabClosed,
            Some("navigated") => Self::Navigated,
            Some("shutdown") => Self::Shutdown,
            _ => Self::User,
        }
    }
}

/// The live session record.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Generation id.
    pub id: SessionId,
    /// Tab whose counterpart is speaking.
    pub tab_id: TabId,
    /// Origin of the tab at start time, for per-site preferences.
    pub origin: Option<String>,
    /// Text being spoken.
    pub text: String,
    /// Requested voice, if any.
    pub voice: Option<String>,
    /// Optimistic pause flag, reconciled by counterpart events.
    pub is_paused: bool,
    /// Wall-clock start time.
    pub started_at: DateTime<Utc>,
}

/// Read-only copy of the orchestrator state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    pub is_active: bool,
    pub is_paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tab_id: Option<TabId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub force_stop_attempts: u32,
}

impl SessionSnapshot {
    /// Snapshot of the idle orchestrator.
    #[must_use]
    pub const fn idle(force_stop_attempts: u32) -> Self {
        Self {
            state: SessionState::Idle,
            session_id: None,
            is_active: false,
            is_paused: false,
            current_tab_id: None,
            current_text: None,
            voice: None,
            started_at: None,
            force_stop_attempts,
        }
    }

    /// Snapshot of a live session in `state`.
    #[must_use]
    pub fn of(session: &Session, state: SessionState, force_stop_attempts: u32) -> Self {
        Self {
            state,
            session_id: Some(session.id),
            is_active: true,
            is_paused: session.is_paused,
            current_tab_id: Some(session.tab_id),
            current_text: Some(session.text.clone()),
            voice: session.voice.clone(),
            started_at: Some(session.started_at),
            force_stop_attempts,
        }
    }

    /// Canonical definition of "is playing": active and not paused.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.is_active && !self.is_paused
    }
}

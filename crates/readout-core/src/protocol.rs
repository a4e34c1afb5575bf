//! Wire protocol.
//!
//! Two directions:
//!
//! - **Inbound** [`Message`]s arrive from the control surface (menu, popup,
//!   shortcuts), from tab counterparts and from host tab events. Each has a
//!   `type` tag and an optional JSON payload, and every one is answered with
//!   a [`Response`] envelope.
//! - **Outbound** [`Instruction`]s go to the counterpart of one tab.
//!
//! ```json
//! { "type": "set-speed", "payload": { "value": 1.5 } }
//! { "success": true, "data": { "speed": 1.5, "changed": true } }
//! { "type": "set-rate", "rate": 1.5 }
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{BoundaryEvent, ProgressSnapshot, SessionId, SessionSnapshot, TabId};
use crate::error::{ErrorPayload, ReadoutError};

/// Inbound message type tags.
pub mod message_types {
    pub const START_SESSION: &str = "start-session";
    pub const STOP_SESSION: &str = "stop-session";
    pub const FORCE_STOP: &str = "force-stop";
    pub const PAUSE: &str = "pause";
    pub const RESUME: &str = "resume";
    pub const TOGGLE_PAUSE: &str = "toggle-pause";

    pub const SET_SPEED: &str = "set-speed";
    pub const ADJUST_SPEED: &str = "adjust-speed";
    pub const INCREMENT_SPEED: &str = "increment-speed";
    pub const DECREMENT_SPEED: &str = "decrement-speed";
    pub const SELECT_SPEED_PRESET: &str = "select-speed-preset";
    pub const SET_SITE_SPEED: &str = "set-site-speed";
    pub const CLEAR_SITE_SPEED: &str = "clear-site-speed";

    pub const SET_VOLUME: &str = "set-volume";
    pub const ADJUST_VOLUME: &str = "adjust-volume";
    pub const MUTE: &str = "mute";
    pub const UNMUTE: &str = "unmute";
    pub const TOGGLE_MUTE: &str = "toggle-mute";
    pub const APPLY_VOLUME_PRESET: &str = "apply-volume-preset";
    pub const SET_SITE_VOLUME: &str = "set-site-volume";
    pub const CLEAR_SITE_VOLUME: &str = "clear-site-volume";

    pub const SELECTION_CHANGED: &str = "selection-changed";
    pub const SELECTION_CLEARED: &str = "selection-cleared";

    pub const SESSION_STATE_CHANGED: &str = "session-state-changed";
    pub const SPEECH_BOUNDARY: &str = "speech-boundary";
    pub const SPEECH_ERROR: &str = "speech-error";
    pub const COUNTERPART_READY: &str = "counterpart-ready";
    pub const PING: &str = "ping";

    pub const TAB_ACTIVATED: &str = "tab-activated";
    pub const TAB_NAVIGATING: &str = "tab-navigating";
    pub const TAB_REMOVED: &str = "tab-removed";

    pub const GET_STATUS: &str = "get-status";
}

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Menu, popup or keyboard shortcut.
    #[default]
    ControlSurface,
    /// A tab's counterpart.
    Counterpart,
    /// Host browser events (tab lifecycle).
    Host,
}

/// Where a message came from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceContext {
    #[serde(default)]
    pub tab_id: Option<TabId>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub kind: SourceKind,
}

impl SourceContext {
    /// Message from the control surface, optionally about the active tab.
    #[must_use]
    pub const fn control(tab_id: Option<TabId>) -> Self {
        Self {
            tab_id,
            url: None,
            kind: SourceKind::ControlSurface,
        }
    }

    /// Message sent by the counterpart running in `tab_id`.
    pub fn counterpart(tab_id: TabId, url: Option<String>) -> Self {
        Self {
            tab_id: Some(tab_id),
            url,
            kind: SourceKind::Counterpart,
        }
    }

    /// Host tab-lifecycle event.
    #[must_use]
    pub const fn host(tab_id: Option<TabId>) -> Self {
        Self {
            tab_id,
            url: None,
            kind: SourceKind::Host,
        }
    }

    /// Whether a tab's counterpart sent the message, proving it alive.
    #[must_use]
    pub const fn is_counterpart(&self) -> bool {
        matches!(self.kind, SourceKind::Counterpart)
    }
}

/// Inbound tagged message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl Message {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Message without a payload.
    pub fn bare(kind: impl Into<String>) -> Self {
        Self::new(kind, Value::Null)
    }

    /// Decode the payload. A missing payload decodes as `{}`.
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, ReadoutError> {
        let payload = if self.payload.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            self.payload.clone()
        };
        serde_json::from_value(payload)
            .map_err(|e| ReadoutError::invalid(format!("malformed '{}' payload: {e}", self.kind)))
    }
}

/// Engine state reported by a counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteState {
    #[serde(alias = "started", alias = "resumed", alias = "playing")]
    Speaking,
    Paused,
    #[serde(alias = "finished", alias = "end")]
    Ended,
    #[serde(alias = "stopped")]
    Idle,
    Error,
}

/// Instruction sent to a tab's counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Instruction {
    BeginSpeech {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        voice: Option<String>,
        rate: f32,
        volume: u8,
    },
    EndSpeech,
    PauseSpeech,
    ResumeSpeech,
    ForceStop,
    SetRate { rate: f32 },
    SetVolume { volume: u8 },
}

impl Instruction {
    /// Wire tag, for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BeginSpeech { .. } => "begin-speech",
            Self::EndSpeech => "end-speech",
            Self::PauseSpeech => "pause-speech",
            Self::ResumeSpeech => "resume-speech",
            Self::ForceStop => "force-stop",
            Self::SetRate { .. } => "set-rate",
            Self::SetVolume { .. } => "set-volume",
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionPayload {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub tab_id: Option<TabId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StopSessionPayload {
    #[serde(default)]
    pub reason: Option<String>,
    /// Clean up locally without waiting for the counterpart.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SpeedValuePayload {
    #[serde(alias = "speed", alias = "rate")]
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SpeedDeltaPayload {
    pub delta: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PresetIndexPayload {
    pub index: usize,
}

/// Per-site speed. Without `origin` the sender's page origin is used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SiteSpeedPayload {
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(alias = "speed")]
    pub value: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClearSitePayload {
    #[serde(default)]
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct VolumeValuePayload {
    #[serde(alias = "volume")]
    pub value: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct VolumeDeltaPayload {
    pub delta: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VolumePresetPayload {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteVolumePayload {
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(alias = "volume")]
    pub value: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionPayload {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tab_id: Option<TabId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStatePayload {
    pub state: RemoteState,
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryPayload {
    #[serde(flatten)]
    pub boundary: BoundaryEvent,
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

/// Engine error reported by a counterpart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteErrorPayload {
    /// Engine error code (`interrupted`, `synthesis-failed`, ...).
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

impl RemoteErrorPayload {
    /// Codes that only mean "speech was cut short on purpose".
    #[must_use]
    pub fn is_interruption(&self) -> bool {
        matches!(self.error.as_str(), "interrupted" | "canceled" | "cancelled")
    }
}

/// Tab lifecycle payload; the tab defaults to the sender's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabPayload {
    #[serde(default)]
    pub tab_id: Option<TabId>,
    #[serde(default)]
    pub url: Option<String>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Response envelope returned for every inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl Response {
    #[must_use]
    pub const fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    #[must_use]
    pub fn err(error: &ReadoutError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_payload()),
        }
    }

    pub fn from_result(result: Result<Value, ReadoutError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(&e),
        }
    }

    /// Split into data or error payload.
    pub fn into_result(self) -> Result<Value, ErrorPayload> {
        match (self.success, self.error) {
            (true, _) => Ok(self.data.unwrap_or(Value::Null)),
            (false, Some(error)) => Err(error),
            (false, None) => Err(ReadoutError::Internal("missing error payload".into()).to_payload()),
        }
    }
}

/// Serialize a typed response body.
pub fn to_data<T: Serialize>(body: &T) -> Result<Value, ReadoutError> {
    serde_json::to_value(body).map_err(|e| ReadoutError::Internal(e.to_string()))
}

/// Plain acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub acknowledged: bool,
}

impl Ack {
    pub const YES: Self = Self { acknowledged: true };
    pub const NO: Self = Self {
        acknowledged: false,
    };
}

/// Result of a session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedResponse {
    pub session_id: SessionId,
    pub tab_id: TabId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseResponse {
    pub is_paused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedResponse {
    pub speed: f32,
    pub changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeResponse {
    pub effective_volume: u8,
    pub is_muted: bool,
    pub changed: bool,
}

/// Full status for UIs (`get-status`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub session: SessionSnapshot,
    pub is_playing: bool,
    pub selection_present: bool,
    pub speed: f32,
    pub effective_volume: u8,
    pub is_muted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressSnapshot>,
}

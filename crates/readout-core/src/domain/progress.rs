//! Playback progress types.
//!
//! Progress is an estimate: the counterpart only reports coarse boundary
//! events, and the runtime fills the gaps with wall-clock sampling.

use serde::{Deserialize, Serialize};

/// Granularity of an engine boundary marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryKind {
    #[default]
    Word,
    Sentence,
    Char,
}

/// Engine-reported position marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryEvent {
    /// Offset into the session text in UTF-16 code units, the unit speech
    /// engines report boundaries in.
    pub char_index: usize,
    /// Length of the spoken unit, when the engine reports it.
    #[serde(default)]
    pub char_length: Option<usize>,
    #[serde(default)]
    pub kind: BoundaryKind,
}

impl BoundaryEvent {
    pub const fn word(char_index: usize) -> Self {
        Self {
            char_index,
            char_length: None,
            kind: BoundaryKind::Word,
        }
    }
}

/// Derived progress of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Position and length are in UTF-16 code units.
    pub current_position: usize,
    pub total_length: usize,
    /// Playing time so far in milliseconds, paused intervals excluded.
    #[serde(rename = "elapsedTime")]
    pub elapsed_ms: u64,
    /// Estimated time left in milliseconds; `None` until a rate is known.
    #[serde(rename = "remainingTime")]
    pub remaining_ms: Option<u64>,
    pub percent_complete: f64,
    pub speed_at_sample: f32,
}

impl ProgressSnapshot {
    /// Whether the whole text has been spoken.
    pub const fn is_complete(&self) -> bool {
        self.total_length > 0 && self.current_position >= self.total_length
    }
}

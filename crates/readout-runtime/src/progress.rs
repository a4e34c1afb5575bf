//! Progress estimation for the running session.
//!
//! The engine only reports coarse boundary events. Between them the tracker
//! extrapolates from wall-clock time:
//!
//! - elapsed time excludes paused intervals (a paused-time accumulator is
//!   folded in on resume);
//! - remaining time is `(total - position) / observed_rate`, recomputed on
//!   every boundary;
//! - a periodic [`ProgressTracker::tick`] re-estimates remaining time from
//!   elapsed time and percent alone, so long utterances do not look stuck.
//!
//! Positions are UTF-16 code units, matching engine boundary offsets.
//!
//! All instants come from `tokio::time` so paused-clock tests are exact.

#![allow(clippy::cast_precision_loss)] // char counts and millis are far below 2^52

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use readout_core::{BoundaryEvent, ProgressSnapshot, SessionId};
use tokio::time::Instant;
use tracing::trace;

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_millis(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

#[derive(Debug)]
struct Tracking {
    session_id: SessionId,
    total_length: usize,
    position: usize,
    started_at: Instant,
    paused_at: Option<Instant>,
    paused_total: Duration,
    speed: f32,
    /// Played time and position that rate sampling is measured from.
    /// Reset on seek and speed change.
    origin_ms: u64,
    origin_position: usize,
    /// Characters per millisecond of playing time.
    rate: Option<f64>,
    remaining_ms: Option<u64>,
}

impl Tracking {
    fn elapsed(&self, now: Instant) -> Duration {
        let paused_now = self
            .paused_at
            .map_or(Duration::ZERO, |p| now.saturating_duration_since(p));
        now.saturating_duration_since(self.started_at)
            .saturating_sub(self.paused_total)
            .saturating_sub(paused_now)
    }

    fn percent(&self) -> f64 {
        if self.total_length == 0 {
            return 100.0;
        }
        self.position as f64 / self.total_length as f64 * 100.0
    }

    fn reset_origin(&mut self, now: Instant) {
        self.origin_ms = millis(self.elapsed(now));
        self.origin_position = self.position;
    }

    fn remaining_from_rate(&self) -> Option<u64> {
        let rate = self.rate?;
        if rate <= 0.0 {
            return None;
        }
        let left = self.total_length.saturating_sub(self.position) as f64;
        Some(to_millis(left / rate))
    }

    fn snapshot(&self, now: Instant) -> ProgressSnapshot {
        ProgressSnapshot {
            current_position: self.position,
            total_length: self.total_length,
            elapsed_ms: millis(self.elapsed(now)),
            remaining_ms: self.remaining_ms,
            percent_complete: self.percent(),
            speed_at_sample: self.speed,
        }
    }
}

/// Tracks progress of at most one session.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    state: Mutex<Option<Tracking>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Option<Tracking>) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Begin tracking `text` for a new session, replacing any previous one.
    pub fn start_tracking(
        &self,
        session_id: SessionId,
        text: &str,
        start_position: usize,
        speed: f32,
    ) -> ProgressSnapshot {
        let now = Instant::now();
        let total_length = text.encode_utf16().count();
        let position = start_position.min(total_length);
        let tracking = Tracking {
            session_id,
            total_length,
            position,
            started_at: now,
            paused_at: None,
            paused_total: Duration::ZERO,
            speed,
            origin_ms: 0,
            origin_position: position,
            rate: None,
            remaining_ms: None,
        };
        let snapshot = tracking.snapshot(now);
        self.with(|state| *state = Some(tracking));
        snapshot
    }

    /// Forget the current session. Returns its final snapshot.
    pub fn stop(&self) -> Option<ProgressSnapshot> {
        let now = Instant::now();
        self.with(Option::take).map(|t| t.snapshot(now))
    }

    pub fn snapshot(&self) -> Option<ProgressSnapshot> {
        let now = Instant::now();
        self.with(|state| state.as_ref().map(|t| t.snapshot(now)))
    }

    /// Apply an engine boundary. Ignored for any other session.
    pub fn update_progress(
        &self,
        session_id: SessionId,
        boundary: BoundaryEvent,
    ) -> Option<ProgressSnapshot> {
        let now = Instant::now();
        self.with(|state| {
            let tracking = state.as_mut().filter(|t| t.session_id == session_id)?;
            tracking.position = boundary.char_index.min(tracking.total_length);

            let played = millis(tracking.elapsed(now)).saturating_sub(tracking.origin_ms);
            let advanced = tracking.position.saturating_sub(tracking.origin_position);
            if played > 0 && advanced > 0 {
                tracking.rate = Some(advanced as f64 / played as f64);
            }
            tracking.remaining_ms = tracking.remaining_from_rate();
            trace!(
                position = tracking.position,
                total = tracking.total_length,
                "Boundary applied"
            );
            Some(tracking.snapshot(now))
        })
    }

    /// Periodic re-estimate while playing.
    ///
    /// Uses only elapsed time and percent progressed since the last rate
    /// origin. Returns `None` when nothing is playing.
    pub fn tick(&self) -> Option<ProgressSnapshot> {
        let now = Instant::now();
        self.with(|state| {
            let tracking = state.as_mut().filter(|t| t.paused_at.is_none())?;
            if tracking.total_length > 0 {
                let played = millis(tracking.elapsed(now)).saturating_sub(tracking.origin_ms);
                let total = tracking.total_length as f64;
                let done = tracking.position.saturating_sub(tracking.origin_position) as f64
                    / total
                    * 100.0;
                let left = 100.0 - tracking.percent();
                if done > 0.0 && played > 0 {
                    tracking.remaining_ms = Some(to_millis(played as f64 * left / done));
                }
            }
            Some(tracking.snapshot(now))
        })
    }

    pub fn pause(&self) {
        let now = Instant::now();
        self.with(|state| {
            if let Some(tracking) = state.as_mut() {
                if tracking.paused_at.is_none() {
                    tracking.paused_at = Some(now);
                }
            }
        });
    }

    pub fn resume(&self) {
        let now = Instant::now();
        self.with(|state| {
            if let Some(tracking) = state.as_mut() {
                if let Some(paused_at) = tracking.paused_at.take() {
                    tracking.paused_total += now.saturating_duration_since(paused_at);
                }
            }
        });
    }

    pub fn is_paused(&self) -> bool {
        self.with(|state| state.as_ref().is_some_and(|t| t.paused_at.is_some()))
    }

    /// Jump to a character position.
    pub fn seek_to_position(&self, position: usize) -> Option<ProgressSnapshot> {
        let now = Instant::now();
        self.with(|state| {
            let tracking = state.as_mut()?;
            tracking.position = position.min(tracking.total_length);
            tracking.reset_origin(now);
            tracking.remaining_ms = tracking.remaining_from_rate();
            Some(tracking.snapshot(now))
        })
    }

    /// Jump to a percentage of the text (clamped to 0–100).
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn seek_to_percentage(&self, percent: f64) -> Option<ProgressSnapshot> {
        let total = self.with(|state| state.as_ref().map(|t| t.total_length))?;
        let percent = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let position = (total as f64 * percent / 100.0).round() as usize;
        self.seek_to_position(position)
    }

    /// Rescale the observed rate for a new speech speed.
    pub fn update_speed(&self, speed: f32) {
        let now = Instant::now();
        self.with(|state| {
            if let Some(tracking) = state.as_mut() {
                if tracking.speed > 0.0 && speed > 0.0 {
                    let factor = f64::from(speed) / f64::from(tracking.speed);
                    tracking.rate = tracking.rate.map(|r| r * factor);
                }
                tracking.speed = speed;
                tracking.reset_origin(now);
                tracking.remaining_ms = tracking.remaining_from_rate();
            }
        });
    }
}

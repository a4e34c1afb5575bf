//! Linear volume fade planning.
//!
//! A fade is a fixed number of evenly spaced steps over a target duration.
//! The runtime executes the plan on a timer and can cancel it mid-way.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_FADE_DURATION_MS: u64 = 300;
const DEFAULT_FADE_STEPS: u32 = 10;
const MAX_FADE_STEPS: u32 = 100;

/// Fade settings stored with the volume preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FadeConfig {
    pub enabled: bool,
    pub duration_ms: u64,
    pub steps: u32,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_ms: DEFAULT_FADE_DURATION_MS,
            steps: DEFAULT_FADE_STEPS,
        }
    }
}

impl FadeConfig {
    pub(crate) fn normalize(&mut self) {
        self.steps = self.steps.clamp(1, MAX_FADE_STEPS);
    }
}

/// A concrete ramp between two volume levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FadePlan {
    pub from: u8,
    pub to: u8,
    pub steps: u32,
    pub step_interval: Duration,
}

impl FadePlan {
    /// Plan a ramp from `from` to `to` using `config`.
    ///
    /// A disabled fade collapses to a single step with no delay.
    #[must_use]
    pub fn new(from: u8, to: u8, config: &FadeConfig) -> Self {
        if !config.enabled || config.steps <= 1 || config.duration_ms == 0 {
            return Self {
                from,
                to,
                steps: 1,
                step_interval: Duration::ZERO,
            };
        }
        let steps = config.steps.min(MAX_FADE_STEPS);
        Self {
            from,
            to,
            steps,
            step_interval: Duration::from_millis(config.duration_ms / u64::from(steps)),
        }
    }

    /// Whether the ramp would not change anything.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.from == self.to
    }

    /// Intermediate levels, ending exactly at `to`.
    #[must_use]
    pub fn levels(&self) -> Vec<u8> {
        let from = f64::from(self.from);
        let span = f64::from(self.to) - from;
        let steps = f64::from(self.steps);
        (1..=self.steps)
            .map(|i| {
                if i == self.steps {
                    self.to
                } else {
                    let level = (span * f64::from(i)).mul_add(1.0 / steps, from).round();
                    // Level is always within [0, 100] by construction.
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let level = level.clamp(0.0, 100.0) as u8;
                    level
                }
            })
            .collect()
    }
}

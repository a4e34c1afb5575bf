//! Speech rate preference.

use serde::{Deserialize, Serialize};

use super::OriginOverrides;
use crate::error::ReadoutError;

pub const SPEED_MIN: f32 = 0.5;
pub const SPEED_MAX: f32 = 4.0;
pub const SPEED_STEP: f32 = 0.1;
pub const SPEED_DEFAULT: f32 = 1.0;

fn default_presets() -> Vec<f32> {
    vec![0.75, 1.0, 1.25, 1.5, 1.75, 2.0]
}

/// Rate values are kept at two decimals so repeated steps never drift
/// (`1.0 + 0.1 + 0.1` must read back as `1.2`).
fn round_rate(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Speech rate with bounds, step, presets and per-site overrides.
///
/// Invariant: `min <= current <= max`; every write goes through
/// [`SpeedSetting::clamp`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpeedSetting {
    pub current: f32,
    pub default_value: f32,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub presets: Vec<f32>,
    pub per_origin_overrides: OriginOverrides<f32>,
}

impl Default for SpeedSetting {
    fn default() -> Self {
        Self {
            current: SPEED_DEFAULT,
            default_value: SPEED_DEFAULT,
            min: SPEED_MIN,
            max: SPEED_MAX,
            step: SPEED_STEP,
            presets: default_presets(),
            per_origin_overrides: OriginOverrides::default(),
        }
    }
}

impl SpeedSetting {
    /// Clamp a candidate rate into `[min, max]`.
    ///
    /// Non-finite input falls back to the default rate.
    #[must_use]
    pub fn clamp(&self, value: f32) -> f32 {
        let value = if value.is_finite() {
            value
        } else {
            self.default_value
        };
        round_rate(value.clamp(self.min, self.max))
    }

    /// Set the global rate.
    pub fn set(&mut self, value: f32) -> bool {
        let next = self.clamp(value);
        if (next - self.current).abs() < f32::EPSILON {
            return false;
        }
        self.current = next;
        true
    }

    /// Move the global rate by `delta`.
    pub fn adjust(&mut self, delta: f32) -> bool {
        self.set(self.current + delta)
    }

    /// One step faster.
    pub fn increment(&mut self) -> bool {
        self.adjust(self.step)
    }

    /// One step slower.
    pub fn decrement(&mut self) -> bool {
        self.adjust(-self.step)
    }

    /// Back to the default rate.
    pub fn reset(&mut self) -> bool {
        self.set(self.default_value)
    }

    /// Select one of the preset rates by index.
    pub fn select_preset(&mut self, index: usize) -> Result<bool, ReadoutError> {
        let value = self.presets.get(index).copied().ok_or_else(|| {
            ReadoutError::invalid(format!(
                "speed preset {index} out of range (have {})",
                self.presets.len()
            ))
        })?;
        Ok(self.set(value))
    }

    /// Set a per-site rate.
    pub fn set_for_origin(&mut self, origin: &str, value: f32) -> bool {
        let value = self.clamp(value);
        self.per_origin_overrides.insert(origin, value)
    }

    /// Drop a per-site rate.
    pub fn clear_origin(&mut self, origin: &str) -> bool {
        self.per_origin_overrides.remove(origin)
    }

    /// Rate to use for a page on `origin`.
    #[must_use]
    pub fn effective_for(&self, origin: Option<&str>) -> f32 {
        origin
            .and_then(|o| self.per_origin_overrides.get(o))
            .unwrap_or(self.current)
    }

    /// Repair a loaded value: fix inverted bounds and re-clamp everything.
    pub fn normalize(&mut self) {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min > self.max {
            self.min = SPEED_MIN;
            self.max = SPEED_MAX;
        }
        if !self.step.is_finite() || self.step <= 0.0 {
            self.step = SPEED_STEP;
        }
        self.default_value = self.clamp(self.default_value);
        self.current = self.clamp(self.current);
        let (min, max) = (self.min, self.max);
        self.presets = self
            .presets
            .iter()
            .filter(|p| p.is_finite())
            .map(|p| round_rate(p.clamp(min, max)))
            .collect();
        self.per_origin_overrides
            .retain_map(|v| v.is_finite().then(|| round_rate(v.clamp(min, max))));
    }
}

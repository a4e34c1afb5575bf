//! Volume preference with non-destructive mute.

use serde::{Deserialize, Serialize};

use super::{FadeConfig, OriginOverrides};
use crate::error::ReadoutError;

pub const VOLUME_MAX: u8 = 100;
pub const VOLUME_DEFAULT: u8 = 100;

/// Named volume level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumePreset {
    pub name: String,
    pub value: u8,
}

impl VolumePreset {
    pub fn new(name: impl Into<String>, value: u8) -> Self {
        Self {
            name: name.into(),
            value: value.min(VOLUME_MAX),
        }
    }
}

fn default_presets() -> Vec<VolumePreset> {
    vec![
        VolumePreset::new("quiet", 30),
        VolumePreset::new("normal", 70),
        VolumePreset::new("loud", 100),
    ]
}

/// Global volume, mute state, presets and per-site overrides.
///
/// Invariant: `global_volume <= 100`. Mute never overwrites
/// `global_volume`; it stashes the pre-mute level in `previous_volume` and
/// [`VolumeSetting::unmute`] restores it exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VolumeSetting {
    pub global_volume: u8,
    pub is_muted: bool,
    pub previous_volume: u8,
    pub per_origin_overrides: OriginOverrides<u8>,
    pub presets: Vec<VolumePreset>,
    pub fade: FadeConfig,
}

impl Default for VolumeSetting {
    fn default() -> Self {
        Self {
            global_volume: VOLUME_DEFAULT,
            is_muted: false,
            previous_volume: VOLUME_DEFAULT,
            per_origin_overrides: OriginOverrides::default(),
            presets: default_presets(),
            fade: FadeConfig::default(),
        }
    }
}

impl VolumeSetting {
    /// Clamp any integer into `0..=100`.
    #[must_use]
    pub fn clamp(value: i32) -> u8 {
        u8::try_from(value.clamp(0, i32::from(VOLUME_MAX))).unwrap_or(VOLUME_MAX)
    }

    /// Level actually sent to the engine.
    #[must_use]
    pub const fn effective_volume(&self) -> u8 {
        if self.is_muted { 0 } else { self.global_volume }
    }

    /// Level for a page on `origin`, honoring mute and site overrides.
    #[must_use]
    pub fn effective_for(&self, origin: Option<&str>) -> u8 {
        if self.is_muted {
            return 0;
        }
        origin
            .and_then(|o| self.per_origin_overrides.get(o))
            .unwrap_or(self.global_volume)
    }

    /// Set the global volume. An explicit level also ends mute.
    pub fn set_volume(&mut self, value: i32) -> bool {
        let next = Self::clamp(value);
        let changed = next != self.global_volume || self.is_muted;
        self.global_volume = next;
        self.previous_volume = next;
        self.is_muted = false;
        changed
    }

    /// Move the volume by `delta`, relative to the pre-mute level when muted.
    pub fn adjust(&mut self, delta: i32) -> bool {
        let base = if self.is_muted {
            self.previous_volume
        } else {
            self.global_volume
        };
        self.set_volume(i32::from(base) + delta)
    }

    pub fn mute(&mut self) -> bool {
        if self.is_muted {
            return false;
        }
        self.previous_volume = self.global_volume;
        self.is_muted = true;
        true
    }

    pub fn unmute(&mut self) -> bool {
        if !self.is_muted {
            return false;
        }
        self.global_volume = self.previous_volume;
        self.is_muted = false;
        true
    }

    pub fn toggle_mute(&mut self) -> bool {
        if self.is_muted {
            self.unmute()
        } else {
            self.mute()
        }
    }

    /// Apply a named preset (case-insensitive).
    pub fn apply_preset(&mut self, name: &str) -> Result<bool, ReadoutError> {
        let value = self
            .presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.value)
            .ok_or_else(|| ReadoutError::invalid(format!("unknown volume preset '{name}'")))?;
        Ok(self.set_volume(i32::from(value)))
    }

    pub fn set_for_origin(&mut self, origin: &str, value: i32) -> bool {
        self.per_origin_overrides.insert(origin, Self::clamp(value))
    }

    pub fn clear_origin(&mut self, origin: &str) -> bool {
        self.per_origin_overrides.remove(origin)
    }

    /// Repair a loaded value.
    pub fn normalize(&mut self) {
        self.global_volume = self.global_volume.min(VOLUME_MAX);
        self.previous_volume = self.previous_volume.min(VOLUME_MAX);
        for preset in &mut self.presets {
            preset.value = preset.value.min(VOLUME_MAX);
        }
        self.per_origin_overrides
            .retain_map(|v| Some(v.min(VOLUME_MAX)));
        self.fade.normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_mute_then_unmute() {
        let mut volume = VolumeSetting::default();
        volume.set_volume(70);
        assert!(volume.mute());
        assert_eq!(volume.effective_volume(), 0);
        assert!(volume.is_muted);
        assert!(volume.unmute());
        assert_eq!(volume.effective_volume(), 70);
        assert!(!volume.is_muted);
    }

    #[test]
    fn test_mute_round_trip_for_every_level() {
        for level in 0..=100 {
            let mut volume = VolumeSetting::default();
            volume.set_volume(level);
            volume.mute();
            volume.unmute();
            assert_eq!(i32::from(volume.global_volume), level);
        }
    }

    #[test]
    fn test_clamp_invariant() {
        let mut volume = VolumeSetting::default();
        for value in [-500, -1, 0, 55, 100, 101, i32::MAX, i32::MIN] {
            volume.set_volume(value);
            assert!(volume.global_volume <= VOLUME_MAX);
        }
        volume.set_volume(95);
        volume.adjust(20);
        assert_eq!(volume.global_volume, 100);
    }

    #[test]
    fn test_repeated_mute_is_noop() {
        let mut volume = VolumeSetting::default();
        assert!(volume.mute());
        assert!(!volume.mute());
        assert!(volume.unmute());
        assert!(!volume.unmute());
    }

    #[test]
    fn test_adjust_while_muted_uses_previous_level() {
        let mut volume = VolumeSetting::default();
        volume.set_volume(40);
        volume.mute();
        assert!(volume.adjust(10));
        assert!(!volume.is_muted);
        assert_eq!(volume.global_volume, 50);
    }

    #[test]
    fn test_presets() {
        let mut volume = VolumeSetting::default();
        assert!(volume.apply_preset("Quiet").unwrap());
        assert_eq!(volume.global_volume, 30);
        assert!(volume.apply_preset("nope").is_err());
    }

    #[test]
    fn test_origin_override_respects_mute() {
        let mut volume = VolumeSetting::default();
        volume.set_for_origin("https://video.test", 20);
        assert_eq!(volume.effective_for(Some("https://video.test")), 20);
        volume.mute();
        assert_eq!(volume.effective_for(Some("https://video.test")), 0);
    }
}

//! Preference stores: clamped numeric settings with per-origin overrides.
//!
//! Everything here is pure and synchronous. Persistence, debouncing and fade
//! scheduling are the runtime's job (`readout-runtime::preferences`).
//!
//! Every mutator returns `true` only when observable state changed, so
//! callers can skip redundant persistence and broadcast work.

mod fade;
mod overrides;
mod speed;
mod volume;

pub use fade::{FadeConfig, FadePlan};
pub use overrides::{DEFAULT_OVERRIDE_CAPACITY, OriginOverrides};
pub use speed::{SPEED_DEFAULT, SPEED_MAX, SPEED_MIN, SPEED_STEP, SpeedSetting};
pub use volume::{VOLUME_DEFAULT, VOLUME_MAX, VolumePreset, VolumeSetting};

/// Storage key for the speed store.
pub const SPEED_STORAGE_KEY: &str = "speed";

/// Storage key for the volume store.
pub const VOLUME_STORAGE_KEY: &str = "volume";

//! Preference services: the pure stores from `readout-core` plus
//! persistence, change broadcasting and fade execution.

mod debounce;
mod fade;
mod speed;
mod volume;

pub use debounce::Debouncer;
pub use fade::FadeRunner;
pub use speed::{SpeedService, SpeedUpdate};
pub use volume::{VolumeService, VolumeUpdate};

use readout_core::PreferenceStorage;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Load a store from storage, falling back to defaults when the value is
/// missing, unreadable or malformed.
async fn load_store<T>(storage: &dyn PreferenceStorage, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match storage.load(key).await {
        Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(key, error = %e, "Stored preference is malformed, using defaults");
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key, error = %e, "Failed to load preference, using defaults");
            T::default()
        }
    }
}

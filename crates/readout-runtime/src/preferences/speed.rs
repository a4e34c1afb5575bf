//! Speed preference service.

use std::sync::{Arc, PoisonError, RwLock};

use readout_core::preferences::SPEED_STORAGE_KEY;
use readout_core::{
    AppEvent, AppEventEmitter, PreferenceStorage, ReadoutError, SpeedSetting, StorageError,
};
use tracing::{debug, info, warn};

use super::load_store;

/// Result of a speed mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedUpdate {
    pub changed: bool,
    pub current: f32,
}

/// Owns the [`SpeedSetting`] and persists it on every change.
pub struct SpeedService {
    setting: RwLock<SpeedSetting>,
    storage: Arc<dyn PreferenceStorage>,
    emitter: Arc<dyn AppEventEmitter>,
}

impl SpeedService {
    pub fn new(
        setting: SpeedSetting,
        storage: Arc<dyn PreferenceStorage>,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        Self {
            setting: RwLock::new(setting),
            storage,
            emitter,
        }
    }

    /// Restore the persisted setting, repairing corrupt values.
    pub async fn load(
        storage: Arc<dyn PreferenceStorage>,
        emitter: Arc<dyn AppEventEmitter>,
        override_capacity: usize,
    ) -> Self {
        let mut setting: SpeedSetting = load_store(storage.as_ref(), SPEED_STORAGE_KEY).await;
        setting.normalize();
        setting.per_origin_overrides.set_capacity(override_capacity);
        info!(speed = setting.current, "Speed preference loaded");
        Self::new(setting, storage, emitter)
    }

    pub fn snapshot(&self) -> SpeedSetting {
        self.setting
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn current(&self) -> f32 {
        self.setting
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
    }

    pub fn effective_for(&self, origin: Option<&str>) -> f32 {
        self.setting
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .effective_for(origin)
    }

    /// Refresh an origin's override recency without persisting.
    pub fn touch_origin(&self, origin: &str) {
        self.setting
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .per_origin_overrides
            .touch(origin);
    }

    /// Apply a mutation; persist and broadcast only when it changed state.
    ///
    /// A failed write is logged. The in-memory setting stays authoritative,
    /// so callers still see (and forward) the new value.
    pub async fn update<F>(&self, mutate: F) -> Result<SpeedUpdate, ReadoutError>
    where
        F: FnOnce(&mut SpeedSetting) -> Result<bool, ReadoutError>,
    {
        let (changed, current, snapshot) = {
            let mut setting = self.setting.write().unwrap_or_else(PoisonError::into_inner);
            let changed = mutate(&mut setting)?;
            (changed, setting.current, changed.then(|| setting.clone()))
        };

        if let Some(snapshot) = snapshot {
            debug!(speed = current, "Speed preference changed");
            self.emitter.emit(AppEvent::SpeedChanged { speed: current });
            if let Err(e) = self.persist(&snapshot).await {
                warn!(error = %e, "Failed to persist speed preference");
            }
        }
        Ok(SpeedUpdate { changed, current })
    }

    async fn persist(&self, setting: &SpeedSetting) -> Result<(), StorageError> {
        let value = serde_json::to_value(setting)?;
        self.storage.save(SPEED_STORAGE_KEY, &value).await
    }
}

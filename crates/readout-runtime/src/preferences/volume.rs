//! Volume preference service with debounced persistence.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use readout_core::preferences::VOLUME_STORAGE_KEY;
use readout_core::{
    AppEvent, AppEventEmitter, FadeConfig, PreferenceStorage, ReadoutError, VolumeSetting,
};
use tracing::{debug, info, warn};

use super::debounce::Debouncer;
use super::load_store;

/// Result of a volume mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeUpdate {
    pub changed: bool,
    /// Global effective volume before the mutation.
    pub before: u8,
    /// Global effective volume after the mutation.
    pub after: u8,
    pub is_muted: bool,
}

/// Owns the [`VolumeSetting`].
///
/// Writes are coalesced: a burst of changes (a slider drag) produces one
/// storage write, `debounce` after the last change.
pub struct VolumeService {
    setting: Arc<RwLock<VolumeSetting>>,
    storage: Arc<dyn PreferenceStorage>,
    emitter: Arc<dyn AppEventEmitter>,
    debouncer: Debouncer,
}

impl VolumeService {
    pub fn new(
        setting: VolumeSetting,
        storage: Arc<dyn PreferenceStorage>,
        emitter: Arc<dyn AppEventEmitter>,
        debounce: Duration,
    ) -> Self {
        Self {
            setting: Arc::new(RwLock::new(setting)),
            storage,
            emitter,
            debouncer: Debouncer::new(debounce),
        }
    }

    /// Restore the persisted setting, repairing corrupt values.
    pub async fn load(
        storage: Arc<dyn PreferenceStorage>,
        emitter: Arc<dyn AppEventEmitter>,
        debounce: Duration,
        override_capacity: usize,
    ) -> Self {
        let mut setting: VolumeSetting = load_store(storage.as_ref(), VOLUME_STORAGE_KEY).await;
        setting.normalize();
        setting.per_origin_overrides.set_capacity(override_capacity);
        info!(
            volume = setting.global_volume,
            muted = setting.is_muted,
            "Volume preference loaded"
        );
        Self::new(setting, storage, emitter, debounce)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, VolumeSetting> {
        self.setting.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> VolumeSetting {
        self.read().clone()
    }

    pub fn effective_volume(&self) -> u8 {
        self.read().effective_volume()
    }

    pub fn is_muted(&self) -> bool {
        self.read().is_muted
    }

    pub fn effective_for(&self, origin: Option<&str>) -> u8 {
        self.read().effective_for(origin)
    }

    pub fn fade_config(&self) -> FadeConfig {
        self.read().fade
    }

    pub fn touch_origin(&self, origin: &str) {
        self.setting
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .per_origin_overrides
            .touch(origin);
    }

    /// Apply a mutation; schedule persistence and broadcast on change.
    pub fn update<F>(&self, mutate: F) -> Result<VolumeUpdate, ReadoutError>
    where
        F: FnOnce(&mut VolumeSetting) -> Result<bool, ReadoutError>,
    {
        let update = {
            let mut setting = self.setting.write().unwrap_or_else(PoisonError::into_inner);
            let before = setting.effective_volume();
            let changed = mutate(&mut setting)?;
            VolumeUpdate {
                changed,
                before,
                after: setting.effective_volume(),
                is_muted: setting.is_muted,
            }
        };

        if update.changed {
            debug!(
                volume = update.after,
                muted = update.is_muted,
                "Volume preference changed"
            );
            self.emitter.emit(AppEvent::VolumeChanged {
                effective_volume: update.after,
                is_muted: update.is_muted,
            });
            self.schedule_persist();
        }
        Ok(update)
    }

    fn schedule_persist(&self) {
        let setting = Arc::clone(&self.setting);
        let storage = Arc::clone(&self.storage);
        self.debouncer.schedule(async move {
            if let Err(e) = persist(&setting, storage.as_ref()).await {
                warn!(error = %e, "Failed to persist volume preference");
            }
        });
    }

    /// Write a pending change now instead of waiting for the debounce.
    pub async fn flush(&self) -> Result<(), ReadoutError> {
        if self.debouncer.cancel() {
            persist(&self.setting, self.storage.as_ref()).await?;
            debug!("Flushed pending volume preference");
        }
        Ok(())
    }
}

async fn persist(
    setting: &RwLock<VolumeSetting>,
    storage: &dyn PreferenceStorage,
) -> Result<(), ReadoutError> {
    let value = {
        let setting = setting.read().unwrap_or_else(PoisonError::into_inner);
        serde_json::to_value(&*setting).map_err(readout_core::StorageError::from)?
    };
    storage.save(VOLUME_STORAGE_KEY, &value).await?;
    Ok(())
}

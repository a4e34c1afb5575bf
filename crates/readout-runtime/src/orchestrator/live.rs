//! Live parameter changes.
//!
//! Preference stores are updated first; the new effective value is then
//! forwarded to the active session, if there is one. A failed forward is
//! reported but never rolls back the stored preference.

use readout_core::{
    FadePlan, Instruction, ReadoutError, SessionId, SpeedSetting, TabId, VolumeSetting,
};
use tracing::debug;

use super::SessionOrchestrator;
use crate::preferences::{SpeedUpdate, VolumeUpdate};

impl SessionOrchestrator {
    /// Mutate the speed preference and retune the active session.
    pub async fn update_speed<F>(&self, mutate: F) -> Result<SpeedUpdate, ReadoutError>
    where
        F: FnOnce(&mut SpeedSetting) -> Result<bool, ReadoutError>,
    {
        let _op = self.inner.op_lock.lock().await;
        let update = self.inner.deps.speed.update(mutate).await?;
        if update.changed {
            self.forward_rate_locked().await;
        }
        Ok(update)
    }

    pub async fn apply_speed(&self, value: f32) -> Result<SpeedUpdate, ReadoutError> {
        self.update_speed(|s| Ok(s.set(value))).await
    }

    async fn forward_rate_locked(&self) {
        let Some((session_id, tab_id, origin)) = self.live_target() else {
            return;
        };
        let rate = self.inner.deps.speed.effective_for(origin.as_deref());
        self.inner.deps.progress.update_speed(rate);
        debug!(%session_id, rate, "Forwarding rate to active session");
        if let Err(e) = self
            .inner
            .deps
            .link
            .send(tab_id, Instruction::SetRate { rate })
            .await
        {
            self.handle_instruction_error(&e, session_id).await;
        }
    }

    /// Mutate the volume preference and apply it to the active session,
    /// ramping when `fade` is set and fading is enabled.
    pub async fn update_volume<F>(&self, mutate: F, fade: bool) -> Result<VolumeUpdate, ReadoutError>
    where
        F: FnOnce(&mut VolumeSetting) -> Result<bool, ReadoutError>,
    {
        let _op = self.inner.op_lock.lock().await;
        let target = self.live_target();
        let origin = target.as_ref().and_then(|(_, _, origin)| origin.clone());
        let before = self.inner.deps.volume.effective_for(origin.as_deref());

        let update = self.inner.deps.volume.update(mutate)?;
        if !update.changed {
            return Ok(update);
        }
        let Some((session_id, tab_id, _)) = target else {
            return Ok(update);
        };

        let after = self.inner.deps.volume.effective_for(origin.as_deref());
        let config = self.inner.deps.volume.fade_config();
        if fade && config.enabled && before != after {
            let plan = FadePlan::new(before, after, &config);
            self.inner
                .fade
                .start(plan, self.inner.deps.link.clone(), tab_id);
            return Ok(update);
        }

        self.inner.fade.cancel();
        debug!(%session_id, volume = after, "Forwarding volume to active session");
        if let Err(e) = self
            .inner
            .deps
            .link
            .send(tab_id, Instruction::SetVolume { volume: after })
            .await
        {
            self.handle_instruction_error(&e, session_id).await;
        }
        Ok(update)
    }

    pub async fn apply_volume(&self, value: i32) -> Result<VolumeUpdate, ReadoutError> {
        self.update_volume(|v| Ok(v.set_volume(value)), false).await
    }

    fn live_target(&self) -> Option<(SessionId, TabId, Option<String>)> {
        self.state()
            .session
            .as_ref()
            .map(|s| (s.id, s.tab_id, s.origin.clone()))
    }
}

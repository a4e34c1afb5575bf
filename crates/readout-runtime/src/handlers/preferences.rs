//! Speed and volume preference commands.
//!
//! Volume steps that the user hears as a switch (mute, unmute, presets)
//! fade; direct level changes apply at once.

use async_trait::async_trait;
use readout_core::protocol::{
    ClearSitePayload, PresetIndexPayload, SiteSpeedPayload, SiteVolumePayload, SpeedDeltaPayload,
    SpeedResponse, SpeedValuePayload, VolumeDeltaPayload, VolumePresetPayload, VolumeResponse,
    VolumeValuePayload, message_types, to_data,
};
use readout_core::{Message, ReadoutError, SourceContext, SpeedSetting, VolumeSetting};
use serde_json::Value;

use super::{HandlerDeps, site_origin, unexpected};
use crate::dispatcher::CommandHandler;
use crate::orchestrator::SessionOrchestrator;
use crate::preferences::{SpeedUpdate, VolumeUpdate};

pub struct SpeedHandler {
    orchestrator: SessionOrchestrator,
}

impl SpeedHandler {
    pub const KINDS: &'static [&'static str] = &[
        message_types::SET_SPEED,
        message_types::ADJUST_SPEED,
        message_types::INCREMENT_SPEED,
        message_types::DECREMENT_SPEED,
        message_types::SELECT_SPEED_PRESET,
        message_types::SET_SITE_SPEED,
        message_types::CLEAR_SITE_SPEED,
    ];

    pub fn new(deps: &HandlerDeps) -> Self {
        Self {
            orchestrator: deps.orchestrator.clone(),
        }
    }

    async fn apply<F>(&self, mutate: F) -> Result<Value, ReadoutError>
    where
        F: FnOnce(&mut SpeedSetting) -> Result<bool, ReadoutError>,
    {
        let SpeedUpdate { changed, current } = self.orchestrator.update_speed(mutate).await?;
        to_data(&SpeedResponse {
            speed: current,
            changed,
        })
    }
}

#[async_trait]
impl CommandHandler for SpeedHandler {
    async fn handle(&self, message: Message, source: SourceContext) -> Result<Value, ReadoutError> {
        match message.kind.as_str() {
            message_types::SET_SPEED => {
                let SpeedValuePayload { value } = message.parse_payload()?;
                self.apply(|s| Ok(s.set(value))).await
            }
            message_types::ADJUST_SPEED => {
                let SpeedDeltaPayload { delta } = message.parse_payload()?;
                self.apply(|s| Ok(s.adjust(delta))).await
            }
            message_types::INCREMENT_SPEED => self.apply(|s| Ok(s.increment())).await,
            message_types::DECREMENT_SPEED => self.apply(|s| Ok(s.decrement())).await,
            message_types::SELECT_SPEED_PRESET => {
                let PresetIndexPayload { index } = message.parse_payload()?;
                self.apply(|s| s.select_preset(index)).await
            }
            message_types::SET_SITE_SPEED => {
                let SiteSpeedPayload { origin, value } = message.parse_payload()?;
                let origin = site_origin(origin, &source)?;
                self.apply(|s| Ok(s.set_for_origin(&origin, value))).await
            }
            message_types::CLEAR_SITE_SPEED => {
                let ClearSitePayload { origin } = message.parse_payload()?;
                let origin = site_origin(origin, &source)?;
                self.apply(|s| Ok(s.clear_origin(&origin))).await
            }
            other => Err(unexpected(other)),
        }
    }
}

pub struct VolumeHandler {
    orchestrator: SessionOrchestrator,
}

impl VolumeHandler {
    pub const KINDS: &'static [&'static str] = &[
        message_types::SET_VOLUME,
        message_types::ADJUST_VOLUME,
        message_types::MUTE,
        message_types::UNMUTE,
        message_types::TOGGLE_MUTE,
        message_types::APPLY_VOLUME_PRESET,
        message_types::SET_SITE_VOLUME,
        message_types::CLEAR_SITE_VOLUME,
    ];

    pub fn new(deps: &HandlerDeps) -> Self {
        Self {
            orchestrator: deps.orchestrator.clone(),
        }
    }

    async fn apply<F>(&self, mutate: F, fade: bool) -> Result<Value, ReadoutError>
    where
        F: FnOnce(&mut VolumeSetting) -> Result<bool, ReadoutError>,
    {
        let VolumeUpdate {
            changed,
            after,
            is_muted,
            ..
        } = self.orchestrator.update_volume(mutate, fade).await?;
        to_data(&VolumeResponse {
            effective_volume: after,
            is_muted,
            changed,
        })
    }
}

#[async_trait]
impl CommandHandler for VolumeHandler {
    async fn handle(&self, message: Message, source: SourceContext) -> Result<Value, ReadoutError> {
        match message.kind.as_str() {
            message_types::SET_VOLUME => {
                let VolumeValuePayload { value } = message.parse_payload()?;
                self.apply(|v| Ok(v.set_volume(value)), false).await
            }
            message_types::ADJUST_VOLUME => {
                let VolumeDeltaPayload { delta } = message.parse_payload()?;
                self.apply(|v| Ok(v.adjust(delta)), false).await
            }
            message_types::MUTE => self.apply(|v| Ok(v.mute()), true).await,
            message_types::UNMUTE => self.apply(|v| Ok(v.unmute()), true).await,
            message_types::TOGGLE_MUTE => self.apply(|v| Ok(v.toggle_mute()), true).await,
            message_types::APPLY_VOLUME_PRESET => {
                let VolumePresetPayload { name } = message.parse_payload()?;
                self.apply(|v| v.apply_preset(&name), true).await
            }
            message_types::SET_SITE_VOLUME => {
                let SiteVolumePayload { origin, value } = message.parse_payload()?;
                let origin = site_origin(origin, &source)?;
                self.apply(|v| Ok(v.set_for_origin(&origin, value)), false)
                    .await
            }
            message_types::CLEAR_SITE_VOLUME => {
                let ClearSitePayload { origin } = message.parse_payload()?;
                let origin = site_origin(origin, &source)?;
                self.apply(|v| Ok(v.clear_origin(&origin)), false).await
            }
            other => Err(unexpected(other)),
        }
    }
}

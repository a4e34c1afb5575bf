use async_trait::async_trait;
use readout_core::protocol::{
    Ack, PauseResponse, StartSessionPayload, StartedResponse, StopSessionPayload, message_types,
    to_data,
};
use readout_core::{Message, ReadoutError, SourceContext, StopReason};
use serde_json::Value;

use super::{HandlerDeps, unexpected};
use crate::dispatcher::CommandHandler;
use crate::orchestrator::{SessionOrchestrator, StartRequest};

/// Session lifecycle commands.
pub struct SessionHandler {
    orchestrator: SessionOrchestrator,
}

impl SessionHandler {
    pub const KINDS: &'static [&'static str] = &[
        message_types::START_SESSION,
        message_types::STOP_SESSION,
        message_types::FORCE_STOP,
        message_types::PAUSE,
        message_types::RESUME,
        message_types::TOGGLE_PAUSE,
    ];

    pub fn new(deps: &HandlerDeps) -> Self {
        Self {
            orchestrator: deps.orchestrator.clone(),
        }
    }

    async fn start(&self, message: &Message, source: &SourceContext) -> Result<Value, ReadoutError> {
        let payload: StartSessionPayload = message.parse_payload()?;
        let tab_id = payload.tab_id.or(source.tab_id);
        // The sender's page URL only describes the target when it is the sender.
        let url = source
            .url
            .clone()
            .filter(|_| tab_id.is_some() && tab_id == source.tab_id);
        let snapshot = self
            .orchestrator
            .start(StartRequest {
                text: payload.text,
                voice: payload.voice,
                tab_id,
                url,
            })
            .await?;
        match (snapshot.session_id, snapshot.current_tab_id) {
            (Some(session_id), Some(tab_id)) => to_data(&StartedResponse { session_id, tab_id }),
            _ => Err(ReadoutError::Internal(
                "session ended while starting".into(),
            )),
        }
    }

    async fn stop(&self, message: &Message) -> Result<Value, ReadoutError> {
        let payload: StopSessionPayload = message.parse_payload()?;
        let reason = StopReason::from_label(payload.reason.as_deref());
        if payload.force {
            self.orchestrator.force_cleanup(reason).await;
            return to_data(&Ack::YES);
        }
        let acknowledged = self.orchestrator.stop(reason).await;
        to_data(&Ack { acknowledged })
    }
}

#[async_trait]
impl CommandHandler for SessionHandler {
    async fn handle(&self, message: Message, source: SourceContext) -> Result<Value, ReadoutError> {
        match message.kind.as_str() {
            message_types::START_SESSION => self.start(&message, &source).await,
            message_types::STOP_SESSION => self.stop(&message).await,
            message_types::FORCE_STOP => to_data(&self.orchestrator.force_stop(source.tab_id).await),
            message_types::PAUSE => to_data(&PauseResponse {
                is_paused: self.orchestrator.pause().await?,
            }),
            message_types::RESUME => to_data(&PauseResponse {
                is_paused: self.orchestrator.resume().await?,
            }),
            message_types::TOGGLE_PAUSE => to_data(&PauseResponse {
                is_paused: self.orchestrator.toggle_pause().await?,
            }),
            other => Err(unexpected(other)),
        }
    }
}

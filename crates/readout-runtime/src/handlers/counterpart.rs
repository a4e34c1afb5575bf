//! Reports from tab counterparts.
//!
//! These require a sender tab; the payload cannot override it.

use std::sync::Arc;

use async_trait::async_trait;
use readout_core::protocol::{
    Ack, BoundaryPayload, RemoteErrorPayload, RemoteStatePayload, message_types, to_data,
};
use readout_core::{Message, ReadoutError, SourceContext};
use serde_json::Value;

use super::{HandlerDeps, unexpected};
use crate::dispatcher::CommandHandler;
use crate::orchestrator::SessionOrchestrator;
use crate::recovery::RecoveryMonitor;

pub struct CounterpartHandler {
    orchestrator: SessionOrchestrator,
    recovery: Arc<RecoveryMonitor>,
}

impl CounterpartHandler {
    pub const KINDS: &'static [&'static str] = &[
        message_types::SESSION_STATE_CHANGED,
        message_types::SPEECH_BOUNDARY,
        message_types::SPEECH_ERROR,
        message_types::COUNTERPART_READY,
        message_types::PING,
    ];

    pub fn new(deps: &HandlerDeps) -> Self {
        Self {
            orchestrator: deps.orchestrator.clone(),
            recovery: Arc::clone(&deps.recovery),
        }
    }
}

#[async_trait]
impl CommandHandler for CounterpartHandler {
    async fn handle(&self, message: Message, source: SourceContext) -> Result<Value, ReadoutError> {
        let tab_id = source
            .tab_id
            .ok_or_else(|| ReadoutError::invalid("counterpart message without a sender tab"))?;

        match message.kind.as_str() {
            message_types::SESSION_STATE_CHANGED => {
                let payload: RemoteStatePayload = message.parse_payload()?;
                self.orchestrator
                    .on_remote_state_changed(payload.state, tab_id, payload.session_id)
                    .await;
            }
            message_types::SPEECH_BOUNDARY => {
                let payload: BoundaryPayload = message.parse_payload()?;
                self.orchestrator
                    .on_boundary(payload.boundary, tab_id, payload.session_id);
            }
            message_types::SPEECH_ERROR => {
                let payload: RemoteErrorPayload = message.parse_payload()?;
                self.orchestrator.on_remote_error(payload, tab_id).await;
            }
            message_types::COUNTERPART_READY => self.recovery.register(tab_id, source.url),
            message_types::PING => self.recovery.record_contact(tab_id, source.url),
            other => return Err(unexpected(other)),
        }
        to_data(&Ack::YES)
    }
}

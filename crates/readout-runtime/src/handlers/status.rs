use async_trait::async_trait;
use readout_core::protocol::{message_types, to_data};
use readout_core::{Message, ReadoutError, SourceContext};
use serde_json::Value;

use super::{HandlerDeps, unexpected};
use crate::dispatcher::CommandHandler;
use crate::orchestrator::SessionOrchestrator;

pub struct StatusHandler {
    orchestrator: SessionOrchestrator,
}

impl StatusHandler {
    pub const KINDS: &'static [&'static str] = &[message_types::GET_STATUS];

    pub fn new(deps: &HandlerDeps) -> Self {
        Self {
            orchestrator: deps.orchestrator.clone(),
        }
    }
}

#[async_trait]
impl CommandHandler for StatusHandler {
    async fn handle(&self, message: Message, _source: SourceContext) -> Result<Value, ReadoutError> {
        match message.kind.as_str() {
            message_types::GET_STATUS => to_data(&self.orchestrator.status()),
            other => Err(unexpected(other)),
        }
    }
}

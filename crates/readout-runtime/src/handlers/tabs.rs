use std::sync::Arc;

use async_trait::async_trait;
use readout_core::protocol::{Ack, TabPayload, message_types, to_data};
use readout_core::{Message, ReadoutError, SourceContext};
use serde_json::Value;

use super::{HandlerDeps, target_tab, unexpected};
use crate::dispatcher::CommandHandler;
use crate::orchestrator::SessionOrchestrator;
use crate::recovery::RecoveryMonitor;
use crate::selection::SelectionTracker;

/// Host tab lifecycle events.
pub struct TabHandler {
    orchestrator: SessionOrchestrator,
    selection: Arc<SelectionTracker>,
    recovery: Arc<RecoveryMonitor>,
}

impl TabHandler {
    pub const KINDS: &'static [&'static str] = &[
        message_types::TAB_ACTIVATED,
        message_types::TAB_NAVIGATING,
        message_types::TAB_REMOVED,
    ];

    pub fn new(deps: &HandlerDeps) -> Self {
        Self {
            orchestrator: deps.orchestrator.clone(),
            selection: Arc::clone(&deps.selection),
            recovery: Arc::clone(&deps.recovery),
        }
    }
}

#[async_trait]
impl CommandHandler for TabHandler {
    async fn handle(&self, message: Message, source: SourceContext) -> Result<Value, ReadoutError> {
        let payload: TabPayload = message.parse_payload()?;
        let tab_id = target_tab(payload.tab_id, &source)?;

        match message.kind.as_str() {
            message_types::TAB_ACTIVATED => self.selection.on_tab_activated(tab_id),
            message_types::TAB_NAVIGATING => {
                self.selection.on_navigation(tab_id);
                self.recovery.on_navigation(tab_id);
                self.orchestrator.on_tab_navigated(tab_id).await;
            }
            message_types::TAB_REMOVED => {
                self.selection.on_navigation(tab_id);
                self.recovery.on_tab_removed(tab_id);
                self.orchestrator.on_tab_removed(tab_id).await;
            }
            other => return Err(unexpected(other)),
        }
        to_data(&Ack::YES)
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use readout_core::protocol::{Ack, SelectionPayload, TabPayload, message_types, to_data};
use readout_core::{Message, ReadoutError, Selection, SourceContext};
use serde_json::Value;

use super::{HandlerDeps, target_tab, unexpected};
use crate::dispatcher::CommandHandler;
use crate::selection::SelectionTracker;

/// Selection reports from counterparts.
pub struct SelectionHandler {
    selection: Arc<SelectionTracker>,
}

impl SelectionHandler {
    pub const KINDS: &'static [&'static str] = &[
        message_types::SELECTION_CHANGED,
        message_types::SELECTION_CLEARED,
    ];

    pub fn new(deps: &HandlerDeps) -> Self {
        Self {
            selection: Arc::clone(&deps.selection),
        }
    }
}

#[async_trait]
impl CommandHandler for SelectionHandler {
    async fn handle(&self, message: Message, source: SourceContext) -> Result<Value, ReadoutError> {
        match message.kind.as_str() {
            message_types::SELECTION_CHANGED => {
                let payload: SelectionPayload = message.parse_payload()?;
                let tab_id = target_tab(payload.tab_id, &source)?;
                let url = payload.url.or(source.url);
                self.selection
                    .update(Selection::new(payload.text, url, payload.title, tab_id));
            }
            message_types::SELECTION_CLEARED => {
                let payload: TabPayload = message.parse_payload()?;
                match payload.tab_id.or(source.tab_id) {
                    Some(tab_id) => self.selection.on_navigation(tab_id),
                    None => self.selection.clear(),
                }
            }
            other => return Err(unexpected(other)),
        }
        to_data(&Ack::YES)
    }
}

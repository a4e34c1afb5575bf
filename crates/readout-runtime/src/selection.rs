//! Selection tracker.
//!
//! Holds the most recent selection and the tab it came from. A selection is
//! only meaningful while its tab stays focused on the same page, so tab
//! switches and navigations invalidate it.

use std::sync::{Arc, PoisonError, RwLock};

use readout_core::{AppEvent, AppEventEmitter, Selection, TabId};
use tracing::debug;

pub struct SelectionTracker {
    current: RwLock<Option<Selection>>,
    emitter: Arc<dyn AppEventEmitter>,
}

impl SelectionTracker {
    pub fn new(emitter: Arc<dyn AppEventEmitter>) -> Self {
        Self {
            current: RwLock::new(None),
            emitter,
        }
    }

    /// Latest selection, if any.
    pub fn current(&self) -> Option<Selection> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_selection(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Replace the selection. Whitespace-only text clears it instead.
    pub fn update(&self, selection: Selection) {
        if !selection.has_text() {
            self.clear_where(|s| s.tab_id == selection.tab_id);
            return;
        }
        let tab_id = selection.tab_id;
        debug!(%tab_id, chars = selection.text.chars().count(), "Selection updated");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(selection);
        self.emitter.emit(AppEvent::SelectionChanged {
            present: true,
            tab_id: Some(tab_id),
        });
    }

    /// Drop the selection unconditionally.
    pub fn clear(&self) {
        self.clear_where(|_| true);
    }

    /// Another tab got focus: a selection from any other tab is stale.
    pub fn on_tab_activated(&self, tab_id: TabId) {
        self.clear_where(|s| s.tab_id != tab_id);
    }

    /// A tab started loading a new page: its selection is gone.
    pub fn on_navigation(&self, tab_id: TabId) {
        self.clear_where(|s| s.tab_id == tab_id);
    }

    fn clear_where(&self, predicate: impl FnOnce(&Selection) -> bool) {
        let removed = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            match current.as_ref() {
                Some(selection) if predicate(selection) => current.take(),
                _ => None,
            }
        };
        if let Some(removed) = removed {
            debug!(tab_id = %removed.tab_id, "Selection cleared");
            self.emitter.emit(AppEvent::SelectionChanged {
                present: false,
                tab_id: Some(removed.tab_id),
            });
        }
    }
}

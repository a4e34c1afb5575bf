//! Simulated host adapters.
//!
//! Instead of a browser, each port writes what it was asked to do to the
//! output sink. Tab reachability is controlled from the command line so
//! recovery paths can be exercised by hand.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use readout_core::ports::MenuSurfaceError;
use readout_core::{
    ChannelError, CounterpartPort, Instruction, MenuSurface, Notification, Notifier, Severity,
    TabId,
};
use tracing::{debug, error, info, warn};

use crate::output::{LineSink, OutputLine, emit};

// ── Counterpart ──────────────────────────────────────────────────────────────

/// Counterpart that acknowledges everything except on offline or restricted
/// tabs.
pub struct SimulatedCounterpart {
    sink: Arc<dyn LineSink>,
    offline: Mutex<HashSet<TabId>>,
    restricted: HashSet<TabId>,
}

impl SimulatedCounterpart {
    pub fn new(
        sink: Arc<dyn LineSink>,
        offline: impl IntoIterator<Item = TabId>,
        restricted: impl IntoIterator<Item = TabId>,
    ) -> Self {
        Self {
            sink,
            offline: Mutex::new(offline.into_iter().collect()),
            restricted: restricted.into_iter().collect(),
        }
    }

    pub fn is_offline(&self, tab_id: TabId) -> bool {
        self.offline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&tab_id)
    }

    fn check_reachable(&self, tab_id: TabId) -> Result<(), ChannelError> {
        if self.restricted.contains(&tab_id) {
            return Err(ChannelError::Restricted(format!("tab {tab_id} is a browser page")));
        }
        if self.is_offline(tab_id) {
            return Err(ChannelError::Unreachable(format!("tab {tab_id} did not answer")));
        }
        Ok(())
    }
}

#[async_trait]
impl CounterpartPort for SimulatedCounterpart {
    async fn send(&self, tab_id: TabId, instruction: Instruction) -> Result<(), ChannelError> {
        self.check_reachable(tab_id)?;
        emit(
            self.sink.as_ref(),
            &OutputLine::Instruction {
                tab_id,
                instruction: &instruction,
            },
        );
        Ok(())
    }

    async fn probe(&self, tab_id: TabId) -> Result<(), ChannelError> {
        let result = self.check_reachable(tab_id);
        debug!(%tab_id, ok = result.is_ok(), "Probe");
        result
    }

    async fn reinstall(&self, tab_id: TabId) -> Result<(), ChannelError> {
        if self.restricted.contains(&tab_id) {
            return Err(ChannelError::Restricted(format!("tab {tab_id} is a browser page")));
        }
        let healed = self
            .offline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&tab_id);
        info!(%tab_id, healed, "Counterpart reinstalled");
        Ok(())
    }
}

// ── Menu ─────────────────────────────────────────────────────────────────────

/// Prints menu changes.
pub struct SinkMenu {
    sink: Arc<dyn LineSink>,
}

impl SinkMenu {
    pub fn new(sink: Arc<dyn LineSink>) -> Self {
        Self { sink }
    }
}

impl MenuSurface for SinkMenu {
    fn set_enabled(&self, item: &str, enabled: bool) -> Result<(), MenuSurfaceError> {
        emit(
            self.sink.as_ref(),
            &OutputLine::Menu {
                item,
                enabled: Some(enabled),
                title: None,
            },
        );
        Ok(())
    }

    fn set_title(&self, item: &str, title: &str) -> Result<(), MenuSurfaceError> {
        emit(
            self.sink.as_ref(),
            &OutputLine::Menu {
                item,
                enabled: None,
                title: Some(title),
            },
        );
        Ok(())
    }
}

// ── Notifier ─────────────────────────────────────────────────────────────────

/// Logs notifications and prints them.
pub struct SinkNotifier {
    sink: Arc<dyn LineSink>,
}

impl SinkNotifier {
    pub fn new(sink: Arc<dyn LineSink>) -> Self {
        Self { sink }
    }
}

impl Notifier for SinkNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Error => error!(title = %notification.title, "{}", notification.message),
            Severity::Warning => warn!(title = %notification.title, "{}", notification.message),
            Severity::Info => info!(title = %notification.title, "{}", notification.message),
        }
        emit(
            self.sink.as_ref(),
            &OutputLine::Notification {
                notification: &notification,
            },
        );
    }
}

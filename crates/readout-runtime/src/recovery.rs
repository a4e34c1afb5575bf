//! Recovery monitor.
//!
//! Keeps one [`TabLinkState`] per tab whose counterpart has registered and
//! periodically sweeps them. A tab is stale when nothing has been heard from
//! it for twice the sweep interval. Stale tabs go through:
//!
//! 1. a lightweight probe (answer → reconnected, retries reset);
//! 2. otherwise one reinstall of the counterpart (restricted pages fail fast
//!    as unrecoverable), a settle delay and a re-probe;
//! 3. after `max_retries` failed attempts the tab is abandoned.
//!
//! The monitor is policy-free about sessions: [`RecoveryMonitor::sweep`]
//! returns outcomes and the composition root decides what a lost tab means
//! for the running session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use readout_core::domain::is_restricted_url;
use readout_core::{
    AppEvent, AppEventEmitter, ErrorKind, Notification, Notifier, ReadoutConfig, RecoveryOutcome,
    TabId,
};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::link::CounterpartLink;

/// Recovery timings and limits.
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    pub stale_after: Duration,
    pub probe_timeout: Duration,
    pub reinject_settle: Duration,
    pub max_retries: u32,
    pub restricted_schemes: Vec<String>,
}

impl From<&ReadoutConfig> for RecoveryConfig {
    fn from(config: &ReadoutConfig) -> Self {
        Self {
            stale_after: config.stale_after(),
            probe_timeout: config.probe_timeout(),
            reinject_settle: config.reinject_settle(),
            max_retries: config.max_recovery_retries,
            restricted_schemes: config.restricted_schemes.clone(),
        }
    }
}

/// Link health of one tab.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabLinkState {
    pub tab_id: TabId,
    pub url: Option<String>,
    pub last_ping_time: DateTime<Utc>,
    pub is_connected: bool,
    pub retry_count: u32,
    #[serde(skip)]
    last_contact: Instant,
}

impl TabLinkState {
    fn new(tab_id: TabId, url: Option<String>) -> Self {
        Self {
            tab_id,
            url,
            last_ping_time: Utc::now(),
            is_connected: true,
            retry_count: 0,
            last_contact: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_ping_time = Utc::now();
        self.last_contact = Instant::now();
        self.is_connected = true;
        self.retry_count = 0;
    }

    fn is_stale(&self, now: Instant, stale_after: Duration) -> bool {
        now.saturating_duration_since(self.last_contact) > stale_after
    }
}

pub struct RecoveryMonitor {
    tabs: Mutex<HashMap<TabId, TabLinkState>>,
    link: CounterpartLink,
    emitter: Arc<dyn AppEventEmitter>,
    notifier: Arc<dyn Notifier>,
    config: RecoveryConfig,
}

impl RecoveryMonitor {
    pub fn new(
        link: CounterpartLink,
        emitter: Arc<dyn AppEventEmitter>,
        notifier: Arc<dyn Notifier>,
        config: RecoveryConfig,
    ) -> Self {
        Self {
            tabs: Mutex::new(HashMap::new()),
            link,
            emitter,
            notifier,
            config,
        }
    }

    fn tabs(&self) -> std::sync::MutexGuard<'_, HashMap<TabId, TabLinkState>> {
        self.tabs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A counterpart announced itself.
    pub fn register(&self, tab_id: TabId, url: Option<String>) {
        let mut tabs = self.tabs();
        let state = tabs
            .entry(tab_id)
            .or_insert_with(|| TabLinkState::new(tab_id, None));
        state.touch();
        if url.is_some() {
            state.url = url;
        }
        info!(%tab_id, tracked = tabs.len(), "Counterpart registered");
    }

    /// Any inbound message from a tab proves its counterpart alive.
    pub fn record_contact(&self, tab_id: TabId, url: Option<String>) {
        let mut tabs = self.tabs();
        let state = tabs
            .entry(tab_id)
            .or_insert_with(|| TabLinkState::new(tab_id, None));
        state.touch();
        if url.is_some() {
            state.url = url;
        }
    }

    /// Navigation start: the counterpart is about to be destroyed.
    pub fn on_navigation(&self, tab_id: TabId) {
        if self.tabs().remove(&tab_id).is_some() {
            debug!(%tab_id, "Dropped link state on navigation");
        }
    }

    pub fn on_tab_removed(&self, tab_id: TabId) {
        if self.tabs().remove(&tab_id).is_some() {
            debug!(%tab_id, "Dropped link state on tab removal");
        }
    }

    pub fn state(&self, tab_id: TabId) -> Option<TabLinkState> {
        self.tabs().get(&tab_id).cloned()
    }

    pub fn tracked_tabs(&self) -> Vec<TabId> {
        let mut ids: Vec<TabId> = self.tabs().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Run one health sweep over all stale tabs.
    pub async fn sweep(&self) -> Vec<(TabId, RecoveryOutcome)> {
        let now = Instant::now();
        let stale: Vec<TabId> = {
            let tabs = self.tabs();
            let mut stale: Vec<TabId> = tabs
                .values()
                .filter(|s| s.is_stale(now, self.config.stale_after))
                .map(|s| s.tab_id)
                .collect();
            stale.sort_unstable();
            stale
        };
        if !stale.is_empty() {
            debug!(count = stale.len(), "Sweeping stale tabs");
        }

        let mut outcomes = Vec::with_capacity(stale.len());
        for tab_id in stale {
            if let Some(outcome) = self.recover(tab_id).await {
                self.report(tab_id, &outcome);
                outcomes.push((tab_id, outcome));
            }
        }
        outcomes
    }

    /// One recovery attempt. `None` when the tab vanished meanwhile.
    async fn recover(&self, tab_id: TabId) -> Option<RecoveryOutcome> {
        let url = self.tabs().get(&tab_id)?.url.clone();

        if self
            .link
            .probe(tab_id, self.config.probe_timeout)
            .await
            .is_ok()
        {
            self.tabs().get_mut(&tab_id)?.touch();
            return Some(RecoveryOutcome::Reconnected);
        }

        if let Some(url) = url
            .as_deref()
            .filter(|u| is_restricted_url(u, &self.config.restricted_schemes))
        {
            self.tabs().remove(&tab_id);
            return Some(RecoveryOutcome::Unrecoverable {
                reason: format!("restricted page {url}"),
            });
        }

        match self.link.reinstall(tab_id).await {
            Err(e) if e.kind() == ErrorKind::Unrecoverable => {
                self.tabs().remove(&tab_id);
                return Some(RecoveryOutcome::Unrecoverable {
                    reason: e.to_string(),
                });
            }
            Err(e) => debug!(%tab_id, error = %e, "Counterpart reinstall failed"),
            Ok(()) => debug!(%tab_id, "Counterpart reinstalled, waiting to settle"),
        }
        tokio::time::sleep(self.config.reinject_settle).await;

        let reprobe = self.link.probe(tab_id, self.config.probe_timeout).await;
        let mut tabs = self.tabs();
        let state = tabs.get_mut(&tab_id)?;
        if reprobe.is_ok() {
            state.touch();
            return Some(RecoveryOutcome::Reinjected);
        }

        state.is_connected = false;
        state.retry_count += 1;
        let attempts = state.retry_count;
        if attempts >= self.config.max_retries {
            tabs.remove(&tab_id);
            Some(RecoveryOutcome::Abandoned { attempts })
        } else {
            Some(RecoveryOutcome::Retrying { attempt: attempts })
        }
    }

    fn report(&self, tab_id: TabId, outcome: &RecoveryOutcome) {
        match outcome {
            RecoveryOutcome::Reconnected | RecoveryOutcome::Reinjected => {
                info!(%tab_id, ?outcome, "Tab link recovered");
            }
            RecoveryOutcome::Retrying { attempt } => {
                warn!(%tab_id, attempt, "Tab still unreachable");
            }
            RecoveryOutcome::Abandoned { attempts } => {
                warn!(%tab_id, attempts, "Giving up on unreachable tab");
                self.notifier.notify(Notification::warning(
                    "Reading stopped",
                    "The page stopped responding. Reload it to continue reading.",
                ));
            }
            RecoveryOutcome::Unrecoverable { reason } => {
                warn!(%tab_id, %reason, "Tab cannot host the reader");
                self.notifier.notify(Notification::error(
                    "Reading unavailable",
                    "This page does not allow the reader to run.",
                ));
            }
        }
        self.emitter.emit(AppEvent::TabRecovery {
            tab_id,
            outcome: outcome.clone(),
        });
    }
}

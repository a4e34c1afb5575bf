//! Reports from the counterpart and the tab host.
//!
//! Counterpart reports are checked against the current session: a report
//! for another tab or an older session id is stale and dropped.

use readout_core::protocol::RemoteErrorPayload;
use readout_core::{
    AppEvent, BoundaryEvent, ReadoutError, RemoteState, SessionId, StopReason, TabId,
};
use tracing::{debug, warn};

use super::SessionOrchestrator;

impl SessionOrchestrator {
    /// The session a counterpart report refers to, if it is current.
    fn current_for(&self, tab_id: TabId, session_id: Option<SessionId>) -> Option<SessionId> {
        let (current_id, current_tab) = self.state().current()?;
        if current_tab != tab_id || session_id.is_some_and(|id| id != current_id) {
            return None;
        }
        Some(current_id)
    }

    /// The counterpart reported an engine state change.
    pub async fn on_remote_state_changed(
        &self,
        remote: RemoteState,
        tab_id: TabId,
        session_id: Option<SessionId>,
    ) {
        let _op = self.inner.op_lock.lock().await;
        let Some(current) = self.current_for(tab_id, session_id) else {
            debug!(%tab_id, ?session_id, ?remote, "Ignoring stale state report");
            return;
        };
        match remote {
            RemoteState::Speaking => self.apply_pause_state(current, false),
            RemoteState::Paused => self.apply_pause_state(current, true),
            RemoteState::Ended | RemoteState::Idle => self.cleanup(StopReason::Finished),
            RemoteState::Error => {
                let err = ReadoutError::EngineFailure("speech engine reported an error".into());
                self.report_error(&err, Some(current));
                self.fail_session_locked(&err, current).await;
            }
        }
    }

    /// The counterpart reported an engine error.
    ///
    /// Interruptions are the engine acknowledging our own stop or replace
    /// and are not failures.
    pub async fn on_remote_error(&self, payload: RemoteErrorPayload, tab_id: TabId) {
        if payload.is_interruption() {
            debug!(%tab_id, error = %payload.error, "Ignoring engine interruption");
            return;
        }
        let _op = self.inner.op_lock.lock().await;
        let Some(current) = self.current_for(tab_id, payload.session_id) else {
            debug!(%tab_id, error = %payload.error, "Ignoring error for stale session");
            return;
        };
        let detail = payload
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| payload.error.clone());
        let err = ReadoutError::EngineFailure(detail);
        self.report_error(&err, Some(current));
        self.fail_session_locked(&err, current).await;
    }

    /// A word or sentence boundary was reached.
    pub fn on_boundary(&self, boundary: BoundaryEvent, tab_id: TabId, session_id: Option<SessionId>) {
        let Some(current) = self.current_for(tab_id, session_id) else {
            return;
        };
        if let Some(progress) = self.inner.deps.progress.update_progress(current, boundary) {
            self.inner.deps.emitter.emit(AppEvent::ProgressUpdated {
                session_id: current,
                progress,
            });
        }
    }

    // ── Tab lifecycle ────────────────────────────────────────────────────────

    pub async fn on_tab_removed(&self, tab_id: TabId) {
        self.end_for_tab(tab_id, StopReason::TabClosed).await;
    }

    pub async fn on_tab_navigated(&self, tab_id: TabId) {
        self.end_for_tab(tab_id, StopReason::Navigated).await;
    }

    /// Recovery gave up on a tab.
    pub async fn on_tab_unreachable(&self, tab_id: TabId) {
        let _op = self.inner.op_lock.lock().await;
        let Some((session_id, current_tab)) = self.state().current() else {
            return;
        };
        if current_tab != tab_id {
            return;
        }
        warn!(%session_id, %tab_id, "Ending session on unreachable tab");
        self.report_error(
            &ReadoutError::CommunicationFailure(format!("tab {tab_id} is unreachable")),
            Some(session_id),
        );
        self.cleanup(StopReason::Unreachable);
    }

    /// The tab is gone or its page is; the counterpart cannot be told.
    async fn end_for_tab(&self, tab_id: TabId, reason: StopReason) {
        let _op = self.inner.op_lock.lock().await;
        if self.current_tab() == Some(tab_id) {
            debug!(%tab_id, ?reason, "Session tab went away");
            self.cleanup(reason);
        }
    }
}

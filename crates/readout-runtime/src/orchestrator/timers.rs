//! Per-session background timers.
//!
//! One task per session drives both the auto-stop ceiling and the progress
//! ticker. It holds only a weak reference to the orchestrator and exits when
//! the session token is cancelled by cleanup.

use std::sync::Arc;

use readout_core::{AppEvent, SessionId, StopReason};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::SessionOrchestrator;

impl SessionOrchestrator {
    pub(super) fn spawn_session_timers(&self, session_id: SessionId, token: CancellationToken) {
        let weak = Arc::downgrade(&self.inner);
        let max_duration = self.inner.config.max_session_duration;
        let tick = self.inner.config.progress_tick;

        tokio::spawn(async move {
            let auto_stop = tokio::time::sleep(max_duration);
            tokio::pin!(auto_stop);
            let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    () = &mut auto_stop => {
                        if let Some(inner) = weak.upgrade() {
                            SessionOrchestrator { inner }.auto_stop(session_id).await;
                        }
                        break;
                    }
                    _ = ticker.tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        if let Some(progress) = inner.deps.progress.tick() {
                            inner.deps.emitter.emit(AppEvent::ProgressUpdated {
                                session_id,
                                progress,
                            });
                        }
                    }
                }
            }
            debug!(%session_id, "Session timers finished");
        });
    }

    async fn auto_stop(&self, session_id: SessionId) {
        let _op = self.inner.op_lock.lock().await;
        if self.state().current().map(|(id, _)| id) != Some(session_id) {
            return;
        }
        info!(%session_id, limit = ?self.inner.config.max_session_duration, "Session hit its duration limit");
        self.stop_locked(StopReason::Timeout).await;
    }
}

//! Session orchestrator.
//!
//! Owns the single speech session and drives it through
//! `Idle → Starting → Speaking ⇄ Paused → Stopping → Idle`.
//!
//! # Locking discipline
//!
//! - `op_lock` (tokio mutex) serializes whole operations, including their
//!   counterpart round-trips. Commands already arrive one at a time through
//!   the dispatcher; the lock additionally orders them against background
//!   callers (auto-stop timer, recovery loop).
//! - `state` (std mutex) guards the session record. It is never held across
//!   an `.await`; events are emitted after it is released.
//!
//! Internal helpers with a `_locked` suffix expect `op_lock` to be held.

mod live;
mod remote;
mod timers;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use readout_core::protocol::StatusResponse;
use readout_core::{
    AppEvent, AppEventEmitter, Instruction, Notification, Notifier, ReadoutConfig, ReadoutError,
    Session, SessionId, SessionSnapshot, SessionState, StopReason, TabId, origin_of,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::link::CounterpartLink;
use crate::preferences::{FadeRunner, SpeedService, VolumeService};
use crate::progress::ProgressTracker;
use crate::selection::SelectionTracker;

/// Orchestrator timings and limits.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub restart_grace: Duration,
    pub max_session_duration: Duration,
    pub max_text_chars: usize,
    pub max_force_stop_attempts: u32,
    pub progress_tick: Duration,
}

impl From<&ReadoutConfig> for OrchestratorConfig {
    fn from(config: &ReadoutConfig) -> Self {
        Self {
            restart_grace: config.restart_grace(),
            max_session_duration: config.max_session_duration(),
            max_text_chars: config.max_text_chars,
            max_force_stop_attempts: config.max_force_stop_attempts,
            progress_tick: config.progress_tick(),
        }
    }
}

/// Collaborators injected by the composition root.
#[derive(Clone)]
pub struct OrchestratorDeps {
    pub link: CounterpartLink,
    pub speed: Arc<SpeedService>,
    pub volume: Arc<VolumeService>,
    pub selection: Arc<SelectionTracker>,
    pub progress: Arc<ProgressTracker>,
    pub emitter: Arc<dyn AppEventEmitter>,
    pub notifier: Arc<dyn Notifier>,
}

/// What to speak. Missing fields are resolved from the current selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartRequest {
    pub text: Option<String>,
    pub voice: Option<String>,
    pub tab_id: Option<TabId>,
    /// Page URL of the target tab, for per-site preferences.
    pub url: Option<String>,
}

/// Result of a force stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceStopOutcome {
    pub acknowledged: bool,
    /// Consecutive unacknowledged force stops, after this one.
    pub attempts: u32,
}

#[derive(Debug, Default)]
struct State {
    phase: SessionState,
    session: Option<Session>,
    last_id: Option<SessionId>,
    force_stop_attempts: u32,
    /// Cancels the auto-stop timer and progress ticker of the live session.
    session_token: Option<CancellationToken>,
}

impl State {
    fn snapshot(&self) -> SessionSnapshot {
        self.session.as_ref().map_or_else(
            || SessionSnapshot::idle(self.force_stop_attempts),
            |s| SessionSnapshot::of(s, self.phase, self.force_stop_attempts),
        )
    }

    /// Move to `to` if the edge is legal, returning the transition event.
    fn transition(&mut self, to: SessionState, reason: Option<StopReason>) -> Option<AppEvent> {
        let from = self.phase;
        if from == to {
            return None;
        }
        if !from.can_transition_to(to) {
            warn!(%from, %to, "Ignoring illegal session transition");
            return None;
        }
        self.phase = to;
        debug!(%from, %to, ?reason, "Session transition");
        Some(AppEvent::SessionTransition {
            from,
            to,
            session: self.snapshot(),
            reason,
        })
    }

    fn current(&self) -> Option<(SessionId, TabId)> {
        self.session.as_ref().map(|s| (s.id, s.tab_id))
    }
}

struct Inner {
    deps: OrchestratorDeps,
    config: OrchestratorConfig,
    fade: FadeRunner,
    op_lock: tokio::sync::Mutex<()>,
    state: Mutex<State>,
}

/// Cheaply cloneable handle to the orchestrator.
#[derive(Clone)]
pub struct SessionOrchestrator {
    inner: Arc<Inner>,
}

fn stop_reason_for(err: &ReadoutError) -> StopReason {
    if err.is_communication() {
        StopReason::Unreachable
    } else {
        StopReason::EngineFailure
    }
}

impl SessionOrchestrator {
    pub fn new(deps: OrchestratorDeps, config: OrchestratorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                deps,
                config,
                fade: FadeRunner::new(),
                op_lock: tokio::sync::Mutex::new(()),
                state: Mutex::new(State::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: Option<AppEvent>) {
        if let Some(event) = event {
            self.inner.deps.emitter.emit(event);
        }
    }

    // ── Read-only accessors ──────────────────────────────────────────────────

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state().snapshot()
    }

    pub fn phase(&self) -> SessionState {
        self.state().phase
    }

    pub fn is_active(&self) -> bool {
        self.state().session.is_some()
    }

    /// Active and not paused.
    pub fn is_playing(&self) -> bool {
        self.snapshot().is_playing()
    }

    pub fn current_tab(&self) -> Option<TabId> {
        self.state().session.as_ref().map(|s| s.tab_id)
    }

    /// Everything a UI needs in one read.
    pub fn status(&self) -> StatusResponse {
        let session = self.snapshot();
        let origin = self
            .state()
            .session
            .as_ref()
            .and_then(|s| s.origin.clone());
        let deps = &self.inner.deps;
        StatusResponse {
            is_playing: session.is_playing(),
            session,
            selection_present: deps.selection.has_selection(),
            speed: deps.speed.effective_for(origin.as_deref()),
            effective_volume: deps.volume.effective_for(origin.as_deref()),
            is_muted: deps.volume.is_muted(),
            progress: deps.progress.snapshot(),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Start speaking, replacing any active session.
    pub async fn start(&self, request: StartRequest) -> Result<SessionSnapshot, ReadoutError> {
        let _op = self.inner.op_lock.lock().await;
        let (text, tab_id, url) = self.resolve_start(request.text, request.tab_id, request.url)?;

        if self.is_active() {
            info!("Replacing active session");
            self.stop_locked(StopReason::Replaced).await;
            tokio::time::sleep(self.inner.config.restart_grace).await;
        }

        let deps = &self.inner.deps;
        let origin = url.as_deref().and_then(origin_of);
        let rate = deps.speed.effective_for(origin.as_deref());
        let volume = deps.volume.effective_for(origin.as_deref());
        if let Some(origin) = origin.as_deref() {
            deps.speed.touch_origin(origin);
            deps.volume.touch_origin(origin);
        }

        // Timers are armed with the record: an aborted start must still auto-stop.
        let token = CancellationToken::new();
        let (session_id, event) = {
            let mut state = self.state();
            let session_id = state.last_id.map_or(SessionId(1), SessionId::next);
            state.last_id = Some(session_id);
            state.session_token = Some(token.clone());
            state.session = Some(Session {
                id: session_id,
                tab_id,
                origin,
                text: text.clone(),
                voice: request.voice.clone(),
                is_paused: false,
                started_at: Utc::now(),
            });
            (session_id, state.transition(SessionState::Starting, None))
        };
        deps.progress.start_tracking(session_id, &text, 0, rate);
        self.spawn_session_timers(session_id, token);
        self.emit(event);

        let instruction = Instruction::BeginSpeech {
            session_id,
            text: text.clone(),
            voice: request.voice,
            rate,
            volume,
        };
        if let Err(e) = deps.link.send(tab_id, instruction).await {
            warn!(%session_id, %tab_id, error = %e, "Failed to start speech");
            self.cleanup(stop_reason_for(&e));
            self.report_error(&e, Some(session_id));
            return Err(e);
        }

        let (snapshot, event) = {
            let mut state = self.state();
            let event = state.transition(SessionState::Speaking, None);
            (state.snapshot(), event)
        };
        self.emit(event);
        info!(%session_id, %tab_id, chars = text.chars().count(), rate, volume, "Session started");
        Ok(snapshot)
    }

    fn resolve_start(
        &self,
        text: Option<String>,
        tab_id: Option<TabId>,
        url: Option<String>,
    ) -> Result<(String, TabId, Option<String>), ReadoutError> {
        let selection = self.inner.deps.selection.current();
        let text = match text {
            Some(text) => text,
            None => selection
                .as_ref()
                .map(|s| s.text.clone())
                .ok_or(ReadoutError::NoSelection)?,
        };
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(ReadoutError::invalid("text is empty"));
        }
        let chars = text.chars().count();
        let limit = self.inner.config.max_text_chars;
        if chars > limit {
            return Err(ReadoutError::invalid(format!(
                "text is {chars} characters, the limit is {limit}"
            )));
        }

        let tab_id = tab_id
            .or_else(|| selection.as_ref().map(|s| s.tab_id))
            .ok_or_else(|| ReadoutError::invalid("no target tab"))?;
        let url = url.or_else(|| {
            selection
                .filter(|s| s.tab_id == tab_id)
                .and_then(|s| s.origin_url)
        });
        Ok((text, tab_id, url))
    }

    /// Stop the session. Idempotent.
    ///
    /// Returns whether the counterpart acknowledged; local state is cleaned
    /// up either way.
    pub async fn stop(&self, reason: StopReason) -> bool {
        let _op = self.inner.op_lock.lock().await;
        self.stop_locked(reason).await
    }

    async fn stop_locked(&self, reason: StopReason) -> bool {
        self.inner.fade.cancel();
        let (current, event) = {
            let mut state = self.state();
            let current = state.current();
            let event = current.and_then(|_| state.transition(SessionState::Stopping, None));
            (current, event)
        };
        self.emit(event);

        let acknowledged = match current {
            Some((session_id, tab_id)) => {
                match self.inner.deps.link.send(tab_id, Instruction::EndSpeech).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(%session_id, error = %e, "Stop not acknowledged, cleaning up locally");
                        false
                    }
                }
            }
            None => true,
        };
        self.cleanup(reason);
        acknowledged
    }

    /// Return to Idle without messaging the counterpart.
    pub async fn force_cleanup(&self, reason: StopReason) {
        let _op = self.inner.op_lock.lock().await;
        self.cleanup(reason);
    }

    /// Unconditional cleanup. Safe to call in any state.
    fn cleanup(&self, reason: StopReason) {
        self.inner.fade.cancel();
        let (ended, event) = {
            let mut state = self.state();
            if let Some(token) = state.session_token.take() {
                token.cancel();
            }
            // Drop the session first so the event carries the idle snapshot.
            let ended = state.session.take();
            (ended, state.transition(SessionState::Idle, Some(reason)))
        };
        self.inner.deps.progress.stop();
        if let Some(session) = ended {
            info!(session_id = %session.id, ?reason, "Session ended");
        }
        self.emit(event);
    }

    /// Escape hatch for a stuck engine.
    ///
    /// Always returns the orchestrator to Idle. Consecutive unacknowledged
    /// attempts are counted; past the configured bound the user is asked to
    /// intervene and the count starts over.
    pub async fn force_stop(&self, tab_hint: Option<TabId>) -> ForceStopOutcome {
        let _op = self.inner.op_lock.lock().await;
        let tab_id = self.current_tab().or(tab_hint);

        let acknowledged = match tab_id {
            Some(tab_id) => match self.inner.deps.link.send(tab_id, Instruction::ForceStop).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(%tab_id, error = %e, "Force stop not acknowledged");
                    false
                }
            },
            None => true,
        };
        self.cleanup(StopReason::ForceStop);

        let attempts = {
            let mut state = self.state();
            if acknowledged {
                state.force_stop_attempts = 0;
            } else {
                state.force_stop_attempts += 1;
            }
            state.force_stop_attempts
        };
        if attempts > self.inner.config.max_force_stop_attempts {
            warn!(attempts, "Force stop keeps failing, asking for manual intervention");
            self.inner.deps.notifier.notify(Notification::error(
                "Speech will not stop",
                "Reading could not be stopped. Close or reload the tab that is speaking.",
            ));
            self.state().force_stop_attempts = 0;
        }
        ForceStopOutcome {
            acknowledged,
            attempts,
        }
    }

    // ── Pause / resume ───────────────────────────────────────────────────────

    /// Pause playback. No session is a successful no-op. Returns `is_paused`.
    pub async fn pause(&self) -> Result<bool, ReadoutError> {
        let _op = self.inner.op_lock.lock().await;
        self.set_paused_locked(true).await
    }

    /// Resume playback. No session is a successful no-op. Returns `is_paused`.
    pub async fn resume(&self) -> Result<bool, ReadoutError> {
        let _op = self.inner.op_lock.lock().await;
        self.set_paused_locked(false).await
    }

    pub async fn toggle_pause(&self) -> Result<bool, ReadoutError> {
        let _op = self.inner.op_lock.lock().await;
        let paused = self.state().session.as_ref().is_some_and(|s| s.is_paused);
        self.set_paused_locked(!paused).await
    }

    async fn set_paused_locked(&self, paused: bool) -> Result<bool, ReadoutError> {
        let current = {
            let state = self.state();
            state.session.as_ref().map(|s| (s.id, s.tab_id, s.is_paused))
        };
        let Some((session_id, tab_id, is_paused)) = current else {
            return Ok(false);
        };
        if is_paused == paused {
            return Ok(is_paused);
        }

        let instruction = if paused {
            Instruction::PauseSpeech
        } else {
            Instruction::ResumeSpeech
        };
        if let Err(e) = self.inner.deps.link.send(tab_id, instruction).await {
            self.handle_instruction_error(&e, session_id).await;
            return Err(e);
        }
        self.apply_pause_state(session_id, paused);
        Ok(paused)
    }

    /// Flip the pause flag optimistically or from a counterpart report.
    fn apply_pause_state(&self, session_id: SessionId, paused: bool) {
        let event = {
            let mut state = self.state();
            match state.session.as_mut() {
                Some(session) if session.id == session_id => session.is_paused = paused,
                _ => return,
            }
            let to = if paused {
                SessionState::Paused
            } else {
                SessionState::Speaking
            };
            state.transition(to, None)
        };
        if paused {
            self.inner.deps.progress.pause();
        } else {
            self.inner.deps.progress.resume();
        }
        self.emit(event);
    }

    // ── Errors ───────────────────────────────────────────────────────────────

    fn report_error(&self, err: &ReadoutError, session_id: Option<SessionId>) {
        self.inner.deps.emitter.emit(AppEvent::ErrorReported {
            error: err.to_payload(),
            session_id,
        });
    }

    /// An instruction for a live session failed.
    ///
    /// Engine failures end the session. Communication failures are only
    /// reported: the recovery monitor decides whether the tab is lost.
    async fn handle_instruction_error(&self, err: &ReadoutError, session_id: SessionId) {
        self.report_error(err, Some(session_id));
        if err.is_communication() {
            warn!(%session_id, error = %err, "Counterpart unreachable");
            return;
        }
        self.fail_session_locked(err, session_id).await;
    }

    /// Best-effort force stop of the engine, then cleanup.
    async fn fail_session_locked(&self, err: &ReadoutError, session_id: SessionId) {
        let Some((current_id, tab_id)) = self.state().current() else {
            return;
        };
        if current_id != session_id {
            return;
        }
        warn!(%session_id, error = %err, "Ending session after engine failure");
        if let Err(e) = self.inner.deps.link.send(tab_id, Instruction::ForceStop).await {
            debug!(%session_id, error = %e, "Force stop after engine failure not acknowledged");
        }
        self.cleanup(stop_reason_for(err));
    }
}

impl std::fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

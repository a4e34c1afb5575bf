//! Shared fakes for the runtime integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use readout_core::ports::MenuSurfaceError;
use readout_core::{
    AppEvent, AppEventEmitter, ChannelError, CounterpartPort, Instruction, MenuSurface,
    NoopNotifier, Notification, Notifier, PreferenceStorage, SpeedSetting, StorageError, TabId,
    VolumeSetting,
};
use readout_runtime::preferences::{SpeedService, VolumeService};
use readout_runtime::{
    BroadcastEmitter, CounterpartLink, MemoryStorage, OrchestratorConfig, OrchestratorDeps,
    ProgressTracker, SelectionTracker, SessionOrchestrator,
};
use serde_json::Value;
use tokio::sync::broadcast;

// ── Counterpart ────────────────────────────────────────────────────

/// Records every instruction and answers probes from a flag.
#[derive(Default)]
pub struct FakeCounterpart {
    sent: Mutex<Vec<(TabId, Instruction)>>,
    send_errors: Mutex<HashMap<&'static str, ChannelError>>,
    hanging: AtomicBool,
    unreachable: AtomicBool,
    reachable_after_reinstall: AtomicBool,
    reinstall_error: Mutex<Option<ChannelError>>,
    probes: AtomicUsize,
    reinstalls: AtomicUsize,
}

impl FakeCounterpart {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<(TabId, Instruction)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_names(&self) -> Vec<&'static str> {
        self.sent().iter().map(|(_, i)| i.name()).collect()
    }

    pub fn last_sent(&self) -> Option<Instruction> {
        self.sent().pop().map(|(_, i)| i)
    }

    pub fn volumes_sent(&self) -> Vec<u8> {
        self.sent()
            .into_iter()
            .filter_map(|(_, i)| match i {
                Instruction::SetVolume { volume } => Some(volume),
                _ => None,
            })
            .collect()
    }

    pub fn clear_sent(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Make every `name` instruction fail with `error` until healed.
    pub fn fail(&self, name: &'static str, error: ChannelError) {
        self.send_errors.lock().unwrap().insert(name, error);
    }

    pub fn heal(&self, name: &'static str) {
        self.send_errors.lock().unwrap().remove(name);
    }

    /// Sends never resolve.
    pub fn set_hanging(&self, hanging: bool) {
        self.hanging.store(hanging, Ordering::SeqCst);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn set_reachable_after_reinstall(&self, reachable: bool) {
        self.reachable_after_reinstall
            .store(reachable, Ordering::SeqCst);
    }

    pub fn set_reinstall_error(&self, error: Option<ChannelError>) {
        *self.reinstall_error.lock().unwrap() = error;
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn reinstalls(&self) -> usize {
        self.reinstalls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CounterpartPort for FakeCounterpart {
    async fn send(&self, tab_id: TabId, instruction: Instruction) -> Result<(), ChannelError> {
        if self.hanging.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let error = self.send_errors.lock().unwrap().get(instruction.name()).cloned();
        self.sent.lock().unwrap().push((tab_id, instruction));
        error.map_or(Ok(()), Err)
    }

    async fn probe(&self, _tab_id: TabId) -> Result<(), ChannelError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            Err(ChannelError::Unreachable("no pong".into()))
        } else {
            Ok(())
        }
    }

    async fn reinstall(&self, _tab_id: TabId) -> Result<(), ChannelError> {
        self.reinstalls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.reinstall_error.lock().unwrap().clone() {
            return Err(error);
        }
        if self.reachable_after_reinstall.load(Ordering::SeqCst) {
            self.set_unreachable(false);
        }
        Ok(())
    }
}

// ── Storage ────────────────────────────────────────────────────────

/// Memory storage whose writes can be made to fail.
#[derive(Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    failing: AtomicBool,
}

impl FlakyStorage {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.get(key)
    }
}

#[async_trait]
impl PreferenceStorage for FlakyStorage {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.inner.load(key).await
    }

    async fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Io("disk full".into()));
        }
        self.inner.save(key, value).await
    }
}

// ── Menu ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeMenu {
    enabled: Mutex<HashMap<String, bool>>,
    titles: Mutex<HashMap<String, String>>,
}

impl FakeMenu {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn enabled(&self, item: &str) -> Option<bool> {
        self.enabled.lock().unwrap().get(item).copied()
    }

    pub fn title(&self, item: &str) -> Option<String> {
        self.titles.lock().unwrap().get(item).cloned()
    }
}

impl MenuSurface for FakeMenu {
    fn set_enabled(&self, item: &str, enabled: bool) -> Result<(), MenuSurfaceError> {
        self.enabled.lock().unwrap().insert(item.into(), enabled);
        Ok(())
    }

    fn set_title(&self, item: &str, title: &str) -> Result<(), MenuSurfaceError> {
        self.titles.lock().unwrap().insert(item.into(), title.into());
        Ok(())
    }
}

// ── Notifier ───────────────────────────────────────────────────────

mock! {
    pub Notifier {}

    impl Notifier for Notifier {
        fn notify(&self, notification: Notification);
    }
}

// ── Orchestrator harness ───────────────────────────────────────────

pub fn orchestrator_config() -> OrchestratorConfig {
    OrchestratorConfig {
        restart_grace: Duration::from_millis(150),
        max_session_duration: Duration::from_secs(60),
        max_text_chars: 1_000,
        max_force_stop_attempts: 3,
        progress_tick: Duration::from_secs(1),
    }
}

pub struct Harness {
    pub counterpart: Arc<FakeCounterpart>,
    pub emitter: Arc<BroadcastEmitter>,
    pub events: broadcast::Receiver<AppEvent>,
    pub storage: Arc<FlakyStorage>,
    pub selection: Arc<SelectionTracker>,
    pub speed: Arc<SpeedService>,
    pub volume: Arc<VolumeService>,
    pub progress: Arc<ProgressTracker>,
    pub orchestrator: SessionOrchestrator,
}

pub fn harness() -> Harness {
    harness_with(Arc::new(NoopNotifier), orchestrator_config())
}

pub fn harness_with(notifier: Arc<dyn Notifier>, config: OrchestratorConfig) -> Harness {
    let counterpart = FakeCounterpart::new();
    let emitter = Arc::new(BroadcastEmitter::default());
    let events = emitter.subscribe();
    let dyn_emitter: Arc<dyn AppEventEmitter> = emitter.clone();
    let storage = Arc::new(FlakyStorage::default());

    let speed = Arc::new(SpeedService::new(
        SpeedSetting::default(),
        storage.clone(),
        Arc::clone(&dyn_emitter),
    ));
    let volume = Arc::new(VolumeService::new(
        VolumeSetting::default(),
        storage.clone(),
        Arc::clone(&dyn_emitter),
        Duration::from_millis(300),
    ));
    let selection = Arc::new(SelectionTracker::new(Arc::clone(&dyn_emitter)));
    let progress = Arc::new(ProgressTracker::new());

    let orchestrator = SessionOrchestrator::new(
        OrchestratorDeps {
            link: CounterpartLink::new(counterpart.clone(), Duration::from_secs(3)),
            speed: Arc::clone(&speed),
            volume: Arc::clone(&volume),
            selection: Arc::clone(&selection),
            progress: Arc::clone(&progress),
            emitter: dyn_emitter,
            notifier,
        },
        config,
    );

    Harness {
        counterpart,
        emitter,
        events,
        storage,
        selection,
        speed,
        volume,
        progress,
        orchestrator,
    }
}

/// Every event received so far.
pub fn drain(events: &mut broadcast::Receiver<AppEvent>) -> Vec<AppEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

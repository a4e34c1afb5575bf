//! Composition root.
//!
//! [`AppContext::build`] is the only place the services are wired together.
//! Hosts supply the four adapters in [`HostPorts`] and then talk to the
//! runtime through [`AppContext::dispatch`] and the event stream.
//!
//! Background tasks started here:
//! - the dispatcher worker;
//! - the recovery sweep, which ends the session when its tab is lost;
//! - the menu sync, which re-renders the menu on session and selection
//!   changes.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use readout_core::{
    AppEvent, AppEventEmitter, ConfigError, CounterpartPort, MenuSurface, Message, Notifier,
    PreferenceStorage, ReadoutConfig, ReadoutError, Response, SourceContext, StopReason,
};
use thiserror::Error;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatcher::{Dispatcher, DispatcherConfig};
use crate::emitter::{BroadcastEmitter, DEFAULT_EVENT_CAPACITY};
use crate::handlers::{HandlerDeps, build_registry};
use crate::link::CounterpartLink;
use crate::menu::MenuReflector;
use crate::orchestrator::{OrchestratorConfig, OrchestratorDeps, SessionOrchestrator};
use crate::preferences::{SpeedService, VolumeService};
use crate::progress::ProgressTracker;
use crate::recovery::{RecoveryConfig, RecoveryMonitor};
use crate::selection::SelectionTracker;

/// Adapters supplied by the host.
#[derive(Clone)]
pub struct HostPorts {
    pub counterpart: Arc<dyn CounterpartPort>,
    pub storage: Arc<dyn PreferenceStorage>,
    pub menu: Arc<dyn MenuSurface>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to flush preferences on shutdown: {0}")]
    Flush(#[source] ReadoutError),
}

/// Fully composed runtime.
pub struct AppContext {
    config: ReadoutConfig,
    emitter: Arc<BroadcastEmitter>,
    orchestrator: SessionOrchestrator,
    selection: Arc<SelectionTracker>,
    recovery: Arc<RecoveryMonitor>,
    speed: Arc<SpeedService>,
    volume: Arc<VolumeService>,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AppContext {
    /// Validate `config`, restore preferences and start the background tasks.
    pub async fn build(config: ReadoutConfig, ports: HostPorts) -> Result<Self, ContextError> {
        config.validate()?;

        let emitter = Arc::new(BroadcastEmitter::new(DEFAULT_EVENT_CAPACITY));
        let events: Arc<dyn AppEventEmitter> = emitter.clone();
        let link = CounterpartLink::new(ports.counterpart, config.message_timeout());

        // 1. Preferences
        let speed = Arc::new(
            SpeedService::load(
                Arc::clone(&ports.storage),
                Arc::clone(&events),
                config.override_capacity,
            )
            .await,
        );
        let volume = Arc::new(
            VolumeService::load(
                Arc::clone(&ports.storage),
                Arc::clone(&events),
                config.volume_debounce(),
                config.override_capacity,
            )
            .await,
        );

        // 2. Session services
        let selection = Arc::new(SelectionTracker::new(Arc::clone(&events)));
        let orchestrator = SessionOrchestrator::new(
            OrchestratorDeps {
                link: link.clone(),
                speed: Arc::clone(&speed),
                volume: Arc::clone(&volume),
                selection: Arc::clone(&selection),
                progress: Arc::new(ProgressTracker::new()),
                emitter: Arc::clone(&events),
                notifier: Arc::clone(&ports.notifier),
            },
            OrchestratorConfig::from(&config),
        );
        let recovery = Arc::new(RecoveryMonitor::new(
            link,
            Arc::clone(&events),
            Arc::clone(&ports.notifier),
            RecoveryConfig::from(&config),
        ));

        // 3. Dispatcher
        let registry = build_registry(&HandlerDeps {
            orchestrator: orchestrator.clone(),
            selection: Arc::clone(&selection),
            recovery: Arc::clone(&recovery),
        });
        debug!(kinds = registry.len(), "Handlers registered");
        let shutdown = CancellationToken::new();
        let (dispatcher, worker) = Dispatcher::spawn(
            registry,
            DispatcherConfig::from(&config),
            shutdown.child_token(),
        );

        // 4. Background loops
        let reflector = MenuReflector::new(ports.menu);
        reflector.sync(&orchestrator.snapshot(), selection.has_selection());
        let menu_task = spawn_menu_sync(
            reflector,
            emitter.subscribe(),
            orchestrator.clone(),
            Arc::clone(&selection),
            shutdown.child_token(),
        );
        let sweep_task = spawn_recovery_loop(
            Arc::clone(&recovery),
            orchestrator.clone(),
            config.sweep_interval(),
            shutdown.child_token(),
        );

        info!(
            queue_capacity = config.queue_capacity,
            command_timeout_ms = config.command_timeout_ms,
            "Readout runtime started"
        );
        Ok(Self {
            config,
            emitter,
            orchestrator,
            selection,
            recovery,
            speed,
            volume,
            dispatcher,
            shutdown,
            tasks: Mutex::new(vec![worker, menu_task, sweep_task]),
        })
    }

    // ── Inbound messages ─────────────────────────────────────────────────────

    /// Queue a message; the receiver yields its response.
    pub fn submit(
        &self,
        message: Message,
        source: SourceContext,
    ) -> Result<oneshot::Receiver<Response>, ReadoutError> {
        self.note_sender(&source);
        self.dispatcher.submit(message, source)
    }

    /// Queue a message and wait for its response.
    pub async fn dispatch(&self, message: Message, source: SourceContext) -> Response {
        self.note_sender(&source);
        self.dispatcher.dispatch(message, source).await
    }

    /// Anything a counterpart sends proves it alive.
    fn note_sender(&self, source: &SourceContext) {
        if let (true, Some(tab_id)) = (source.is_counterpart(), source.tab_id) {
            self.recovery.record_contact(tab_id, source.url.clone());
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.emitter.subscribe()
    }

    pub const fn config(&self) -> &ReadoutConfig {
        &self.config
    }

    pub const fn orchestrator(&self) -> &SessionOrchestrator {
        &self.orchestrator
    }

    pub fn selection(&self) -> &Arc<SelectionTracker> {
        &self.selection
    }

    pub fn recovery(&self) -> &Arc<RecoveryMonitor> {
        &self.recovery
    }

    pub fn speed(&self) -> &Arc<SpeedService> {
        &self.speed
    }

    pub fn volume(&self) -> &Arc<VolumeService> {
        &self.volume
    }

    // ── Shutdown ─────────────────────────────────────────────────────────────

    /// Stop the session, flush preferences and stop the background tasks.
    pub async fn shutdown(&self) -> Result<(), ContextError> {
        if self.shutdown.is_cancelled() {
            return Ok(());
        }
        info!("Shutting down readout runtime");
        self.orchestrator.stop(StopReason::Shutdown).await;
        let flushed = self.volume.flush().await;

        self.shutdown.cancel();
        let tasks: Vec<JoinHandle<()>> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
        flushed.map_err(ContextError::Flush)
    }
}

fn spawn_menu_sync(
    reflector: MenuReflector,
    mut events: broadcast::Receiver<AppEvent>,
    orchestrator: SessionOrchestrator,
    selection: Arc<SelectionTracker>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                () = shutdown.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Ok(event) if !event.affects_menu() => continue,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Menu sync lagged, resyncing");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
            reflector.sync(&orchestrator.snapshot(), selection.has_selection());
        }
    })
}

fn spawn_recovery_loop(
    recovery: Arc<RecoveryMonitor>,
    orchestrator: SessionOrchestrator,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            for (tab_id, outcome) in recovery.sweep().await {
                if outcome.is_terminal() {
                    orchestrator.on_tab_unreachable(tab_id).await;
                }
            }
        }
    })
}

//! Command dispatcher.
//!
//! Inbound messages are queued on a bounded channel and executed one at a
//! time by a single worker, in arrival order. Each message gets exactly one
//! [`Response`]:
//!
//! - a full queue is rejected immediately with `QueueFull`;
//! - an unknown type yields `NoHandler`;
//! - a handler exceeding the command timeout is aborted and yields `Timeout`;
//! - a panicking handler yields `Internal`, and the worker keeps going.
//!
//! Handlers run on their own task so a panic or an abort never takes the
//! worker down with it.

mod registry;

use std::sync::Arc;
use std::time::Duration;

use readout_core::{Message, ReadoutConfig, ReadoutError, Response, SourceContext};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub use registry::{CommandHandler, FnHandler, HandlerRegistry};

#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    pub capacity: usize,
    pub command_timeout: Duration,
}

impl From<&ReadoutConfig> for DispatcherConfig {
    fn from(config: &ReadoutConfig) -> Self {
        Self {
            capacity: config.queue_capacity,
            command_timeout: config.command_timeout(),
        }
    }
}

/// A queued message and where to send its response.
struct Job {
    message: Message,
    source: SourceContext,
    reply: oneshot::Sender<Response>,
    enqueued_at: Instant,
}

/// Handle for submitting messages. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<Job>,
    capacity: usize,
}

impl Dispatcher {
    /// Start the worker. It stops when `shutdown` is cancelled or every
    /// handle has been dropped; queued messages are then dropped unanswered.
    pub fn spawn(
        registry: HandlerRegistry,
        config: DispatcherConfig,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let capacity = config.capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let worker = tokio::spawn(run_worker(
            rx,
            Arc::new(registry),
            config.command_timeout,
            shutdown,
        ));
        (Self { tx, capacity }, worker)
    }

    /// Queue a message without waiting for its execution.
    pub fn submit(
        &self,
        message: Message,
        source: SourceContext,
    ) -> Result<oneshot::Receiver<Response>, ReadoutError> {
        let (reply, rx) = oneshot::channel();
        let job = Job {
            message,
            source,
            reply,
            enqueued_at: Instant::now(),
        };
        match self.tx.try_send(job) {
            Ok(()) => Ok(rx),
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(kind = %job.message.kind, capacity = self.capacity, "Command queue full");
                Err(ReadoutError::QueueFull {
                    capacity: self.capacity,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(ReadoutError::Internal("dispatcher stopped".into()))
            }
        }
    }

    /// Queue a message and wait for its response.
    pub async fn dispatch(&self, message: Message, source: SourceContext) -> Response {
        let rx = match self.submit(message, source) {
            Ok(rx) => rx,
            Err(e) => return Response::err(&e),
        };
        rx.await.unwrap_or_else(|_| {
            Response::err(&ReadoutError::Internal(
                "dispatcher stopped before answering".into(),
            ))
        })
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<Job>,
    registry: Arc<HandlerRegistry>,
    command_timeout: Duration,
    shutdown: CancellationToken,
) {
    debug!(handlers = registry.len(), "Dispatcher worker started");
    loop {
        let job = tokio::select! {
            () = shutdown.cancelled() => break,
            job = rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };
        let Job {
            message,
            source,
            reply,
            enqueued_at,
        } = job;
        let kind = message.kind.clone();
        let response = execute(&registry, message, source, command_timeout).await;
        debug!(
            %kind,
            success = response.success,
            elapsed_ms = enqueued_at.elapsed().as_millis(),
            "Command handled"
        );
        if reply.send(response).is_err() {
            debug!(%kind, "Caller dropped before the response was ready");
        }
    }
    debug!("Dispatcher worker stopped");
}

async fn execute(
    registry: &HandlerRegistry,
    message: Message,
    source: SourceContext,
    command_timeout: Duration,
) -> Response {
    let kind = message.kind.clone();
    let Some(handler) = registry.get(&kind) else {
        warn!(%kind, "No handler for message type");
        return Response::err(&ReadoutError::NoHandler(kind));
    };

    let mut task = tokio::spawn(async move { handler.handle(message, source).await });
    match tokio::time::timeout(command_timeout, &mut task).await {
        Ok(Ok(result)) => {
            if let Err(e) = &result {
                debug!(%kind, error = %e, "Command failed");
            }
            Response::from_result(result)
        }
        Ok(Err(join_error)) => {
            error!(%kind, error = %join_error, "Command handler panicked");
            Response::err(&ReadoutError::Internal(format!(
                "handler for '{kind}' failed unexpectedly"
            )))
        }
        Err(_) => {
            task.abort();
            warn!(%kind, timeout = ?command_timeout, "Command timed out");
            Response::err(&ReadoutError::timeout(kind, command_timeout))
        }
    }
}

//! `readout run` handler: the JSON-lines message loop.
//!
//! Each non-blank input line is a message object, optionally carrying the
//! sender:
//!
//! ```text
//! {"type":"selection-changed","payload":{"text":"Hello"},"source":{"tabId":1,"kind":"counterpart"}}
//! {"type":"start-session"}
//! ```
//!
//! Lines starting with `#` are comments. Every message line gets exactly one
//! `response` line back, in input order.

use std::sync::Arc;

use anyhow::{Context, Result};
use readout_core::{Message, ReadoutError, Response, SourceContext};
use readout_runtime::AppContext;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bootstrap::CliContext;
use crate::commands::RunArgs;
use crate::error::CliError;
use crate::output::{LineSink, OutputLine, emit};

/// One input line.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(flatten)]
    message: Message,
    #[serde(default)]
    source: SourceContext,
}

fn parse_line(raw: &str) -> Result<Envelope, ReadoutError> {
    serde_json::from_str(raw).map_err(|e| ReadoutError::invalid(format!("bad input line: {e}")))
}

/// Run until stdin closes or Ctrl-C, then shut the runtime down.
pub async fn execute(ctx: &CliContext, args: &RunArgs) -> Result<()> {
    let printer = args
        .events
        .then(|| spawn_event_printer(ctx.app.subscribe(), Arc::clone(&ctx.sink)));

    let stdin = BufReader::new(tokio::io::stdin());
    let processed = tokio::select! {
        result = process_lines(&ctx.app, stdin, ctx.sink.as_ref()) => Some(result),
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            None
        }
    };

    let shutdown = ctx.app.shutdown().await;
    if let Some(printer) = printer {
        printer.abort();
    }
    if let Some(result) = processed {
        let count = result?;
        info!(messages = count, "Input closed");
    }
    shutdown.map_err(CliError::from)?;
    Ok(())
}

/// Dispatch every message line from `reader`, printing responses to `sink`.
///
/// Returns the number of message lines handled.
pub async fn process_lines<R>(app: &AppContext, reader: R, sink: &dyn LineSink) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut number = 0;
    let mut handled = 0;

    while let Some(raw) = lines
        .next_line()
        .await
        .map_err(|e| CliError::Io(e.to_string()))
        .context("failed to read input")?
    {
        number += 1;
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }
        handled += 1;

        let response = match parse_line(raw) {
            Ok(Envelope { message, source }) => {
                debug!(line = number, kind = %message.kind, "Dispatching");
                app.dispatch(message, source).await
            }
            Err(e) => {
                warn!(line = number, error = %e, "Skipping malformed line");
                Response::err(&e)
            }
        };
        emit(
            sink,
            &OutputLine::Response {
                line: number,
                response: &response,
            },
        );
    }
    Ok(handled)
}

fn spawn_event_printer(
    mut events: broadcast::Receiver<readout_core::AppEvent>,
    sink: Arc<dyn LineSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => emit(sink.as_ref(), &OutputLine::Event { event: &event }),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

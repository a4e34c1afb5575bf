//! JSON-lines output.
//!
//! Everything the host prints goes through a [`LineSink`] as one JSON
//! object per line, tagged by `kind`.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use readout_core::{AppEvent, Instruction, Notification, Response, TabId};
use serde::Serialize;
use tracing::warn;

/// One line of host output.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputLine<'a> {
    /// Answer to input line `line` (1-based).
    Response { line: usize, response: &'a Response },
    Event { event: &'a AppEvent },
    /// Instruction the simulated counterpart received.
    Instruction {
        #[serde(rename = "tabId")]
        tab_id: TabId,
        instruction: &'a Instruction,
    },
    Menu {
        item: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        enabled: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<&'a str>,
    },
    Notification { notification: &'a Notification },
}

/// Destination for output lines.
pub trait LineSink: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Serialize `line` and hand it to `sink`.
pub fn emit(sink: &dyn LineSink, line: &OutputLine<'_>) {
    match serde_json::to_string(line) {
        Ok(json) => sink.write_line(&json),
        Err(e) => warn!(error = %e, "Failed to encode output line"),
    }
}

/// Writes to stdout; a closed pipe is logged, not fatal.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn write_line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!(error = %e, "Failed to write to stdout");
        }
    }
}

/// Collects lines in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Lines decoded as JSON, skipping any that do not parse.
    pub fn values(&self) -> Vec<serde_json::Value> {
        self.lines()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl LineSink for MemorySink {
    fn write_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

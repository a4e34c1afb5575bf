//! Error taxonomy for the orchestration core.
//!
//! Every error is serializable as an [`ErrorPayload`] so it can travel back
//! to the control surface in a response without depending on non-serializable
//! source errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::{ChannelError, StorageError};

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NoSelection,
    CommunicationFailure,
    EngineFailure,
    Timeout,
    Unrecoverable,
    QueueFull,
    NoHandler,
    Storage,
    Internal,
}

/// Core error type.
///
/// Component-local failures are reported with this type and never crash the
/// orchestrator; the dispatcher converts them into error responses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadoutError {
    /// Empty or oversized text, malformed payload. Not retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Nothing to speak. Not retried.
    #[error("No text selected")]
    NoSelection,

    /// The tab-side counterpart did not answer.
    #[error("Counterpart unreachable: {0}")]
    CommunicationFailure(String),

    /// The speech engine rejected the request.
    #[error("Speech engine failure: {0}")]
    EngineFailure(String),

    /// A command or probe exceeded its budget.
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        /// What timed out.
        operation: String,
        /// Budget that was exceeded.
        after_ms: u64,
    },

    /// Restricted page or context; surfaced immediately, never retried.
    #[error("Unrecoverable: {0}")]
    Unrecoverable(String),

    /// Command queue at capacity.
    #[error("Command queue full: maximum {capacity} pending commands")]
    QueueFull {
        /// Queue capacity.
        capacity: usize,
    },

    /// Unknown message type.
    #[error("No handler registered for message type '{0}'")]
    NoHandler(String),

    /// Durable storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Unexpected condition (handler panic, closed channel).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReadoutError {
    /// Create an invalid-input error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a timeout error for `operation`.
    pub fn timeout(operation: impl Into<String>, after: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NoSelection => ErrorKind::NoSelection,
            Self::CommunicationFailure(_) => ErrorKind::CommunicationFailure,
            Self::EngineFailure(_) => ErrorKind::EngineFailure,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Unrecoverable(_) => ErrorKind::Unrecoverable,
            Self::QueueFull { .. } => ErrorKind::QueueFull,
            Self::NoHandler(_) => ErrorKind::NoHandler,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Communication failures and timeouts are handled the same way.
    #[must_use]
    pub const fn is_communication(&self) -> bool {
        matches!(self, Self::CommunicationFailure(_) | Self::Timeout { .. })
    }

    /// Whether the recovery monitor should retry after this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.is_communication()
    }

    /// Serializable form for responses and events.
    #[must_use]
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<ChannelError> for ReadoutError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Unreachable(msg) => Self::CommunicationFailure(msg),
            ChannelError::Closed => Self::CommunicationFailure("channel closed".to_string()),
            ChannelError::Rejected(msg) => Self::EngineFailure(msg),
            ChannelError::Restricted(msg) => Self::Unrecoverable(msg),
        }
    }
}

/// Error as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
}

//! Durable key-value storage for user preferences.
//!
//! Only preferences are persisted; sessions never are.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Storage failure, captured as strings so it stays cloneable and
/// serializable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Backend I/O failed.
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// Stored value could not be encoded or decoded.
    #[error("Storage serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Key-value store keyed by preference store name (`"speed"`, `"volume"`).
#[async_trait]
pub trait PreferenceStorage: Send + Sync {
    /// Load the value stored under `key`, `None` when absent.
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Replace the value stored under `key`.
    async fn save(&self, key: &str, value: &Value) -> Result<(), StorageError>;
}

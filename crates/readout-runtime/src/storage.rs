//! Preference storage adapters.
//!
//! - [`JsonFileStorage`]: one JSON document on disk, keyed by store name,
//!   written atomically (temp file + rename).
//! - [`MemoryStorage`]: in-process map for tests and ephemeral hosts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use readout_core::{PreferenceStorage, StorageError};
use serde_json::{Map, Value};
use tracing::debug;

fn io_err(context: &str, path: &Path, err: &std::io::Error) -> StorageError {
    StorageError::Io(format!("{context} {}: {err}", path.display()))
}

/// File-backed key-value storage.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Map<String, Value>, StorageError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(io_err("Failed to read", &self.path, &e)),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            other => Err(StorageError::Serialization(format!(
                "expected a JSON object in {}, found {}",
                self.path.display(),
                type_name(&other)
            ))),
        }
    }

    async fn write_document(&self, document: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| io_err("Failed to create", parent, &e))?;
            }
        }
        let body = serde_json::to_string_pretty(document)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, body)
            .await
            .map_err(|e| io_err("Failed to write", &tmp_path, &e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| io_err("Failed to replace", &self.path, &e))
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl PreferenceStorage for JsonFileStorage {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let mut document = self.read_document().await?;
        Ok(document.remove(key))
    }

    async fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        document.insert(key.to_string(), value.clone());
        self.write_document(&document).await?;
        debug!(key, path = %self.path.display(), "Saved preferences");
        Ok(())
    }
}

/// In-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value, as if persisted by an earlier run.
    pub fn with_entry(self, key: &str, value: Value) -> Self {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        self
    }

    /// Current value under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl PreferenceStorage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.clone());
        Ok(())
    }
}

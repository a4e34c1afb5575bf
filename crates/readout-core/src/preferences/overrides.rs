//! Origin-keyed override map with least-recently-touched eviction.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default maximum number of per-origin overrides.
pub const DEFAULT_OVERRIDE_CAPACITY: usize = 100;

const fn default_capacity() -> usize {
    DEFAULT_OVERRIDE_CAPACITY
}

/// Per-website exceptions to a global setting.
///
/// Insertion order doubles as recency order: touching an entry moves it to
/// the back, and eviction pops from the front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginOverrides<T> {
    entries: IndexMap<String, T>,
    #[serde(skip, default = "default_capacity")]
    capacity: usize,
}

impl<T> Default for OriginOverrides<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
            capacity: DEFAULT_OVERRIDE_CAPACITY,
        }
    }
}

impl<T: Copy + PartialEq> OriginOverrides<T> {
    /// Create an empty map holding at most `capacity` origins.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Change the cap, evicting the oldest entries if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict_overflow();
    }

    pub fn get(&self, origin: &str) -> Option<T> {
        self.entries.get(origin).copied()
    }

    pub fn contains(&self, origin: &str) -> bool {
        self.entries.contains_key(origin)
    }

    /// Insert or replace an override and mark it most recently touched.
    ///
    /// Returns whether the stored value changed.
    pub fn insert(&mut self, origin: impl Into<String>, value: T) -> bool {
        let origin = origin.into();
        let changed = self.entries.get(&origin) != Some(&value);
        self.entries.shift_remove(&origin);
        self.entries.insert(origin, value);
        self.evict_overflow();
        changed
    }

    /// Mark an override most recently touched without changing it.
    pub fn touch(&mut self, origin: &str) {
        if let Some(value) = self.entries.shift_remove(origin) {
            self.entries.insert(origin.to_string(), value);
        }
    }

    /// Remove an override. Returns whether one existed.
    pub fn remove(&mut self, origin: &str) -> bool {
        self.entries.shift_remove(origin).is_some()
    }

    /// Apply `f` to every value, dropping entries it maps to `None`.
    pub fn retain_map(&mut self, mut f: impl FnMut(T) -> Option<T>) {
        let drained: Vec<(String, T)> = self.entries.drain(..).collect();
        for (origin, value) in drained {
            if let Some(mapped) = f(value) {
                self.entries.insert(origin, mapped);
            }
        }
    }

    /// Origins from least to most recently touched.
    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn evict_overflow(&mut self) {
        while self.entries.len() > self.capacity {
            if let Some((origin, _)) = self.entries.shift_remove_index(0) {
                tracing::debug!(%origin, "Evicted least recently touched origin override");
            }
        }
    }
}

//! Session data

use crate::error::{KvSessionError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Session data stored in the session store
///
/// A mapping from string keys to JSON values. A session with no stored entry
/// and a session stored empty look the same to handlers. Serializes as the
/// bare JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionData {
    /// Session data as key-value pairs
    data: HashMap<String, Value>,

    /// Set when a handler writes to the session; never persisted
    #[serde(skip)]
    modified: bool,
}

impl SessionData {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a typed value from the session
    ///
    /// Returns `Ok(None)` if the key is absent, and an error if the stored
    /// value does not deserialize into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.data.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| {
                    KvSessionError::serialization(format!(
                        "Failed to deserialize session value '{}': {}",
                        key, e
                    ))
                }),
            None => Ok(None),
        }
    }

    /// Get the raw JSON value for a key
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Set a typed value, returning the previous raw value if any
    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<Option<Value>> {
        let value = serde_json::to_value(value)
            .map_err(|e| KvSessionError::serialization(format!("Failed to serialize session value: {}", e)))?;
        Ok(self.insert_value(key, value))
    }

    /// Set a raw JSON value
    pub fn insert_value(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.modified = true;
        self.data.insert(key.into(), value)
    }

    /// Remove a value from the session
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    /// Remove every value
    pub fn clear(&mut self) {
        if !self.data.is_empty() {
            self.modified = true;
        }
        self.data.clear();
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Whether the session was written to since it was created or loaded
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Reset the modification flag, called once the data has been loaded from a store
    pub(crate) fn mark_clean(&mut self) {
        self.modified = false;
    }

    pub(crate) fn mark_modified(&mut self) {
        self.modified = true;
    }
}

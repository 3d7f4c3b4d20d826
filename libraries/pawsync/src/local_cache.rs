//! The browser-scoped key/value cache, and the keys we keep in it.
//!
//! Failures here are never surfaced to the user: they are logged, and a failed
//! read counts as "nothing stored".

use std::{cell::RefCell, collections::BTreeMap};

use serde::{Serialize, de::DeserializeOwned};

/// Every key this product owns starts with this prefix.
pub const NAMESPACE: &str = "pawdentify";
pub const SETTINGS_KEY: &str = "pawdentify-settings";
pub const PREDICTION_KEY: &str = "pawdentify-prediction";
/// Survives "clear all data".
pub const THEME_KEY: &str = "pawdentify-theme";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocalCacheError {
    #[error("local storage is unavailable")]
    Unavailable,

    #[error("local storage rejected the operation: {0}")]
    Backend(String),
}

/// Synchronous persistent key/value store (`window.localStorage` in the browser).
pub trait LocalCache {
    fn get(&self, key: &str) -> Result<Option<String>, LocalCacheError>;
    fn set(&self, key: &str, value: &str) -> Result<(), LocalCacheError>;
    fn remove(&self, key: &str) -> Result<(), LocalCacheError>;
    fn keys(&self) -> Result<Vec<String>, LocalCacheError>;
}

/// Reads and parses `key`. Missing, unreadable and unparseable entries all come back as `None`.
pub fn read_json<T: DeserializeOwned>(cache: &dyn LocalCache, key: &str) -> Option<T> {
    let raw = match cache.get(key) {
        Ok(raw) => raw?,
        Err(e) => {
            log::error!("Failed to read `{key}` from local storage: {e}");
            return None;
        }
    };
    serde_json::from_str(&raw)
        .inspect_err(|e| log::error!("Ignoring unparseable `{key}` in local storage: {e}"))
        .ok()
}

/// Serializes `value` into `key`. Returns whether the write went through.
pub fn write_json<T: Serialize>(cache: &dyn LocalCache, key: &str, value: &T) -> bool {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            log::error!("Failed to serialize `{key}`: {e}");
            return false;
        }
    };
    cache
        .set(key, &raw)
        .inspect_err(|e| log::error!("Failed to write `{key}` to local storage: {e}"))
        .is_ok()
}

pub fn remove_logged(cache: &dyn LocalCache, key: &str) -> bool {
    cache
        .remove(key)
        .inspect_err(|e| log::error!("Failed to remove `{key}` from local storage: {e}"))
        .is_ok()
}

/// In-memory cache, used when the browser has no usable storage and in tests.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.borrow().clone()
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, LocalCacheError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalCacheError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), LocalCacheError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, LocalCacheError> {
        Ok(self.entries.borrow().keys().cloned().collect())
    }
}

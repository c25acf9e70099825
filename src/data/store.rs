// src/data/store.rs

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Mutex;

use serde_json::Value;
use tracing::warn;

/// Workflow-wide key-value store.
///
/// Implementations synchronise internally, so a shared reference is enough
/// for both reads and writes.
pub trait DataStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    fn remove(&self, key: &str) -> Option<Value>;
}

/// In-memory store (lost on restart).
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for seeding a store in one expression.
    pub fn with(self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value.into());
        self
    }
}

impl DataStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        match self.values.lock() {
            Ok(guard) => guard.get(key).cloned(),
            Err(_) => {
                warn!(key, "data store mutex poisoned; treating key as missing");
                None
            }
        }
    }

    fn set(&self, key: &str, value: Value) {
        match self.values.lock() {
            Ok(mut guard) => {
                guard.insert(key.to_string(), value);
            }
            Err(_) => warn!(key, "data store mutex poisoned; dropping write"),
        }
    }

    fn remove(&self, key: &str) -> Option<Value> {
        self.values.lock().ok().and_then(|mut guard| guard.remove(key))
    }
}

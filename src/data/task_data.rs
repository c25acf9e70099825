// src/data/task_data.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Data payload owned by a task and forwarded to launched workflows.
///
/// `Clone` is a deep copy: the copy shares no state with the original, so a
/// callback mutating its copy never affects the task's data or another
/// invocation's copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskData {
    fields: Map<String, Value>,
}

impl TaskData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Insert a value, returning the previous one for this key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl From<Map<String, Value>> for TaskData {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

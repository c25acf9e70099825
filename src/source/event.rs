// src/source/event.rs

use serde::Serialize;
use serde_json::{Map, Value};

/// Named fields describing one change, as reported by the source.
pub type EventFields = Map<String, Value>;

/// One change notification from a monitored value.
///
/// The field set is whatever the source reports (typically `pvname`,
/// `value`, `timestamp`, `status`); no schema is imposed here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChangeEvent {
    fields: EventFields,
}

impl ChangeEvent {
    pub fn new(fields: EventFields) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &EventFields {
        &self.fields
    }

    /// The changed value, if the source reported one.
    pub fn value(&self) -> Option<&Value> {
        self.field("value")
    }

    /// Numeric view of `value`.
    pub fn value_f64(&self) -> Option<f64> {
        self.value().and_then(Value::as_f64)
    }

    pub fn pvname(&self) -> Option<&str> {
        self.field("pvname").and_then(Value::as_str)
    }

    pub fn timestamp(&self) -> Option<&Value> {
        self.field("timestamp")
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ChangeEvent {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

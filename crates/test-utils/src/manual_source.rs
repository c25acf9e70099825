use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::{json, Value};

use pvtrigger::errors::{PvTriggerError, Result};
use pvtrigger::source::{ChangeCallback, EventFields, SubscriptionId, ValueSource};

/// A value source driven by the test itself.
///
/// - Only names registered with [`ManualSource::with_value`] can be
///   subscribed to.
/// - With `initial_notification` enabled (the default), subscribing
///   immediately delivers the current value, like a real monitor.
/// - [`ManualSource::emit`] delivers a change synchronously on the calling
///   thread, so tests control exactly what is queued before a pass.
#[derive(Default)]
pub struct ManualSource {
    values: Mutex<HashMap<String, Value>>,
    callbacks: Mutex<HashMap<SubscriptionId, (String, ChangeCallback)>>,
    next_id: AtomicU64,
    no_initial_notification: bool,
    subscribes: AtomicUsize,
    unsubscribes: AtomicUsize,
}

impl std::fmt::Debug for ManualSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualSource")
            .field("subscribes", &self.subscribe_count())
            .field("unsubscribes", &self.unsubscribe_count())
            .finish_non_exhaustive()
    }
}

impl ManualSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, name: &str, value: impl Into<Value>) -> Self {
        self.values.lock().unwrap().insert(name.to_string(), value.into());
        self
    }

    /// Do not deliver the current value on subscribe.
    pub fn without_initial_notification(mut self) -> Self {
        self.no_initial_notification = true;
        self
    }

    /// Change `name` and notify its subscribers on the calling thread.
    pub fn emit(&self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        self.values.lock().unwrap().insert(name.to_string(), value.clone());

        let callbacks = self.callbacks.lock().unwrap();
        for (pv, callback) in callbacks.values() {
            if pv == name {
                callback(fields(name, &value));
            }
        }
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    pub fn active_subscriptions(&self) -> usize {
        self.callbacks.lock().unwrap().len()
    }
}

impl ValueSource for ManualSource {
    fn subscribe(&self, name: &str, on_change: ChangeCallback) -> Result<SubscriptionId> {
        let current = self.values.lock().unwrap().get(name).cloned();
        let Some(current) = current else {
            return Err(PvTriggerError::SourceUnavailable {
                name: name.to_string(),
                reason: "unknown name".to_string(),
            });
        };

        self.subscribes.fetch_add(1, Ordering::SeqCst);
        if !self.no_initial_notification {
            on_change(fields(name, &current));
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.callbacks
            .lock()
            .unwrap()
            .insert(id, (name.to_string(), on_change));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        self.callbacks.lock().unwrap().remove(&id);
    }
}

fn fields(name: &str, value: &Value) -> EventFields {
    let mut fields = EventFields::new();
    fields.insert("pvname".into(), json!(name));
    fields.insert("value".into(), value.clone());
    fields.insert("timestamp".into(), json!(0.0));
    fields
}

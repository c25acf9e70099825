// src/source/simulated.rs

//! In-process value source with its own delivery thread.
//!
//! Behaves like a monitored control-system channel:
//! - values must be [`define`](SimulatedSource::define)d before anyone can
//!   subscribe to them, otherwise subscribing fails with `SourceUnavailable`;
//! - a new subscriber immediately receives the current value (the "initial
//!   value" notification);
//! - [`post`](SimulatedSource::post) updates a value and notifies every
//!   subscriber;
//! - once [`unsubscribe`](ValueSource::unsubscribe) returns, that
//!   subscriber's callback never runs again, even for deliveries already
//!   queued.
//!
//! All callbacks run on a dedicated thread owned by the source, never on the
//! caller's thread.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, trace, warn};

use crate::errors::{PvTriggerError, Result};
use crate::source::event::EventFields;
use crate::source::subscription::{ChangeCallback, SubscriptionId, ValueSource};

/// One registration.
///
/// The delivery thread holds `active` while a callback runs, so clearing it
/// waits for an in-flight call and no call starts afterwards. Notifications
/// already queued for a deactivated subscriber are dropped.
struct Subscriber {
    id: SubscriptionId,
    active: Mutex<bool>,
    callback: ChangeCallback,
}

impl Subscriber {
    fn new(id: SubscriptionId, callback: ChangeCallback) -> Self {
        Self {
            id,
            active: Mutex::new(true),
            callback,
        }
    }

    fn deliver(&self, fields: EventFields) {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if *active {
            (self.callback)(fields);
        } else {
            trace!(subscription = %self.id, "dropping notification for released subscription");
        }
    }

    /// Must not be called from inside this subscriber's own callback.
    fn deactivate(&self) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }
}

#[derive(Default)]
struct Channel {
    value: Value,
    subscribers: Vec<Arc<Subscriber>>,
}

enum Delivery {
    Notify {
        fields: EventFields,
        subscribers: Vec<Arc<Subscriber>>,
    },
    Barrier(mpsc::Sender<()>),
    Shutdown,
}

pub struct SimulatedSource {
    channels: Mutex<HashMap<String, Channel>>,
    next_id: AtomicU64,
    tx: mpsc::Sender<Delivery>,
    thread: Option<JoinHandle<()>>,
}

impl fmt::Debug for SimulatedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.lock().keys().cloned().collect();
        f.debug_struct("SimulatedSource")
            .field("channels", &names)
            .finish_non_exhaustive()
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel::<Delivery>();

        let thread = thread::Builder::new()
            .name("pvtrigger-sim-delivery".to_string())
            .spawn(move || delivery_loop(rx))
            .map_err(|err| warn!(error = %err, "failed to spawn delivery thread"))
            .ok();

        Self {
            channels: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            tx,
            thread,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Channel>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `name` available with an initial value. Re-defining an existing
    /// name only replaces its value; subscribers are kept and not notified.
    pub fn define(&self, name: &str, initial: impl Into<Value>) {
        let mut channels = self.lock();
        channels.entry(name.to_string()).or_default().value = initial.into();
        debug!(pv = %name, "simulated value defined");
    }

    /// Update `name` and notify all its subscribers on the delivery thread.
    pub fn post(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        trace!(pv = %name, %value, "posting simulated change");

        // Sent under the lock so deliveries for one name stay in the order
        // their updates were applied.
        let mut channels = self.lock();
        let channel = channels.get_mut(name).ok_or_else(|| unavailable(name))?;
        channel.value = value;
        self.send(Delivery::Notify {
            fields: notification(name, &channel.value),
            subscribers: channel.subscribers.clone(),
        })
    }

    /// Current value of `name`, if defined.
    pub fn current(&self, name: &str) -> Option<Value> {
        self.lock().get(name).map(|c| c.value.clone())
    }

    pub fn subscriber_count(&self, name: &str) -> usize {
        self.lock().get(name).map_or(0, |c| c.subscribers.len())
    }

    /// Block until every notification posted so far has been delivered.
    pub fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.send(Delivery::Barrier(ack_tx))?;
        ack_rx
            .recv()
            .map_err(|_| PvTriggerError::Other(anyhow::anyhow!("delivery thread stopped")))
    }

    fn send(&self, delivery: Delivery) -> Result<()> {
        self.tx
            .send(delivery)
            .map_err(|_| PvTriggerError::Other(anyhow::anyhow!("delivery thread stopped")))
    }
}

impl ValueSource for SimulatedSource {
    fn subscribe(&self, name: &str, on_change: ChangeCallback) -> Result<SubscriptionId> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Arc::new(Subscriber::new(id, on_change));

        // The initial value is queued before the lock is released, so no
        // concurrent `post` can overtake it.
        let mut channels = self.lock();
        let channel = channels.get_mut(name).ok_or_else(|| unavailable(name))?;
        channel.subscribers.push(Arc::clone(&subscriber));
        let initial = Delivery::Notify {
            fields: notification(name, &channel.value),
            subscribers: vec![subscriber],
        };
        if let Err(err) = self.send(initial) {
            channel.subscribers.retain(|s| s.id != id);
            return Err(err);
        }
        drop(channels);

        debug!(pv = %name, subscription = %id, "simulated subscription registered");
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let removed = {
            let mut channels = self.lock();
            channels.iter_mut().find_map(|(name, channel)| {
                let pos = channel.subscribers.iter().position(|s| s.id == id)?;
                Some((name.clone(), channel.subscribers.remove(pos)))
            })
        };

        // Deactivate outside the channels lock: a running callback may post.
        match removed {
            Some((name, subscriber)) => {
                subscriber.deactivate();
                debug!(pv = %name, subscription = %id, "simulated subscription removed");
            }
            None => warn!(subscription = %id, "unsubscribe for unknown subscription"),
        }
    }
}

impl Drop for SimulatedSource {
    fn drop(&mut self) {
        let _ = self.tx.send(Delivery::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn delivery_loop(rx: mpsc::Receiver<Delivery>) {
    while let Ok(delivery) = rx.recv() {
        match delivery {
            Delivery::Notify { fields, subscribers } => {
                for subscriber in subscribers {
                    subscriber.deliver(fields.clone());
                }
            }
            Delivery::Barrier(ack) => {
                let _ = ack.send(());
            }
            Delivery::Shutdown => break,
        }
    }
}

fn unavailable(name: &str) -> PvTriggerError {
    PvTriggerError::SourceUnavailable {
        name: name.to_string(),
        reason: "no such process variable".to_string(),
    }
}

fn notification(name: &str, value: &Value) -> EventFields {
    let now = Utc::now();
    let timestamp = now.timestamp_micros() as f64 / 1_000_000.0;

    let mut fields = EventFields::new();
    fields.insert("pvname".into(), json!(name));
    fields.insert("value".into(), value.clone());
    fields.insert("timestamp".into(), json!(timestamp));
    fields.insert("status".into(), json!(0));
    fields.insert("severity".into(), json!(0));
    fields
}

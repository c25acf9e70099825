// src/source/subscription.rs

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::Result;
use crate::source::event::{ChangeEvent, EventFields};
use crate::source::queue::EventQueue;

/// Identifier of one registration with a [`ValueSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Callback registered with a source. Invoked on the source's delivery
/// thread, never on the trigger loop.
pub type ChangeCallback = Box<dyn Fn(EventFields) + Send + Sync + 'static>;

/// Client of an external monitored-value system.
///
/// Production code would wrap a control-system client library; the crate
/// ships [`SimulatedSource`](crate::source::SimulatedSource) for the demo
/// binary and tests.
pub trait ValueSource: Send + Sync + fmt::Debug {
    /// Open a live subscription to `name`, invoking `on_change` every time
    /// the value changes.
    ///
    /// Fails with [`PvTriggerError::SourceUnavailable`](crate::errors::PvTriggerError::SourceUnavailable)
    /// if the name cannot be resolved or connected.
    fn subscribe(&self, name: &str, on_change: ChangeCallback) -> Result<SubscriptionId>;

    /// Release a subscription. No callbacks for `id` start after this returns.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// A live subscription feeding an [`EventQueue`].
///
/// The subscription is released exactly once: either explicitly through
/// [`Subscription::close`] or, on any other exit path, when the guard is
/// dropped.
pub struct Subscription {
    source: Arc<dyn ValueSource>,
    name: String,
    id: Option<SubscriptionId>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Subscription {
    /// Subscribe to `name` and forward every notification, verbatim, into
    /// `queue`.
    pub fn open(source: Arc<dyn ValueSource>, name: &str, queue: EventQueue) -> Result<Self> {
        let on_change: ChangeCallback = Box::new(move |fields| {
            queue.push(ChangeEvent::new(fields));
        });

        let id = source.subscribe(name, on_change)?;
        info!(source = %name, subscription = %id, "subscribed to monitored value");

        Ok(Self {
            source,
            name: name.to_string(),
            id: Some(id),
        })
    }

    /// Release the subscription now.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.source.unsubscribe(id);
            info!(source = %self.name, subscription = %id, "unsubscribed from monitored value");
        } else {
            debug!(source = %self.name, "subscription already released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.id.is_some() {
            self.release();
        }
    }
}

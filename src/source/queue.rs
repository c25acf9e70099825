// src/source/queue.rs

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::source::event::ChangeEvent;
use crate::types::DrainOrder;

/// Unbounded queue of change events shared between the source's delivery
/// thread (producer) and the trigger loop (sole consumer).
///
/// Semantics:
/// - `push` always appends at the tail and only holds the lock for the
///   append, so the producer never waits on the consumer's processing.
/// - `pop` removes exactly one event under the lock. With
///   [`DrainOrder::Lifo`] it takes the tail (newest first), with
///   [`DrainOrder::Fifo`] the head.
/// - Every pushed event is returned by at most one `pop`.
/// - Events are numbered in delivery order starting at 0, independent of
///   the order they are popped in.
///
/// Cloning yields another handle onto the same queue.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    inner: Arc<Mutex<Buffer>>,
}

#[derive(Debug, Default)]
struct Buffer {
    events: VecDeque<QueuedEvent>,
    delivered: u64,
}

/// An event together with its position in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedEvent {
    pub seq: u64,
    pub event: ChangeEvent,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Buffer> {
        // A panic while holding the lock can only happen between single
        // push/pop operations, so the buffer itself is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, event: ChangeEvent) {
        let mut guard = self.lock();
        let seq = guard.delivered;
        guard.delivered += 1;
        guard.events.push_back(QueuedEvent { seq, event });
        trace!(seq, queued = guard.events.len(), "change event queued");
    }

    pub fn pop(&self, order: DrainOrder) -> Option<QueuedEvent> {
        let mut guard = self.lock();
        match order {
            DrainOrder::Lifo => guard.events.pop_back(),
            DrainOrder::Fifo => guard.events.pop_front(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }

    /// Total number of events ever pushed.
    pub fn delivered(&self) -> u64 {
        self.lock().delivered
    }

    /// Drop everything still queued, returning how many events were dropped.
    pub fn clear(&self) -> usize {
        let mut guard = self.lock();
        let dropped = guard.events.len();
        guard.events.clear();
        dropped
    }
}

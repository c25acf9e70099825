// src/engine/core.rs

//! Pure core of the trigger loop.
//!
//! This module contains the synchronous, deterministic bookkeeping of a
//! trigger task run:
//! - the pass counter deciding when the stop signal is queried
//! - the one-shot "skip initial notification" flag
//! - the run statistics reported to the caller
//!
//! The async shell (`engine::trigger_loop::TriggerLoop`) is responsible for:
//! - sleeping between passes
//! - querying the stop signal when the core says so
//! - popping events, invoking the decision callback, launching workflows
//!
//! The core is unit tested without any Tokio, threads or sources.

use tracing::debug;

use crate::engine::params::TriggerTaskConfig;
use crate::source::{ChangeEvent, QueuedEvent};

/// Counters describing one trigger task run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Completed or started passes of the loop.
    pub passes: u64,
    /// How often the stop signal was queried.
    pub stop_checks: u64,
    /// Events taken off the queue.
    pub events_received: u64,
    /// Events swallowed by the skip-initial policy.
    pub events_skipped: u64,
    pub callbacks_invoked: u64,
    /// Callback invocations that returned a dispatch request.
    pub dispatch_requests: u64,
    pub workflows_launched: u64,
    /// Events still queued at teardown.
    pub events_discarded: u64,
}

/// What the shell should do with an event taken off the queue.
#[derive(Debug, Clone, PartialEq)]
pub enum EventAction {
    /// Swallowed by the skip-initial policy; do not invoke the callback.
    Skip,
    /// Invoke the decision callback with this event.
    Invoke(ChangeEvent),
}

#[derive(Debug)]
pub struct TriggerCore {
    stop_check_every: u32,
    passes_since_check: u32,
    skip_armed: bool,
    summary: RunSummary,
}

impl TriggerCore {
    pub fn new(config: &TriggerTaskConfig) -> Self {
        Self {
            stop_check_every: config.stop_check_every.max(1),
            passes_since_check: 0,
            skip_armed: config.skip_initial_callback,
            summary: RunSummary::default(),
        }
    }

    /// Whether the next event will be swallowed.
    pub fn skip_armed(&self) -> bool {
        self.skip_armed
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Start a new pass. Returns true when the stop signal must be queried
    /// during this pass (every `stop_check_every` passes).
    pub fn begin_pass(&mut self) -> bool {
        self.summary.passes += 1;
        self.passes_since_check += 1;

        if self.passes_since_check >= self.stop_check_every {
            self.passes_since_check = 0;
            self.summary.stop_checks += 1;
            true
        } else {
            false
        }
    }

    /// Classify an event taken off the queue. While armed, the skip flag
    /// swallows the first event delivered after subscription (sequence 0)
    /// and is then disarmed, whatever order the queue is drained in.
    pub fn admit(&mut self, queued: QueuedEvent) -> EventAction {
        self.summary.events_received += 1;
        let QueuedEvent { seq, event } = queued;

        if self.skip_armed && seq == 0 {
            self.skip_armed = false;
            self.summary.events_skipped += 1;
            debug!(fields = ?event.fields(), "skipping initial notification");
            return EventAction::Skip;
        }

        EventAction::Invoke(event)
    }

    pub fn record_callback(&mut self, dispatched: bool) {
        self.summary.callbacks_invoked += 1;
        if dispatched {
            self.summary.dispatch_requests += 1;
        }
    }

    pub fn record_launch(&mut self) {
        self.summary.workflows_launched += 1;
    }

    pub fn record_discarded(&mut self, count: usize) {
        self.summary.events_discarded += count as u64;
    }
}

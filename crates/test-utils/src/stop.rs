use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pvtrigger::engine::StopSignal;

/// Stop signal that reports "stop requested" from the `n`-th query onwards
/// and counts how often it was queried.
#[derive(Debug, Clone)]
pub struct StopAfterChecks {
    stop_at: usize,
    checks: Arc<AtomicUsize>,
}

impl StopAfterChecks {
    /// `n = 1` stops at the first checkpoint.
    pub fn new(n: usize) -> Self {
        Self {
            stop_at: n,
            checks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl StopSignal for StopAfterChecks {
    fn is_stop_requested(&self) -> bool {
        let n = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
        n >= self.stop_at
    }
}

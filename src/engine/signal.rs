// src/engine/signal.rs

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation signal, queried by the trigger loop at its stop
/// checkpoints. Must be cheap and non-blocking.
pub trait StopSignal: Send + Sync + Debug {
    fn is_stop_requested(&self) -> bool;
}

/// Shared stop flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    stopped: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }
}

impl StopSignal for StopFlag {
    fn is_stop_requested(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

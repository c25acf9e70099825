// src/engine/mod.rs

//! Trigger engine.
//!
//! This module ties together:
//! - task parameters and their resolution ([`params`])
//! - the pure pass/skip bookkeeping ([`core`])
//! - the async loop that drains change events, invokes the decision callback
//!   and launches workflows ([`trigger_loop`])
//! - the seams to the outside world: stop signal ([`signal`]) and workflow
//!   launcher ([`launcher`])
//!
//! [`PvTriggerTask`] is the entry point used by workflow definitions.

pub mod core;
pub mod dispatch;
pub mod launcher;
pub mod params;
pub mod signal;
pub mod task;
pub mod trigger_loop;

/// Helper that pins a closure to the [`TriggerCallback`] signature, so its
/// argument and return types are inferred without annotations.
pub fn decision<F>(f: F) -> F
where
    F: FnMut(TaskData, &dyn DataStore, &ChangeEvent) -> anyhow::Result<Option<DispatchRequest>>
        + Send,
{
    f
}

use crate::data::{DataStore, TaskData};
use crate::source::ChangeEvent;

pub use self::core::{EventAction, RunSummary, TriggerCore};
pub use dispatch::{DispatchRequest, TriggerCallback};
pub use launcher::{LaunchFuture, LoggingLauncher, WorkflowLauncher};
pub use params::{Param, TaskParameters, TriggerTaskConfig, DEFAULT_STOP_CHECK_EVERY};
pub use signal::{StopFlag, StopSignal};
pub use task::PvTriggerTask;
pub use trigger_loop::{TriggerContext, TriggerLoop};
pub use crate::types::DrainOrder;

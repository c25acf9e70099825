// src/engine/task.rs

use std::fmt;

use tracing::info;

use crate::errors::Result;

use super::core::RunSummary;
use super::dispatch::TriggerCallback;
use super::launcher::WorkflowLauncher;
use super::params::TaskParameters;
use super::trigger_loop::{TriggerContext, TriggerLoop};

/// Task that launches workflows when a monitored value changes.
///
/// Constructed by the workflow-definition layer with a name, its parameters
/// and a decision callback. [`PvTriggerTask::run`] resolves the parameters
/// against the run-time context, subscribes, and keeps processing changes
/// until the stop signal is observed.
pub struct PvTriggerTask {
    name: String,
    params: TaskParameters,
    callback: Box<dyn TriggerCallback>,
}

impl fmt::Debug for PvTriggerTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PvTriggerTask")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl PvTriggerTask {
    pub fn new(
        name: impl Into<String>,
        params: TaskParameters,
        callback: impl TriggerCallback + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            callback: Box::new(callback),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &TaskParameters {
        &self.params
    }

    /// Run the task to completion: INIT, RUNNING, TEARDOWN.
    ///
    /// Parameter or subscription failures are returned before any pass
    /// runs. Callback and launch failures are returned after the
    /// subscription has been released.
    pub async fn run<L: WorkflowLauncher>(self, ctx: TriggerContext<L>) -> Result<RunSummary> {
        let config = self.params.resolve(&ctx.data, ctx.store.as_ref())?;
        info!(task = %self.name, source = %config.source_name, "starting trigger task");

        TriggerLoop::start(self.name, config, self.callback, ctx)?
            .run()
            .await
    }
}

// src/engine/trigger_loop.rs

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::data::{DataStore, TaskData};
use crate::errors::{PvTriggerError, Result};
use crate::source::{EventQueue, Subscription, ValueSource};

use super::core::{EventAction, RunSummary, TriggerCore};
use super::dispatch::{DispatchRequest, TriggerCallback};
use super::launcher::WorkflowLauncher;
use super::params::TriggerTaskConfig;
use super::signal::StopSignal;

/// Run-time context a trigger task executes in.
pub struct TriggerContext<L> {
    /// The task's data payload; each callback invocation gets a copy.
    pub data: TaskData,
    pub store: Arc<dyn DataStore>,
    pub signal: Arc<dyn StopSignal>,
    pub source: Arc<dyn ValueSource>,
    pub launcher: L,
}

impl<L> fmt::Debug for TriggerContext<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerContext")
            .field("data", &self.data)
            .field("store", &self.store)
            .field("signal", &self.signal)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// A subscribed trigger loop.
///
/// Owns the subscription for its whole lifetime: [`TriggerLoop::run`]
/// releases it on every exit path, and dropping an unfinished loop (e.g. a
/// cancelled future) releases it through the subscription guard.
pub struct TriggerLoop<L: WorkflowLauncher> {
    task_name: String,
    config: TriggerTaskConfig,
    core: TriggerCore,
    queue: EventQueue,
    subscription: Subscription,
    callback: Box<dyn TriggerCallback>,
    data: TaskData,
    store: Arc<dyn DataStore>,
    signal: Arc<dyn StopSignal>,
    launcher: L,
}

impl<L: WorkflowLauncher> fmt::Debug for TriggerLoop<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerLoop")
            .field("task", &self.task_name)
            .field("config", &self.config)
            .field("core", &self.core)
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

impl<L: WorkflowLauncher> TriggerLoop<L> {
    /// INIT: subscribe to the configured source.
    ///
    /// Fails with `SourceUnavailable` before any pass runs if the source
    /// rejects the subscription.
    pub fn start(
        task_name: impl Into<String>,
        config: TriggerTaskConfig,
        callback: Box<dyn TriggerCallback>,
        ctx: TriggerContext<L>,
    ) -> Result<Self> {
        let task_name = task_name.into();
        let queue = EventQueue::new();
        let subscription = Subscription::open(ctx.source, &config.source_name, queue.clone())?;

        info!(
            task = %task_name,
            source = %config.source_name,
            poll_interval = ?config.poll_interval,
            stop_check_every = config.stop_check_every,
            skip_initial_callback = config.skip_initial_callback,
            drain_order = ?config.drain_order,
            "trigger loop started"
        );

        Ok(Self {
            core: TriggerCore::new(&config),
            task_name,
            config,
            queue,
            subscription,
            callback,
            data: ctx.data,
            store: ctx.store,
            signal: ctx.signal,
            launcher: ctx.launcher,
        })
    }

    pub fn config(&self) -> &TriggerTaskConfig {
        &self.config
    }

    /// RUNNING until the stop signal is observed or an error occurs, then
    /// TEARDOWN. The subscription is released before any error is returned.
    pub async fn run(mut self) -> Result<RunSummary> {
        let outcome = self.run_passes().await;

        // Unsubscribe first so nothing is appended after the queue is cleared.
        self.subscription.close();
        let discarded = self.queue.clear();
        if discarded > 0 {
            debug!(task = %self.task_name, discarded, "dropping events still queued at teardown");
        }
        self.core.record_discarded(discarded);

        let summary = self.core.summary();
        match &outcome {
            Ok(()) => info!(task = %self.task_name, ?summary, "trigger loop stopped"),
            Err(err) => warn!(task = %self.task_name, error = %err, ?summary, "trigger loop failed"),
        }
        outcome.map(|()| summary)
    }

    async fn run_passes(&mut self) -> Result<()> {
        loop {
            match self.config.poll_interval {
                Some(interval) => tokio::time::sleep(interval).await,
                // Passes run back to back, but other tasks on the runtime
                // still get to make progress.
                None => tokio::task::yield_now().await,
            }

            if self.core.begin_pass() && self.signal.is_stop_requested() {
                info!(task = %self.task_name, "stop requested");
                return Ok(());
            }

            self.drain().await?;
        }
    }

    /// Process events until the queue is empty, including events that arrive
    /// while draining.
    async fn drain(&mut self) -> Result<()> {
        while let Some(queued) = self.queue.pop(self.config.drain_order) {
            let event = match self.core.admit(queued) {
                EventAction::Skip => continue,
                EventAction::Invoke(event) => event,
            };

            debug!(task = %self.task_name, fields = ?event.fields(), "invoking decision callback");
            let request = self
                .callback
                .on_change(self.data.clone(), self.store.as_ref(), &event)
                .map_err(|source| PvTriggerError::CallbackFailure {
                    task: self.task_name.clone(),
                    source,
                })?;

            self.core.record_callback(request.is_some());
            if let Some(request) = request {
                self.dispatch(request).await?;
            }
        }
        Ok(())
    }

    /// Launch every workflow of `request` in order. Stops at the first
    /// failed launch; the remaining workflows are not launched.
    async fn dispatch(&mut self, request: DispatchRequest) -> Result<()> {
        if request.workflows.is_empty() {
            debug!(task = %self.task_name, "dispatch request names no workflows");
            return Ok(());
        }

        debug!(task = %self.task_name, workflows = ?request.workflows, "dispatching workflows");
        for workflow in &request.workflows {
            self.launcher
                .launch(workflow, request.data.clone())
                .await
                .map_err(|source| PvTriggerError::DispatchFailure {
                    workflow: workflow.clone(),
                    source,
                })?;
            self.core.record_launch();
            info!(task = %self.task_name, %workflow, "workflow launch requested");
        }
        Ok(())
    }
}

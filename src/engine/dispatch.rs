// src/engine/dispatch.rs

use crate::data::{DataStore, TaskData};
use crate::source::ChangeEvent;

/// Request returned by a decision callback to launch downstream workflows.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    /// Data handed to every launched workflow.
    pub data: TaskData,
    /// Workflows to launch, in this order.
    pub workflows: Vec<String>,
}

impl DispatchRequest {
    pub fn new(data: TaskData) -> Self {
        Self {
            data,
            workflows: Vec::new(),
        }
    }

    pub fn launch(mut self, workflow: impl Into<String>) -> Self {
        self.workflows.push(workflow.into());
        self
    }

    pub fn with_workflows<I, S>(data: TaskData, workflows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data,
            workflows: workflows.into_iter().map(Into::into).collect(),
        }
    }
}

/// User-supplied decision function, invoked once per processed change event
/// on the trigger loop.
///
/// Receives its own copy of the task data, the shared store, and the event.
/// Returning `Ok(None)` means "nothing to launch"; an `Err` stops the task.
pub trait TriggerCallback: Send {
    fn on_change(
        &mut self,
        data: TaskData,
        store: &dyn DataStore,
        event: &ChangeEvent,
    ) -> anyhow::Result<Option<DispatchRequest>>;
}

impl<F> TriggerCallback for F
where
    F: FnMut(TaskData, &dyn DataStore, &ChangeEvent) -> anyhow::Result<Option<DispatchRequest>>
        + Send,
{
    fn on_change(
        &mut self,
        data: TaskData,
        store: &dyn DataStore,
        event: &ChangeEvent,
    ) -> anyhow::Result<Option<DispatchRequest>> {
        self(data, store, event)
    }
}

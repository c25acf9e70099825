// src/engine/launcher.rs

//! Pluggable workflow launcher abstraction.
//!
//! The trigger loop hands launch requests to a `WorkflowLauncher` instead of
//! talking to an orchestrator directly. Production code wires in whatever
//! schedules downstream workflows; tests provide a recording fake.
//!
//! - `LoggingLauncher` is the implementation used by the `pvtrigger` binary.
//!   It does not schedule anything and just reports each launch.

use std::future::Future;
use std::pin::Pin;

use tracing::info;

use crate::data::TaskData;
use crate::errors::Error;

/// Boxed future returned by [`WorkflowLauncher::launch`].
pub type LaunchFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'a>>;

/// Starts downstream workflows. Fire-and-forget from the loop's perspective:
/// only success or failure of the hand-off is observed.
pub trait WorkflowLauncher: Send {
    fn launch(&mut self, workflow: &str, payload: TaskData) -> LaunchFuture<'_>;
}

/// Launcher that logs each request (and the payload fields) instead of
/// starting anything.
#[derive(Debug, Default)]
pub struct LoggingLauncher {
    launched: usize,
}

impl LoggingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launched(&self) -> usize {
        self.launched
    }
}

impl WorkflowLauncher for LoggingLauncher {
    fn launch(&mut self, workflow: &str, payload: TaskData) -> LaunchFuture<'_> {
        let workflow = workflow.to_string();
        self.launched += 1;

        Box::pin(async move {
            let name = payload.get("pv_name").map(|v| v.to_string());
            let value = payload.get("pv_value").map(|v| v.to_string());
            let keys: Vec<&str> = payload.iter().map(|(k, _)| k.as_str()).collect();
            info!(
                %workflow,
                pv_name = name.as_deref().unwrap_or("-"),
                pv_value = value.as_deref().unwrap_or("-"),
                ?keys,
                "workflow launched"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logging_launcher_counts_launches() {
        let mut launcher = LoggingLauncher::new();
        let mut payload = TaskData::new();
        payload.insert("pv_name", "PV:X");
        payload.insert("pv_value", 2.5);

        launcher.launch("pv_action_dag", payload.clone()).await.unwrap();
        launcher.launch("pv_printout", payload).await.unwrap();

        assert_eq!(launcher.launched(), 2);
    }
}

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use pvtrigger::data::TaskData;
use pvtrigger::engine::{LaunchFuture, WorkflowLauncher};

/// One recorded launch call.
#[derive(Debug, Clone, PartialEq)]
pub struct Launch {
    pub workflow: String,
    pub payload: TaskData,
}

/// A fake launcher that:
/// - records every launch call in order
/// - fails launches of one configured workflow name, if any.
#[derive(Debug, Clone, Default)]
pub struct RecordingLauncher {
    launches: Arc<Mutex<Vec<Launch>>>,
    fail_on: Option<String>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject launches of `workflow` with an error.
    pub fn failing_on(workflow: &str) -> Self {
        Self {
            fail_on: Some(workflow.to_string()),
            ..Self::default()
        }
    }

    /// Shared handle onto the recorded launches; stays valid after the
    /// launcher has been moved into a trigger loop.
    pub fn launches(&self) -> Arc<Mutex<Vec<Launch>>> {
        Arc::clone(&self.launches)
    }

    pub fn workflows(&self) -> Vec<String> {
        self.launches
            .lock()
            .unwrap()
            .iter()
            .map(|l| l.workflow.clone())
            .collect()
    }
}

impl WorkflowLauncher for RecordingLauncher {
    fn launch(&mut self, workflow: &str, payload: TaskData) -> LaunchFuture<'_> {
        let workflow = workflow.to_string();
        let launches = Arc::clone(&self.launches);
        let fail = self.fail_on.as_deref() == Some(workflow.as_str());

        Box::pin(async move {
            if fail {
                return Err(anyhow!("orchestrator rejected workflow '{workflow}'"));
            }
            launches.lock().unwrap().push(Launch { workflow, payload });
            Ok(())
        })
    }
}

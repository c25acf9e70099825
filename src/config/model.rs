// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::data::{DataStore, TaskData};
use crate::engine::{Param, TaskParameters};
use crate::types::DrainOrder;

/// Data store key holding the monitored value's name when it is supplied as
/// a workflow argument rather than in the config file.
pub const PVNAME_KEY: &str = "pvname";

/// Raw configuration as read from a TOML file, before validation.
///
/// ```toml
/// [trigger]
/// poll_interval = "100ms"
/// stop_check_every = 2
/// skip_initial_callback = true
///
/// [action]
/// center = 3.0
/// tolerance = 2.0
/// workflows = ["pv_action_dag"]
///
/// [simulate]
/// initial = 5.0
/// values = [2.5, 10.0]
/// interval = "200ms"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub trigger: RawTriggerSection,

    #[serde(default)]
    pub action: ActionSection,

    #[serde(default)]
    pub simulate: RawSimulateSection,
}

/// `[trigger]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTriggerSection {
    /// Name reported in logs and errors.
    #[serde(default = "default_task_name")]
    pub task_name: String,

    /// Monitored value. If absent, the name is looked up in the data store
    /// under `pvname` (set from `--pvname`) when the task starts.
    #[serde(default)]
    pub source_name: Option<String>,

    /// Sleep between passes, e.g. `"100ms"`. Absent means no sleep.
    #[serde(default)]
    pub poll_interval: Option<String>,

    #[serde(default = "default_stop_check_every")]
    pub stop_check_every: u32,

    #[serde(default = "default_true")]
    pub skip_initial_callback: bool,

    #[serde(default)]
    pub drain_order: DrainOrder,
}

impl Default for RawTriggerSection {
    fn default() -> Self {
        Self {
            task_name: default_task_name(),
            source_name: None,
            poll_interval: None,
            stop_check_every: default_stop_check_every(),
            skip_initial_callback: true,
            drain_order: DrainOrder::default(),
        }
    }
}

/// `[action]` section: launch `workflows` when the new value lies within
/// `center ± tolerance` (exclusive).
#[derive(Debug, Clone, Deserialize)]
pub struct ActionSection {
    #[serde(default = "default_center")]
    pub center: f64,

    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    #[serde(default = "default_workflows")]
    pub workflows: Vec<String>,
}

impl Default for ActionSection {
    fn default() -> Self {
        Self {
            center: default_center(),
            tolerance: default_tolerance(),
            workflows: default_workflows(),
        }
    }
}

/// `[simulate]` section: scripted values posted to the simulated source.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSimulateSection {
    #[serde(default)]
    pub initial: f64,

    #[serde(default)]
    pub values: Vec<f64>,

    #[serde(default = "default_simulate_interval")]
    pub interval: String,

    /// Request a stop once every scripted value has been posted.
    #[serde(default = "default_true")]
    pub stop_when_done: bool,
}

impl Default for RawSimulateSection {
    fn default() -> Self {
        Self {
            initial: 0.0,
            values: Vec::new(),
            interval: default_simulate_interval(),
            stop_when_done: true,
        }
    }
}

fn default_task_name() -> String {
    "monitor_task".to_string()
}

fn default_stop_check_every() -> u32 {
    crate::engine::DEFAULT_STOP_CHECK_EVERY
}

fn default_true() -> bool {
    true
}

fn default_center() -> f64 {
    3.0
}

fn default_tolerance() -> f64 {
    2.0
}

fn default_workflows() -> Vec<String> {
    vec!["pv_action_dag".to_string()]
}

fn default_simulate_interval() -> String {
    "500ms".to_string()
}

/// Validated configuration. Only constructible through
/// `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub trigger: TriggerSection,
    pub action: ActionSection,
    pub simulate: SimulateSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        trigger: TriggerSection,
        action: ActionSection,
        simulate: SimulateSection,
    ) -> Self {
        Self {
            trigger,
            action,
            simulate,
        }
    }
}

/// Validated `[trigger]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSection {
    pub task_name: String,
    pub source_name: Option<String>,
    pub poll_interval: Option<Duration>,
    pub stop_check_every: u32,
    pub skip_initial_callback: bool,
    pub drain_order: DrainOrder,
}

/// Validated `[simulate]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulateSection {
    pub initial: f64,
    pub values: Vec<f64>,
    pub interval: Duration,
    pub stop_when_done: bool,
}

impl ConfigFile {
    /// Trigger task parameters described by `[trigger]`.
    ///
    /// Without an explicit `source_name`, the name is read from the data
    /// store key `pvname` when the task starts.
    pub fn task_parameters(&self) -> TaskParameters {
        let source_name = match &self.trigger.source_name {
            Some(name) => Param::Value(name.clone()),
            None => Param::computed(|_data: &TaskData, store: &dyn DataStore| {
                store
                    .get(PVNAME_KEY)
                    .and_then(|v| v.as_str().map(str::to_string))
                    .ok_or_else(|| {
                        anyhow::anyhow!("no source_name configured and '{PVNAME_KEY}' not set in store")
                    })
            }),
        };

        TaskParameters::new(source_name)
            .poll_interval(self.trigger.poll_interval)
            .stop_check_every(self.trigger.stop_check_every)
            .skip_initial_callback(self.trigger.skip_initial_callback)
            .drain_order(self.trigger.drain_order)
    }
}

// src/action.rs

//! Range-check decision used by the `pvtrigger` binary.
//!
//! When a change arrives whose value lies strictly within
//! `center ± tolerance`, the PV's name and value are recorded in the payload
//! (`pv_name`, `pv_value`) and the configured workflows are launched with it.

use anyhow::anyhow;
use tracing::debug;

use crate::config::ActionSection;
use crate::data::{DataStore, TaskData};
use crate::engine::{DispatchRequest, TriggerCallback};
use crate::source::ChangeEvent;

#[derive(Debug, Clone, PartialEq)]
pub struct RangeAction {
    pub center: f64,
    pub tolerance: f64,
    pub workflows: Vec<String>,
}

impl RangeAction {
    pub fn new(center: f64, tolerance: f64, workflows: Vec<String>) -> Self {
        Self {
            center,
            tolerance,
            workflows,
        }
    }

    pub fn in_range(&self, value: f64) -> bool {
        (value - self.center).abs() < self.tolerance
    }
}

impl From<&ActionSection> for RangeAction {
    fn from(section: &ActionSection) -> Self {
        Self::new(section.center, section.tolerance, section.workflows.clone())
    }
}

impl TriggerCallback for RangeAction {
    fn on_change(
        &mut self,
        mut data: TaskData,
        _store: &dyn DataStore,
        event: &ChangeEvent,
    ) -> anyhow::Result<Option<DispatchRequest>> {
        let value = event
            .value_f64()
            .ok_or_else(|| anyhow!("change event has no numeric value: {:?}", event.value()))?;
        let pvname = event.pvname().unwrap_or_default();

        debug!(pv = pvname, value, center = self.center, "checking value against range");
        if !self.in_range(value) {
            return Ok(None);
        }

        data.insert("pv_name", pvname);
        data.insert("pv_value", value);
        Ok(Some(DispatchRequest::with_workflows(data, self.workflows.iter().cloned())))
    }
}

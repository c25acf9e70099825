// src/config/validate.rs

use crate::config::duration::parse_duration;
use crate::config::model::{
    ActionSection, ConfigFile, RawConfigFile, RawSimulateSection, RawTriggerSection,
    SimulateSection, TriggerSection,
};
use crate::errors::{PvTriggerError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PvTriggerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let trigger = validate_trigger(raw.trigger)?;
        validate_action(&raw.action)?;
        let simulate = validate_simulate(raw.simulate)?;
        Ok(ConfigFile::new_unchecked(trigger, raw.action, simulate))
    }
}

fn config_error(msg: impl Into<String>) -> PvTriggerError {
    PvTriggerError::ConfigError(msg.into())
}

fn validate_trigger(raw: RawTriggerSection) -> Result<TriggerSection> {
    if raw.task_name.trim().is_empty() {
        return Err(config_error("[trigger].task_name must not be empty"));
    }

    if let Some(name) = raw.source_name.as_deref() {
        if name.trim().is_empty() {
            return Err(config_error(
                "[trigger].source_name must not be empty (omit it to use --pvname)",
            ));
        }
    }

    if raw.stop_check_every == 0 {
        return Err(config_error("[trigger].stop_check_every must be >= 1 (got 0)"));
    }

    let poll_interval = raw
        .poll_interval
        .as_deref()
        .map(parse_duration)
        .transpose()
        .map_err(|e| config_error(format!("[trigger].poll_interval: {e}")))?;

    Ok(TriggerSection {
        task_name: raw.task_name,
        source_name: raw.source_name,
        poll_interval,
        stop_check_every: raw.stop_check_every,
        skip_initial_callback: raw.skip_initial_callback,
        drain_order: raw.drain_order,
    })
}

fn validate_action(action: &ActionSection) -> Result<()> {
    if !action.center.is_finite() {
        return Err(config_error("[action].center must be a finite number"));
    }
    if !(action.tolerance.is_finite() && action.tolerance > 0.0) {
        return Err(config_error(format!(
            "[action].tolerance must be a positive number (got {})",
            action.tolerance
        )));
    }
    if action.workflows.is_empty() {
        return Err(config_error("[action].workflows must name at least one workflow"));
    }
    if let Some(blank) = action.workflows.iter().position(|w| w.trim().is_empty()) {
        return Err(config_error(format!("[action].workflows[{blank}] is empty")));
    }
    Ok(())
}

fn validate_simulate(raw: RawSimulateSection) -> Result<SimulateSection> {
    let interval = parse_duration(&raw.interval)
        .map_err(|e| config_error(format!("[simulate].interval: {e}")))?;

    Ok(SimulateSection {
        initial: raw.initial,
        values: raw.values,
        interval,
        stop_when_done: raw.stop_when_done,
    })
}

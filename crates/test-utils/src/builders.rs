#![allow(dead_code)]

use pvtrigger::config::{ConfigFile, RawConfigFile};
use pvtrigger::types::DrainOrder;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn source_name(mut self, name: &str) -> Self {
        self.config.trigger.source_name = Some(name.to_string());
        self
    }

    pub fn poll_interval(mut self, interval: &str) -> Self {
        self.config.trigger.poll_interval = Some(interval.to_string());
        self
    }

    pub fn stop_check_every(mut self, passes: u32) -> Self {
        self.config.trigger.stop_check_every = passes;
        self
    }

    pub fn skip_initial_callback(mut self, skip: bool) -> Self {
        self.config.trigger.skip_initial_callback = skip;
        self
    }

    pub fn drain_order(mut self, order: DrainOrder) -> Self {
        self.config.trigger.drain_order = order;
        self
    }

    pub fn action(mut self, center: f64, tolerance: f64, workflows: &[&str]) -> Self {
        self.config.action.center = center;
        self.config.action.tolerance = tolerance;
        self.config.action.workflows = workflows.iter().map(|w| w.to_string()).collect();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

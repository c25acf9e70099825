// src/engine/params.rs

//! Task parameters and their one-time resolution into a [`TriggerTaskConfig`].
//!
//! Every parameter is either a literal or a function of the task data and
//! the shared store, e.g. a source name looked up from an argument that was
//! stored when the workflow was started.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::data::{DataStore, TaskData};
use crate::errors::{PvTriggerError, Result};
use crate::types::DrainOrder;

/// Default number of passes between two stop-signal checks.
pub const DEFAULT_STOP_CHECK_EVERY: u32 = 2;

pub type Resolver<T> = Arc<dyn Fn(&TaskData, &dyn DataStore) -> anyhow::Result<T> + Send + Sync>;

/// A literal value or a function of the run-time context.
pub enum Param<T> {
    Value(T),
    Computed(Resolver<T>),
}

impl<T: Clone> Param<T> {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&TaskData, &dyn DataStore) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Param::Computed(Arc::new(f))
    }

    pub fn resolve(&self, data: &TaskData, store: &dyn DataStore) -> anyhow::Result<T> {
        match self {
            Param::Value(v) => Ok(v.clone()),
            Param::Computed(f) => f(data, store),
        }
    }
}

impl<T: Clone> Clone for Param<T> {
    fn clone(&self) -> Self {
        match self {
            Param::Value(v) => Param::Value(v.clone()),
            Param::Computed(f) => Param::Computed(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Param<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Param::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl<T> From<T> for Param<T> {
    fn from(value: T) -> Self {
        Param::Value(value)
    }
}

impl From<&str> for Param<String> {
    fn from(value: &str) -> Self {
        Param::Value(value.to_string())
    }
}

/// Unresolved parameters of a trigger task.
#[derive(Debug, Clone)]
pub struct TaskParameters {
    pub source_name: Param<String>,
    pub poll_interval: Param<Option<Duration>>,
    pub stop_check_every: Param<u32>,
    pub skip_initial_callback: Param<bool>,
    pub drain_order: Param<DrainOrder>,
}

impl TaskParameters {
    /// Parameters with the defaults: no sleep between passes, stop check
    /// every [`DEFAULT_STOP_CHECK_EVERY`] passes, initial notification
    /// skipped, newest-first draining.
    pub fn new(source_name: impl Into<Param<String>>) -> Self {
        Self {
            source_name: source_name.into(),
            poll_interval: Param::Value(None),
            stop_check_every: Param::Value(DEFAULT_STOP_CHECK_EVERY),
            skip_initial_callback: Param::Value(true),
            drain_order: Param::Value(DrainOrder::default()),
        }
    }

    pub fn poll_interval(mut self, interval: impl Into<Param<Option<Duration>>>) -> Self {
        self.poll_interval = interval.into();
        self
    }

    pub fn stop_check_every(mut self, passes: impl Into<Param<u32>>) -> Self {
        self.stop_check_every = passes.into();
        self
    }

    pub fn skip_initial_callback(mut self, skip: impl Into<Param<bool>>) -> Self {
        self.skip_initial_callback = skip.into();
        self
    }

    pub fn drain_order(mut self, order: impl Into<Param<DrainOrder>>) -> Self {
        self.drain_order = order.into();
        self
    }

    /// Evaluate every parameter once against the current context.
    pub fn resolve(&self, data: &TaskData, store: &dyn DataStore) -> Result<TriggerTaskConfig> {
        let config = TriggerTaskConfig {
            source_name: resolve_field("source_name", &self.source_name, data, store)?,
            poll_interval: resolve_field("poll_interval", &self.poll_interval, data, store)?,
            stop_check_every: resolve_field("stop_check_every", &self.stop_check_every, data, store)?,
            skip_initial_callback: resolve_field(
                "skip_initial_callback",
                &self.skip_initial_callback,
                data,
                store,
            )?,
            drain_order: resolve_field("drain_order", &self.drain_order, data, store)?,
        };
        config.validate()?;
        debug!(?config, "resolved trigger task parameters");
        Ok(config)
    }
}

fn resolve_field<T: Clone>(
    field: &str,
    param: &Param<T>,
    data: &TaskData,
    store: &dyn DataStore,
) -> Result<T> {
    param
        .resolve(data, store)
        .map_err(|err| PvTriggerError::ParameterError(format!("resolving '{field}': {err:#}")))
}

/// Immutable configuration of one trigger task invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerTaskConfig {
    /// Name of the monitored value.
    pub source_name: String,
    /// Sleep before each pass; `None` means passes run back to back.
    pub poll_interval: Option<Duration>,
    /// Passes between two queries of the stop signal (>= 1).
    pub stop_check_every: u32,
    /// Swallow the first notification after subscribing.
    pub skip_initial_callback: bool,
    pub drain_order: DrainOrder,
}

impl TriggerTaskConfig {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            poll_interval: None,
            stop_check_every: DEFAULT_STOP_CHECK_EVERY,
            skip_initial_callback: true,
            drain_order: DrainOrder::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_name.trim().is_empty() {
            return Err(PvTriggerError::ParameterError(
                "source_name must not be empty".to_string(),
            ));
        }
        if self.stop_check_every == 0 {
            return Err(PvTriggerError::ParameterError(
                "stop_check_every must be >= 1 (got 0)".to_string(),
            ));
        }
        Ok(())
    }

    /// Upper bound on the time between a stop request and the loop noticing
    /// it, ignoring the time spent draining. `None` when passes do not sleep.
    pub fn stop_latency_bound(&self) -> Option<Duration> {
        self.poll_interval.map(|p| p * self.stop_check_every)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryStore;
    use serde_json::Value;

    #[test]
    fn literals_resolve_with_defaults() {
        let store = MemoryStore::new();
        let cfg = TaskParameters::new("SR:CURRENT")
            .resolve(&TaskData::new(), &store)
            .unwrap();

        assert_eq!(cfg, TriggerTaskConfig::new("SR:CURRENT"));
        assert_eq!(cfg.stop_check_every, 2);
        assert!(cfg.skip_initial_callback);
        assert_eq!(cfg.stop_latency_bound(), None);
    }

    #[test]
    fn computed_source_name_reads_store() {
        let store = MemoryStore::new().with("pvname", "BR:TEMP");
        let params = TaskParameters::new(Param::computed(|_data: &TaskData, store: &dyn DataStore| {
            store
                .get("pvname")
                .and_then(|v| v.as_str().map(str::to_string))
                .ok_or_else(|| anyhow::anyhow!("pvname not set"))
        }))
        .poll_interval(Some(Duration::from_millis(100)))
        .stop_check_every(3_u32);

        let cfg = params.resolve(&TaskData::new(), &store).unwrap();
        assert_eq!(cfg.source_name, "BR:TEMP");
        assert_eq!(cfg.stop_latency_bound(), Some(Duration::from_millis(300)));
    }

    #[test]
    fn failing_resolver_is_parameter_error() {
        let store = MemoryStore::new();
        let params = TaskParameters::new(Param::computed(|_: &TaskData, s: &dyn DataStore| {
            match s.get("pvname") {
                Some(Value::String(name)) => Ok(name),
                _ => Err(anyhow::anyhow!("pvname not set")),
            }
        }));

        let err = params.resolve(&TaskData::new(), &store).unwrap_err();
        match err {
            PvTriggerError::ParameterError(msg) => {
                assert!(msg.contains("source_name"));
                assert!(msg.contains("pvname not set"));
            }
            other => panic!("expected ParameterError, got {other:?}"),
        }
    }

    #[test]
    fn zero_stop_check_every_is_rejected() {
        let store = MemoryStore::new();
        let err = TaskParameters::new("PV")
            .stop_check_every(0_u32)
            .resolve(&TaskData::new(), &store)
            .unwrap_err();
        assert!(matches!(err, PvTriggerError::ParameterError(_)));
    }
}

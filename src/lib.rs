// src/lib.rs

pub mod action;
pub mod cli;
pub mod config;
pub mod data;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod source;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::action::RangeAction;
use crate::cli::CliArgs;
use crate::config::model::{ConfigFile, SimulateSection};
use crate::config::{load_and_validate, PVNAME_KEY};
use crate::data::{DataStore, MemoryStore, TaskData};
use crate::engine::{LoggingLauncher, PvTriggerTask, StopFlag, TriggerContext};
use crate::source::{SimulatedSource, ValueSource};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the data store (seeded with `--pvname`)
/// - a simulated source fed by the `[simulate]` script
/// - the trigger task with the `[action]` range check
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let store = Arc::new(MemoryStore::new());
    if let Some(pvname) = &args.pvname {
        store.set(PVNAME_KEY, json!(pvname));
    }

    let params = cfg.task_parameters();
    let data = TaskData::new();
    let resolved = params.resolve(&data, store.as_ref())?;

    if args.dry_run {
        print_dry_run(&cfg, &resolved);
        return Ok(());
    }

    let source = Arc::new(SimulatedSource::new());
    source.define(&resolved.source_name, cfg.simulate.initial);

    let signal = StopFlag::new();

    // Ctrl-C → graceful shutdown.
    {
        let signal = signal.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl-C received; requesting stop");
            signal.request_stop();
        });
    }

    let script = spawn_script(
        Arc::clone(&source),
        resolved.source_name.clone(),
        cfg.simulate.clone(),
        signal.clone(),
    );

    let task = PvTriggerTask::new(
        cfg.trigger.task_name.clone(),
        params,
        RangeAction::from(&cfg.action),
    );

    let source: Arc<dyn ValueSource> = source;
    let store: Arc<dyn DataStore> = store;
    let ctx = TriggerContext {
        data,
        store,
        signal: Arc::new(signal),
        source,
        launcher: LoggingLauncher::new(),
    };

    let summary = task.run(ctx).await;
    script.abort();

    let summary = summary?;
    info!(?summary, "pvtrigger finished");
    println!(
        "processed {} change(s), skipped {}, launched {} workflow(s)",
        summary.callbacks_invoked, summary.events_skipped, summary.workflows_launched
    );
    Ok(())
}

/// Post the scripted values to the simulated source, one per interval.
fn spawn_script(
    source: Arc<SimulatedSource>,
    pvname: String,
    script: SimulateSection,
    signal: StopFlag,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        for value in &script.values {
            tokio::time::sleep(script.interval).await;
            debug!(pv = %pvname, value, "posting scripted value");
            if let Err(err) = source.post(&pvname, *value) {
                warn!(error = %err, "failed to post scripted value; stopping script");
                return;
            }
        }

        if script.stop_when_done {
            // Give the last value time to be processed before stopping.
            tokio::time::sleep(script.interval).await;
            info!("script finished; requesting stop");
            signal.request_stop();
        }
    })
}

/// Simple dry-run output: print the resolved trigger settings.
fn print_dry_run(cfg: &ConfigFile, resolved: &engine::TriggerTaskConfig) {
    println!("pvtrigger dry-run");
    println!("  task: {}", cfg.trigger.task_name);
    println!("  source_name: {}", resolved.source_name);
    match resolved.poll_interval {
        Some(interval) => println!("  poll_interval: {interval:?}"),
        None => println!("  poll_interval: none"),
    }
    println!("  stop_check_every: {}", resolved.stop_check_every);
    println!("  skip_initial_callback: {}", resolved.skip_initial_callback);
    println!("  drain_order: {:?}", resolved.drain_order);
    if let Some(bound) = resolved.stop_latency_bound() {
        println!("  stop latency bound: {bound:?}");
    }
    println!();
    println!(
        "action: launch {:?} when |value - {}| < {}",
        cfg.action.workflows, cfg.action.center, cfg.action.tolerance
    );
    println!(
        "simulate: initial = {}, {} scripted value(s) every {:?}",
        cfg.simulate.initial,
        cfg.simulate.values.len(),
        cfg.simulate.interval
    );

    debug!("dry-run complete (no subscription)");
}

// tests/trigger_loop.rs

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use serde_json::json;

use pvtrigger::data::{MemoryStore, TaskData};
use pvtrigger::engine::{
    decision, DispatchRequest, DrainOrder, StopFlag, StopSignal, TriggerCallback,
    TriggerContext, TriggerLoop, TriggerTaskConfig,
};
use pvtrigger::errors::PvTriggerError;
use pvtrigger_test_utils::fake_launcher::RecordingLauncher;
use pvtrigger_test_utils::init_tracing;
use pvtrigger_test_utils::manual_source::ManualSource;
use pvtrigger_test_utils::stop::StopAfterChecks;
use pvtrigger_test_utils::with_timeout;

type TestResult = Result<(), Box<dyn Error>>;

const PV: &str = "TEST:PV";

fn config(stop_check_every: u32, skip: bool) -> TriggerTaskConfig {
    TriggerTaskConfig {
        stop_check_every,
        skip_initial_callback: skip,
        ..TriggerTaskConfig::new(PV)
    }
}

fn context(
    source: &Arc<ManualSource>,
    signal: impl StopSignal + 'static,
    launcher: RecordingLauncher,
) -> TriggerContext<RecordingLauncher> {
    TriggerContext {
        data: TaskData::new(),
        store: Arc::new(MemoryStore::new()),
        signal: Arc::new(signal),
        source: Arc::clone(source) as _,
        launcher,
    }
}

/// Decision callback that records each value it sees and never dispatches.
fn recorder(seen: Arc<Mutex<Vec<f64>>>) -> Box<dyn TriggerCallback> {
    Box::new(decision(move |_data, _store, event| {
        seen.lock().unwrap().push(event.value_f64().unwrap_or(f64::NAN));
        Ok(None)
    }))
}

#[tokio::test]
async fn queued_events_are_processed_newest_first() -> TestResult {
    init_tracing();

    let source = Arc::new(ManualSource::new().with_value(PV, 0.0).without_initial_notification());
    let seen = Arc::new(Mutex::new(Vec::new()));

    // Stop is reported at the first checkpoint, which with k = 2 comes after
    // exactly one drain pass.
    let trigger = TriggerLoop::start(
        "ordering",
        config(2, false),
        recorder(Arc::clone(&seen)),
        context(&source, StopAfterChecks::new(1), RecordingLauncher::new()),
    )?;
    source.emit(PV, 1.0);
    source.emit(PV, 2.0);
    source.emit(PV, 3.0);

    let summary = with_timeout(trigger.run()).await?;

    assert_eq!(*seen.lock().unwrap(), vec![3.0, 2.0, 1.0]);
    assert_eq!(summary.passes, 2);
    assert_eq!(summary.callbacks_invoked, 3);
    Ok(())
}

#[tokio::test]
async fn fifo_drain_order_processes_oldest_first() -> TestResult {
    init_tracing();

    let source = Arc::new(ManualSource::new().with_value(PV, 0.0).without_initial_notification());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let config = TriggerTaskConfig {
        drain_order: DrainOrder::Fifo,
        ..config(2, false)
    };
    let trigger = TriggerLoop::start(
        "fifo",
        config,
        recorder(Arc::clone(&seen)),
        context(&source, StopAfterChecks::new(1), RecordingLauncher::new()),
    )?;
    for v in [1.0, 2.0, 3.0] {
        source.emit(PV, v);
    }

    with_timeout(trigger.run()).await?;

    assert_eq!(*seen.lock().unwrap(), vec![1.0, 2.0, 3.0]);
    Ok(())
}

#[tokio::test]
async fn initial_notification_is_skipped_once() -> TestResult {
    init_tracing();

    // The source delivers the current value (5.0) as soon as we subscribe.
    let source = Arc::new(ManualSource::new().with_value(PV, 5.0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let trigger = TriggerLoop::start(
        "skip",
        config(2, true),
        recorder(Arc::clone(&seen)),
        context(&source, StopAfterChecks::new(1), RecordingLauncher::new()),
    )?;
    source.emit(PV, 2.5);
    source.emit(PV, 10.0);

    let summary = with_timeout(trigger.run()).await?;

    // Drained newest first; the initial 5.0 is the one that was swallowed.
    assert_eq!(*seen.lock().unwrap(), vec![10.0, 2.5]);
    assert_eq!(summary.events_received, 3);
    assert_eq!(summary.events_skipped, 1);
    assert_eq!(summary.callbacks_invoked, 2);
    Ok(())
}

#[tokio::test]
async fn initial_notification_is_processed_when_skip_disabled() -> TestResult {
    init_tracing();

    let source = Arc::new(ManualSource::new().with_value(PV, 5.0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let trigger = TriggerLoop::start(
        "no-skip",
        config(2, false),
        recorder(Arc::clone(&seen)),
        context(&source, StopAfterChecks::new(1), RecordingLauncher::new()),
    )?;

    let summary = with_timeout(trigger.run()).await?;

    assert_eq!(*seen.lock().unwrap(), vec![5.0]);
    assert_eq!(summary.events_skipped, 0);
    Ok(())
}

#[tokio::test]
async fn stop_signal_is_queried_every_k_passes() -> TestResult {
    init_tracing();

    let source = Arc::new(ManualSource::new().with_value(PV, 0.0));
    let signal = StopAfterChecks::new(3);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let trigger = TriggerLoop::start(
        "checks",
        config(4, true),
        recorder(Arc::clone(&seen)),
        context(&source, signal.clone(), RecordingLauncher::new()),
    )?;

    let summary = with_timeout(trigger.run()).await?;

    assert_eq!(signal.checks(), 3);
    assert_eq!(summary.stop_checks, 3);
    assert_eq!(summary.passes, 12);
    Ok(())
}

#[tokio::test]
async fn stop_is_observed_within_latency_bound_and_unsubscribes() -> TestResult {
    init_tracing();

    let source = Arc::new(ManualSource::new().with_value(PV, 0.0));
    let flag = StopFlag::new();
    let config = TriggerTaskConfig {
        poll_interval: Some(Duration::from_millis(10)),
        ..config(3, true)
    };

    let trigger = TriggerLoop::start(
        "latency",
        config,
        recorder(Arc::new(Mutex::new(Vec::new()))),
        context(&source, flag.clone(), RecordingLauncher::new()),
    )?;
    let bound = trigger
        .config()
        .stop_latency_bound()
        .expect("poll interval is set");
    let handle = tokio::spawn(trigger.run());

    tokio::time::sleep(Duration::from_millis(75)).await;
    assert_eq!(source.active_subscriptions(), 1);

    let requested = Instant::now();
    flag.request_stop();
    with_timeout(handle).await??;
    let elapsed = requested.elapsed();

    // Timer granularity on a loaded machine is generous; the bound is 30ms.
    assert!(
        elapsed < bound + Duration::from_millis(100),
        "stop took {elapsed:?}, bound {bound:?}"
    );
    assert_eq!(source.active_subscriptions(), 0);
    assert_eq!(source.unsubscribe_count(), 1);
    Ok(())
}

#[tokio::test]
async fn each_event_is_delivered_to_the_callback_at_most_once() -> TestResult {
    init_tracing();

    let source = Arc::new(ManualSource::new().with_value(PV, 0.0).without_initial_notification());
    let flag = StopFlag::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let trigger = TriggerLoop::start(
        "once",
        config(1, false),
        recorder(Arc::clone(&seen)),
        context(&source, flag.clone(), RecordingLauncher::new()),
    )?;
    let handle = tokio::spawn(trigger.run());

    // Emit from a plain thread, interleaved with many passes.
    let producer = {
        let source = Arc::clone(&source);
        std::thread::spawn(move || {
            for n in 0..200 {
                source.emit(PV, f64::from(n));
                if n % 20 == 0 {
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
        })
    };
    producer.join().expect("producer thread panicked");

    // Let the loop catch up before stopping.
    with_timeout(async {
        while seen.lock().unwrap().len() < 200 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
    flag.request_stop();
    let summary = with_timeout(handle).await??;

    let mut values = seen.lock().unwrap().clone();
    values.sort_by(f64::total_cmp);
    let expected: Vec<f64> = (0..200).map(f64::from).collect();
    assert_eq!(values, expected);
    assert_eq!(summary.callbacks_invoked, 200);
    assert_eq!(summary.events_discarded, 0);
    Ok(())
}

#[tokio::test]
async fn each_invocation_gets_its_own_copy_of_the_data() -> TestResult {
    init_tracing();

    let source = Arc::new(ManualSource::new().with_value(PV, 0.0).without_initial_notification());
    let observed = Arc::new(Mutex::new(Vec::new()));

    let callback = {
        let observed = Arc::clone(&observed);
        decision(move |mut data, _store, event| {
            observed.lock().unwrap().push(data.clone());
            // Mutations must stay local to this invocation.
            data.insert("touched", event.value_f64().unwrap_or_default());
            data.remove("base");
            Ok(Some(DispatchRequest::new(data).launch("wf")))
        })
    };

    let mut ctx = context(&source, StopAfterChecks::new(1), RecordingLauncher::new());
    ctx.data.insert("base", "original");
    let launches = ctx.launcher.launches();

    let trigger = TriggerLoop::start("isolation", config(2, false), Box::new(callback), ctx)?;
    source.emit(PV, 1.0);
    source.emit(PV, 2.0);
    with_timeout(trigger.run()).await?;

    let observed = observed.lock().unwrap();
    assert_eq!(observed.len(), 2);
    for data in observed.iter() {
        assert_eq!(data.get("base"), Some(&json!("original")));
        assert!(!data.contains_key("touched"));
    }

    let launches = launches.lock().unwrap();
    let touched: Vec<_> = launches.iter().map(|l| l.payload.get("touched").cloned()).collect();
    assert_eq!(touched, vec![Some(json!(2.0)), Some(json!(1.0))]);
    Ok(())
}

#[tokio::test]
async fn dispatch_launches_every_workflow_in_order_with_payload() -> TestResult {
    init_tracing();

    let source = Arc::new(ManualSource::new().with_value(PV, 0.0).without_initial_notification());
    let callback = decision(|mut data, _store, event| {
        data.insert("pv_value", event.value_f64().unwrap_or_default());
        Ok(Some(DispatchRequest::with_workflows(data, ["A", "B"])))
    });

    let launcher = RecordingLauncher::new();
    let launches = launcher.launches();
    let trigger = TriggerLoop::start(
        "fanout",
        config(2, false),
        Box::new(callback),
        context(&source, StopAfterChecks::new(1), launcher),
    )?;
    source.emit(PV, 4.0);

    let summary = with_timeout(trigger.run()).await?;

    let launches = launches.lock().unwrap();
    let names: Vec<_> = launches.iter().map(|l| l.workflow.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
    for launch in launches.iter() {
        assert_eq!(launch.payload.get("pv_value"), Some(&json!(4.0)));
    }
    assert_eq!(summary.dispatch_requests, 1);
    assert_eq!(summary.workflows_launched, 2);
    Ok(())
}

#[tokio::test]
async fn empty_dispatch_request_launches_nothing() -> TestResult {
    init_tracing();

    let source = Arc::new(ManualSource::new().with_value(PV, 0.0).without_initial_notification());
    let launcher = RecordingLauncher::new();
    let launches = launcher.launches();

    let trigger = TriggerLoop::start(
        "empty",
        config(2, false),
        Box::new(decision(|data, _store, _event| Ok(Some(DispatchRequest::new(data))))),
        context(&source, StopAfterChecks::new(1), launcher),
    )?;
    source.emit(PV, 1.0);

    let summary = with_timeout(trigger.run()).await?;

    assert!(launches.lock().unwrap().is_empty());
    assert_eq!(summary.dispatch_requests, 1);
    assert_eq!(summary.workflows_launched, 0);
    Ok(())
}

#[tokio::test]
async fn callback_failure_stops_the_task_and_unsubscribes() -> TestResult {
    init_tracing();

    let source = Arc::new(ManualSource::new().with_value(PV, 0.0).without_initial_notification());
    let calls = Arc::new(Mutex::new(0_usize));

    let callback = {
        let calls = Arc::clone(&calls);
        decision(move |_data, _store, event| {
            *calls.lock().unwrap() += 1;
            match event.value_f64() {
                Some(v) if v < 0.0 => Err(anyhow!("negative reading {v}")),
                _ => Ok(None),
            }
        })
    };

    let trigger = TriggerLoop::start(
        "failing-callback",
        config(1, false),
        Box::new(callback),
        context(&source, StopFlag::new(), RecordingLauncher::new()),
    )?;
    source.emit(PV, 1.0);
    source.emit(PV, -1.0);

    let err = with_timeout(trigger.run()).await.unwrap_err();

    match err {
        PvTriggerError::CallbackFailure { task, source: cause } => {
            assert_eq!(task, "failing-callback");
            assert!(cause.to_string().contains("negative reading"));
        }
        other => panic!("expected CallbackFailure, got {other:?}"),
    }
    // Newest first: -1.0 fails before 1.0 is looked at.
    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(source.active_subscriptions(), 0);
    assert_eq!(source.unsubscribe_count(), 1);
    Ok(())
}

#[tokio::test]
async fn dispatch_failure_skips_remaining_workflows_and_unsubscribes() -> TestResult {
    init_tracing();

    let source = Arc::new(ManualSource::new().with_value(PV, 0.0).without_initial_notification());
    let launcher = RecordingLauncher::failing_on("B");
    let recorded = launcher.clone();

    let trigger = TriggerLoop::start(
        "failing-launch",
        config(1, false),
        Box::new(decision(|data, _store, _event| {
            Ok(Some(DispatchRequest::with_workflows(data, ["A", "B", "C"])))
        })),
        context(&source, StopFlag::new(), launcher),
    )?;
    source.emit(PV, 1.0);

    let err = with_timeout(trigger.run()).await.unwrap_err();

    assert!(
        matches!(&err, PvTriggerError::DispatchFailure { workflow, .. } if workflow == "B"),
        "unexpected error: {err:?}"
    );
    assert_eq!(recorded.workflows(), vec!["A".to_string()]);
    assert_eq!(source.active_subscriptions(), 0);
    Ok(())
}

#[tokio::test]
async fn unknown_source_fails_before_any_callback() -> TestResult {
    init_tracing();

    let source = Arc::new(ManualSource::new());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let result = TriggerLoop::start(
        "missing",
        config(2, true),
        recorder(Arc::clone(&seen)),
        context(&source, StopFlag::new(), RecordingLauncher::new()),
    );

    assert!(matches!(
        result,
        Err(PvTriggerError::SourceUnavailable { ref name, .. }) if name == PV
    ));
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(source.subscribe_count(), 0);
    Ok(())
}

#[tokio::test]
async fn dropping_an_unstarted_loop_releases_the_subscription() -> TestResult {
    init_tracing();

    let source = Arc::new(ManualSource::new().with_value(PV, 0.0));
    let trigger = TriggerLoop::start(
        "dropped",
        config(2, true),
        recorder(Arc::new(Mutex::new(Vec::new()))),
        context(&source, StopFlag::new(), RecordingLauncher::new()),
    )?;
    assert_eq!(source.active_subscriptions(), 1);

    drop(trigger);

    assert_eq!(source.active_subscriptions(), 0);
    assert_eq!(source.unsubscribe_count(), 1);
    Ok(())
}

#[tokio::test]
async fn events_left_at_stop_are_discarded() -> TestResult {
    init_tracing();

    let source = Arc::new(ManualSource::new().with_value(PV, 0.0).without_initial_notification());
    let seen = Arc::new(Mutex::new(Vec::new()));

    // k = 1: the very first pass checks the signal before draining.
    let trigger = TriggerLoop::start(
        "discard",
        config(1, false),
        recorder(Arc::clone(&seen)),
        context(&source, StopAfterChecks::new(1), RecordingLauncher::new()),
    )?;
    source.emit(PV, 1.0);
    source.emit(PV, 2.0);

    let summary = with_timeout(trigger.run()).await?;

    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(summary.events_discarded, 2);
    Ok(())
}

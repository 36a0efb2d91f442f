//! Scheduler behaviour against the deterministic executor.

mod common;

use common::{fan_in_graph, TaskBuilder};
use prototyper_core::config::{DependencyFailurePolicy, SchedulerConfig};
use prototyper_core::error::ExecutionError;
use prototyper_core::executor::{Phase, ScriptedExecutor};
use prototyper_core::orchestration::TaskScheduler;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn scheduler(executor: &ScriptedExecutor, config: SchedulerConfig) -> TaskScheduler {
    TaskScheduler::new(Arc::new(executor.clone()), config)
}

fn config(max_concurrency: usize) -> SchedulerConfig {
    SchedulerConfig {
        max_concurrency,
        retry_base_delay_ms: 1,
        ..SchedulerConfig::default()
    }
}

#[tokio::test]
async fn test_single_slot_runs_views_before_integration_regardless_of_priority() {
    // The integration task carries the highest priority and still waits.
    let mut tasks = fan_in_graph(3, &[1, 5, 3]);
    tasks.last_mut().unwrap().priority = 100;
    let executor = ScriptedExecutor::new().with_latency(Duration::from_millis(5));

    let results = scheduler(&executor, config(1))
        .run(&tasks, &CancellationToken::new(), |_| {})
        .await
        .unwrap();

    assert!(results.iter().all(|r| r.success));
    assert_eq!(
        executor.start_order(),
        vec!["view_1", "view_2", "view_0", "integration_setup"]
    );

    let timeline = executor.timeline();
    let integration_start = timeline
        .iter()
        .position(|(id, phase)| id == "integration_setup" && *phase == Phase::Started)
        .unwrap();
    for view in ["view_0", "view_1", "view_2"] {
        let finished = timeline
            .iter()
            .position(|(id, phase)| id == view && *phase == Phase::Finished)
            .unwrap();
        assert!(finished < integration_start, "{view} finished after integration started");
    }
    assert_eq!(executor.peak_concurrency(), 1);
}

#[tokio::test]
async fn test_concurrency_cap_is_never_exceeded() {
    for cap in [1usize, 2, 4] {
        let tasks = fan_in_graph(10, &[]);
        let executor = ScriptedExecutor::new().with_latency(Duration::from_millis(3));

        let results = scheduler(&executor, config(cap))
            .run(&tasks, &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(results.len(), tasks.len());
        assert!(executor.peak_concurrency() <= cap);
        assert_eq!(executor.in_flight(), 0);
    }
}

#[tokio::test]
async fn test_results_come_back_in_input_order() {
    let tasks = fan_in_graph(4, &[1, 2, 3, 4]);
    let executor = ScriptedExecutor::new()
        .with_task_latency("view_0", Duration::from_millis(20))
        .with_latency(Duration::from_millis(1));

    let results = scheduler(&executor, config(4))
        .run(&tasks, &CancellationToken::new(), |_| {})
        .await
        .unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.task_id.as_str()).collect();
    let expected: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_failed_view_skips_integration_by_default() {
    let tasks = fan_in_graph(2, &[]);
    let executor = ScriptedExecutor::new()
        .failing_always("view_1", ExecutionError::Permanent("bad prompt".into()));
    let mut completed = Vec::new();

    let results = scheduler(&executor, config(2))
        .run(&tasks, &CancellationToken::new(), |r| completed.push(r.task_id.clone()))
        .await
        .unwrap();

    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(results[2].is_skipped());
    assert_eq!(executor.calls("integration_setup"), 0);
    assert_eq!(completed.len(), 3);
}

#[tokio::test]
async fn test_proceed_policy_runs_integration_after_failure() {
    let tasks = fan_in_graph(2, &[]);
    let executor = ScriptedExecutor::new()
        .failing_always("view_0", ExecutionError::Permanent("bad prompt".into()));
    let config = SchedulerConfig {
        dependency_failure_policy: DependencyFailurePolicy::Proceed,
        ..config(2)
    };

    let results = scheduler(&executor, config)
        .run(&tasks, &CancellationToken::new(), |_| {})
        .await
        .unwrap();

    assert!(!results[0].success);
    assert!(results[2].success);
    assert_eq!(executor.calls("integration_setup"), 1);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let tasks = vec![TaskBuilder::view("flaky").build()];
    let executor = ScriptedExecutor::new().failing_times(
        "flaky",
        2,
        ExecutionError::Transient("rate limited".into()),
    );

    let results = scheduler(&executor, config(1))
        .run(&tasks, &CancellationToken::new(), |_| {})
        .await
        .unwrap();

    assert!(results[0].success);
    assert_eq!(results[0].metadata.attempts, 3);
    assert_eq!(executor.calls("flaky"), 3);
}

#[tokio::test]
async fn test_cancellation_stops_the_run() {
    let tasks = fan_in_graph(3, &[]);
    let executor = ScriptedExecutor::new().with_latency(Duration::from_secs(5));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let error = scheduler(&executor, config(3))
        .run(&tasks, &cancel, |_| {})
        .await
        .unwrap_err();

    assert!(error.to_string().contains("subagent_coordination"));
    assert_eq!(executor.calls("integration_setup"), 0);
}

#[tokio::test]
async fn test_cyclic_graph_is_rejected_before_execution() {
    let tasks = vec![
        TaskBuilder::view("a").depends_on(&["b"]).build(),
        TaskBuilder::view("b").depends_on(&["a"]).build(),
    ];
    let executor = ScriptedExecutor::new();

    let result = scheduler(&executor, config(2))
        .run(&tasks, &CancellationToken::new(), |_| {})
        .await;

    assert!(result.is_err());
    assert_eq!(executor.total_calls(), 0);
}

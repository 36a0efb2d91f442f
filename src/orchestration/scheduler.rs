//! # Task Scheduler
//!
//! Runs a generation task graph under a hard concurrency cap.
//!
//! All task state lives in the coordinating loop. Workers never touch it: each
//! executor call runs on its own tokio task and reports back over a channel,
//! and the loop wakes on that message rather than polling.
//!
//! ## Ordering
//!
//! A task starts only once its dependencies are satisfied. Priority (higher
//! first) and then graph order only break ties among tasks that are ready at
//! the same time.
//!
//! ## Failure handling
//!
//! Each attempt is bounded by `timeout_ms`. Retryable errors are retried up to
//! `retry_attempts` more times with exponential backoff. With the default
//! [`DependencyFailurePolicy::Skip`] the dependents of a failed task settle as
//! failed without being executed; with `Proceed` they run once every
//! dependency has settled either way.

use super::types::{Task, TaskMetadata, TaskResult};
use crate::config::{DependencyFailurePolicy, SchedulerConfig};
use crate::error::{ExecutionError, PipelineError};
use crate::events::RunStage;
use crate::executor::TaskExecutor;
use crate::logging::log_task_operation;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Lifecycle of a task within one run. A task is in exactly one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Executing,
    Completed,
    Failed,
    Skipped,
}

impl TaskState {
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

pub struct TaskScheduler {
    executor: Arc<dyn TaskExecutor>,
    config: SchedulerConfig,
}

impl TaskScheduler {
    pub fn new(executor: Arc<dyn TaskExecutor>, config: SchedulerConfig) -> Self {
        Self { executor, config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run every task to a settled state and return one result per task, in
    /// input order. `on_complete` is called exactly once per task, from the
    /// coordinating loop, as each task settles.
    #[instrument(
        skip_all,
        fields(
            task_count = tasks.len(),
            max_concurrency = self.config.max_concurrency,
            executor = self.executor.name()
        )
    )]
    pub async fn run<F>(
        &self,
        tasks: &[Task],
        cancel: &CancellationToken,
        mut on_complete: F,
    ) -> Result<Vec<TaskResult>, PipelineError>
    where
        F: FnMut(&TaskResult),
    {
        self.config
            .validate()
            .map_err(|e| PipelineError::Scheduler(e.to_string()))?;
        validate_graph(tasks)?;

        let total = tasks.len();
        let positions: HashMap<&str, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();
        let dependencies: Vec<Vec<usize>> = tasks
            .iter()
            .map(|t| t.dependencies.iter().map(|d| positions[d.as_str()]).collect())
            .collect();

        let mut states = vec![TaskState::Pending; total];
        let mut results: Vec<Option<TaskResult>> = vec![None; total];
        let mut in_flight: HashMap<usize, AbortHandle> = HashMap::new();
        let mut settled = 0usize;
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, TaskResult)>();

        while settled < total {
            if cancel.is_cancelled() {
                warn!(
                    in_flight = in_flight.len(),
                    settled = settled,
                    "Run cancelled, aborting in-flight tasks"
                );
                for handle in in_flight.values() {
                    handle.abort();
                }
                return Err(PipelineError::Cancelled {
                    stage: RunStage::SubagentCoordination.to_string(),
                });
            }

            if self.config.dependency_failure_policy == DependencyFailurePolicy::Skip {
                for i in skip_blocked(&mut states, &dependencies) {
                    let blocker = dependencies[i]
                        .iter()
                        .find(|&&d| matches!(states[d], TaskState::Failed | TaskState::Skipped))
                        .map(|&d| tasks[d].id.as_str())
                        .unwrap_or_default();
                    let result = TaskResult::skipped(&tasks[i], blocker);
                    log_task_operation("skip", &tasks[i].id, "skipped", None, result.error.as_deref());
                    on_complete(&result);
                    results[i] = Some(result);
                    settled += 1;
                }
                if settled == total {
                    break;
                }
            }

            let capacity = self.config.max_concurrency.saturating_sub(in_flight.len());
            if capacity > 0 {
                let mut ready: Vec<usize> = (0..total)
                    .filter(|&i| states[i] == TaskState::Pending)
                    .filter(|&i| self.dependencies_satisfied(&dependencies[i], &states))
                    .collect();
                ready.sort_by(|&a, &b| {
                    tasks[b]
                        .priority
                        .cmp(&tasks[a].priority)
                        .then_with(|| a.cmp(&b))
                });

                for i in ready.into_iter().take(capacity) {
                    states[i] = TaskState::Executing;
                    let handle = self.spawn_task(i, &tasks[i], cancel, tx.clone());
                    in_flight.insert(i, handle);
                }
            }

            if in_flight.is_empty() {
                return Err(PipelineError::Scheduler(format!(
                    "{} task(s) can never become ready",
                    total - settled
                )));
            }

            tokio::select! {
                _ = cancel.cancelled() => continue,
                received = rx.recv() => {
                    let Some((i, result)) = received else {
                        return Err(PipelineError::Scheduler(
                            "completion channel closed unexpectedly".to_string(),
                        ));
                    };
                    in_flight.remove(&i);
                    states[i] = if result.success {
                        TaskState::Completed
                    } else {
                        TaskState::Failed
                    };
                    debug!(
                        task_id = %result.task_id,
                        success = result.success,
                        attempts = result.metadata.attempts,
                        "Generation task settled"
                    );
                    on_complete(&result);
                    results[i] = Some(result);
                    settled += 1;
                }
            }
        }

        let results: Vec<TaskResult> = results.into_iter().flatten().collect();
        info!(
            completed = results.iter().filter(|r| r.success).count(),
            failed = results.iter().filter(|r| !r.success).count(),
            "Task graph execution finished"
        );
        Ok(results)
    }

    fn dependencies_satisfied(&self, dependencies: &[usize], states: &[TaskState]) -> bool {
        match self.config.dependency_failure_policy {
            DependencyFailurePolicy::Skip => dependencies
                .iter()
                .all(|&d| states[d] == TaskState::Completed),
            DependencyFailurePolicy::Proceed => dependencies.iter().all(|&d| states[d].is_settled()),
        }
    }

    /// Start one task on its own tokio task. A watcher forwards its result,
    /// or a failure if the worker panicked or was aborted, to the loop.
    fn spawn_task(
        &self,
        index: usize,
        task: &Task,
        cancel: &CancellationToken,
        tx: mpsc::UnboundedSender<(usize, TaskResult)>,
    ) -> AbortHandle {
        log_task_operation("execute", &task.id, "started", None, None);
        let worker = tokio::spawn(execute_with_retry(
            Arc::clone(&self.executor),
            task.clone(),
            self.config.clone(),
            cancel.clone(),
        ));
        let abort = worker.abort_handle();

        let task = task.clone();
        tokio::spawn(async move {
            let result = match worker.await {
                Ok(result) => result,
                Err(e) => {
                    let reason = if e.is_cancelled() {
                        ExecutionError::Cancelled.to_string()
                    } else {
                        format!("executor panicked: {e}")
                    };
                    TaskResult::failed(
                        &task,
                        reason,
                        TaskMetadata {
                            processing_time_ms: 0,
                            confidence: None,
                            attempts: 1,
                        },
                    )
                }
            };
            // The loop only stops listening once the run is over.
            let _ = tx.send((index, result));
        });
        abort
    }
}

/// Mark pending tasks with a failed or skipped dependency as skipped,
/// cascading, and return them in the order they were marked.
fn skip_blocked(states: &mut [TaskState], dependencies: &[Vec<usize>]) -> Vec<usize> {
    let mut skipped = Vec::new();
    loop {
        let blocked: Vec<usize> = (0..states.len())
            .filter(|&i| states[i] == TaskState::Pending)
            .filter(|&i| {
                dependencies[i]
                    .iter()
                    .any(|&d| matches!(states[d], TaskState::Failed | TaskState::Skipped))
            })
            .collect();
        if blocked.is_empty() {
            return skipped;
        }
        for i in blocked {
            states[i] = TaskState::Skipped;
            skipped.push(i);
        }
    }
}

async fn execute_with_retry(
    executor: Arc<dyn TaskExecutor>,
    task: Task,
    config: SchedulerConfig,
    cancel: CancellationToken,
) -> TaskResult {
    let started = Instant::now();
    let attempt_timeout = config.timeout();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let outcome = match tokio::time::timeout(attempt_timeout, executor.execute(&task)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ExecutionError::Timeout(attempt_timeout)),
        };
        let metadata = |confidence: Option<f64>| TaskMetadata {
            processing_time_ms: started.elapsed().as_millis() as u64,
            confidence,
            attempts: attempt,
        };

        match outcome {
            Ok(output) => {
                log_task_operation("execute", &task.id, "completed", Some(attempt), None);
                return TaskResult::succeeded(&task, output.payload, metadata(output.confidence));
            }
            Err(error) if error.is_retryable() && attempt <= config.retry_attempts => {
                let delay = config.retry_delay(attempt);
                warn!(
                    task_id = %task.id,
                    attempt = attempt,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying generation task"
                );
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return TaskResult::failed(
                            &task,
                            ExecutionError::Cancelled.to_string(),
                            metadata(None),
                        );
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(error) => {
                let message = error.to_string();
                log_task_operation("execute", &task.id, "failed", Some(attempt), Some(&message));
                return TaskResult::failed(&task, message, metadata(None));
            }
        }
    }
}

/// Reject graphs the scheduler could never finish: duplicate ids, unknown or
/// self dependencies, and cycles.
pub fn validate_graph(tasks: &[Task]) -> Result<(), PipelineError> {
    let mut ids = HashSet::new();
    for task in tasks {
        if !ids.insert(task.id.as_str()) {
            return Err(PipelineError::InvalidTaskGraph(format!(
                "duplicate task id '{}'",
                task.id
            )));
        }
    }
    for task in tasks {
        for dep in &task.dependencies {
            if dep == &task.id {
                return Err(PipelineError::InvalidTaskGraph(format!(
                    "task '{}' depends on itself",
                    task.id
                )));
            }
            if !ids.contains(dep.as_str()) {
                return Err(PipelineError::InvalidTaskGraph(format!(
                    "task '{}' depends on unknown task '{dep}'",
                    task.id
                )));
            }
        }
    }

    // Kahn's algorithm: anything left unvisited sits on a cycle.
    let mut remaining: HashMap<&str, usize> = tasks
        .iter()
        .map(|t| (t.id.as_str(), t.dependencies.len()))
        .collect();
    let mut queue: VecDeque<&str> = remaining
        .iter()
        .filter(|(_, &n)| n == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut visited = 0usize;
    while let Some(id) = queue.pop_front() {
        visited += 1;
        for dependent in tasks.iter().filter(|t| t.dependencies.contains(id)) {
            if let Some(count) = remaining.get_mut(dependent.id.as_str()) {
                *count -= 1;
                if *count == 0 {
                    queue.push_back(dependent.id.as_str());
                }
            }
        }
    }
    if visited != tasks.len() {
        return Err(PipelineError::InvalidTaskGraph(
            "dependency cycle detected".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Phase, ScriptedExecutor};
    use crate::orchestration::types::{ExpectedOutput, TaskKind};
    use serde_json::json;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn view_task(id: &str, priority: i32) -> Task {
        Task {
            id: id.to_string(),
            kind: TaskKind::ViewGeneration,
            prompt: format!("generate {id}"),
            context: json!({ "component_name": id, "table": "t", "view_kind": "list" }),
            expected_output: ExpectedOutput {
                format: "component".to_string(),
                component_name: Some(id.to_string()),
                required_fields: Vec::new(),
            },
            priority,
            dependencies: BTreeSet::new(),
        }
    }

    fn integration_task(deps: &[&str], priority: i32) -> Task {
        Task {
            id: "integration_setup".to_string(),
            kind: TaskKind::IntegrationSetup,
            prompt: "wire".to_string(),
            context: json!({ "components": [] }),
            expected_output: ExpectedOutput {
                format: "integration".to_string(),
                component_name: None,
                required_fields: Vec::new(),
            },
            priority,
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    fn config(max_concurrency: usize) -> SchedulerConfig {
        SchedulerConfig {
            max_concurrency,
            timeout_ms: 1_000,
            retry_attempts: 0,
            retry_base_delay_ms: 1,
            dependency_failure_policy: DependencyFailurePolicy::Skip,
        }
    }

    fn scheduler(executor: &ScriptedExecutor, config: SchedulerConfig) -> TaskScheduler {
        TaskScheduler::new(Arc::new(executor.clone()), config)
    }

    #[tokio::test]
    async fn test_dependencies_dominate_priority() {
        let tasks = vec![
            view_task("a", 1),
            view_task("b", 2),
            view_task("c", 3),
            integration_task(&["a", "b", "c"], 100),
        ];
        let executor = ScriptedExecutor::new().with_latency(Duration::from_millis(2));
        let results = scheduler(&executor, config(1))
            .run(&tasks, &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(executor.start_order(), vec!["c", "b", "a", "integration_setup"]);
        assert_eq!(executor.peak_concurrency(), 1);
    }

    #[tokio::test]
    async fn test_concurrency_cap_is_respected() {
        let tasks: Vec<Task> = (0..8).map(|i| view_task(&format!("v{i}"), 1)).collect();
        let executor = ScriptedExecutor::new().with_latency(Duration::from_millis(10));
        scheduler(&executor, config(3))
            .run(&tasks, &CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(executor.peak_concurrency(), 3);
        assert_eq!(executor.total_calls(), 8);
    }

    #[tokio::test]
    async fn test_completion_callback_fires_once_per_task() {
        let tasks = vec![
            view_task("a", 1),
            view_task("b", 1),
            integration_task(&["a", "b"], 1),
        ];
        let executor =
            ScriptedExecutor::new().failing_always("a", ExecutionError::Permanent("bad".into()));
        let mut seen = Vec::new();
        let results = scheduler(&executor, config(2))
            .run(&tasks, &CancellationToken::new(), |r| seen.push(r.task_id.clone()))
            .await
            .unwrap();

        seen.sort();
        assert_eq!(seen, vec!["a", "b", "integration_setup"]);
        assert_eq!(results.iter().map(|r| r.task_id.as_str()).collect::<Vec<_>>(), vec!["a", "b", "integration_setup"]);
    }

    #[tokio::test]
    async fn test_failed_dependency_skips_dependents() {
        let tasks = vec![view_task("a", 1), view_task("b", 1), integration_task(&["a", "b"], 1)];
        let executor =
            ScriptedExecutor::new().failing_always("a", ExecutionError::Permanent("bad".into()));
        let results = scheduler(&executor, config(2))
            .run(&tasks, &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        let integration = &results[2];
        assert!(!integration.success);
        assert!(integration.is_skipped());
        assert_eq!(
            integration.error.as_deref(),
            Some("skipped: dependency a did not complete")
        );
        assert_eq!(executor.calls("integration_setup"), 0);
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn test_proceed_policy_runs_dependents_after_failure() {
        let tasks = vec![view_task("a", 1), integration_task(&["a"], 1)];
        let executor =
            ScriptedExecutor::new().failing_always("a", ExecutionError::Permanent("bad".into()));
        let config = SchedulerConfig {
            dependency_failure_policy: DependencyFailurePolicy::Proceed,
            ..config(1)
        };
        let results = scheduler(&executor, config)
            .run(&tasks, &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert!(!results[0].success);
        assert!(results[1].success);
        assert_eq!(executor.calls("integration_setup"), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let tasks = vec![view_task("a", 1)];
        let executor = ScriptedExecutor::new().failing_times(
            "a",
            2,
            ExecutionError::Transient("busy".into()),
        );
        let config = SchedulerConfig {
            retry_attempts: 2,
            ..config(1)
        };
        let results = scheduler(&executor, config)
            .run(&tasks, &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert!(results[0].success);
        assert_eq!(results[0].metadata.attempts, 3);
        assert_eq!(executor.calls("a"), 3);
    }

    #[tokio::test]
    async fn test_permanent_failures_are_not_retried() {
        let tasks = vec![view_task("a", 1)];
        let executor =
            ScriptedExecutor::new().failing_always("a", ExecutionError::Permanent("bad".into()));
        let config = SchedulerConfig {
            retry_attempts: 3,
            ..config(1)
        };
        let results = scheduler(&executor, config)
            .run(&tasks, &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert!(!results[0].success);
        assert_eq!(executor.calls("a"), 1);
    }

    #[tokio::test]
    async fn test_attempt_timeout_fails_task() {
        let tasks = vec![view_task("slow", 1), view_task("fast", 1)];
        let executor =
            ScriptedExecutor::new().with_task_latency("slow", Duration::from_millis(500));
        let config = SchedulerConfig {
            timeout_ms: 20,
            retry_attempts: 1,
            ..config(2)
        };
        let results = scheduler(&executor, config)
            .run(&tasks, &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("timed out"));
        assert_eq!(results[0].metadata.attempts, 2);
        assert!(results[1].success);
        assert_eq!(executor.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_run() {
        let tasks: Vec<Task> = (0..4).map(|i| view_task(&format!("v{i}"), 1)).collect();
        let executor = ScriptedExecutor::new().with_latency(Duration::from_millis(200));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = scheduler(&executor, config(2))
            .run(&tasks, &cancel, |_| {})
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::Cancelled {
                stage: "subagent_coordination".to_string()
            }
        );
        assert!(executor.total_calls() <= 2);
    }

    #[tokio::test]
    async fn test_empty_graph() {
        let executor = ScriptedExecutor::new();
        let results = scheduler(&executor, config(1))
            .run(&[], &CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_integration_starts_after_all_views_finish() {
        let tasks = vec![
            view_task("a", 1),
            view_task("b", 1),
            view_task("c", 1),
            integration_task(&["a", "b", "c"], 1),
        ];
        let executor = ScriptedExecutor::new().with_latency(Duration::from_millis(3));
        scheduler(&executor, config(3))
            .run(&tasks, &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        let timeline = executor.timeline();
        let integration_start = timeline
            .iter()
            .position(|(id, phase)| id == "integration_setup" && *phase == Phase::Started)
            .unwrap();
        let finished_before = timeline[..integration_start]
            .iter()
            .filter(|(_, phase)| *phase == Phase::Finished)
            .count();
        assert_eq!(finished_before, 3);
    }

    #[test]
    fn test_graph_validation() {
        let mut cyclic = vec![view_task("a", 1), view_task("b", 1)];
        cyclic[0].dependencies.insert("b".into());
        cyclic[1].dependencies.insert("a".into());
        assert_eq!(
            validate_graph(&cyclic),
            Err(PipelineError::InvalidTaskGraph("dependency cycle detected".into()))
        );

        let unknown = vec![integration_task(&["missing"], 1)];
        assert!(matches!(
            validate_graph(&unknown),
            Err(PipelineError::InvalidTaskGraph(_))
        ));

        let duplicate = vec![view_task("a", 1), view_task("a", 1)];
        assert!(validate_graph(&duplicate).is_err());

        let fine = vec![view_task("a", 1), integration_task(&["a"], 1)];
        assert!(validate_graph(&fine).is_ok());
    }
}

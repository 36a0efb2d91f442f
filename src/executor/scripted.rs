//! Deterministic executor for tests and benchmarks. Built only with the
//! `test-util` feature.
//!
//! Outcomes are scripted per task id; every call is recorded so tests can
//! assert on start order, overlap and peak concurrency.

use super::{render_output, ExecutionOutput, TaskExecutor};
use crate::error::ExecutionError;
use crate::orchestration::Task;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Started,
    Finished,
}

#[derive(Debug, Default)]
struct Recorder {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    timeline: Mutex<Vec<(String, Phase)>>,
    calls: Mutex<HashMap<String, u32>>,
}

/// Decrements the in-flight count even when the call is dropped mid-flight.
struct InFlightGuard<'a> {
    recorder: &'a Recorder,
    task_id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.recorder.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.recorder
            .timeline
            .lock()
            .push((std::mem::take(&mut self.task_id), Phase::Finished));
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedExecutor {
    default_latency: Duration,
    latencies: HashMap<String, Duration>,
    failures: Arc<Mutex<HashMap<String, VecDeque<ExecutionError>>>>,
    permanent: HashMap<String, ExecutionError>,
    recorder: Arc<Recorder>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.default_latency = latency;
        self
    }

    pub fn with_task_latency(mut self, task_id: &str, latency: Duration) -> Self {
        self.latencies.insert(task_id.to_string(), latency);
        self
    }

    /// Fail the first `times` calls for `task_id` with `error`, then succeed.
    pub fn failing_times(self, task_id: &str, times: usize, error: ExecutionError) -> Self {
        self.failures
            .lock()
            .entry(task_id.to_string())
            .or_default()
            .extend(std::iter::repeat(error).take(times));
        self
    }

    /// Fail every call for `task_id`.
    pub fn failing_always(mut self, task_id: &str, error: ExecutionError) -> Self {
        self.permanent.insert(task_id.to_string(), error);
        self
    }

    pub fn peak_concurrency(&self) -> usize {
        self.recorder.peak.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.recorder.in_flight.load(Ordering::SeqCst)
    }

    pub fn timeline(&self) -> Vec<(String, Phase)> {
        self.recorder.timeline.lock().clone()
    }

    /// Task ids in the order their first attempt started.
    pub fn start_order(&self) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        for (id, phase) in self.timeline() {
            if phase == Phase::Started && !order.contains(&id) {
                order.push(id);
            }
        }
        order
    }

    pub fn calls(&self, task_id: &str) -> u32 {
        self.recorder.calls.lock().get(task_id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.recorder.calls.lock().values().sum()
    }
}

#[async_trait::async_trait]
impl TaskExecutor for ScriptedExecutor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn execute(&self, task: &Task) -> Result<ExecutionOutput, ExecutionError> {
        let recorder = &*self.recorder;
        *recorder.calls.lock().entry(task.id.clone()).or_insert(0) += 1;
        recorder.timeline.lock().push((task.id.clone(), Phase::Started));
        let now = recorder.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        recorder.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard {
            recorder,
            task_id: task.id.clone(),
        };

        let latency = self
            .latencies
            .get(&task.id)
            .copied()
            .unwrap_or(self.default_latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = self.permanent.get(&task.id) {
            return Err(error.clone());
        }
        let scripted = self
            .failures
            .lock()
            .get_mut(&task.id)
            .and_then(VecDeque::pop_front);
        if let Some(error) = scripted {
            return Err(error);
        }

        Ok(ExecutionOutput {
            payload: render_output(task)?,
            confidence: Some(1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::{build_tasks, GenerationPreferences};

    #[tokio::test]
    async fn test_scripted_failures_then_success() {
        let task = build_tasks(&[], &GenerationPreferences::default()).remove(0);
        let executor = ScriptedExecutor::new().failing_times(
            &task.id,
            2,
            ExecutionError::Transient("busy".into()),
        );

        assert!(executor.execute(&task).await.is_err());
        assert!(executor.execute(&task).await.is_err());
        assert!(executor.execute(&task).await.is_ok());
        assert_eq!(executor.calls(&task.id), 3);
        assert_eq!(executor.in_flight(), 0);
        assert_eq!(executor.peak_concurrency(), 1);
    }

    #[tokio::test]
    async fn test_timeline_records_start_and_finish() {
        let task = build_tasks(&[], &GenerationPreferences::default()).remove(0);
        let executor = ScriptedExecutor::new()
            .failing_always(&task.id, ExecutionError::Permanent("nope".into()));
        assert!(executor.execute(&task).await.is_err());
        assert_eq!(
            executor.timeline(),
            vec![
                (task.id.clone(), Phase::Started),
                (task.id.clone(), Phase::Finished)
            ]
        );
        assert_eq!(executor.start_order(), vec![task.id]);
    }
}

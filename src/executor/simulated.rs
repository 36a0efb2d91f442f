//! Production executor: a self-contained stand-in for a remote generation
//! service. Waits a configured latency, then returns rendered component code.

use super::{render_output, ExecutionOutput, TaskExecutor};
use crate::config::ExecutorConfig;
use crate::error::ExecutionError;
use crate::orchestration::Task;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SimulatedSubagentExecutor {
    latency: Duration,
    confidence: f64,
}

impl SimulatedSubagentExecutor {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            latency: Duration::from_millis(config.simulated_latency_ms),
            confidence: config.simulated_confidence,
        }
    }
}

impl Default for SimulatedSubagentExecutor {
    fn default() -> Self {
        Self::new(&ExecutorConfig::default())
    }
}

#[async_trait::async_trait]
impl TaskExecutor for SimulatedSubagentExecutor {
    fn name(&self) -> &'static str {
        "simulated_subagent"
    }

    async fn execute(&self, task: &Task) -> Result<ExecutionOutput, ExecutionError> {
        debug!(task_id = %task.id, latency_ms = self.latency.as_millis() as u64, "Simulating subagent call");
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(ExecutionOutput {
            payload: render_output(task)?,
            confidence: Some(self.confidence),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::{build_tasks, GenerationPreferences, TaskKind};

    #[tokio::test]
    async fn test_simulated_executor_renders_integration() {
        let tasks = build_tasks(&[], &GenerationPreferences::default());
        let executor = SimulatedSubagentExecutor::new(&ExecutorConfig {
            simulated_latency_ms: 0,
            simulated_confidence: 0.5,
        });
        assert_eq!(tasks[0].kind, TaskKind::IntegrationSetup);

        let output = executor.execute(&tasks[0]).await.unwrap();
        assert_eq!(output.confidence, Some(0.5));
        assert_eq!(output.payload["routes"], serde_json::json!([]));
    }
}

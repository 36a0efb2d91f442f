//! # Response Merger
//!
//! Folds task results into one configuration. Total: any sequence of results,
//! including an empty or all-failed one, yields a value. Failures are logged
//! and counted, never raised.

use super::types::{GeneratedComponent, IntegrationBundle, TaskKind, TaskResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Mean over successful results; `None` when nothing succeeded.
    pub average_processing_time_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTask {
    pub task_id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedConfiguration {
    pub components: Vec<GeneratedComponent>,
    pub integration: Option<IntegrationBundle>,
    pub failures: Vec<FailedTask>,
    pub stats: MergeStats,
}

pub fn merge(results: &[TaskResult]) -> MergedConfiguration {
    let mut components = Vec::new();
    let mut integration = None;
    let mut failures = Vec::new();
    let mut success_times = Vec::new();

    for result in results {
        match accept(result) {
            Ok(Accepted::Component(component)) => {
                components.push(component);
                success_times.push(result.metadata.processing_time_ms);
            }
            Ok(Accepted::Integration(bundle)) => {
                if integration.is_some() {
                    warn!(task_id = %result.task_id, "Ignoring additional integration result");
                }
                integration.get_or_insert(bundle);
                success_times.push(result.metadata.processing_time_ms);
            }
            Err(error) => {
                warn!(task_id = %result.task_id, error = %error, "Generation task failed");
                failures.push(FailedTask {
                    task_id: result.task_id.clone(),
                    error,
                });
            }
        }
    }

    let average_processing_time_ms = if success_times.is_empty() {
        None
    } else {
        Some(success_times.iter().sum::<u64>() as f64 / success_times.len() as f64)
    };
    let stats = MergeStats {
        total: results.len(),
        successful: success_times.len(),
        failed: failures.len(),
        average_processing_time_ms,
    };
    debug!(
        total = stats.total,
        successful = stats.successful,
        failed = stats.failed,
        "Merged generation results"
    );

    MergedConfiguration {
        components,
        integration,
        failures,
        stats,
    }
}

enum Accepted {
    Component(GeneratedComponent),
    Integration(IntegrationBundle),
}

/// A result counts as successful only if its payload has the expected shape.
fn accept(result: &TaskResult) -> Result<Accepted, String> {
    if !result.success {
        return Err(result
            .error
            .clone()
            .unwrap_or_else(|| "unknown error".to_string()));
    }
    let Some(output) = result.output.clone() else {
        return Err("invalid output: missing payload".to_string());
    };
    match result.kind {
        TaskKind::ViewGeneration => serde_json::from_value(output)
            .map(Accepted::Component)
            .map_err(|e| format!("invalid output: {e}")),
        TaskKind::IntegrationSetup => serde_json::from_value(output)
            .map(Accepted::Integration)
            .map_err(|e| format!("invalid output: {e}")),
    }
}

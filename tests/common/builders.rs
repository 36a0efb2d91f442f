//! Test data builders for generation tasks.

use prototyper_core::orchestration::{ExpectedOutput, Task, TaskKind};
use serde_json::json;
use std::collections::BTreeSet;

/// Builder for scheduler test tasks whose context renders with the stock
/// executors.
pub struct TaskBuilder {
    id: String,
    kind: TaskKind,
    priority: i32,
    dependencies: BTreeSet<String>,
}

impl TaskBuilder {
    pub fn view(id: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: TaskKind::ViewGeneration,
            priority: 1,
            dependencies: BTreeSet::new(),
        }
    }

    pub fn integration() -> Self {
        Self {
            id: "integration_setup".to_string(),
            kind: TaskKind::IntegrationSetup,
            priority: 1,
            dependencies: BTreeSet::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn depends_on(mut self, ids: &[&str]) -> Self {
        self.dependencies.extend(ids.iter().map(|id| id.to_string()));
        self
    }

    pub fn build(self) -> Task {
        let context = match self.kind {
            TaskKind::ViewGeneration => {
                json!({ "component_name": self.id, "table": "fixture", "view_kind": "list" })
            }
            TaskKind::IntegrationSetup => json!({ "components": [] }),
        };
        Task {
            expected_output: ExpectedOutput {
                format: match self.kind {
                    TaskKind::ViewGeneration => "component".to_string(),
                    TaskKind::IntegrationSetup => "integration".to_string(),
                },
                component_name: None,
                required_fields: Vec::new(),
            },
            prompt: format!("generate {}", self.id),
            id: self.id,
            kind: self.kind,
            context,
            priority: self.priority,
            dependencies: self.dependencies,
        }
    }
}

/// `count` independent view tasks plus an integration task over all of them.
pub fn fan_in_graph(count: usize, priorities: &[i32]) -> Vec<Task> {
    let mut tasks: Vec<Task> = (0..count)
        .map(|i| {
            TaskBuilder::view(&format!("view_{i}"))
                .with_priority(priorities.get(i).copied().unwrap_or(1))
                .build()
        })
        .collect();
    let ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    tasks.push(TaskBuilder::integration().depends_on(&refs).build());
    tasks
}

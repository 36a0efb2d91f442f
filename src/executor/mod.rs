//! # Executor
//!
//! The pluggable unit of work that turns one [`Task`] into an output payload.
//! The scheduler only sees the [`TaskExecutor`] trait; timeouts, retries and
//! result bookkeeping stay on the scheduler side.

#[cfg(any(test, feature = "test-util"))]
pub mod scripted;
pub mod simulated;

use crate::error::ExecutionError;
use crate::mapping::ViewKind;
use crate::orchestration::{
    GeneratedComponent, IntegrationBundle, RouteEntry, Task, TaskKind,
};
use serde_json::Value;

#[cfg(any(test, feature = "test-util"))]
pub use scripted::{Phase, ScriptedExecutor};
pub use simulated::SimulatedSubagentExecutor;

/// Payload produced by one successful executor call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutput {
    pub payload: Value,
    pub confidence: Option<f64>,
}

/// Generation backend for a single task.
#[async_trait::async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Executor name for logging
    fn name(&self) -> &'static str;

    /// Run one attempt. The scheduler applies timeouts and retries around it.
    async fn execute(&self, task: &Task) -> Result<ExecutionOutput, ExecutionError>;
}

/// Canned output for a task, shaped the way the response merger expects.
pub fn render_output(task: &Task) -> Result<Value, ExecutionError> {
    match task.kind {
        TaskKind::ViewGeneration => render_component(task),
        TaskKind::IntegrationSetup => render_integration(task),
    }
}

fn context_str<'a>(task: &'a Task, key: &str) -> Result<&'a str, ExecutionError> {
    task.context[key].as_str().ok_or_else(|| {
        ExecutionError::Permanent(format!("task {} context is missing '{key}'", task.id))
    })
}

fn render_component(task: &Task) -> Result<Value, ExecutionError> {
    let name = context_str(task, "component_name")?;
    let table = context_str(task, "table")?;
    let view_kind: ViewKind = context_str(task, "view_kind")?
        .parse()
        .map_err(ExecutionError::Permanent)?;

    let children: Vec<&str> = task.context["suggestion"]["components"]
        .as_array()
        .map(|components| components.iter().filter_map(|c| c["id"].as_str()).collect())
        .unwrap_or_default();
    let body = children
        .iter()
        .map(|id| format!("      <Slot id=\"{id}\" />"))
        .collect::<Vec<_>>()
        .join("\n");
    let code = format!(
        "export function {name}({{ data }}) {{\n  return (\n    <View kind=\"{view_kind}\" source=\"{table}\">\n{body}\n    </View>\n  );\n}}\n"
    );
    let wants_tests = task.context["preferences"]["generate_tests"]
        .as_bool()
        .unwrap_or(false);

    let component = GeneratedComponent {
        name: name.to_string(),
        table: table.to_string(),
        view_kind,
        code,
        imports: vec!["View".to_string(), "Slot".to_string()],
        tests: wants_tests.then(|| {
            format!("test('{name} renders', () => {{\n  render(<{name} data={{[]}} />);\n}});\n")
        }),
    };
    serde_json::to_value(component).map_err(|e| ExecutionError::Permanent(e.to_string()))
}

fn render_integration(task: &Task) -> Result<Value, ExecutionError> {
    let components = task.context["components"].as_array().cloned().unwrap_or_default();
    let mut routes = Vec::new();
    let mut navigation: Vec<String> = Vec::new();
    for component in &components {
        let (Some(name), Some(table), Some(view)) = (
            component["name"].as_str(),
            component["table"].as_str(),
            component["view_kind"].as_str(),
        ) else {
            continue;
        };
        routes.push(RouteEntry {
            path: format!("/{table}/{view}"),
            component: name.to_string(),
        });
        if !navigation.iter().any(|t| t == table) {
            navigation.push(table.to_string());
        }
    }
    let code = routes
        .iter()
        .map(|r| format!("  {{ path: '{}', component: {} }},", r.path, r.component))
        .collect::<Vec<_>>()
        .join("\n");

    let bundle = IntegrationBundle {
        routes,
        navigation,
        code: format!("export const routes = [\n{code}\n];\n"),
    };
    serde_json::to_value(bundle).map_err(|e| ExecutionError::Permanent(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::generate_suggestions;
    use crate::orchestration::{build_tasks, GenerationPreferences};
    use crate::schema::parse;

    fn tasks() -> Vec<Task> {
        let schema = parse("Table users {\n  id int [pk]\n  name varchar\n}\n").unwrap();
        let prefs = GenerationPreferences {
            include_views: Some(vec![ViewKind::List, ViewKind::Form]),
            ..Default::default()
        };
        build_tasks(&generate_suggestions(&schema.tables, &schema.relationships), &prefs)
    }

    #[test]
    fn test_render_component_output() {
        let tasks = tasks();
        let output = render_output(&tasks[0]).unwrap();
        let component: GeneratedComponent = serde_json::from_value(output).unwrap();
        assert_eq!(component.name, "UsersList");
        assert_eq!(component.view_kind, ViewKind::List);
        assert!(component.code.contains("export function UsersList"));
        assert!(component.tests.is_none());
    }

    #[test]
    fn test_render_integration_output() {
        let tasks = tasks();
        let output = render_output(tasks.last().unwrap()).unwrap();
        let bundle: IntegrationBundle = serde_json::from_value(output).unwrap();
        assert_eq!(bundle.routes.len(), 2);
        assert_eq!(bundle.routes[1].path, "/users/form");
        assert_eq!(bundle.navigation, vec!["users"]);
    }

    #[test]
    fn test_missing_context_is_permanent() {
        let mut task = tasks().remove(0);
        task.context = Value::Null;
        let err = render_output(&task).unwrap_err();
        assert!(matches!(err, ExecutionError::Permanent(_)));
    }
}

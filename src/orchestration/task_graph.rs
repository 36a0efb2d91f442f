//! # Task Graph Builder
//!
//! Turns view suggestions into one `view_generation` task per surviving
//! (table, view) pair plus a single trailing `integration_setup` task that
//! depends on all of them. The graph is always exactly two levels deep.

use super::types::{ExpectedOutput, GenerationPreferences, Task, TaskKind};
use crate::constants::{priorities, INTEGRATION_TASK_ID};
use crate::mapping::{ViewKind, ViewSuggestion};
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

const COMPONENT_FIELDS: [&str; 4] = ["name", "table", "view_kind", "code"];
const INTEGRATION_FIELDS: [&str; 3] = ["routes", "navigation", "code"];

pub fn view_priority(kind: ViewKind) -> i32 {
    match kind {
        ViewKind::List => priorities::LIST,
        ViewKind::Detail => priorities::DETAIL,
        ViewKind::Form => priorities::FORM,
        ViewKind::Dashboard => priorities::DASHBOARD,
        _ => priorities::DEFAULT,
    }
}

pub fn build_tasks(suggestions: &[ViewSuggestion], preferences: &GenerationPreferences) -> Vec<Task> {
    let mut tasks = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for suggestion in suggestions
        .iter()
        .filter(|s| preferences.includes(s.view_kind))
    {
        let base_id = format!(
            "view_{}_{}",
            suggestion.table,
            suggestion.view_kind.to_string().replace('-', "_")
        );
        let count = seen.entry(base_id.clone()).or_insert(0);
        *count += 1;
        let id = if *count == 1 {
            base_id
        } else {
            format!("{base_id}_{count}")
        };
        tasks.push(view_task(id, suggestion, preferences));
    }

    let dependencies: BTreeSet<String> = tasks.iter().map(|t| t.id.clone()).collect();
    let integration = integration_task(&tasks, dependencies, preferences);
    tasks.push(integration);

    debug!(
        task_count = tasks.len(),
        view_tasks = tasks.len() - 1,
        "Built generation task graph"
    );
    tasks
}

fn view_task(id: String, suggestion: &ViewSuggestion, preferences: &GenerationPreferences) -> Task {
    let mut prompt = format!(
        "Generate a {} view component named {} for the `{}` table.\n{}\nLayout: {:?} with {} column(s). Components: {}.\nTheme: {:?}, style: {}.",
        suggestion.view_kind,
        suggestion.name,
        suggestion.table,
        suggestion.description,
        suggestion.layout.kind,
        suggestion.layout.columns,
        suggestion
            .components
            .iter()
            .map(|c| c.id.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        preferences.theme_mode,
        preferences.component_style,
    );
    if preferences.include_validation && suggestion.view_kind == ViewKind::Form {
        prompt.push_str("\nInclude client-side validation for required and length-limited fields.");
    }
    if preferences.include_relationships {
        prompt.push_str("\nWire related-data bindings to their source tables.");
    }
    if preferences.generate_tests {
        prompt.push_str("\nInclude a unit test for the component.");
    }

    Task {
        id,
        kind: TaskKind::ViewGeneration,
        prompt,
        context: json!({
            "table": suggestion.table,
            "view_kind": suggestion.view_kind,
            "component_name": suggestion.name,
            "suggestion": suggestion,
            "preferences": preferences,
        }),
        expected_output: ExpectedOutput {
            format: "component".to_string(),
            component_name: Some(suggestion.name.clone()),
            required_fields: COMPONENT_FIELDS.iter().map(|f| f.to_string()).collect(),
        },
        priority: view_priority(suggestion.view_kind),
        dependencies: BTreeSet::new(),
    }
}

fn integration_task(
    view_tasks: &[Task],
    dependencies: BTreeSet<String>,
    preferences: &GenerationPreferences,
) -> Task {
    let components: Vec<_> = view_tasks
        .iter()
        .map(|t| {
            json!({
                "task_id": t.id,
                "name": t.context["component_name"],
                "table": t.context["table"],
                "view_kind": t.context["view_kind"],
            })
        })
        .collect();

    Task {
        id: INTEGRATION_TASK_ID.to_string(),
        kind: TaskKind::IntegrationSetup,
        prompt: format!(
            "Wire {} generated component(s) into one application: routes, navigation and shared state.",
            components.len()
        ),
        context: json!({
            "components": components,
            "preferences": preferences,
        }),
        expected_output: ExpectedOutput {
            format: "integration".to_string(),
            component_name: None,
            required_fields: INTEGRATION_FIELDS.iter().map(|f| f.to_string()).collect(),
        },
        priority: priorities::INTEGRATION,
        dependencies,
    }
}

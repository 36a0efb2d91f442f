use proptest::prelude::*;
use prototyper_core::orchestration::{TaskKind, TaskMetadata, TaskResult};
use serde_json::json;

/// Strategy for generating valid DBML identifiers
pub fn identifier_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

/// Strategy for generating column type names, including unknown ones
pub fn column_type_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("int".to_string()),
        Just("varchar".to_string()),
        Just("varchar(64)".to_string()),
        Just("decimal(10,2)".to_string()),
        Just("boolean".to_string()),
        Just("timestamp".to_string()),
        Just("text".to_string()),
        Just("geometry".to_string()),
    ]
}

/// A generated schema: DBML text plus the expected table names and the
/// inline references (owning table, column, target table).
#[derive(Debug, Clone)]
pub struct GeneratedSchema {
    pub dbml: String,
    pub tables: Vec<String>,
    pub references: Vec<(String, String, String)>,
}

/// Strategy for generating well-formed DBML with 1..=8 tables, where later
/// tables may reference earlier ones.
pub fn schema_strategy() -> impl Strategy<Value = GeneratedSchema> {
    prop::collection::vec(
        (
            prop::collection::vec(column_type_strategy(), 0..5),
            prop::option::of(any::<prop::sample::Index>()),
        ),
        1..=8,
    )
    .prop_map(|tables| {
        let mut dbml = String::new();
        let mut names = Vec::new();
        let mut references = Vec::new();
        for (i, (types, reference)) in tables.into_iter().enumerate() {
            let name = format!("table_{i}");
            dbml.push_str(&format!("Table {name} {{\n  id int [pk]\n"));
            for (c, ty) in types.iter().enumerate() {
                dbml.push_str(&format!("  col_{c} {ty}\n"));
            }
            if let (Some(index), true) = (reference, i > 0) {
                let target = format!("table_{}", index.index(i));
                dbml.push_str(&format!("  parent_id int [not null, ref: > {target}.id]\n"));
                references.push((name.clone(), "parent_id".to_string(), target));
            }
            dbml.push_str("}\n\n");
            names.push(name);
        }
        GeneratedSchema {
            dbml,
            tables: names,
            references,
        }
    })
}

/// Strategy for generating arbitrary task results, well-formed or not
pub fn task_result_strategy() -> impl Strategy<Value = TaskResult> {
    (
        identifier_strategy(),
        prop::bool::ANY,
        prop::bool::ANY,
        0u64..5_000,
        prop_oneof![
            Just(None),
            Just(Some(json!({}))),
            Just(Some(json!({ "name": "AList", "table": "a", "view_kind": "list", "code": "" }))),
            Just(Some(json!({ "routes": [], "navigation": [], "code": "" }))),
            Just(Some(json!([1, 2, 3]))),
        ],
    )
        .prop_map(|(task_id, integration, success, ms, output)| TaskResult {
            task_id,
            kind: if integration {
                TaskKind::IntegrationSetup
            } else {
                TaskKind::ViewGeneration
            },
            success,
            error: (!success).then(|| "generated failure".to_string()),
            output,
            metadata: TaskMetadata {
                processing_time_ms: ms,
                confidence: None,
                attempts: 1,
            },
        })
}

//! # Prototype Assembler
//!
//! Combines the source schema, the merged configuration and run metadata into
//! the artifact handed to the store.

use super::response_merger::{FailedTask, MergeStats, MergedConfiguration};
use super::types::{GeneratedComponent, GenerationOptions, IntegrationBundle, ThemeMode};
use crate::error::PipelineError;
use crate::schema::ParsedSchema;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub data_type: String,
    pub primary_key: bool,
    /// `table.column` this column references, if any.
    pub references: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    pub columns: Vec<ColumnSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaRecord {
    pub dbml: String,
    pub tables: Vec<TableSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSettings {
    pub mode: ThemeMode,
    pub component_style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomSettings {
    pub integration: Option<IntegrationBundle>,
    pub stats: MergeStats,
    pub failures: Vec<FailedTask>,
    pub parsed_schema: ParsedSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrototypeConfiguration {
    /// Components keyed by generated component name.
    pub components: BTreeMap<String, GeneratedComponent>,
    pub theme: ThemeSettings,
    pub custom: CustomSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub name: String,
    pub description: String,
    pub original_schema: SchemaRecord,
    pub configuration: PrototypeConfiguration,
    pub generated_at: DateTime<Utc>,
}

impl GeneratedArtifact {
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.original_schema.tables.iter().map(|t| t.name.as_str())
    }
}

pub fn assemble(
    options: &GenerationOptions,
    schema: &ParsedSchema,
    merged: MergedConfiguration,
) -> Result<GeneratedArtifact, PipelineError> {
    let name = options.name.trim();
    if name.is_empty() {
        return Err(PipelineError::Assembly(
            "prototype name must not be empty".to_string(),
        ));
    }

    let tables = schema
        .tables
        .iter()
        .map(|table| TableSummary {
            name: table.name.clone(),
            columns: table
                .columns
                .iter()
                .map(|c| ColumnSummary {
                    name: c.name.clone(),
                    data_type: c.data_type.clone(),
                    primary_key: c.primary_key,
                    references: c
                        .references
                        .as_ref()
                        .map(|r| format!("{}.{}", r.table, r.column)),
                })
                .collect(),
        })
        .collect();

    let mut components = BTreeMap::new();
    for component in merged.components {
        let mut key = component.name.clone();
        let mut n = 1;
        while components.contains_key(&key) {
            n += 1;
            key = format!("{}_{n}", component.name);
        }
        if n > 1 {
            warn!(component = %component.name, key = %key, "Duplicate component name");
        }
        components.insert(key, component);
    }

    let description = options
        .description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "Prototype generated from {} table(s) with {} component(s)",
                schema.tables.len(),
                components.len()
            )
        });

    Ok(GeneratedArtifact {
        name: name.to_string(),
        description,
        original_schema: SchemaRecord {
            dbml: options.dbml_content.clone(),
            tables,
        },
        configuration: PrototypeConfiguration {
            components,
            theme: ThemeSettings {
                mode: options.preferences.theme_mode,
                component_style: options.preferences.component_style.clone(),
            },
            custom: CustomSettings {
                integration: merged.integration,
                stats: merged.stats,
                failures: merged.failures,
                parsed_schema: schema.clone(),
            },
        },
        generated_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ViewKind;
    use crate::orchestration::response_merger::merge;
    use crate::schema::parse;

    fn component(name: &str) -> GeneratedComponent {
        GeneratedComponent {
            name: name.to_string(),
            table: "users".to_string(),
            view_kind: ViewKind::List,
            code: String::new(),
            imports: Vec::new(),
            tests: None,
        }
    }

    #[test]
    fn test_assemble_summarizes_schema() {
        let dbml = "Table users {\n  id int [pk]\n}\nTable posts {\n  user_id int [ref: > users.id]\n}\n";
        let schema = parse(dbml).unwrap();
        let options = GenerationOptions::new(dbml, "Blog");
        let mut merged = merge(&[]);
        merged.components.push(component("UsersList"));

        let artifact = assemble(&options, &schema, merged).unwrap();
        assert_eq!(artifact.name, "Blog");
        assert_eq!(artifact.table_names().collect::<Vec<_>>(), vec!["users", "posts"]);
        assert_eq!(
            artifact.original_schema.tables[1].columns[0].references.as_deref(),
            Some("users.id")
        );
        assert!(artifact.configuration.components.contains_key("UsersList"));
        assert_eq!(artifact.configuration.custom.parsed_schema, schema);
        assert!(artifact.description.contains("2 table(s)"));
    }

    #[test]
    fn test_empty_merge_still_assembles() {
        let schema = ParsedSchema::default();
        let artifact =
            assemble(&GenerationOptions::new("", "Empty"), &schema, merge(&[])).unwrap();
        assert!(artifact.configuration.components.is_empty());
        assert!(artifact.configuration.custom.integration.is_none());
    }

    #[test]
    fn test_duplicate_component_names_are_kept() {
        let mut merged = merge(&[]);
        merged.components.push(component("AList"));
        merged.components.push(component("AList"));
        let artifact = assemble(
            &GenerationOptions::new("", "Dupes"),
            &ParsedSchema::default(),
            merged,
        )
        .unwrap();
        let keys: Vec<_> = artifact.configuration.components.keys().cloned().collect();
        assert_eq!(keys, vec!["AList", "AList_2"]);
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let err = assemble(
            &GenerationOptions::new("", "  "),
            &ParsedSchema::default(),
            merge(&[]),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Assembly(_)));
    }
}

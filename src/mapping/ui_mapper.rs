//! # UI Suggestion Mapper
//!
//! Rule-based mapping from the parsed schema to candidate views. Pure and
//! deterministic: the same tables and relationships, in the same order, always
//! yield the same suggestions.
//!
//! Every table gets `list`, `detail` and `form` views. A `dashboard` is added
//! when the table has a numeric or temporal column or takes part in any
//! relationship. A `master-detail` view is added when the table owns an
//! outgoing one-to-many or many-to-one relationship.

use super::field_types::{self, FieldType, TypeFamily};
use super::types::{
    ComponentDescriptor, ComponentType, DataBinding, LayoutDescriptor, ViewKind, ViewSuggestion,
};
use crate::constants::{limits, DISPLAY_COLUMN_PRIORITY};
use crate::schema::{Column, EnumDef, Relationship, RelationshipKind, Table};
use serde_json::json;
use tracing::debug;

/// Produces view suggestions for every table, in table order.
pub fn generate_suggestions(tables: &[Table], relationships: &[Relationship]) -> Vec<ViewSuggestion> {
    UiMapper::new(tables, relationships).generate()
}

pub struct UiMapper<'a> {
    tables: &'a [Table],
    relationships: &'a [Relationship],
    enums: &'a [EnumDef],
}

impl<'a> UiMapper<'a> {
    pub fn new(tables: &'a [Table], relationships: &'a [Relationship]) -> Self {
        Self {
            tables,
            relationships,
            enums: &[],
        }
    }

    /// Enum definitions let form fields typed by an enum render as a select.
    pub fn with_enums(mut self, enums: &'a [EnumDef]) -> Self {
        self.enums = enums;
        self
    }

    pub fn generate(&self) -> Vec<ViewSuggestion> {
        let mut suggestions = Vec::new();
        for table in self.tables {
            let before = suggestions.len();
            suggestions.push(self.list_view(table));
            suggestions.push(self.detail_view(table));
            suggestions.push(self.form_view(table));
            if self.wants_dashboard(table) {
                suggestions.push(self.dashboard_view(table));
            }
            if !self.master_detail_links(table).is_empty() {
                suggestions.push(self.master_detail_view(table));
            }
            debug!(
                table = %table.name,
                views = suggestions.len() - before,
                "Generated view suggestions"
            );
        }
        suggestions
    }

    fn relationships_for(&self, table: &Table) -> impl Iterator<Item = &'a Relationship> + '_ {
        let name = table.name.clone();
        self.relationships.iter().filter(move |r| r.touches(&name))
    }

    /// Tables on the other end of any relationship, deduplicated, in order.
    fn related_tables(&self, table: &Table) -> Vec<(String, String)> {
        let mut related: Vec<(String, String)> = Vec::new();
        for rel in self.relationships_for(table) {
            let Some(other) = rel.other_table(&table.name) else {
                continue;
            };
            let link = if rel.from_table == table.name {
                rel.from_column.clone()
            } else {
                rel.to_column.clone()
            };
            if !related.iter().any(|(t, _)| t == other) {
                related.push((other.to_string(), link));
            }
        }
        related
    }

    fn wants_dashboard(&self, table: &Table) -> bool {
        table
            .columns
            .iter()
            .any(|c| field_types::is_numeric(c) || field_types::is_temporal(c))
            || self.relationships_for(table).next().is_some()
    }

    /// Outgoing one-to-many / many-to-one relationships as (detail table, fk column).
    fn master_detail_links(&self, table: &Table) -> Vec<(String, String)> {
        let mut links: Vec<(String, String)> = Vec::new();
        for rel in self.relationships.iter().filter(|r| r.from_table == table.name) {
            let fk = match rel.kind {
                RelationshipKind::ManyToOne => &rel.from_column,
                RelationshipKind::OneToMany => &rel.to_column,
                _ => continue,
            };
            if !links.iter().any(|(t, _)| *t == rel.to_table) {
                links.push((rel.to_table.clone(), fk.clone()));
            }
        }
        links
    }

    fn list_view(&self, table: &Table) -> ViewSuggestion {
        let id = |part: &str| component_id(table, ViewKind::List, part);
        let display = display_columns(table);
        let mut components = Vec::new();

        let search: Vec<String> = display
            .iter()
            .take(limits::MAX_SEARCH_COLUMNS)
            .cloned()
            .collect();
        if !search.is_empty() {
            components.push(ComponentDescriptor {
                id: id("search"),
                component_type: ComponentType::SearchBar,
                props: json!({
                    "placeholder": format!("Search by {}", search.join(", ")),
                    "fields": search,
                }),
                data_binding: Some(DataBinding::fields(&table.name, search.clone())),
            });
        }

        let filters: Vec<serde_json::Value> = table
            .columns
            .iter()
            .filter_map(|c| {
                let filter_type = match field_types::type_family(c) {
                    TypeFamily::String => "text",
                    TypeFamily::Boolean => "boolean",
                    TypeFamily::Date => "date-range",
                    _ => return None,
                };
                Some(json!({ "field": c.name, "filterType": filter_type }))
            })
            .take(limits::MAX_FILTER_COLUMNS)
            .collect();
        if !filters.is_empty() {
            let fields = filters
                .iter()
                .filter_map(|f| f["field"].as_str().map(str::to_string))
                .collect();
            components.push(ComponentDescriptor {
                id: id("filters"),
                component_type: ComponentType::FilterPanel,
                props: json!({ "filters": filters }),
                data_binding: Some(DataBinding::fields(&table.name, fields)),
            });
        }

        let related: Vec<String> = self
            .related_tables(table)
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        components.push(ComponentDescriptor {
            id: id("table"),
            component_type: ComponentType::DataTable,
            props: json!({
                "columns": display,
                "relatedColumns": related,
                "sortable": true,
                "pagination": { "pageSize": 25 },
                "rowActions": ["view", "edit", "delete"],
            }),
            data_binding: Some(DataBinding::fields(&table.name, display.clone())),
        });

        ViewSuggestion {
            table: table.name.clone(),
            view_kind: ViewKind::List,
            name: component_name(table, ViewKind::List),
            description: format!("Browse, search and filter {} records", table.name),
            components,
            layout: LayoutDescriptor::stack(),
        }
    }

    fn detail_view(&self, table: &Table) -> ViewSuggestion {
        let id = |part: &str| component_id(table, ViewKind::Detail, part);
        let all_columns: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
        let title_field = display_columns(table).into_iter().next();

        let mut components = vec![
            ComponentDescriptor {
                id: id("header"),
                component_type: ComponentType::Header,
                props: json!({
                    "title": format!("{} details", humanize(&table.name)),
                    "titleField": title_field,
                    "actions": ["edit", "delete"],
                }),
                data_binding: None,
            },
            ComponentDescriptor {
                id: id("info"),
                component_type: ComponentType::InfoCard,
                props: json!({
                    "fields": table.columns.iter().map(|c| json!({
                        "field": c.name,
                        "label": humanize(&c.name),
                        "type": c.data_type,
                    })).collect::<Vec<_>>(),
                    "note": table.note,
                }),
                data_binding: Some(DataBinding::fields(&table.name, all_columns)),
            },
        ];

        for (index, (related, link)) in self
            .related_tables(table)
            .into_iter()
            .take(limits::MAX_RELATED_SECTIONS)
            .enumerate()
        {
            components.push(ComponentDescriptor {
                id: id(&format!("related-{related}")),
                component_type: ComponentType::RelatedSection,
                props: json!({
                    "title": humanize(&related),
                    "expanded": index == 0,
                }),
                data_binding: Some(DataBinding::related(&related, &link)),
            });
        }

        ViewSuggestion {
            table: table.name.clone(),
            view_kind: ViewKind::Detail,
            name: component_name(table, ViewKind::Detail),
            description: format!("Show a single {} record with its related data", table.name),
            components,
            layout: LayoutDescriptor::grid(2),
        }
    }

    fn form_view(&self, table: &Table) -> ViewSuggestion {
        let mut components: Vec<ComponentDescriptor> = table
            .columns
            .iter()
            .filter(|c| !c.primary_key)
            .map(|c| self.form_field(table, c))
            .collect();
        let field_count = components.len();

        components.push(ComponentDescriptor {
            id: component_id(table, ViewKind::Form, "actions"),
            component_type: ComponentType::FormActions,
            props: json!({ "submitLabel": "Save", "cancelLabel": "Cancel" }),
            data_binding: None,
        });

        ViewSuggestion {
            table: table.name.clone(),
            view_kind: ViewKind::Form,
            name: component_name(table, ViewKind::Form),
            description: format!("Create or edit a {} record", table.name),
            components,
            layout: LayoutDescriptor::grid(if field_count > 6 { 2 } else { 1 }),
        }
    }

    fn form_field(&self, table: &Table, column: &Column) -> ComponentDescriptor {
        let mapping = field_types::map_column(column);
        let enum_def = self
            .enums
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(&column.base_type()));
        let field_type = if enum_def.is_some() {
            FieldType::Select
        } else {
            mapping.field_type
        };

        let mut props = json!({
            "label": humanize(&column.name),
            "fieldType": field_type,
            "required": column.is_required(),
        });
        if let Some(step) = mapping.step {
            props["step"] = json!(step);
        }
        if let Some(max) = mapping.max_length {
            props["validation"] = json!({ "maxLength": max });
        }
        if let Some(default) = &column.default_value {
            props["defaultValue"] = json!(default);
        }
        if let Some(reference) = &column.references {
            let label_field = self
                .tables
                .iter()
                .find(|t| t.name == reference.table)
                .and_then(|t| display_columns(t).into_iter().next())
                .unwrap_or_else(|| reference.column.clone());
            props["options"] = json!({
                "source": reference.table,
                "valueField": reference.column,
                "labelField": label_field,
            });
        } else if let Some(def) = enum_def {
            props["options"] = json!({ "values": def.values });
        }

        ComponentDescriptor {
            id: component_id(table, ViewKind::Form, &format!("field-{}", column.name)),
            component_type: ComponentType::FormField,
            props,
            data_binding: Some(DataBinding::fields(&table.name, vec![column.name.clone()])),
        }
    }

    fn dashboard_view(&self, table: &Table) -> ViewSuggestion {
        let id = |part: &str| component_id(table, ViewKind::Dashboard, part);
        let metrics: Vec<&Column> = table
            .columns
            .iter()
            .filter(|c| field_types::is_numeric(c) && !c.primary_key && c.references.is_none())
            .collect();

        let mut stats = vec![json!({ "label": "Total records", "aggregate": "count" })];
        stats.extend(metrics.iter().take(limits::MAX_STAT_COLUMNS).map(|c| {
            json!({
                "label": format!("Total {}", humanize(&c.name).to_lowercase()),
                "aggregate": "sum",
                "field": c.name,
            })
        }));

        let value_field = metrics
            .first()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "count".to_string());
        let date_field = table
            .columns
            .iter()
            .find(|c| field_types::is_temporal(c))
            .map(|c| c.name.clone());

        let components = vec![
            ComponentDescriptor {
                id: id("stats"),
                component_type: ComponentType::StatsGrid,
                props: json!({ "stats": stats }),
                data_binding: Some(DataBinding::fields(
                    &table.name,
                    metrics.iter().map(|c| c.name.clone()).collect(),
                )),
            },
            ComponentDescriptor {
                id: id("trend"),
                component_type: ComponentType::TrendChart,
                props: json!({
                    "chartType": "line",
                    "valueField": value_field,
                    "dateField": date_field,
                }),
                data_binding: Some(DataBinding::fields(&table.name, vec![value_field.clone()])),
            },
        ];

        ViewSuggestion {
            table: table.name.clone(),
            view_kind: ViewKind::Dashboard,
            name: component_name(table, ViewKind::Dashboard),
            description: format!("Key metrics and trends for {}", table.name),
            components,
            layout: LayoutDescriptor::grid(2),
        }
    }

    fn master_detail_view(&self, table: &Table) -> ViewSuggestion {
        let id = |part: &str| component_id(table, ViewKind::MasterDetail, part);
        let display = display_columns(table);
        let links = self.master_detail_links(table);

        let components = vec![
            ComponentDescriptor {
                id: id("master"),
                component_type: ComponentType::MasterList,
                props: json!({ "columns": display }),
                data_binding: Some(DataBinding::fields(&table.name, display.clone())),
            },
            ComponentDescriptor {
                id: id("tabs"),
                component_type: ComponentType::DetailTabs,
                props: json!({
                    "tabs": links.iter().map(|(related, fk)| json!({
                        "table": related,
                        "label": humanize(related),
                        "foreignKey": fk,
                    })).collect::<Vec<_>>(),
                }),
                data_binding: None,
            },
        ];

        ViewSuggestion {
            table: table.name.clone(),
            view_kind: ViewKind::MasterDetail,
            name: component_name(table, ViewKind::MasterDetail),
            description: format!("{} alongside their related records", humanize(&table.name)),
            components,
            layout: LayoutDescriptor::split(),
        }
    }
}

/// Up to six columns: priority names first (in priority order), then the rest
/// alphabetically.
pub fn display_columns(table: &Table) -> Vec<String> {
    let rank = |name: &str| {
        DISPLAY_COLUMN_PRIORITY
            .iter()
            .position(|p| *p == name)
            .unwrap_or(DISPLAY_COLUMN_PRIORITY.len())
    };
    let mut names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    names.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.cmp(b)));
    names
        .into_iter()
        .take(limits::MAX_DISPLAY_COLUMNS)
        .map(str::to_string)
        .collect()
}

/// `order_items` -> `OrderItemsList`.
pub fn component_name(table: &Table, kind: ViewKind) -> String {
    format!("{}{}", pascal_case(&table.name), kind.component_suffix())
}

fn component_id(table: &Table, kind: ViewKind, part: &str) -> String {
    format!("{}-{}-{}", slug(&table.name), kind, slug(part))
}

fn pascal_case(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

fn humanize(name: &str) -> String {
    let spaced = name.replace(['_', '-'], " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse;

    fn kinds_for(suggestions: &[ViewSuggestion], table: &str) -> Vec<ViewKind> {
        suggestions
            .iter()
            .filter(|s| s.table == table)
            .map(|s| s.view_kind)
            .collect()
    }

    #[test]
    fn test_dashboard_only_with_numeric_date_or_relationship() {
        let schema = parse(
            "Table items {\n  price decimal(10,2)\n}\nTable tags {\n  label varchar\n  slug varchar\n}\n",
        )
        .unwrap();
        let suggestions = generate_suggestions(&schema.tables, &schema.relationships);
        assert_eq!(
            kinds_for(&suggestions, "items"),
            vec![ViewKind::List, ViewKind::Detail, ViewKind::Form, ViewKind::Dashboard]
        );
        assert_eq!(
            kinds_for(&suggestions, "tags"),
            vec![ViewKind::List, ViewKind::Detail, ViewKind::Form]
        );
    }

    #[test]
    fn test_master_detail_for_outgoing_many_to_one() {
        let schema = parse(
            "Table categories {\n  title varchar\n}\nTable products {\n  name varchar\n  category_id int [ref: > categories.id]\n}\n",
        )
        .unwrap();
        let suggestions = generate_suggestions(&schema.tables, &schema.relationships);
        assert!(kinds_for(&suggestions, "products").contains(&ViewKind::MasterDetail));
        assert!(!kinds_for(&suggestions, "categories").contains(&ViewKind::MasterDetail));
        // relationship participation alone triggers the dashboard
        assert!(kinds_for(&suggestions, "categories").contains(&ViewKind::Dashboard));

        let md = suggestions
            .iter()
            .find(|s| s.view_kind == ViewKind::MasterDetail)
            .unwrap();
        let tabs = &md.component(ComponentType::DetailTabs).unwrap().props["tabs"];
        assert_eq!(tabs[0]["table"], "categories");
        assert_eq!(tabs[0]["foreignKey"], "category_id");
    }

    #[test]
    fn test_display_column_ranking() {
        let schema = parse(
            "Table people {\n  zeta varchar\n  alpha varchar\n  email varchar\n  name varchar\n  status varchar\n  beta int\n  gamma int\n}\n",
        )
        .unwrap();
        let columns = display_columns(&schema.tables[0]);
        assert_eq!(columns, vec!["name", "email", "status", "alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_list_view_components() {
        let schema = parse(
            "Table users {\n  id int [pk]\n  name varchar\n  email varchar\n  active boolean\n  joined date\n  score int\n  bio text\n}\nTable posts {\n  user_id int [ref: > users.id]\n}\n",
        )
        .unwrap();
        let suggestions = generate_suggestions(&schema.tables, &schema.relationships);
        let list = &suggestions[0];
        assert_eq!(list.name, "UsersList");

        let search = list.component(ComponentType::SearchBar).unwrap();
        assert_eq!(search.props["fields"], json!(["name", "email", "active"]));

        let filters = list.component(ComponentType::FilterPanel).unwrap();
        let filter_fields: Vec<_> = filters.props["filters"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(filter_fields, vec!["name", "email", "active", "joined"]);

        let table = list.component(ComponentType::DataTable).unwrap();
        assert_eq!(table.props["relatedColumns"], json!(["posts"]));
        assert_eq!(table.props["columns"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_detail_view_related_sections_capped_and_first_expanded() {
        let schema = parse(
            r#"
Table users { id int [pk] }
Table a { user_id int [ref: > users.id] }
Table b { user_id int [ref: > users.id] }
Table c { user_id int [ref: > users.id] }
Table d { user_id int [ref: > users.id] }
"#,
        )
        .unwrap();
        let suggestions = generate_suggestions(&schema.tables, &schema.relationships);
        let detail = suggestions
            .iter()
            .find(|s| s.table == "users" && s.view_kind == ViewKind::Detail)
            .unwrap();
        let sections: Vec<_> = detail.components_of(ComponentType::RelatedSection).collect();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].props["expanded"], true);
        assert_eq!(sections[1].props["expanded"], false);
        assert_eq!(
            sections[0].data_binding.as_ref().unwrap().relation.as_deref(),
            Some("id")
        );
        assert!(detail.component(ComponentType::Header).is_some());
        assert!(detail.component(ComponentType::InfoCard).is_some());
    }

    #[test]
    fn test_form_view_fields() {
        let schema = parse(
            r#"
enum status { draft, published }
Table categories {
  id int [pk]
  title varchar
}
Table products {
  id int [pk]
  name varchar(80) [not null]
  price decimal(10,2)
  category_id int [ref: > categories.id]
  state status
}
"#,
        )
        .unwrap();
        let suggestions = UiMapper::new(&schema.tables, &schema.relationships)
            .with_enums(&schema.enums)
            .generate();
        let form = suggestions
            .iter()
            .find(|s| s.table == "products" && s.view_kind == ViewKind::Form)
            .unwrap();
        let fields: Vec<_> = form.components_of(ComponentType::FormField).collect();
        assert_eq!(fields.len(), 4, "primary key is excluded");

        let name = &fields[0].props;
        assert_eq!(name["required"], true);
        assert_eq!(name["validation"]["maxLength"], 80);
        assert_eq!(name["fieldType"], "text-input");

        assert_eq!(fields[1].props["step"], 0.01);
        assert_eq!(fields[1].props["required"], false);

        let category = &fields[2].props;
        assert_eq!(category["fieldType"], "select");
        assert_eq!(category["options"]["source"], "categories");
        assert_eq!(category["options"]["labelField"], "title");

        assert_eq!(fields[3].props["fieldType"], "select");
        assert_eq!(fields[3].props["options"]["values"], json!(["draft", "published"]));
    }

    #[test]
    fn test_dashboard_stats_and_trend() {
        let schema = parse(
            "Table orders {\n  id int [pk]\n  total decimal\n  tax decimal\n  shipping decimal\n  discount decimal\n  placed_at timestamp\n}\n",
        )
        .unwrap();
        let suggestions = generate_suggestions(&schema.tables, &schema.relationships);
        let dash = suggestions
            .iter()
            .find(|s| s.view_kind == ViewKind::Dashboard)
            .unwrap();
        let stats = dash.component(ComponentType::StatsGrid).unwrap().props["stats"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(stats.len(), 4, "count plus three sums");
        assert_eq!(stats[0]["aggregate"], "count");
        assert_eq!(stats[1]["field"], "total");

        let trend = dash.component(ComponentType::TrendChart).unwrap();
        assert_eq!(trend.props["valueField"], "total");
        assert_eq!(trend.props["dateField"], "placed_at");
    }

    #[test]
    fn test_trend_falls_back_to_count() {
        let schema = parse("Table events {\n  id int [pk]\n  happened_at date\n}\n").unwrap();
        let suggestions = generate_suggestions(&schema.tables, &schema.relationships);
        let dash = suggestions
            .iter()
            .find(|s| s.view_kind == ViewKind::Dashboard)
            .unwrap();
        assert_eq!(
            dash.component(ComponentType::TrendChart).unwrap().props["valueField"],
            "count"
        );
    }

    #[test]
    fn test_generation_is_deterministic() {
        let schema = parse(
            "Table a {\n  id int [pk]\n  name varchar\n}\nTable b {\n  a_id int [ref: > a.id]\n}\n",
        )
        .unwrap();
        let first = generate_suggestions(&schema.tables, &schema.relationships);
        let second = generate_suggestions(&schema.tables, &schema.relationships);
        assert_eq!(first, second);
    }

    #[test]
    fn test_naming_helpers() {
        let table = Table::new("order_items");
        assert_eq!(component_name(&table, ViewKind::MasterDetail), "OrderItemsMasterDetail");
        assert_eq!(humanize("created_at"), "Created at");
        assert_eq!(slug("order items"), "order-items");
    }
}

//! Types produced by the UI suggestion mapper.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Granularity at which views are suggested and generation tasks created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    List,
    Detail,
    Form,
    Dashboard,
    MasterDetail,
}

impl ViewKind {
    pub const ALL: [ViewKind; 5] = [
        ViewKind::List,
        ViewKind::Detail,
        ViewKind::Form,
        ViewKind::Dashboard,
        ViewKind::MasterDetail,
    ];

    /// Suffix used in generated component names (`ProductsList`).
    pub fn component_suffix(&self) -> &'static str {
        match self {
            Self::List => "List",
            Self::Detail => "Detail",
            Self::Form => "Form",
            Self::Dashboard => "Dashboard",
            Self::MasterDetail => "MasterDetail",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Detail => write!(f, "detail"),
            Self::Form => write!(f, "form"),
            Self::Dashboard => write!(f, "dashboard"),
            Self::MasterDetail => write!(f, "master-detail"),
        }
    }
}

impl std::str::FromStr for ViewKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "list" => Ok(Self::List),
            "detail" => Ok(Self::Detail),
            "form" => Ok(Self::Form),
            "dashboard" => Ok(Self::Dashboard),
            "master-detail" | "master_detail" | "masterdetail" => Ok(Self::MasterDetail),
            _ => Err(format!("Invalid view kind: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentType {
    Header,
    InfoCard,
    RelatedSection,
    SearchBar,
    FilterPanel,
    DataTable,
    FormField,
    FormActions,
    StatsGrid,
    TrendChart,
    MasterList,
    DetailTabs,
}

/// Where a component reads its data from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBinding {
    pub source: String,
    pub fields: Vec<String>,
    /// Column linking `source` to the view's own table, for related data.
    pub relation: Option<String>,
}

impl DataBinding {
    pub fn fields(source: &str, fields: Vec<String>) -> Self {
        Self {
            source: source.to_string(),
            fields,
            relation: None,
        }
    }

    pub fn related(source: &str, relation: &str) -> Self {
        Self {
            source: source.to_string(),
            fields: Vec::new(),
            relation: Some(relation.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub props: serde_json::Value,
    pub data_binding: Option<DataBinding>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    Stack,
    Grid,
    Split,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDescriptor {
    pub kind: LayoutKind,
    pub columns: u8,
}

impl LayoutDescriptor {
    pub fn stack() -> Self {
        Self {
            kind: LayoutKind::Stack,
            columns: 1,
        }
    }

    pub fn grid(columns: u8) -> Self {
        Self {
            kind: LayoutKind::Grid,
            columns,
        }
    }

    pub fn split() -> Self {
        Self {
            kind: LayoutKind::Split,
            columns: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSuggestion {
    pub table: String,
    pub view_kind: ViewKind,
    /// Generated component name (`ProductsList`).
    pub name: String,
    pub description: String,
    pub components: Vec<ComponentDescriptor>,
    pub layout: LayoutDescriptor,
}

impl ViewSuggestion {
    pub fn component(&self, component_type: ComponentType) -> Option<&ComponentDescriptor> {
        self.components
            .iter()
            .find(|c| c.component_type == component_type)
    }

    pub fn components_of(
        &self,
        component_type: ComponentType,
    ) -> impl Iterator<Item = &ComponentDescriptor> {
        self.components
            .iter()
            .filter(move |c| c.component_type == component_type)
    }
}

//! # Schema Model
//!
//! Structured form of a parsed DBML document. Everything here is built once per
//! parse call and consumed read-only by the mapper and the assembler.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Foreign-key target of a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnReference {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Declared type exactly as written, arguments included (`decimal(10,2)`).
    pub data_type: String,
    pub primary_key: bool,
    pub not_null: bool,
    pub unique: bool,
    pub default_value: Option<String>,
    pub references: Option<ColumnReference>,
    pub note: Option<String>,
    /// Raw constraint tokens in source order.
    pub constraints: Vec<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            primary_key: false,
            not_null: false,
            unique: false,
            default_value: None,
            references: None,
            note: None,
            constraints: Vec::new(),
        }
    }

    /// Type name without arguments, lower-cased (`varchar(255)` -> `varchar`).
    pub fn base_type(&self) -> String {
        self.data_type
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase()
    }

    /// Arguments of the declared type, if any (`decimal(10,2)` -> `["10", "2"]`).
    pub fn type_args(&self) -> Vec<String> {
        let Some(open) = self.data_type.find('(') else {
            return Vec::new();
        };
        let close = self.data_type.rfind(')').unwrap_or(self.data_type.len());
        if close <= open {
            return Vec::new();
        }
        self.data_type[open + 1..close]
            .split(',')
            .map(|arg| arg.trim().to_string())
            .filter(|arg| !arg.is_empty())
            .collect()
    }

    pub fn is_required(&self) -> bool {
        self.not_null || self.primary_key
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// Indexed columns or expressions as written.
    pub columns: Vec<String>,
    /// Raw settings (`unique`, `name: 'idx'`, ...).
    pub settings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub alias: Option<String>,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub note: Option<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            columns: Vec::new(),
            indexes: Vec::new(),
            note: None,
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.primary_key)
    }
}

/// Relationship cardinality, read from the left-hand side of the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl RelationshipKind {
    /// Maps a DBML ref operator to a kind: `>` many-to-one, `<` one-to-many,
    /// `-` one-to-one, `<>` many-to-many.
    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            ">" => Some(Self::ManyToOne),
            "<" => Some(Self::OneToMany),
            "-" => Some(Self::OneToOne),
            "<>" => Some(Self::ManyToMany),
            _ => None,
        }
    }

    pub fn operator(&self) -> &'static str {
        match self {
            Self::ManyToOne => ">",
            Self::OneToMany => "<",
            Self::OneToOne => "-",
            Self::ManyToMany => "<>",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneToOne => write!(f, "one-to-one"),
            Self::OneToMany => write!(f, "one-to-many"),
            Self::ManyToOne => write!(f, "many-to-one"),
            Self::ManyToMany => write!(f, "many-to-many"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

impl Relationship {
    pub fn touches(&self, table: &str) -> bool {
        self.from_table == table || self.to_table == table
    }

    /// The table on the other end, seen from `table`.
    pub fn other_table(&self, table: &str) -> Option<&str> {
        if self.from_table == table {
            Some(&self.to_table)
        } else if self.to_table == table {
            Some(&self.from_table)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedSchema {
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
    pub enums: Vec<EnumDef>,
}

impl ParsedSchema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.iter().find(|e| e.name == name)
    }

    pub fn relationships_for<'a>(
        &'a self,
        table: &'a str,
    ) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.relationships.iter().filter(move |r| r.touches(table))
    }
}

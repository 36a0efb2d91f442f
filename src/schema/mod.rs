//! # Schema
//!
//! DBML ingestion: a validator that scans raw text for structural problems and
//! a tokenizer-backed parser that builds the [`ParsedSchema`] model.
//!
//! Callers are expected to [`validate`] first and [`parse`] second. Validation
//! reports problems as data; parsing fails only on structure it cannot model.

pub mod lexer;
pub mod parser;
pub mod types;
pub mod validator;

pub use parser::parse;
pub use types::{
    Column, ColumnReference, EnumDef, Index, ParsedSchema, Relationship, RelationshipKind, Table,
};
pub use validator::{validate, Severity, ValidationIssue, ValidationReport};

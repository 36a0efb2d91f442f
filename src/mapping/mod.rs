//! # Mapping
//!
//! Turns a parsed schema into UI view suggestions: a declared-type to widget
//! table and the rule set that picks views and their components per table.

pub mod field_types;
pub mod types;
pub mod ui_mapper;

pub use field_types::{map_column, FieldMapping, FieldType, TypeFamily};
pub use types::{
    ComponentDescriptor, ComponentType, DataBinding, LayoutDescriptor, LayoutKind, ViewKind,
    ViewSuggestion,
};
pub use ui_mapper::{generate_suggestions, UiMapper};

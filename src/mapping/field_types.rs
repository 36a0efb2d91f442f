//! Declared-type to UI-field mapping table.
//!
//! Unknown types degrade to a plain text input; they never fail.

use crate::schema::Column;
use serde::{Deserialize, Serialize};

/// Coarse classification of a declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFamily {
    String,
    Numeric,
    Boolean,
    Date,
    Other,
}

/// UI widget a form field renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    TextInput,
    TextArea,
    NumberInput,
    Switch,
    DatePicker,
    DateTimePicker,
    TimePicker,
    EmailInput,
    UrlInput,
    PhoneInput,
    ImageUpload,
    FileUpload,
    JsonEditor,
    Select,
}

/// Resolved mapping for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub field_type: FieldType,
    pub family: TypeFamily,
    /// Step for numeric inputs; fractional for float/decimal types.
    pub step: Option<f64>,
    /// Max length parsed from a `(N)` suffix on string types.
    pub max_length: Option<u32>,
}

const INTEGER_TYPES: &[&str] = &[
    "int", "integer", "int2", "int4", "int8", "bigint", "smallint", "tinyint", "mediumint",
    "serial", "bigserial", "smallserial",
];
const DECIMAL_TYPES: &[&str] = &[
    "decimal", "numeric", "float", "float4", "float8", "double", "real", "money",
];
const STRING_TYPES: &[&str] = &[
    "varchar", "char", "character", "nvarchar", "nchar", "string", "citext", "uuid", "enum",
];
const TEXT_TYPES: &[&str] = &["text", "longtext", "mediumtext", "tinytext", "clob"];
const BOOLEAN_TYPES: &[&str] = &["bool", "boolean", "bit"];
const DATETIME_TYPES: &[&str] = &["datetime", "datetime2", "timestamp", "timestamptz"];
const TIME_TYPES: &[&str] = &["time", "timetz"];
const JSON_TYPES: &[&str] = &["json", "jsonb"];
const BINARY_TYPES: &[&str] = &["blob", "binary", "varbinary", "bytea", "file"];

pub fn type_family(column: &Column) -> TypeFamily {
    let base = column.base_type();
    let t = base.as_str();
    if INTEGER_TYPES.contains(&t) || DECIMAL_TYPES.contains(&t) {
        TypeFamily::Numeric
    } else if BOOLEAN_TYPES.contains(&t) {
        TypeFamily::Boolean
    } else if t == "date" || DATETIME_TYPES.contains(&t) || TIME_TYPES.contains(&t) {
        TypeFamily::Date
    } else if JSON_TYPES.contains(&t) || BINARY_TYPES.contains(&t) || t == "image" {
        TypeFamily::Other
    } else {
        TypeFamily::String
    }
}

pub fn is_numeric(column: &Column) -> bool {
    type_family(column) == TypeFamily::Numeric
}

pub fn is_temporal(column: &Column) -> bool {
    type_family(column) == TypeFamily::Date
}

/// Maps a column to its form widget. Foreign keys always become a select.
pub fn map_column(column: &Column) -> FieldMapping {
    let family = type_family(column);
    let base = column.base_type();
    let t = base.as_str();

    let field_type = if column.references.is_some() {
        FieldType::Select
    } else if INTEGER_TYPES.contains(&t) || DECIMAL_TYPES.contains(&t) {
        FieldType::NumberInput
    } else if BOOLEAN_TYPES.contains(&t) {
        FieldType::Switch
    } else if t == "date" {
        FieldType::DatePicker
    } else if DATETIME_TYPES.contains(&t) {
        FieldType::DateTimePicker
    } else if TIME_TYPES.contains(&t) {
        FieldType::TimePicker
    } else if JSON_TYPES.contains(&t) {
        FieldType::JsonEditor
    } else if t == "image" {
        FieldType::ImageUpload
    } else if BINARY_TYPES.contains(&t) {
        FieldType::FileUpload
    } else if t == "email" {
        FieldType::EmailInput
    } else if t == "url" || t == "uri" {
        FieldType::UrlInput
    } else if t == "phone" || t == "tel" {
        FieldType::PhoneInput
    } else if let Some(hinted) = name_hint(&column.name) {
        hinted
    } else if TEXT_TYPES.contains(&t) {
        FieldType::TextArea
    } else {
        FieldType::TextInput
    };

    let step = match field_type {
        FieldType::NumberInput if DECIMAL_TYPES.contains(&t) => Some(0.01),
        FieldType::NumberInput => Some(1.0),
        _ => None,
    };

    let max_length = if family == TypeFamily::String && !TEXT_TYPES.contains(&t) {
        match column.type_args().as_slice() {
            [n] => n.parse().ok(),
            _ => None,
        }
    } else {
        None
    };

    FieldMapping {
        field_type,
        family,
        step,
        max_length,
    }
}

/// Specialised widgets inferred from conventional string column names.
fn name_hint(name: &str) -> Option<FieldType> {
    let name = name.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| name.contains(n));
    if has(&["email"]) {
        Some(FieldType::EmailInput)
    } else if name.ends_with("url") || has(&["website", "link"]) {
        Some(FieldType::UrlInput)
    } else if has(&["phone", "mobile"]) {
        Some(FieldType::PhoneInput)
    } else if has(&["image", "avatar", "photo", "logo", "thumbnail"]) {
        Some(FieldType::ImageUpload)
    } else if has(&["attachment", "document"]) || name.ends_with("file") {
        Some(FieldType::FileUpload)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnReference;

    fn col(name: &str, ty: &str) -> Column {
        Column::new(name, ty)
    }

    #[test]
    fn test_numeric_mapping_and_step() {
        let price = map_column(&col("price", "decimal(10,2)"));
        assert_eq!(price.field_type, FieldType::NumberInput);
        assert_eq!(price.step, Some(0.01));
        assert_eq!(price.max_length, None);

        let qty = map_column(&col("qty", "int"));
        assert_eq!(qty.step, Some(1.0));
        assert_eq!(map_column(&col("ratio", "float")).step, Some(0.01));
    }

    #[test]
    fn test_string_length_becomes_max_length() {
        let name = map_column(&col("name", "varchar(120)"));
        assert_eq!(name.field_type, FieldType::TextInput);
        assert_eq!(name.max_length, Some(120));
        assert_eq!(map_column(&col("bio", "text")).field_type, FieldType::TextArea);
    }

    #[test]
    fn test_temporal_and_boolean_mapping() {
        assert_eq!(map_column(&col("born", "date")).field_type, FieldType::DatePicker);
        assert_eq!(
            map_column(&col("created_at", "timestamp")).field_type,
            FieldType::DateTimePicker
        );
        assert_eq!(map_column(&col("opens", "time")).field_type, FieldType::TimePicker);
        assert_eq!(map_column(&col("active", "boolean")).field_type, FieldType::Switch);
    }

    #[test]
    fn test_specialised_widgets() {
        assert_eq!(map_column(&col("contact", "email")).field_type, FieldType::EmailInput);
        assert_eq!(
            map_column(&col("email", "varchar(255)")).field_type,
            FieldType::EmailInput
        );
        assert_eq!(map_column(&col("homepage_url", "varchar")).field_type, FieldType::UrlInput);
        assert_eq!(map_column(&col("phone", "varchar")).field_type, FieldType::PhoneInput);
        assert_eq!(map_column(&col("avatar", "varchar")).field_type, FieldType::ImageUpload);
        assert_eq!(map_column(&col("contract", "bytea")).field_type, FieldType::FileUpload);
    }

    #[test]
    fn test_foreign_key_is_always_select() {
        let mut fk = col("category_id", "int");
        fk.references = Some(ColumnReference {
            table: "categories".into(),
            column: "id".into(),
        });
        let mapping = map_column(&fk);
        assert_eq!(mapping.field_type, FieldType::Select);
        assert_eq!(mapping.step, None);
        assert_eq!(mapping.family, TypeFamily::Numeric);
    }

    #[test]
    fn test_unknown_type_degrades_to_text() {
        let mapping = map_column(&col("shape", "geometry"));
        assert_eq!(mapping.field_type, FieldType::TextInput);
        assert_eq!(mapping.family, TypeFamily::String);
    }
}

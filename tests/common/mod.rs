#![allow(dead_code)] // Each test binary uses a different subset

pub mod builders;
pub mod strategies;

pub use builders::*;

/// Three-table shop schema: users, products and categories, with
/// `products.category_id` referencing `categories.id`.
pub const SHOP_SCHEMA: &str = r#"
// Shop example
Table users {
  id int [pk]
  name varchar(120) [not null]
  email varchar(255) [unique]
  created_at timestamp
}

Table products {
  id int [pk]
  name varchar [not null]
  description text
  price decimal(10,2)
  category_id int [ref: > categories.id]
}

Table categories {
  id int [pk]
  title varchar
}
"#;

/// Two tables with no relationships.
pub const TWO_TABLE_SCHEMA: &str = r#"
Table authors {
  id int [pk]
  name varchar
}

Table tags {
  label varchar
}
"#;

//! # Persistence
//!
//! The boundary to the prototype store. The pipeline only ever calls
//! [`PrototypeStore::create`]; the remaining operations serve callers that
//! browse and edit stored prototypes.

pub mod memory;

use crate::error::StoreError;
use crate::orchestration::GeneratedArtifact;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use memory::InMemoryPrototypeStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrototypeStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPrototype {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: PrototypeStatus,
    pub tags: Vec<String>,
    pub artifact: GeneratedArtifact,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrototype {
    pub artifact: GeneratedArtifact,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<GeneratedArtifact> for NewPrototype {
    fn from(artifact: GeneratedArtifact) -> Self {
        Self {
            artifact,
            tags: Vec::new(),
        }
    }
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrototypePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<PrototypeStatus>,
    pub tags: Option<Vec<String>>,
}

impl PrototypePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.tags.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrototypeFilters {
    /// Case-insensitive substring of the name.
    pub name_contains: Option<String>,
    pub status: Option<PrototypeStatus>,
    pub tag: Option<String>,
    /// Prototypes whose source schema has a table with this name.
    pub table: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrototypeQuery {
    pub filters: PrototypeFilters,
    pub sort: SortField,
    pub order: SortOrder,
    pub limit: usize,
    pub offset: usize,
}

impl Default for PrototypeQuery {
    fn default() -> Self {
        Self {
            filters: PrototypeFilters::default(),
            sort: SortField::default(),
            order: SortOrder::default(),
            limit: 20,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPage {
    pub items: Vec<StoredPrototype>,
    pub total: usize,
    pub has_more: bool,
    pub next_offset: Option<usize>,
}

#[async_trait::async_trait]
pub trait PrototypeStore: Send + Sync {
    async fn create(&self, input: NewPrototype) -> Result<StoredPrototype, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<StoredPrototype>, StoreError>;

    async fn update(&self, id: Uuid, patch: PrototypePatch) -> Result<StoredPrototype, StoreError>;

    async fn query(&self, query: PrototypeQuery) -> Result<QueryPage, StoreError>;
}

//! In-memory [`PrototypeStore`] backed by a concurrent map.

use super::{
    NewPrototype, PrototypePatch, PrototypeQuery, PrototypeStore, QueryPage, SortField,
    SortOrder, StoredPrototype,
};
use crate::error::StoreError;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct InMemoryPrototypeStore {
    items: Arc<DashMap<Uuid, StoredPrototype>>,
}

impl InMemoryPrototypeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait::async_trait]
impl PrototypeStore for InMemoryPrototypeStore {
    async fn create(&self, input: NewPrototype) -> Result<StoredPrototype, StoreError> {
        let now = Utc::now();
        let stored = StoredPrototype {
            id: Uuid::new_v4(),
            name: input.artifact.name.clone(),
            description: input.artifact.description.clone(),
            status: Default::default(),
            tags: input.tags,
            artifact: input.artifact,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        self.items.insert(stored.id, stored.clone());
        debug!(id = %stored.id, name = %stored.name, "Stored prototype");
        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredPrototype>, StoreError> {
        Ok(self.items.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update(&self, id: Uuid, patch: PrototypePatch) -> Result<StoredPrototype, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::InvalidPatch("patch changes nothing".to_string()));
        }
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(StoreError::InvalidPatch("name must not be empty".to_string()));
        }

        let mut entry = self.items.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let item = entry.value_mut();
        if let Some(name) = patch.name {
            item.artifact.name = name.clone();
            item.name = name;
        }
        if let Some(description) = patch.description {
            item.artifact.description = description.clone();
            item.description = description;
        }
        if let Some(status) = patch.status {
            item.status = status;
        }
        if let Some(tags) = patch.tags {
            item.tags = tags;
        }
        item.version += 1;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn query(&self, query: PrototypeQuery) -> Result<QueryPage, StoreError> {
        let filters = &query.filters;
        let needle = filters.name_contains.as_ref().map(|n| n.to_lowercase());

        let mut matches: Vec<StoredPrototype> = self
            .items
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|p| {
                needle
                    .as_ref()
                    .map_or(true, |n| p.name.to_lowercase().contains(n))
            })
            .filter(|p| filters.status.map_or(true, |s| p.status == s))
            .filter(|p| filters.tag.as_ref().map_or(true, |t| p.tags.contains(t)))
            .filter(|p| {
                filters
                    .table
                    .as_ref()
                    .map_or(true, |t| p.artifact.table_names().any(|name| name == t))
            })
            .collect();

        matches.sort_by(|a, b| {
            let ordering = match query.sort {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SortField::Name => a.name.cmp(&b.name),
            }
            .then_with(|| a.id.cmp(&b.id));
            match query.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = matches.len();
        let items: Vec<StoredPrototype> = matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();
        let end = query.offset + items.len();
        let has_more = end < total;

        Ok(QueryPage {
            items,
            total,
            has_more,
            next_offset: has_more.then_some(end),
        })
    }
}

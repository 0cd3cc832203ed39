use std::collections::hash_map::Entry;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, TodoItem, TodoPatch, TodoStore};

/// In-process key-value implementation of [`TodoStore`].
///
/// The map is keyed by the `(owner_id, id)` composite key, which makes owner
/// isolation structural: no lookup or mutation can reach another owner's
/// partition. Each operation is a single read-modify-write under one lock
/// acquisition, so a cancelled request never leaves an item half-written.
pub struct MemoryTodoStore {
    table_name: String,
    items: RwLock<HashMap<(String, String), TodoItem>>,
}

impl MemoryTodoStore {
    pub fn new(table_name: impl Into<String>) -> Self {
        let table_name = table_name.into();
        tracing::info!(table = %table_name, "using in-memory todo store");
        Self {
            table_name,
            items: RwLock::new(HashMap::new()),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl TodoStore for MemoryTodoStore {
    async fn list(&self, owner_id: &str, limit: usize) -> Result<Vec<TodoItem>, StoreError> {
        let items = self.items.read().await;
        let mut owned: Vec<TodoItem> = items
            .iter()
            .filter(|((owner, _), _)| owner == owner_id)
            .map(|(_, item)| item.clone())
            .collect();

        // Stable output order; not part of the contract
        owned.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        owned.truncate(limit);
        Ok(owned)
    }

    async fn get(&self, owner_id: &str, id: &str) -> Result<TodoItem, StoreError> {
        let items = self.items.read().await;
        items
            .get(&(owner_id.to_string(), id.to_string()))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create(
        &self,
        owner_id: &str,
        title: String,
        content: String,
    ) -> Result<TodoItem, StoreError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let item = TodoItem {
            owner_id: owner_id.to_string(),
            id: id.clone(),
            title,
            content,
            done: false,
            created_at: now,
            updated_at: now,
        };

        let mut items = self.items.write().await;
        match items.entry((owner_id.to_string(), id.clone())) {
            Entry::Occupied(_) => Err(StoreError::Conflict(id)),
            Entry::Vacant(slot) => {
                slot.insert(item.clone());
                Ok(item)
            }
        }
    }

    async fn update(
        &self,
        owner_id: &str,
        id: &str,
        patch: TodoPatch,
    ) -> Result<TodoItem, StoreError> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(&(owner_id.to_string(), id.to_string()))
            .ok_or(StoreError::NotFound)?;

        if let Some(title) = patch.title {
            item.title = title;
        }
        if let Some(content) = patch.content {
            item.content = content;
        }
        if let Some(done) = patch.done {
            item.done = done;
        }

        let mut now = Utc::now();
        if now <= item.updated_at {
            // Clock granularity guard: updated_at must advance strictly
            now = item.updated_at + chrono::Duration::nanoseconds(1);
        }
        item.updated_at = now;

        Ok(item.clone())
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), StoreError> {
        let mut items = self.items.write().await;
        items
            .remove(&(owner_id.to_string(), id.to_string()))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

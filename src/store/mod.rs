use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;

pub use memory::MemoryTodoStore;

/// A single todo item. `(owner_id, id)` is the unique composite key;
/// `owner_id` partitions the collection and never comes from caller input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub owner_id: String,
    pub id: String,
    pub title: String,
    pub content: String,
    pub done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; unspecified fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub done: Option<bool>,
}

/// Errors from TodoStore implementations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("todo not found")]
    NotFound,

    #[error("id collision on insert: {0}")]
    Conflict(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Owner-scoped CRUD against the todo collection.
///
/// Every operation takes the owner id from the verified principal. Mutations
/// are conditioned on the exact owner-scoped key, so a write can never affect
/// another owner's data even under adapter misuse.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// All items for the owner, capped at `limit`. Order is an
    /// implementation detail; callers must treat the result as a set.
    async fn list(&self, owner_id: &str, limit: usize) -> Result<Vec<TodoItem>, StoreError>;

    async fn get(&self, owner_id: &str, id: &str) -> Result<TodoItem, StoreError>;

    /// Insert a new item with a server-generated id and timestamps.
    /// Conditional insert: fails `Conflict` if the generated key already
    /// exists rather than silently overwriting.
    async fn create(
        &self,
        owner_id: &str,
        title: String,
        content: String,
    ) -> Result<TodoItem, StoreError>;

    /// Apply a partial update. `updated_at` is refreshed unconditionally on
    /// success.
    async fn update(
        &self,
        owner_id: &str,
        id: &str,
        patch: TodoPatch,
    ) -> Result<TodoItem, StoreError>;

    /// Terminal, immediate removal. No soft-delete.
    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), StoreError>;
}

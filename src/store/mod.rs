//! Document persistence backends. Each collection holds JSON documents keyed by `_id`.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs ("memory", "postgres").
    fn backend(&self) -> &'static str;

    /// Create the collection's backing storage if it does not exist yet.
    async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError>;

    /// Insert a new document. Fails with `StoreError::Conflict` if `id` is taken.
    async fn insert(&self, collection: &str, id: &str, doc: &Value) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Documents whose top-level properties equal every entry of `filter`, in insertion order.
    /// Equality is on whole values: an array or object filter value never matches a superset.
    async fn list(&self, collection: &str, filter: &Map<String, Value>) -> Result<Vec<Value>, StoreError>;

    /// Replace an existing document. Returns false when `id` does not exist.
    async fn replace(&self, collection: &str, id: &str, doc: &Value) -> Result<bool, StoreError>;

    /// Returns false when `id` does not exist.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// Cheap liveness check for the readiness endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Exact match on every filter entry. A missing key never matches, not even a `null` filter value.
pub(crate) fn matches_filter(doc: &Value, filter: &Map<String, Value>) -> bool {
    filter.iter().all(|(k, v)| doc.get(k) == Some(v))
}

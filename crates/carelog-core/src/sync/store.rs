//! Storage seams consumed by the sync engine.
//!
//! Each entity type plugs in a local store, a remote store and a mapper.
//! Bookkeeping (mappings, watermarks, conflict log) is shared by all of them.

use async_trait::async_trait;

use crate::error::{DomainError, Result};
use crate::models::{EntityType, SyncConflict, SyncMapping, SyncMetadata};

/// A remote document together with its identifier in the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument<R> {
    pub id: String,
    pub data: R,
}

impl<R> RemoteDocument<R> {
    pub fn new(id: impl Into<String>, data: R) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Persistent `(entity_type, local_id) -> remote_id` table.
#[async_trait]
pub trait SyncMappingStore: Send + Sync {
    async fn upsert(&self, mapping: &SyncMapping) -> Result<()>;

    async fn get_by_local_id(
        &self,
        entity_type: EntityType,
        local_id: i64,
    ) -> Result<Option<SyncMapping>>;

    async fn get_all_by_type(&self, entity_type: EntityType) -> Result<Vec<SyncMapping>>;
}

/// Per-scope `lastSyncTime` watermark.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    async fn load(&self, scope_id: &str) -> Result<Option<i64>>;

    async fn save(&self, scope_id: &str, synced_at: i64) -> Result<()>;
}

/// Append-only log of resolved conflicts.
#[async_trait]
pub trait ConflictLog: Send + Sync {
    /// Store the conflict and return its assigned id.
    async fn record(&self, conflict: &SyncConflict) -> Result<i64>;

    /// Most recent conflicts first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<SyncConflict>>;
}

/// Device-local storage for one entity type.
#[async_trait]
pub trait LocalStore<L>: Send + Sync {
    /// Records with `updated_at > since`, or every record when `since` is `None`.
    /// Tombstoned records are included.
    async fn query_changed_since(
        &self,
        scope_id: &str,
        since: Option<i64>,
    ) -> std::result::Result<Vec<L>, DomainError>;

    /// Insert or replace a record. A record without a local id gets a new one.
    async fn upsert(&self, scope_id: &str, record: &L) -> std::result::Result<i64, DomainError>;

    async fn delete(&self, scope_id: &str, local_id: i64) -> std::result::Result<(), DomainError>;
}

/// Remote document collection for one entity type, scoped by care recipient.
#[async_trait]
pub trait RemoteStore<R>: Send + Sync {
    async fn query_changed_since(
        &self,
        scope_id: &str,
        since: Option<i64>,
    ) -> std::result::Result<Vec<RemoteDocument<R>>, DomainError>;

    /// Write a document. `None` creates a new document; the returned id is
    /// the document's id in either case.
    async fn upsert(
        &self,
        scope_id: &str,
        remote_id: Option<&str>,
        doc: &R,
    ) -> std::result::Result<String, DomainError>;
}

/// Local storage for a child entity owned by a parent record.
#[async_trait]
pub trait ChildLocalStore<L>: Send + Sync {
    async fn query_changed_since(
        &self,
        scope_id: &str,
        parent_local_id: i64,
        since: Option<i64>,
    ) -> std::result::Result<Vec<L>, DomainError>;

    async fn upsert(
        &self,
        scope_id: &str,
        parent_local_id: i64,
        record: &L,
    ) -> std::result::Result<i64, DomainError>;

    async fn delete(&self, scope_id: &str, local_id: i64) -> std::result::Result<(), DomainError>;
}

/// Remote collection nested under a parent document.
#[async_trait]
pub trait ChildRemoteStore<R>: Send + Sync {
    async fn query_changed_since(
        &self,
        scope_id: &str,
        parent_remote_id: &str,
        since: Option<i64>,
    ) -> std::result::Result<Vec<RemoteDocument<R>>, DomainError>;

    async fn upsert(
        &self,
        scope_id: &str,
        parent_remote_id: &str,
        remote_id: Option<&str>,
        doc: &R,
    ) -> std::result::Result<String, DomainError>;
}

/// Conversion between the domain model and its remote representation.
pub trait RemoteMapper<L, R>: Send + Sync {
    fn to_domain(&self, doc: &R) -> std::result::Result<L, DomainError>;

    fn to_remote(&self, record: &L, metadata: &SyncMetadata) -> std::result::Result<R, DomainError>;

    /// Sync bookkeeping carried by the document, if it was written by a
    /// syncing client.
    fn extract_sync_metadata(&self, doc: &R) -> Option<SyncMetadata>;
}

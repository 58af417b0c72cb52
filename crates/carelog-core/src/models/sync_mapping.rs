//! Local/remote identity bookkeeping

use serde::{Deserialize, Serialize};

use super::EntityType;

/// Association between a local row and its remote document.
///
/// Unique on `(entity_type, local_id)`. Rows are never removed, so a
/// tombstoned record keeps pointing at its remote document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMapping {
    pub entity_type: EntityType,
    pub local_id: i64,
    pub remote_id: String,
    /// `updated_at` of the last version both sides agreed on (Unix ms)
    pub last_synced_at: i64,
}

impl SyncMapping {
    pub fn new(
        entity_type: EntityType,
        local_id: i64,
        remote_id: impl Into<String>,
        last_synced_at: i64,
    ) -> Self {
        Self {
            entity_type,
            local_id,
            remote_id: remote_id.into(),
            last_synced_at,
        }
    }
}

/// Sync bookkeeping stored alongside a remote document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    /// Local id on the device that last wrote the document
    pub local_id: i64,
    pub synced_at: i64,
    /// Soft-delete marker; `None` means live
    #[serde(default)]
    pub deleted_at: Option<i64>,
}

impl SyncMetadata {
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

//! In-memory bookkeeping stores for ephemeral sessions

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{EntityType, SyncConflict, SyncMapping};
use crate::sync::store::{ConflictLog, SyncMappingStore, WatermarkStore};

/// Mapping table held in memory, ordered by local id within each type.
#[derive(Debug, Default)]
pub struct MemorySyncMappingStore {
    mappings: RwLock<BTreeMap<(EntityType, i64), SyncMapping>>,
}

impl MemorySyncMappingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncMappingStore for MemorySyncMappingStore {
    async fn upsert(&self, mapping: &SyncMapping) -> Result<()> {
        self.mappings
            .write()
            .await
            .insert((mapping.entity_type, mapping.local_id), mapping.clone());
        Ok(())
    }

    async fn get_by_local_id(
        &self,
        entity_type: EntityType,
        local_id: i64,
    ) -> Result<Option<SyncMapping>> {
        Ok(self
            .mappings
            .read()
            .await
            .get(&(entity_type, local_id))
            .cloned())
    }

    async fn get_all_by_type(&self, entity_type: EntityType) -> Result<Vec<SyncMapping>> {
        Ok(self
            .mappings
            .read()
            .await
            .values()
            .filter(|mapping| mapping.entity_type == entity_type)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct MemoryWatermarkStore {
    watermarks: RwLock<HashMap<String, i64>>,
}

impl MemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn load(&self, scope_id: &str) -> Result<Option<i64>> {
        Ok(self.watermarks.read().await.get(scope_id).copied())
    }

    async fn save(&self, scope_id: &str, synced_at: i64) -> Result<()> {
        self.watermarks
            .write()
            .await
            .insert(scope_id.to_string(), synced_at);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryConflictLog {
    conflicts: RwLock<Vec<SyncConflict>>,
}

impl MemoryConflictLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConflictLog for MemoryConflictLog {
    async fn record(&self, conflict: &SyncConflict) -> Result<i64> {
        let mut conflicts = self.conflicts.write().await;
        let id = i64::try_from(conflicts.len()).unwrap_or(i64::MAX - 1) + 1;
        conflicts.push(SyncConflict {
            id,
            ..conflict.clone()
        });
        Ok(id)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let mut conflicts = self.conflicts.read().await.clone();
        conflicts.sort_by(|a, b| b.resolved_at.cmp(&a.resolved_at).then(b.id.cmp(&a.id)));
        conflicts.truncate(limit);
        Ok(conflicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConflictWinner;
    use pretty_assertions::assert_eq;

    #[tokio::test(flavor = "multi_thread")]
    async fn mapping_upsert_replaces_by_key() {
        let store = MemorySyncMappingStore::new();
        store
            .upsert(&SyncMapping::new(EntityType::Note, 3, "n-3", 10))
            .await
            .unwrap();
        store
            .upsert(&SyncMapping::new(EntityType::Note, 1, "n-1", 10))
            .await
            .unwrap();
        store
            .upsert(&SyncMapping::new(EntityType::Note, 3, "n-3", 20))
            .await
            .unwrap();

        let notes = store.get_all_by_type(EntityType::Note).await.unwrap();
        assert_eq!(
            notes,
            vec![
                SyncMapping::new(EntityType::Note, 1, "n-1", 10),
                SyncMapping::new(EntityType::Note, 3, "n-3", 20),
            ]
        );
        assert!(store
            .get_by_local_id(EntityType::Task, 3)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn mappings_of_each_type_stay_ordered_by_local_id() {
        let store = MemorySyncMappingStore::new();
        for (entity_type, local_id) in [
            (EntityType::Task, 2),
            (EntityType::Medication, 9),
            (EntityType::Task, 1),
            (EntityType::MedicationLog, 4),
            (EntityType::Medication, 3),
        ] {
            store
                .upsert(&SyncMapping::new(
                    entity_type,
                    local_id,
                    format!("{entity_type}-{local_id}"),
                    1,
                ))
                .await
                .unwrap();
        }

        let local_ids = |mappings: Vec<SyncMapping>| -> Vec<i64> {
            mappings.iter().map(|m| m.local_id).collect()
        };
        assert_eq!(
            local_ids(store.get_all_by_type(EntityType::Medication).await.unwrap()),
            vec![3, 9]
        );
        assert_eq!(
            local_ids(store.get_all_by_type(EntityType::Task).await.unwrap()),
            vec![1, 2]
        );
        assert_eq!(
            local_ids(store.get_all_by_type(EntityType::MedicationLog).await.unwrap()),
            vec![4]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn watermarks_are_per_scope() {
        let store = MemoryWatermarkStore::new();
        store.save("alice", 100).await.unwrap();

        assert_eq!(store.load("alice").await.unwrap(), Some(100));
        assert_eq!(store.load("bob").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn conflict_log_lists_newest_first() {
        let log = MemoryConflictLog::new();
        for (local_id, resolved_at) in [(1, 50), (2, 300), (3, 100)] {
            log.record(&SyncConflict {
                id: 0,
                entity_type: EntityType::Medication,
                local_id,
                remote_id: format!("rem-{local_id}"),
                local_updated_at: 1,
                remote_updated_at: 2,
                winner: ConflictWinner::Remote,
                resolved_at,
                strategy: "lww".to_string(),
            })
            .await
            .unwrap();
        }

        let recent = log.list_recent(2).await.unwrap();
        let ids: Vec<i64> = recent.iter().map(|c| c.local_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}

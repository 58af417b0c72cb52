//! Shared handle on the local sync bookkeeping database.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::db::{
    Database, LibSqlConflictRepository, LibSqlMappingRepository, LibSqlWatermarkRepository,
};
use crate::models::{EntityType, SyncConflict, SyncMapping};
use crate::sync::{ConflictLog, SyncMappingStore, WatermarkStore};
use crate::Result;

/// Thread-safe service backing the mapping table, watermarks and conflict log.
#[derive(Clone)]
pub struct SyncDatabase {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl SyncDatabase {
    /// Open the database at the given filesystem path.
    ///
    /// A file that is not a database is moved aside and a fresh one created;
    /// mappings are rebuilt on the next full sync.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = match Database::open(&db_path).await {
            Ok(db) => db,
            Err(error) if Self::is_corrupted_db_error(&error) => {
                tracing::warn!("Local sync database is unreadable: {error}");
                Self::quarantine_corrupted_db_files(&db_path)?;
                Database::open(&db_path).await?
            }
            Err(error) => return Err(error),
        };

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory database (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn is_corrupted_db_error(error: &crate::Error) -> bool {
        error
            .to_string()
            .to_ascii_lowercase()
            .contains("file is not a database")
    }

    fn quarantine_corrupted_db_files(db_path: &Path) -> Result<()> {
        if db_path.exists() {
            let timestamp = chrono::Utc::now().timestamp_millis();
            let base_name = db_path
                .file_name()
                .map_or_else(|| "carelog.db".into(), |name| name.to_string_lossy());
            let backup_path = db_path.with_file_name(format!("{base_name}.corrupt-{timestamp}"));

            std::fs::rename(db_path, &backup_path)?;
            tracing::warn!(
                "Moved corrupted sync database from {} to {}",
                db_path.display(),
                backup_path.display()
            );
        }

        let Some(parent) = db_path.parent() else {
            return Ok(());
        };
        let Some(base_name) = db_path.file_name().and_then(|name| name.to_str()) else {
            return Ok(());
        };
        // WAL and SHM files belong to the moved database.
        for suffix in ["-wal", "-shm"] {
            let sidecar = parent.join(format!("{base_name}{suffix}"));
            if sidecar.exists() {
                std::fs::remove_file(&sidecar)?;
                tracing::warn!("Removed stale sidecar file {}", sidecar.display());
            }
        }

        Ok(())
    }

    /// Count mappings per entity type.
    pub async fn count_mappings_by_type(&self) -> Result<Vec<(EntityType, usize)>> {
        let db = self.db.lock().await;
        LibSqlMappingRepository::new(db.connection())
            .count_by_type()
            .await
    }
}

#[async_trait]
impl SyncMappingStore for SyncDatabase {
    async fn upsert(&self, mapping: &SyncMapping) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlMappingRepository::new(db.connection())
            .upsert(mapping)
            .await
    }

    async fn get_by_local_id(
        &self,
        entity_type: EntityType,
        local_id: i64,
    ) -> Result<Option<SyncMapping>> {
        let db = self.db.lock().await;
        LibSqlMappingRepository::new(db.connection())
            .get_by_local_id(entity_type, local_id)
            .await
    }

    async fn get_all_by_type(&self, entity_type: EntityType) -> Result<Vec<SyncMapping>> {
        let db = self.db.lock().await;
        LibSqlMappingRepository::new(db.connection())
            .get_all_by_type(entity_type)
            .await
    }
}

#[async_trait]
impl WatermarkStore for SyncDatabase {
    async fn load(&self, scope_id: &str) -> Result<Option<i64>> {
        let db = self.db.lock().await;
        LibSqlWatermarkRepository::new(db.connection())
            .load(scope_id)
            .await
    }

    async fn save(&self, scope_id: &str, synced_at: i64) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlWatermarkRepository::new(db.connection())
            .save(scope_id, synced_at)
            .await
    }
}

#[async_trait]
impl ConflictLog for SyncDatabase {
    async fn record(&self, conflict: &SyncConflict) -> Result<i64> {
        let db = self.db.lock().await;
        LibSqlConflictRepository::new(db.connection())
            .record(conflict)
            .await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let db = self.db.lock().await;
        LibSqlConflictRepository::new(db.connection())
            .list_recent(limit)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConflictWinner;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn mappings_roundtrip_through_service() {
        let service = SyncDatabase::open_in_memory().await.unwrap();

        service
            .upsert(&SyncMapping::new(EntityType::Medication, 1, "rem-1", 10))
            .await
            .unwrap();
        service
            .upsert(&SyncMapping::new(EntityType::Note, 2, "rem-2", 20))
            .await
            .unwrap();

        assert_eq!(
            service
                .get_by_local_id(EntityType::Medication, 1)
                .await
                .unwrap()
                .map(|m| m.remote_id),
            Some("rem-1".to_string())
        );
        assert_eq!(
            service.count_mappings_by_type().await.unwrap(),
            vec![(EntityType::Medication, 1), (EntityType::Note, 1)]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn watermark_and_conflicts_persist_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("carelog.db");

        {
            let service = SyncDatabase::open_path(&path).await.unwrap();
            service.save("recipient-1", 1_700).await.unwrap();
            service
                .record(&SyncConflict {
                    id: 0,
                    entity_type: EntityType::Task,
                    local_id: 3,
                    remote_id: "rem-3".to_string(),
                    local_updated_at: 5,
                    remote_updated_at: 9,
                    winner: ConflictWinner::Remote,
                    resolved_at: 10,
                    strategy: "lww".to_string(),
                })
                .await
                .unwrap();
        }

        let reopened = SyncDatabase::open_path(&path).await.unwrap();
        assert_eq!(reopened.db_path(), Some(path.as_path()));
        assert_eq!(reopened.load("recipient-1").await.unwrap(), Some(1_700));
        assert_eq!(reopened.load("recipient-2").await.unwrap(), None);
        assert_eq!(reopened.list_recent(5).await.unwrap().len(), 1);
    }

    #[test]
    fn detects_corrupted_database_errors() {
        assert!(SyncDatabase::is_corrupted_db_error(&crate::Error::Database(
            "SQLite failure: file is not a database".to_string()
        )));
        assert!(!SyncDatabase::is_corrupted_db_error(
            &crate::Error::InvalidInput("bad scope".to_string())
        ));
    }

    #[test]
    fn quarantine_moves_db_and_removes_sidecars() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("carelog.db");
        let wal_path = dir.path().join("carelog.db-wal");

        std::fs::write(&db_path, b"bad-db").unwrap();
        std::fs::write(&wal_path, b"wal").unwrap();

        SyncDatabase::quarantine_corrupted_db_files(&db_path).unwrap();

        assert!(!db_path.exists());
        assert!(!wal_path.exists());
        let found_backup = std::fs::read_dir(dir.path()).unwrap().any(|entry| {
            entry
                .unwrap()
                .file_name()
                .to_string_lossy()
                .starts_with("carelog.db.corrupt-")
        });
        assert!(found_backup);
    }
}

//! Sync mapping repository implementation

use crate::error::{Error, Result};
use crate::models::{EntityType, SyncMapping};
use libsql::{params, Connection};

/// libSQL implementation of the `(entity_type, local_id) -> remote_id` table
pub struct LibSqlMappingRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlMappingRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert or replace the mapping for `(entity_type, local_id)`.
    ///
    /// A single statement, so readers never observe a half-written row.
    pub async fn upsert(&self, mapping: &SyncMapping) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_mappings (entity_type, local_id, remote_id, last_synced_at)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(entity_type, local_id) DO UPDATE SET
                     remote_id = excluded.remote_id,
                     last_synced_at = excluded.last_synced_at",
                params![
                    mapping.entity_type.as_str(),
                    mapping.local_id,
                    mapping.remote_id.as_str(),
                    mapping.last_synced_at
                ],
            )
            .await?;
        Ok(())
    }

    /// Get the mapping for one local row
    pub async fn get_by_local_id(
        &self,
        entity_type: EntityType,
        local_id: i64,
    ) -> Result<Option<SyncMapping>> {
        let mut rows = self
            .conn
            .query(
                "SELECT entity_type, local_id, remote_id, last_synced_at
                 FROM sync_mappings
                 WHERE entity_type = ? AND local_id = ?",
                params![entity_type.as_str(), local_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_mapping(&row)?)),
            None => Ok(None),
        }
    }

    /// Get every mapping of one entity type, ordered by local id
    pub async fn get_all_by_type(&self, entity_type: EntityType) -> Result<Vec<SyncMapping>> {
        let mut rows = self
            .conn
            .query(
                "SELECT entity_type, local_id, remote_id, last_synced_at
                 FROM sync_mappings
                 WHERE entity_type = ?
                 ORDER BY local_id ASC",
                [entity_type.as_str()],
            )
            .await?;

        let mut mappings = Vec::new();
        while let Some(row) = rows.next().await? {
            mappings.push(Self::parse_mapping(&row)?);
        }
        Ok(mappings)
    }

    /// Count mappings per entity type
    pub async fn count_by_type(&self) -> Result<Vec<(EntityType, usize)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT entity_type, COUNT(*) FROM sync_mappings
                 GROUP BY entity_type
                 ORDER BY entity_type ASC",
                (),
            )
            .await?;

        let mut counts = Vec::new();
        while let Some(row) = rows.next().await? {
            let entity_type = row.get::<String>(0)?.parse::<EntityType>()?;
            let count = usize::try_from(row.get::<i64>(1)?)
                .map_err(|_| Error::Database("negative mapping count".to_string()))?;
            counts.push((entity_type, count));
        }
        Ok(counts)
    }

    fn parse_mapping(row: &libsql::Row) -> Result<SyncMapping> {
        let entity_type: String = row.get(0)?;
        Ok(SyncMapping {
            entity_type: entity_type.parse()?,
            local_id: row.get(1)?,
            remote_id: row.get(2)?,
            last_synced_at: row.get(3)?,
        })
    }
}

//! Conflict log repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::error::Result;
use crate::models::SyncConflict;
use libsql::{params, Connection};

/// libSQL implementation of the LWW conflict log
pub struct LibSqlConflictRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlConflictRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append a resolved conflict; the row id is assigned here
    pub async fn record(&self, conflict: &SyncConflict) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO sync_conflicts (
                    entity_type,
                    local_id,
                    remote_id,
                    local_updated_at,
                    remote_updated_at,
                    winner,
                    resolved_at,
                    strategy
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    conflict.entity_type.as_str(),
                    conflict.local_id,
                    conflict.remote_id.as_str(),
                    conflict.local_updated_at,
                    conflict.remote_updated_at,
                    conflict.winner.as_str(),
                    conflict.resolved_at,
                    conflict.strategy.as_str()
                ],
            )
            .await?;
        Ok(self.conn.last_insert_rowid())
    }

    /// List recently resolved conflicts, newest first
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, entity_type, local_id, remote_id, local_updated_at,
                        remote_updated_at, winner, resolved_at, strategy
                 FROM sync_conflicts
                 ORDER BY resolved_at DESC, id DESC
                 LIMIT ?",
                [limit as i64],
            )
            .await?;

        let mut conflicts = Vec::new();
        while let Some(row) = rows.next().await? {
            let entity_type: String = row.get(1)?;
            let winner: String = row.get(6)?;
            conflicts.push(SyncConflict {
                id: row.get(0)?,
                entity_type: entity_type.parse()?,
                local_id: row.get(2)?,
                remote_id: row.get(3)?,
                local_updated_at: row.get(4)?,
                remote_updated_at: row.get(5)?,
                winner: winner.parse()?,
                resolved_at: row.get(7)?,
                strategy: row.get(8)?,
            });
        }
        Ok(conflicts)
    }
}

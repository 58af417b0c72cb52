//! Watermark repository implementation
//!
//! The per-scope `last_sync_time` watermark is a local-only setting, stored in
//! the `settings` key/value table under `last_sync_time:<scope>`.

use crate::error::{Error, Result};
use libsql::Connection;

const WATERMARK_KEY_PREFIX: &str = "last_sync_time:";

/// libSQL implementation of watermark persistence
pub struct LibSqlWatermarkRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlWatermarkRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Load the watermark for `scope_id`, `None` before the first full sync
    pub async fn load(&self, scope_id: &str) -> Result<Option<i64>> {
        let Some(value) = self.get_setting(&watermark_key(scope_id)).await? else {
            return Ok(None);
        };

        value.trim().parse::<i64>().map(Some).map_err(|_| {
            Error::Database(format!(
                "corrupt watermark for scope '{scope_id}': {value:?}"
            ))
        })
    }

    /// Persist the watermark for `scope_id`
    pub async fn save(&self, scope_id: &str, timestamp: i64) -> Result<()> {
        self.set_setting(&watermark_key(scope_id), &timestamp.to_string())
            .await
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM settings WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }
}

fn watermark_key(scope_id: &str) -> String {
    format!("{WATERMARK_KEY_PREFIX}{scope_id}")
}

//! Care note model

use serde::{Deserialize, Serialize};

use crate::util::now_millis;

/// A free-form note about the care recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareNote {
    /// Device-local identifier, never sent to the remote store
    #[serde(skip)]
    pub local_id: Option<i64>,
    /// Plain text content
    pub content: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    /// Soft delete marker for sync
    #[serde(default)]
    pub deleted_at: Option<i64>,
}

impl CareNote {
    /// Create a new note with the given content
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            local_id: None,
            content: content.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Get first line as title preview, truncated to `max_len` characters
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        self.content
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }

    /// Check if note content is empty (whitespace-only counts as empty)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

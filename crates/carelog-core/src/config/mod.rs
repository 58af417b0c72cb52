//! Sync engine configuration.
//!
//! `SyncConfig` is loaded from a small JSON file by clients and handed to the
//! orchestrator wiring. Every field has a default so an empty object is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_AUTO_SYNC_INTERVAL_SECS: u64 = 60;

/// How a conflict with identical `updated_at` timestamps is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The shared remote copy is kept, so every device converges on it
    #[default]
    RemoteWins,
    /// The device's own copy overwrites the remote one
    LocalWins,
}

/// Configuration for the sync engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Equal-timestamp conflict policy
    pub tie_break: TieBreak,
    /// Automatic sync interval in seconds; `None` disables background sync
    pub auto_sync_interval_secs: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::default(),
            auto_sync_interval_secs: Some(DEFAULT_AUTO_SYNC_INTERVAL_SECS),
        }
    }
}

impl SyncConfig {
    /// Set the automatic sync interval
    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.auto_sync_interval_secs = Some(interval.as_secs());
        self
    }

    /// Disable automatic sync (manual sync only)
    #[must_use]
    pub const fn without_auto_sync(mut self) -> Self {
        self.auto_sync_interval_secs = None;
        self
    }

    /// Set the equal-timestamp conflict policy
    #[must_use]
    pub const fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Background sync cadence, if enabled. A zero interval counts as disabled.
    pub fn auto_sync_interval(&self) -> Option<Duration> {
        self.auto_sync_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Parse a sync configuration from a raw JSON payload.
pub fn parse_sync_config(payload: &str) -> Result<SyncConfig> {
    if payload.trim().is_empty() {
        return Ok(SyncConfig::default());
    }
    serde_json::from_str(payload)
        .map_err(|error| Error::InvalidInput(format!("invalid sync config: {error}")))
}

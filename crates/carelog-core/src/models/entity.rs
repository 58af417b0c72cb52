//! Entity kinds known to the sync engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The six synchronized entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Medication,
    MedicationLog,
    Note,
    HealthRecord,
    CalendarEvent,
    Task,
}

impl EntityType {
    /// All entity types, parents before children.
    pub const ALL: [Self; 6] = [
        Self::Medication,
        Self::Note,
        Self::HealthRecord,
        Self::CalendarEvent,
        Self::Task,
        Self::MedicationLog,
    ];

    /// Stable key used in the mapping table.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Medication => "medication",
            Self::MedicationLog => "medication_log",
            Self::Note => "note",
            Self::HealthRecord => "health_record",
            Self::CalendarEvent => "calendar_event",
            Self::Task => "task",
        }
    }

    /// Human readable name reported in sync progress.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Medication => "Medications",
            Self::MedicationLog => "Medication logs",
            Self::Note => "Notes",
            Self::HealthRecord => "Health records",
            Self::CalendarEvent => "Calendar events",
            Self::Task => "Tasks",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|entity_type| entity_type.as_str() == normalized)
            .ok_or_else(|| Error::InvalidInput(format!("unknown entity type '{s}'")))
    }
}

/// A locally stored record the sync engine can reconcile.
///
/// `local_id` is `None` for records that only exist remotely so far.
/// `deleted_at` is the tombstone; tombstoned records are kept, not removed.
pub trait SyncRecord: Clone + PartialEq + Send + Sync + 'static {
    fn local_id(&self) -> Option<i64>;

    fn set_local_id(&mut self, local_id: i64);

    /// Last modification timestamp (Unix ms), the LWW clock.
    fn updated_at(&self) -> i64;

    fn deleted_at(&self) -> Option<i64>;

    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}

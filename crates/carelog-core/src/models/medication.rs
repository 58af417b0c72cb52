//! Medication and medication log models

use serde::{Deserialize, Serialize};

use crate::util::now_millis;

/// A medication the care recipient takes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    #[serde(skip)]
    pub local_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub deleted_at: Option<i64>,
}

impl Medication {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            local_id: None,
            name: name.into(),
            dosage: None,
            instructions: None,
            active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// One scheduled dose of a medication.
///
/// Stored remotely under its medication's document, so the parent link is
/// device-local and not serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationLog {
    #[serde(skip)]
    pub local_id: Option<i64>,
    #[serde(skip)]
    pub medication_local_id: Option<i64>,
    pub scheduled_at: i64,
    #[serde(default)]
    pub taken_at: Option<i64>,
    #[serde(default)]
    pub skipped: bool,
    pub updated_at: i64,
    #[serde(default)]
    pub deleted_at: Option<i64>,
}

impl MedicationLog {
    #[must_use]
    pub fn new(medication_local_id: i64, scheduled_at: i64) -> Self {
        Self {
            local_id: None,
            medication_local_id: Some(medication_local_id),
            scheduled_at,
            taken_at: None,
            skipped: false,
            updated_at: now_millis(),
            deleted_at: None,
        }
    }

    /// Whether the dose was neither taken nor skipped
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.taken_at.is_none() && !self.skipped
    }
}

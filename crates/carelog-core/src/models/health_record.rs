//! Health record model

use serde::{Deserialize, Serialize};

use crate::util::now_millis;

/// A single measurement or observation (blood pressure, weight, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    #[serde(skip)]
    pub local_id: Option<i64>,
    /// Measurement kind, e.g. `blood_pressure`
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub unit: Option<String>,
    pub recorded_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub deleted_at: Option<i64>,
}

impl HealthRecord {
    #[must_use]
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            local_id: None,
            kind: kind.into(),
            value: value.into(),
            unit: None,
            recorded_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

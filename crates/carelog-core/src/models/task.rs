//! Care task model

use serde::{Deserialize, Serialize};

use crate::util::now_millis;

/// A to-do item shared between caregivers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareTask {
    #[serde(skip)]
    pub local_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub due_at: Option<i64>,
    #[serde(default)]
    pub completed: bool,
    pub updated_at: i64,
    #[serde(default)]
    pub deleted_at: Option<i64>,
}

impl CareTask {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            local_id: None,
            title: title.into(),
            due_at: None,
            completed: false,
            updated_at: now_millis(),
            deleted_at: None,
        }
    }
}

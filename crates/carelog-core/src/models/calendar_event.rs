//! Calendar event model

use serde::{Deserialize, Serialize};

use crate::util::now_millis;

/// An appointment or reminder on the shared calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(skip)]
    pub local_id: Option<i64>,
    pub title: String,
    pub starts_at: i64,
    #[serde(default)]
    pub ends_at: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    pub updated_at: i64,
    #[serde(default)]
    pub deleted_at: Option<i64>,
}

impl CalendarEvent {
    #[must_use]
    pub fn new(title: impl Into<String>, starts_at: i64) -> Self {
        Self {
            local_id: None,
            title: title.into(),
            starts_at,
            ends_at: None,
            location: None,
            updated_at: now_millis(),
            deleted_at: None,
        }
    }
}

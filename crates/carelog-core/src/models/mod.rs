//! Data models for Carelog

mod calendar_event;
mod entity;
mod health_record;
mod medication;
mod note;
mod sync_conflict;
mod sync_mapping;
mod task;

pub use calendar_event::CalendarEvent;
pub use entity::{EntityType, SyncRecord};
pub use health_record::HealthRecord;
pub use medication::{Medication, MedicationLog};
pub use note::CareNote;
pub use sync_conflict::{ConflictWinner, SyncConflict};
pub use sync_mapping::{SyncMapping, SyncMetadata};
pub use task::CareTask;

/// Implements [`SyncRecord`] for models carrying `local_id`, `updated_at`
/// and `deleted_at` fields.
macro_rules! impl_sync_record {
    ($($model:ty),+ $(,)?) => {
        $(
            impl SyncRecord for $model {
                fn local_id(&self) -> Option<i64> {
                    self.local_id
                }

                fn set_local_id(&mut self, local_id: i64) {
                    self.local_id = Some(local_id);
                }

                fn updated_at(&self) -> i64 {
                    self.updated_at
                }

                fn deleted_at(&self) -> Option<i64> {
                    self.deleted_at
                }
            }
        )+
    };
}

impl_sync_record!(
    Medication,
    MedicationLog,
    CareNote,
    HealthRecord,
    CalendarEvent,
    CareTask,
);


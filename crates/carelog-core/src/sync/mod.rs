//! Offline-first sync engine.
//!
//! Reconciles the device's local store with the shared remote store for each
//! entity type of a care recipient, one sequential pass at a time.

mod conflict;
mod entity_syncer;
mod mapper;
mod medication_log_syncer;
mod memory;
mod orchestrator;
mod reconcile;
mod result;
mod scheduler;
mod state;
mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use conflict::{ConflictResolver, LWW_STRATEGY};
pub use entity_syncer::{EntitySync, EntitySyncer};
pub use mapper::{JsonRemoteMapper, SYNC_METADATA_FIELD};
pub use medication_log_syncer::{MedicationLogSync, MedicationLogSyncer};
pub use memory::{MemoryConflictLog, MemorySyncMappingStore, MemoryWatermarkStore};
pub use orchestrator::{EntitySyncers, SyncOrchestrator};
pub use result::SyncResult;
pub use scheduler::SyncScheduler;
pub use state::{SyncState, SyncStateStream};
pub use store::{
    ChildLocalStore, ChildRemoteStore, ConflictLog, LocalStore, RemoteDocument, RemoteMapper,
    RemoteStore, SyncMappingStore, WatermarkStore,
};

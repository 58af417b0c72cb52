//! Sequencing of the per-entity syncers into one sync pass.
//!
//! A pass runs medications, notes, health records, calendar events and
//! tasks in that order, then medication logs once per mapped medication.
//! The first `Failure` halts the pass. The per-scope watermark moves only
//! after a pass with no failures at all.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::error::{DomainError, Result};
use crate::models::EntityType;
use crate::sync::entity_syncer::EntitySync;
use crate::sync::medication_log_syncer::MedicationLogSync;
use crate::sync::result::{SyncResult, SyncTally};
use crate::sync::state::{SyncState, SyncStateStream};
use crate::sync::store::{SyncMappingStore, WatermarkStore};
use crate::util::now_millis;

/// Five flat steps plus the medication log step.
const TOTAL_STEPS: usize = 6;

/// The syncers a pass is made of.
pub struct EntitySyncers {
    pub medications: Arc<dyn EntitySync>,
    pub notes: Arc<dyn EntitySync>,
    pub health_records: Arc<dyn EntitySync>,
    pub calendar_events: Arc<dyn EntitySync>,
    pub tasks: Arc<dyn EntitySync>,
    pub medication_logs: Arc<dyn MedicationLogSync>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Both,
    Push,
    Pull,
}

/// Writes one pass's state transitions, and puts the stream back to `Idle`
/// if the pass is dropped mid-way.
struct PassGuard<'a> {
    state: &'a SyncStateStream,
    scope_id: &'a str,
    settled: bool,
}

impl<'a> PassGuard<'a> {
    const fn new(state: &'a SyncStateStream, scope_id: &'a str) -> Self {
        Self {
            state,
            scope_id,
            settled: false,
        }
    }

    fn begin(&self, entity_name: &str) {
        self.state.begin(self.scope_id, entity_name);
    }

    fn progress(&self, progress: f32, entity_name: &str) {
        self.state.progress(self.scope_id, progress, entity_name);
    }

    fn succeed(mut self, last_synced_at: i64) {
        self.settled = true;
        self.state.succeed(self.scope_id, last_synced_at);
    }

    fn fail(mut self, error: DomainError) {
        self.settled = true;
        self.state.fail(self.scope_id, error);
    }

    fn idle(mut self) {
        self.settled = true;
        self.state.release(self.scope_id);
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.state.release(self.scope_id);
        }
    }
}

#[allow(clippy::cast_precision_loss)] // step counts are tiny
fn step_progress(index: usize) -> f32 {
    index as f32 / TOTAL_STEPS as f32
}

/// Entry point for every sync operation of a device.
///
/// Owns the [`SyncStateStream`]; watermarks are read from the
/// [`WatermarkStore`] at the start of each pass. Calls for the same scope are
/// serialized.
pub struct SyncOrchestrator {
    syncers: EntitySyncers,
    mappings: Arc<dyn SyncMappingStore>,
    watermarks: Arc<dyn WatermarkStore>,
    state: SyncStateStream,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SyncOrchestrator {
    pub fn new(
        syncers: EntitySyncers,
        mappings: Arc<dyn SyncMappingStore>,
        watermarks: Arc<dyn WatermarkStore>,
    ) -> Self {
        Self {
            syncers,
            mappings,
            watermarks,
            state: SyncStateStream::new(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to sync state changes. The latest state is readable at once.
    pub fn sync_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> SyncState {
        self.state.current()
    }

    /// Scope whose pass wrote the current state, if any pass has run.
    pub fn current_scope(&self) -> Option<String> {
        self.state.scope()
    }

    /// Watermark of the last fully successful pass for `scope_id`.
    pub async fn get_last_sync_time(&self, scope_id: &str) -> Result<Option<i64>> {
        self.watermarks.load(scope_id).await
    }

    /// Run a full pass over every entity type.
    pub async fn sync_all(&self, scope_id: &str) -> SyncResult {
        self.run_pass(scope_id, Direction::Both).await
    }

    /// Same reconciliation as [`Self::sync_all`]; the outcome is reported
    /// in terms of uploads.
    pub async fn push_local_changes(&self, scope_id: &str) -> SyncResult {
        self.run_pass(scope_id, Direction::Push).await
    }

    /// Same reconciliation as [`Self::sync_all`]; the outcome is reported
    /// in terms of downloads.
    pub async fn pull_remote_changes(&self, scope_id: &str) -> SyncResult {
        self.run_pass(scope_id, Direction::Pull).await
    }

    pub async fn sync_medications(&self, scope_id: &str) -> SyncResult {
        self.run_single(scope_id, self.syncers.medications.as_ref())
            .await
    }

    pub async fn sync_notes(&self, scope_id: &str) -> SyncResult {
        self.run_single(scope_id, self.syncers.notes.as_ref()).await
    }

    pub async fn sync_health_records(&self, scope_id: &str) -> SyncResult {
        self.run_single(scope_id, self.syncers.health_records.as_ref())
            .await
    }

    pub async fn sync_calendar_events(&self, scope_id: &str) -> SyncResult {
        self.run_single(scope_id, self.syncers.calendar_events.as_ref())
            .await
    }

    pub async fn sync_tasks(&self, scope_id: &str) -> SyncResult {
        self.run_single(scope_id, self.syncers.tasks.as_ref()).await
    }

    /// Sync the logs of one medication. Fails with `NotFound` when the
    /// medication has never been uploaded.
    pub async fn sync_medication_logs(
        &self,
        scope_id: &str,
        medication_local_id: i64,
    ) -> SyncResult {
        let _lock = self.acquire(scope_id).await;
        let guard = PassGuard::new(&self.state, scope_id);

        let mapping = match self
            .mappings
            .get_by_local_id(EntityType::Medication, medication_local_id)
            .await
        {
            Ok(Some(mapping)) => mapping,
            Ok(None) => {
                let error = DomainError::NotFound(format!(
                    "medication {medication_local_id} has no remote mapping"
                ));
                guard.fail(error.clone());
                return SyncResult::failure(error);
            }
            Err(e) => {
                let error = DomainError::from(e);
                guard.fail(error.clone());
                return SyncResult::failure(error);
            }
        };
        let since = match self.watermarks.load(scope_id).await {
            Ok(since) => since,
            Err(e) => {
                let error = DomainError::from(e);
                guard.fail(error.clone());
                return SyncResult::failure(error);
            }
        };

        guard.begin(EntityType::MedicationLog.display_name());
        let result = self
            .syncers
            .medication_logs
            .sync_for_medication(scope_id, mapping.local_id, &mapping.remote_id, since)
            .await;
        Self::settle_single(guard, &result);
        result
    }

    /// Take the single-flight lock of `scope_id`.
    ///
    /// Locks nobody holds or waits on are dropped from the map on the way.
    async fn acquire(&self, scope_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(scope_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Run one entity type on its own. The watermark is left alone, since
    /// the other entity types were not reconciled.
    async fn run_single(&self, scope_id: &str, syncer: &dyn EntitySync) -> SyncResult {
        let _lock = self.acquire(scope_id).await;
        let guard = PassGuard::new(&self.state, scope_id);

        let since = match self.watermarks.load(scope_id).await {
            Ok(since) => since,
            Err(e) => {
                let error = DomainError::from(e);
                guard.fail(error.clone());
                return SyncResult::failure(error);
            }
        };

        guard.begin(syncer.entity_type().display_name());
        let result = syncer.sync(scope_id, since).await;
        Self::settle_single(guard, &result);
        result
    }

    fn settle_single(guard: PassGuard<'_>, result: &SyncResult) {
        match result.first_error() {
            None => guard.idle(),
            Some(error) => guard.fail(error.clone()),
        }
    }

    async fn run_pass(&self, scope_id: &str, direction: Direction) -> SyncResult {
        let _lock = self.acquire(scope_id).await;
        let guard = PassGuard::new(&self.state, scope_id);

        let started_at = now_millis();
        let since = match self.watermarks.load(scope_id).await {
            Ok(since) => since,
            Err(e) => {
                let error = DomainError::from(e);
                guard.fail(error.clone());
                return SyncResult::failure(error);
            }
        };
        info!(scope_id, ?since, ?direction, "sync pass started");

        let steps = [
            &self.syncers.medications,
            &self.syncers.notes,
            &self.syncers.health_records,
            &self.syncers.calendar_events,
            &self.syncers.tasks,
        ];
        guard.begin(EntityType::Medication.display_name());

        let mut tally = SyncTally::default();
        for (index, syncer) in steps.into_iter().enumerate() {
            let entity = syncer.entity_type();
            guard.progress(step_progress(index), entity.display_name());
            match syncer.sync(scope_id, since).await {
                SyncResult::Failure { error } => {
                    warn!(scope_id, %entity, %error, "sync pass halted");
                    guard.fail(error.clone());
                    return SyncResult::failure(error);
                }
                result => tally.absorb(result),
            }
        }

        guard.progress(
            step_progress(TOTAL_STEPS - 1),
            EntityType::MedicationLog.display_name(),
        );
        match self.sync_all_medication_logs(scope_id, since).await {
            SyncResult::Failure { error } => {
                warn!(scope_id, %error, "sync pass halted at medication logs");
                guard.fail(error.clone());
                return SyncResult::failure(error);
            }
            result => tally.absorb(result),
        }

        let (uploaded, downloaded) = (tally.uploaded(), tally.downloaded());
        let result = tally.finish();
        if let Some(error) = result.first_error() {
            warn!(scope_id, %error, "sync pass finished with failures; watermark kept");
            guard.fail(error.clone());
            return result;
        }

        if let Err(e) = self.watermarks.save(scope_id, started_at).await {
            let error = DomainError::from(e);
            warn!(scope_id, %error, "failed to persist watermark");
            guard.fail(error.clone());
            return SyncResult::failure(error);
        }
        match direction {
            Direction::Both => info!(scope_id, uploaded, downloaded, "sync pass finished"),
            Direction::Push => info!(scope_id, uploaded, "local changes pushed"),
            Direction::Pull => info!(scope_id, downloaded, "remote changes pulled"),
        }
        guard.succeed(started_at);
        result
    }

    /// Log step: one child sync per medication mapping known at this point,
    /// which includes medications uploaded earlier in the same pass.
    async fn sync_all_medication_logs(&self, scope_id: &str, since: Option<i64>) -> SyncResult {
        let medications = match self.mappings.get_all_by_type(EntityType::Medication).await {
            Ok(mappings) => mappings,
            Err(e) => return SyncResult::failure(e.into()),
        };

        let mut tally = SyncTally::default();
        for mapping in medications {
            let result = self
                .syncers
                .medication_logs
                .sync_for_medication(scope_id, mapping.local_id, &mapping.remote_id, since)
                .await;
            if result.is_failure() {
                return result;
            }
            tally.absorb(result);
        }
        tally.finish()
    }
}

//! Reconciliation of medication logs nested under their medication.
//!
//! Log documents live under the parent medication's remote id, so a log
//! cannot sync until its medication has a mapping. The orchestrator runs
//! this once per mapped medication after the medication step.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::error::DomainError;
use crate::models::{EntityType, MedicationLog};
use crate::sync::conflict::ConflictResolver;
use crate::sync::reconcile::{ReconcileTarget, Reconciler};
use crate::sync::result::SyncResult;
use crate::sync::store::{
    ChildLocalStore, ChildRemoteStore, ConflictLog, RemoteMapper, SyncMappingStore,
};

#[async_trait]
pub trait MedicationLogSync: Send + Sync {
    async fn sync_for_medication(
        &self,
        scope_id: &str,
        medication_local_id: i64,
        medication_remote_id: &str,
        since: Option<i64>,
    ) -> SyncResult;
}

pub struct MedicationLogSyncer<R> {
    local: Arc<dyn ChildLocalStore<MedicationLog>>,
    remote: Arc<dyn ChildRemoteStore<R>>,
    mapper: Arc<dyn RemoteMapper<MedicationLog, R>>,
    mappings: Arc<dyn SyncMappingStore>,
    conflicts: Option<Arc<dyn ConflictLog>>,
    resolver: ConflictResolver,
}

impl<R> MedicationLogSyncer<R> {
    pub fn new(
        local: Arc<dyn ChildLocalStore<MedicationLog>>,
        remote: Arc<dyn ChildRemoteStore<R>>,
        mapper: Arc<dyn RemoteMapper<MedicationLog, R>>,
        mappings: Arc<dyn SyncMappingStore>,
    ) -> Self {
        Self {
            local,
            remote,
            mapper,
            mappings,
            conflicts: None,
            resolver: ConflictResolver::default(),
        }
    }

    #[must_use]
    pub fn with_conflict_log(mut self, log: Arc<dyn ConflictLog>) -> Self {
        self.conflicts = Some(log);
        self
    }

    #[must_use]
    pub const fn with_resolver(mut self, resolver: ConflictResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Apply the conflict settings of `config`.
    #[must_use]
    pub fn with_config(self, config: &SyncConfig) -> Self {
        self.with_resolver(ConflictResolver::from(config))
    }
}

struct ParentScopedStores<'a, R> {
    scope_id: &'a str,
    medication_local_id: i64,
    medication_remote_id: &'a str,
    local: &'a dyn ChildLocalStore<MedicationLog>,
    remote: &'a dyn ChildRemoteStore<R>,
}

#[async_trait]
impl<R: Send + Sync> ReconcileTarget<MedicationLog, R> for ParentScopedStores<'_, R> {
    async fn push_remote(&self, remote_id: Option<&str>, doc: &R) -> Result<String, DomainError> {
        self.remote
            .upsert(self.scope_id, self.medication_remote_id, remote_id, doc)
            .await
    }

    async fn save_local(&self, record: &MedicationLog) -> Result<i64, DomainError> {
        let mut record = record.clone();
        self.localize(&mut record);
        self.local
            .upsert(self.scope_id, self.medication_local_id, &record)
            .await
    }

    async fn delete_local(&self, local_id: i64) -> Result<(), DomainError> {
        self.local.delete(self.scope_id, local_id).await
    }

    fn localize(&self, record: &mut MedicationLog) {
        record.medication_local_id = Some(self.medication_local_id);
    }
}

#[async_trait]
impl<R: Send + Sync + 'static> MedicationLogSync for MedicationLogSyncer<R> {
    async fn sync_for_medication(
        &self,
        scope_id: &str,
        medication_local_id: i64,
        medication_remote_id: &str,
        since: Option<i64>,
    ) -> SyncResult {
        let locals = match self
            .local
            .query_changed_since(scope_id, medication_local_id, since)
            .await
        {
            Ok(logs) => logs,
            Err(error) => {
                warn!(medication_local_id, %error, "local log query failed");
                return SyncResult::failure(error);
            }
        };
        let remotes = match self
            .remote
            .query_changed_since(scope_id, medication_remote_id, since)
            .await
        {
            Ok(docs) => docs,
            Err(error) => {
                warn!(medication_local_id, %error, "remote log query failed");
                return SyncResult::failure(error);
            }
        };
        info!(
            medication_local_id,
            medication_remote_id,
            local_changes = locals.len(),
            remote_changes = remotes.len(),
            "reconciling medication logs"
        );

        let reconciler = Reconciler {
            entity_type: EntityType::MedicationLog,
            mapper: self.mapper.as_ref(),
            mappings: self.mappings.as_ref(),
            conflicts: self.conflicts.as_deref(),
            resolver: self.resolver,
        };
        let target = ParentScopedStores {
            scope_id,
            medication_local_id,
            medication_remote_id,
            local: self.local.as_ref(),
            remote: self.remote.as_ref(),
        };
        reconciler.run(&target, locals, remotes).await
    }
}

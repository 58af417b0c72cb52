//! Generic reconciliation engine for one top-level entity type

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::error::DomainError;
use crate::models::{EntityType, SyncRecord};
use crate::sync::conflict::ConflictResolver;
use crate::sync::reconcile::{ReconcileTarget, Reconciler};
use crate::sync::result::SyncResult;
use crate::sync::store::{ConflictLog, LocalStore, RemoteMapper, RemoteStore, SyncMappingStore};

/// One step of a sync pass, as seen by the orchestrator.
#[async_trait]
pub trait EntitySync: Send + Sync {
    fn entity_type(&self) -> EntityType;

    /// Reconcile everything changed after `since` (everything when `None`).
    ///
    /// Never fails outright: errors come back inside the [`SyncResult`].
    async fn sync(&self, scope_id: &str, since: Option<i64>) -> SyncResult;
}

/// Bidirectional syncer for one entity type.
pub struct EntitySyncer<L, R> {
    entity_type: EntityType,
    local: Arc<dyn LocalStore<L>>,
    remote: Arc<dyn RemoteStore<R>>,
    mapper: Arc<dyn RemoteMapper<L, R>>,
    mappings: Arc<dyn SyncMappingStore>,
    conflicts: Option<Arc<dyn ConflictLog>>,
    resolver: ConflictResolver,
}

impl<L, R> EntitySyncer<L, R> {
    pub fn new(
        entity_type: EntityType,
        local: Arc<dyn LocalStore<L>>,
        remote: Arc<dyn RemoteStore<R>>,
        mapper: Arc<dyn RemoteMapper<L, R>>,
        mappings: Arc<dyn SyncMappingStore>,
    ) -> Self {
        Self {
            entity_type,
            local,
            remote,
            mapper,
            mappings,
            conflicts: None,
            resolver: ConflictResolver::default(),
        }
    }

    /// Record every LWW resolution in `log`.
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

struct ScopedStores<'a, L, R> {
    scope_id: &'a str,
    local: &'a dyn LocalStore<L>,
    remote: &'a dyn RemoteStore<R>,
}

#[async_trait]
impl<L, R> ReconcileTarget<L, R> for ScopedStores<'_, L, R>
where
    L: SyncRecord,
    R: Send + Sync,
{
    async fn push_remote(&self, remote_id: Option<&str>, doc: &R) -> Result<String, DomainError> {
        self.remote.upsert(self.scope_id, remote_id, doc).await
    }

    async fn save_local(&self, record: &L) -> Result<i64, DomainError> {
        self.local.upsert(self.scope_id, record).await
    }

    async fn delete_local(&self, local_id: i64) -> Result<(), DomainError> {
        self.local.delete(self.scope_id, local_id).await
    }
}

#[async_trait]
impl<L, R> EntitySync for EntitySyncer<L, R>
where
    L: SyncRecord,
    R: Send + Sync + 'static,
{
    fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    async fn sync(&self, scope_id: &str, since: Option<i64>) -> SyncResult {
        let entity = self.entity_type;

        let locals = match self.local.query_changed_since(scope_id, since).await {
            Ok(records) => records,
            Err(error) => {
                warn!(%entity, %error, "local query failed");
                return SyncResult::failure(error);
            }
        };
        let remotes = match self.remote.query_changed_since(scope_id, since).await {
            Ok(docs) => docs,
            Err(error) => {
                warn!(%entity, %error, "remote query failed");
                return SyncResult::failure(error);
            }
        };
        info!(
            %entity,
            local_changes = locals.len(),
            remote_changes = remotes.len(),
            "reconciling"
        );

        let reconciler = Reconciler {
            entity_type: entity,
            mapper: self.mapper.as_ref(),
            mappings: self.mappings.as_ref(),
            conflicts: self.conflicts.as_deref(),
            resolver: self.resolver,
        };
        let target = ScopedStores {
            scope_id,
            local: self.local.as_ref(),
            remote: self.remote.as_ref(),
        };
        reconciler.run(&target, locals, remotes).await
    }
}

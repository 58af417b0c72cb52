//! Record-by-record reconciliation shared by the flat and child syncers.
//!
//! A record is dirty on a side when its `updated_at` is newer than the
//! mapping's `last_synced_at`. Dirty on one side means copy it over; dirty
//! on both means LWW. Per-record errors are collected, never propagated.
//!
//! An unmapped local record identical to an unmapped remote document is the
//! leftover of an upload or download whose mapping write never landed. The
//! two are linked instead of being copied across again.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::DomainError;
use crate::models::{ConflictWinner, EntityType, SyncConflict, SyncMapping, SyncMetadata, SyncRecord};
use crate::sync::conflict::{ConflictResolver, LWW_STRATEGY};
use crate::sync::result::SyncResult;
use crate::sync::store::{ConflictLog, RemoteDocument, RemoteMapper, SyncMappingStore};
use crate::util::now_millis;

/// Where reconciled records are written, already bound to a scope (and a
/// parent, for child entities).
#[async_trait]
pub(crate) trait ReconcileTarget<L, R>: Send + Sync {
    async fn push_remote(&self, remote_id: Option<&str>, doc: &R) -> Result<String, DomainError>;

    async fn save_local(&self, record: &L) -> Result<i64, DomainError>;

    async fn delete_local(&self, local_id: i64) -> Result<(), DomainError>;

    /// Fill in device-local fields a decoded remote record does not carry.
    fn localize(&self, _record: &mut L) {}
}

pub(crate) struct Reconciler<'a, L, R> {
    pub(crate) entity_type: EntityType,
    pub(crate) mapper: &'a dyn RemoteMapper<L, R>,
    pub(crate) mappings: &'a dyn SyncMappingStore,
    pub(crate) conflicts: Option<&'a dyn ConflictLog>,
    pub(crate) resolver: ConflictResolver,
}

struct RemoteEntry<L, R> {
    doc: RemoteDocument<R>,
    record: L,
    deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Uploaded,
    Downloaded,
    Resolved(ConflictWinner),
    Linked,
    Skipped,
}

#[derive(Debug, Default)]
struct Summary {
    uploaded: usize,
    downloaded: usize,
    conflicts: usize,
    linked: usize,
    failed_entities: Vec<i64>,
    errors: Vec<DomainError>,
}

impl Summary {
    fn record(&mut self, local_id: Option<i64>, outcome: Result<Outcome, DomainError>) {
        match outcome {
            Ok(Outcome::Uploaded) => self.uploaded += 1,
            Ok(Outcome::Downloaded) => self.downloaded += 1,
            Ok(Outcome::Resolved(winner)) => {
                self.conflicts += 1;
                match winner {
                    ConflictWinner::Local => self.uploaded += 1,
                    ConflictWinner::Remote => self.downloaded += 1,
                }
            }
            Ok(Outcome::Linked) => self.linked += 1,
            Ok(Outcome::Skipped) => {}
            Err(error) => self.fail(local_id, error),
        }
    }

    fn fail(&mut self, local_id: Option<i64>, error: DomainError) {
        warn!(?local_id, %error, "record failed to sync");
        if let Some(local_id) = local_id {
            self.failed_entities.push(local_id);
        }
        self.errors.push(error);
    }

    fn finish(self) -> SyncResult {
        let succeeded = self.uploaded + self.downloaded + self.linked;
        match self.errors.first().cloned() {
            None => SyncResult::Success {
                uploaded_count: self.uploaded,
                downloaded_count: self.downloaded,
                conflict_count: self.conflicts,
            },
            Some(error) if succeeded == 0 => SyncResult::failure(error),
            Some(_) => SyncResult::PartialSuccess {
                success_count: succeeded,
                failed_entities: self.failed_entities,
                errors: self.errors,
            },
        }
    }
}

impl<L, R> Reconciler<'_, L, R>
where
    L: SyncRecord,
    R: Send + Sync,
{
    /// Reconcile one window of changed records from both sides.
    pub(crate) async fn run(
        &self,
        target: &dyn ReconcileTarget<L, R>,
        locals: Vec<L>,
        remotes: Vec<RemoteDocument<R>>,
    ) -> SyncResult {
        let mappings = match self.mappings.get_all_by_type(self.entity_type).await {
            Ok(mappings) => mappings,
            Err(e) => return SyncResult::failure(e.into()),
        };
        let local_by_remote: HashMap<String, i64> = mappings
            .iter()
            .map(|m| (m.remote_id.clone(), m.local_id))
            .collect();
        let by_local: HashMap<i64, SyncMapping> =
            mappings.into_iter().map(|m| (m.local_id, m)).collect();

        let mut summary = Summary::default();

        let mut entries: Vec<Option<RemoteEntry<L, R>>> = Vec::with_capacity(remotes.len());
        let mut entry_index: HashMap<String, usize> = HashMap::new();
        let mut unmapped_by_updated_at: HashMap<i64, Vec<usize>> = HashMap::new();
        let mut undecodable: HashSet<String> = HashSet::new();
        for doc in remotes {
            match self.mapper.to_domain(&doc.data) {
                Ok(mut record) => {
                    target.localize(&mut record);
                    let deleted = record.is_deleted()
                        || self
                            .mapper
                            .extract_sync_metadata(&doc.data)
                            .is_some_and(|metadata| metadata.is_deleted());
                    if !local_by_remote.contains_key(&doc.id) {
                        unmapped_by_updated_at
                            .entry(record.updated_at())
                            .or_default()
                            .push(entries.len());
                    }
                    entry_index.insert(doc.id.clone(), entries.len());
                    entries.push(Some(RemoteEntry {
                        doc,
                        record,
                        deleted,
                    }));
                }
                Err(error) => {
                    summary.fail(local_by_remote.get(&doc.id).copied(), error);
                    undecodable.insert(doc.id);
                }
            }
        }

        for local in locals {
            let Some(local_id) = local.local_id() else {
                summary.fail(
                    None,
                    DomainError::Validation(format!(
                        "{} record without a local id",
                        self.entity_type
                    )),
                );
                continue;
            };
            let mapping = by_local.get(&local_id);
            if mapping.is_some_and(|m| undecodable.contains(&m.remote_id)) {
                continue;
            }
            let remote = match mapping {
                Some(m) => entry_index
                    .get(&m.remote_id)
                    .and_then(|&index| entries.get_mut(index))
                    .and_then(Option::take),
                None => take_twin(&mut entries, &unmapped_by_updated_at, local_id, &local),
            };

            let outcome = self
                .reconcile_local(target, local_id, &local, mapping, remote)
                .await;
            summary.record(Some(local_id), outcome);
        }

        for entry in entries.into_iter().flatten() {
            let local_id = local_by_remote.get(&entry.doc.id).copied();
            let outcome = match local_id.and_then(|id| by_local.get(&id)) {
                Some(mapping) => self.reconcile_remote(target, mapping, entry).await,
                None => self.adopt_remote(target, entry).await,
            };
            summary.record(local_id, outcome);
        }

        summary.finish()
    }

    async fn reconcile_local(
        &self,
        target: &dyn ReconcileTarget<L, R>,
        local_id: i64,
        local: &L,
        mapping: Option<&SyncMapping>,
        remote: Option<RemoteEntry<L, R>>,
    ) -> Result<Outcome, DomainError> {
        let Some(mapping) = mapping else {
            if let Some(twin) = remote {
                self.link(local_id, twin).await?;
                return Ok(Outcome::Linked);
            }
            if local.is_deleted() {
                debug!(entity = %self.entity_type, local_id, "skipping never-synced tombstone");
                return Ok(Outcome::Skipped);
            }
            self.upload(target, local_id, local, None).await?;
            return Ok(Outcome::Uploaded);
        };

        let local_dirty = local.updated_at() > mapping.last_synced_at;
        let Some(remote) = remote else {
            if !local_dirty {
                return Ok(Outcome::Skipped);
            }
            self.upload(target, local_id, local, Some(&mapping.remote_id))
                .await?;
            return Ok(Outcome::Uploaded);
        };

        let remote_dirty = remote.record.updated_at() > mapping.last_synced_at;
        match (local_dirty, remote_dirty) {
            (true, true) => self.resolve_conflict(target, local, mapping, remote).await,
            (true, false) => {
                self.upload(target, local_id, local, Some(&mapping.remote_id))
                    .await?;
                Ok(Outcome::Uploaded)
            }
            (false, true) => {
                self.download(target, mapping, remote).await?;
                Ok(Outcome::Downloaded)
            }
            (false, false) => Ok(Outcome::Skipped),
        }
    }

    /// A mapped remote change whose local counterpart did not change.
    async fn reconcile_remote(
        &self,
        target: &dyn ReconcileTarget<L, R>,
        mapping: &SyncMapping,
        remote: RemoteEntry<L, R>,
    ) -> Result<Outcome, DomainError> {
        if remote.record.updated_at() <= mapping.last_synced_at {
            return Ok(Outcome::Skipped);
        }
        self.download(target, mapping, remote).await?;
        Ok(Outcome::Downloaded)
    }

    /// A remote document this device has never seen.
    async fn adopt_remote(
        &self,
        target: &dyn ReconcileTarget<L, R>,
        remote: RemoteEntry<L, R>,
    ) -> Result<Outcome, DomainError> {
        if remote.deleted {
            debug!(entity = %self.entity_type, remote_id = %remote.doc.id, "skipping unknown tombstone");
            return Ok(Outcome::Skipped);
        }
        let updated_at = remote.record.updated_at();
        let local_id = target.save_local(&remote.record).await?;
        self.mappings
            .upsert(&SyncMapping::new(
                self.entity_type,
                local_id,
                remote.doc.id,
                updated_at,
            ))
            .await?;
        Ok(Outcome::Downloaded)
    }

    /// Record the mapping between a local record and its identical remote
    /// copy without writing either side.
    async fn link(&self, local_id: i64, twin: RemoteEntry<L, R>) -> Result<(), DomainError> {
        debug!(entity = %self.entity_type, local_id, remote_id = %twin.doc.id, "linked to existing remote copy");
        self.mappings
            .upsert(&SyncMapping::new(
                self.entity_type,
                local_id,
                twin.doc.id,
                twin.record.updated_at(),
            ))
            .await?;
        Ok(())
    }

    async fn resolve_conflict(
        &self,
        target: &dyn ReconcileTarget<L, R>,
        local: &L,
        mapping: &SyncMapping,
        remote: RemoteEntry<L, R>,
    ) -> Result<Outcome, DomainError> {
        let local_updated_at = local.updated_at();
        let remote_updated_at = remote.record.updated_at();
        let winner = self.resolver.resolve(local, &remote.record);
        debug!(
            entity = %self.entity_type,
            local_id = mapping.local_id,
            local_updated_at,
            remote_updated_at,
            %winner,
            "resolving conflict"
        );

        match winner {
            ConflictWinner::Local => {
                self.upload(target, mapping.local_id, local, Some(&mapping.remote_id))
                    .await?;
            }
            ConflictWinner::Remote => self.download(target, mapping, remote).await?,
        }

        self.log_conflict(mapping, local_updated_at, remote_updated_at, winner)
            .await;
        Ok(Outcome::Resolved(winner))
    }

    async fn upload(
        &self,
        target: &dyn ReconcileTarget<L, R>,
        local_id: i64,
        record: &L,
        remote_id: Option<&str>,
    ) -> Result<(), DomainError> {
        let metadata = SyncMetadata {
            local_id,
            synced_at: now_millis(),
            deleted_at: record.deleted_at(),
        };
        let doc = self.mapper.to_remote(record, &metadata)?;
        let remote_id = target.push_remote(remote_id, &doc).await?;
        debug!(entity = %self.entity_type, local_id, %remote_id, "uploaded");
        self.mappings
            .upsert(&SyncMapping::new(
                self.entity_type,
                local_id,
                remote_id,
                record.updated_at(),
            ))
            .await?;
        Ok(())
    }

    /// Overwrite the mapped local record with the remote version, or remove
    /// it when the remote copy is a tombstone.
    async fn download(
        &self,
        target: &dyn ReconcileTarget<L, R>,
        mapping: &SyncMapping,
        remote: RemoteEntry<L, R>,
    ) -> Result<(), DomainError> {
        let RemoteEntry {
            mut record,
            deleted,
            ..
        } = remote;
        let updated_at = record.updated_at();
        if deleted {
            target.delete_local(mapping.local_id).await?;
            debug!(entity = %self.entity_type, local_id = mapping.local_id, "applied remote deletion");
        } else {
            record.set_local_id(mapping.local_id);
            target.save_local(&record).await?;
            debug!(entity = %self.entity_type, local_id = mapping.local_id, "downloaded");
        }
        self.mappings
            .upsert(&SyncMapping::new(
                self.entity_type,
                mapping.local_id,
                mapping.remote_id.clone(),
                updated_at,
            ))
            .await?;
        Ok(())
    }

    async fn log_conflict(
        &self,
        mapping: &SyncMapping,
        local_updated_at: i64,
        remote_updated_at: i64,
        winner: ConflictWinner,
    ) {
        let Some(log) = self.conflicts else {
            return;
        };
        let conflict = SyncConflict {
            id: 0,
            entity_type: self.entity_type,
            local_id: mapping.local_id,
            remote_id: mapping.remote_id.clone(),
            local_updated_at,
            remote_updated_at,
            winner,
            resolved_at: now_millis(),
            strategy: LWW_STRATEGY.to_string(),
        };
        if let Err(e) = log.record(&conflict).await {
            warn!(entity = %self.entity_type, local_id = mapping.local_id, error = %e, "failed to record conflict");
        }
    }
}

/// Take the unmapped remote entry equal to `local` once given its local id.
fn take_twin<L: SyncRecord, R>(
    entries: &mut [Option<RemoteEntry<L, R>>],
    unmapped_by_updated_at: &HashMap<i64, Vec<usize>>,
    local_id: i64,
    local: &L,
) -> Option<RemoteEntry<L, R>> {
    let index = unmapped_by_updated_at
        .get(&local.updated_at())?
        .iter()
        .copied()
        .find(|&index| {
            entries
                .get(index)
                .and_then(Option::as_ref)
                .is_some_and(|entry| {
                    let mut candidate = entry.record.clone();
                    candidate.set_local_id(local_id);
                    candidate == *local
                })
        })?;
    entries.get_mut(index)?.take()
}

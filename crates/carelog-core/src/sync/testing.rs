//! In-memory fakes of the sync collaborators, with failure injection and
//! call counters.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{DomainError, Error};
use crate::models::{EntityType, MedicationLog, SyncMapping, SyncRecord};
use crate::sync::entity_syncer::EntitySync;
use crate::sync::medication_log_syncer::MedicationLogSync;
use crate::sync::memory::MemorySyncMappingStore;
use crate::sync::result::SyncResult;
use crate::sync::store::{
    ChildLocalStore, ChildRemoteStore, LocalStore, RemoteDocument, RemoteStore,
    SyncMappingStore,
};

fn changed_since(updated_at: i64, since: Option<i64>) -> bool {
    since.map_or(true, |since| updated_at > since)
}

fn doc_updated_at(doc: &Value) -> i64 {
    doc.get("updatedAt").and_then(Value::as_i64).unwrap_or_default()
}

/// Local store keyed by local id, ids assigned from 1.
pub(crate) struct FakeLocalStore<L> {
    records: Mutex<BTreeMap<i64, L>>,
    next_id: AtomicI64,
    fail_query: Mutex<Option<DomainError>>,
    pub(crate) upserts: AtomicUsize,
    pub(crate) deletes: AtomicUsize,
}

impl<L: SyncRecord> FakeLocalStore<L> {
    pub(crate) fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            fail_query: Mutex::new(None),
            upserts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    /// Seed a record as if the app had written it; returns its id.
    pub(crate) fn insert(&self, mut record: L) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        record.set_local_id(id);
        self.records.lock().unwrap().insert(id, record);
        id
    }

    /// Overwrite a seeded record in place, as a local edit would.
    pub(crate) fn replace(&self, record: L) {
        let id = record.local_id().unwrap();
        self.records.lock().unwrap().insert(id, record);
    }

    pub(crate) fn get(&self, local_id: i64) -> Option<L> {
        self.records.lock().unwrap().get(&local_id).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub(crate) fn fail_queries_with(&self, error: DomainError) {
        *self.fail_query.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl<L: SyncRecord> LocalStore<L> for FakeLocalStore<L> {
    async fn query_changed_since(
        &self,
        _scope_id: &str,
        since: Option<i64>,
    ) -> Result<Vec<L>, DomainError> {
        if let Some(error) = self.fail_query.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| changed_since(r.updated_at(), since))
            .cloned()
            .collect())
    }

    async fn upsert(&self, _scope_id: &str, record: &L) -> Result<i64, DomainError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let mut record = record.clone();
        let id = match record.local_id() {
            Some(id) => id,
            None => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                record.set_local_id(id);
                id
            }
        };
        self.records.lock().unwrap().insert(id, record);
        Ok(id)
    }

    async fn delete(&self, _scope_id: &str, local_id: i64) -> Result<(), DomainError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().remove(&local_id);
        Ok(())
    }
}

/// JSON document collection with ids `rem-1`, `rem-2`, ...
pub(crate) struct FakeRemoteStore {
    docs: Mutex<BTreeMap<String, Value>>,
    next_id: AtomicI64,
    fail_query: Mutex<Option<DomainError>>,
    reject: Mutex<Option<(String, Value)>>,
    pub(crate) upserts: AtomicUsize,
}

impl FakeRemoteStore {
    pub(crate) fn new() -> Self {
        Self {
            docs: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            fail_query: Mutex::new(None),
            reject: Mutex::new(None),
            upserts: AtomicUsize::new(0),
        }
    }

    /// Write a document directly, as another device would.
    pub(crate) fn put(&self, id: &str, doc: Value) {
        self.docs.lock().unwrap().insert(id.to_string(), doc);
    }

    pub(crate) fn get(&self, id: &str) -> Option<Value> {
        self.docs.lock().unwrap().get(id).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub(crate) fn fail_queries_with(&self, error: DomainError) {
        *self.fail_query.lock().unwrap() = Some(error);
    }

    /// Reject uploads whose `field` equals `value` with a network error.
    pub(crate) fn reject_uploads_where(&self, field: &str, value: Value) {
        *self.reject.lock().unwrap() = Some((field.to_string(), value));
    }

    fn write(&self, remote_id: Option<&str>, doc: &Value) -> Result<String, DomainError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if let Some((field, value)) = self.reject.lock().unwrap().as_ref() {
            if doc.get(field) == Some(value) {
                return Err(DomainError::Network(format!("upload rejected: {field}")));
            }
        }
        let id = match remote_id {
            Some(id) => id.to_string(),
            None => format!("rem-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
        };
        self.docs.lock().unwrap().insert(id.clone(), doc.clone());
        Ok(id)
    }

    fn changed(&self, since: Option<i64>) -> Result<Vec<RemoteDocument<Value>>, DomainError> {
        if let Some(error) = self.fail_query.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self
            .docs
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, doc)| changed_since(doc_updated_at(doc), since))
            .map(|(id, doc)| RemoteDocument::new(id.clone(), doc.clone()))
            .collect())
    }
}

#[async_trait]
impl RemoteStore<Value> for FakeRemoteStore {
    async fn query_changed_since(
        &self,
        _scope_id: &str,
        since: Option<i64>,
    ) -> Result<Vec<RemoteDocument<Value>>, DomainError> {
        self.changed(since)
    }

    async fn upsert(
        &self,
        _scope_id: &str,
        remote_id: Option<&str>,
        doc: &Value,
    ) -> Result<String, DomainError> {
        self.write(remote_id, doc)
    }
}

/// Medication logs keyed by local id, filtered by owning medication.
pub(crate) struct FakeLogLocalStore {
    inner: FakeLocalStore<MedicationLog>,
}

impl FakeLogLocalStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: FakeLocalStore::new(),
        }
    }

    pub(crate) fn insert(&self, log: MedicationLog) -> i64 {
        self.inner.insert(log)
    }

    pub(crate) fn replace(&self, log: MedicationLog) {
        self.inner.replace(log);
    }

    pub(crate) fn get(&self, local_id: i64) -> Option<MedicationLog> {
        self.inner.get(local_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl ChildLocalStore<MedicationLog> for FakeLogLocalStore {
    async fn query_changed_since(
        &self,
        scope_id: &str,
        parent_local_id: i64,
        since: Option<i64>,
    ) -> Result<Vec<MedicationLog>, DomainError> {
        let logs = self.inner.query_changed_since(scope_id, since).await?;
        Ok(logs
            .into_iter()
            .filter(|log| log.medication_local_id == Some(parent_local_id))
            .collect())
    }

    async fn upsert(
        &self,
        scope_id: &str,
        parent_local_id: i64,
        record: &MedicationLog,
    ) -> Result<i64, DomainError> {
        let mut record = record.clone();
        record.medication_local_id = Some(parent_local_id);
        self.inner.upsert(scope_id, &record).await
    }

    async fn delete(&self, scope_id: &str, local_id: i64) -> Result<(), DomainError> {
        self.inner.delete(scope_id, local_id).await
    }
}

/// Log documents nested under their medication's remote id.
pub(crate) struct FakeLogRemoteStore {
    parents: Mutex<BTreeMap<String, ()>>,
    inner: FakeRemoteStore,
}

impl FakeLogRemoteStore {
    pub(crate) fn new() -> Self {
        Self {
            parents: Mutex::new(BTreeMap::new()),
            inner: FakeRemoteStore::new(),
        }
    }

    pub(crate) fn put(&self, parent_remote_id: &str, id: &str, doc: Value) {
        self.parents
            .lock()
            .unwrap()
            .insert(format!("{parent_remote_id}/{id}"), ());
        self.inner.put(id, doc);
    }

    pub(crate) fn get(&self, id: &str) -> Option<Value> {
        self.inner.get(id)
    }

    pub(crate) fn upserts(&self) -> usize {
        self.inner.upserts.load(Ordering::SeqCst)
    }

    pub(crate) fn children_of(&self, parent_remote_id: &str) -> Vec<String> {
        let prefix = format!("{parent_remote_id}/");
        self.parents
            .lock()
            .unwrap()
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl ChildRemoteStore<Value> for FakeLogRemoteStore {
    async fn query_changed_since(
        &self,
        _scope_id: &str,
        parent_remote_id: &str,
        since: Option<i64>,
    ) -> Result<Vec<RemoteDocument<Value>>, DomainError> {
        let children = self.children_of(parent_remote_id);
        Ok(self
            .inner
            .changed(since)?
            .into_iter()
            .filter(|doc| children.contains(&doc.id))
            .collect())
    }

    async fn upsert(
        &self,
        _scope_id: &str,
        parent_remote_id: &str,
        remote_id: Option<&str>,
        doc: &Value,
    ) -> Result<String, DomainError> {
        let id = self.inner.write(remote_id, doc)?;
        self.parents
            .lock()
            .unwrap()
            .insert(format!("{parent_remote_id}/{id}"), ());
        Ok(id)
    }
}

/// Mapping store whose first `failures` upserts fail with a database error,
/// as if the process lost its disk between the record write and the mapping
/// write.
pub(crate) struct FlakyMappingStore {
    inner: MemorySyncMappingStore,
    failures_left: AtomicUsize,
}

impl FlakyMappingStore {
    pub(crate) fn failing_first(failures: usize) -> Self {
        Self {
            inner: MemorySyncMappingStore::new(),
            failures_left: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl SyncMappingStore for FlakyMappingStore {
    async fn upsert(&self, mapping: &SyncMapping) -> crate::Result<()> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::Database("disk I/O error".to_string()));
        }
        self.inner.upsert(mapping).await
    }

    async fn get_by_local_id(
        &self,
        entity_type: EntityType,
        local_id: i64,
    ) -> crate::Result<Option<SyncMapping>> {
        self.inner.get_by_local_id(entity_type, local_id).await
    }

    async fn get_all_by_type(&self, entity_type: EntityType) -> crate::Result<Vec<SyncMapping>> {
        self.inner.get_all_by_type(entity_type).await
    }
}

/// Entity syncer that replays queued results and counts calls.
///
/// Returns an empty success once the queue runs out.
pub(crate) struct ScriptedSyncer {
    entity_type: EntityType,
    results: Mutex<VecDeque<SyncResult>>,
    pub(crate) calls: AtomicUsize,
    pub(crate) last_since: Mutex<Option<Option<i64>>>,
}

impl ScriptedSyncer {
    pub(crate) fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            results: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            last_since: Mutex::new(None),
        }
    }

    pub(crate) fn returning(entity_type: EntityType, result: SyncResult) -> Self {
        let syncer = Self::new(entity_type);
        syncer.push(result);
        syncer
    }

    pub(crate) fn push(&self, result: SyncResult) {
        self.results.lock().unwrap().push_back(result);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntitySync for ScriptedSyncer {
    fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    async fn sync(&self, _scope_id: &str, since: Option<i64>) -> SyncResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_since.lock().unwrap() = Some(since);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(SyncResult::empty)
    }
}

/// Log syncer recording every `(medication_local_id, medication_remote_id)`.
pub(crate) struct ScriptedLogSyncer {
    results: Mutex<VecDeque<SyncResult>>,
    pub(crate) seen: Mutex<Vec<(i64, String)>>,
}

impl ScriptedLogSyncer {
    pub(crate) fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push(&self, result: SyncResult) {
        self.results.lock().unwrap().push_back(result);
    }

    pub(crate) fn seen(&self) -> Vec<(i64, String)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl MedicationLogSync for ScriptedLogSyncer {
    async fn sync_for_medication(
        &self,
        _scope_id: &str,
        medication_local_id: i64,
        medication_remote_id: &str,
        _since: Option<i64>,
    ) -> SyncResult {
        self.seen
            .lock()
            .unwrap()
            .push((medication_local_id, medication_remote_id.to_string()));
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(SyncResult::empty)
    }
}

//! In-process record and digital-object stores.
//!
//! Used with [`crate::store::MemoryStore`] for tests and dry runs. Both can
//! be told to reject particular inputs so commit failure paths can be
//! exercised.

use std::collections::{BTreeMap, HashSet};

use archivist_core::types::DbId;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::collaborators::{
    CollaboratorError, DeleteOutcome, DigitalObjectStore, NewDigitalObject, NewRecord, RecordStore,
    RecordSummary,
};
use crate::local::records::slug_base;

// ── Records ──────────────────────────────────────────────────────────

/// A record held by [`MemoryRecordStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: DbId,
    /// Legacy id the record can be referenced by.
    pub reference: Option<String>,
    pub title: String,
    pub slug: String,
    pub record: Option<NewRecord>,
}

#[derive(Default)]
struct RecordState {
    next_id: DbId,
    records: BTreeMap<DbId, StoredRecord>,
    failing_titles: HashSet<String>,
    undeletable: HashSet<DbId>,
}

impl RecordState {
    fn insert(&mut self, reference: Option<String>, title: &str, record: Option<NewRecord>) -> DbId {
        self.next_id += 1;
        let id = self.next_id;
        self.records.insert(
            id,
            StoredRecord {
                id,
                reference,
                title: title.to_string(),
                slug: format!("{}-{id}", slug_base(title)),
                record,
            },
        );
        id
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    state: Mutex<RecordState>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record created outside the pipeline.
    pub async fn add_existing(&self, reference: &str, title: &str) -> DbId {
        self.state
            .lock()
            .await
            .insert(Some(reference.to_string()), title, None)
    }

    /// Reject every create request for a record with this title.
    pub async fn fail_title(&self, title: &str) {
        self.state.lock().await.failing_titles.insert(title.to_string());
    }

    /// Reject deletion of this record.
    pub async fn fail_delete(&self, id: DbId) {
        self.state.lock().await.undeletable.insert(id);
    }

    pub async fn allow_delete(&self, id: DbId) {
        self.state.lock().await.undeletable.remove(&id);
    }

    pub async fn get(&self, id: DbId) -> Option<StoredRecord> {
        self.state.lock().await.records.get(&id).cloned()
    }

    /// Records created through [`RecordStore::create_record`], oldest first.
    pub async fn created(&self) -> Vec<(DbId, NewRecord)> {
        self.state
            .lock()
            .await
            .records
            .values()
            .filter_map(|r| Some((r.id, r.record.clone()?)))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create_record(&self, record: &NewRecord) -> Result<DbId, CollaboratorError> {
        let mut state = self.state.lock().await;
        if state.failing_titles.contains(&record.title) {
            return Err(CollaboratorError::Rejected(format!(
                "Record store refused '{}'",
                record.title
            )));
        }
        if let Some(parent) = record.parent_id {
            if !state.records.contains_key(&parent) {
                return Err(CollaboratorError::Rejected(format!(
                    "Parent record {parent} does not exist"
                )));
            }
        }
        Ok(state.insert(record.legacy_id.clone(), &record.title, Some(record.clone())))
    }

    async fn record_exists(&self, id: DbId) -> Result<bool, CollaboratorError> {
        Ok(self.state.lock().await.records.contains_key(&id))
    }

    async fn find_reference(&self, reference: &str) -> Result<Option<DbId>, CollaboratorError> {
        let state = self.state.lock().await;
        let records = &state.records;
        Ok(records
            .values()
            .find(|r| r.reference.as_deref() == Some(reference) || r.slug == reference)
            .or_else(|| records.values().find(|r| r.title == reference))
            .map(|r| r.id))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RecordSummary>, CollaboratorError> {
        let needle = query.to_lowercase();
        let state = self.state.lock().await;
        let mut found: Vec<RecordSummary> = state
            .records
            .values()
            .filter(|r| r.title.to_lowercase().contains(&needle))
            .map(|r| RecordSummary {
                id: r.id,
                title: r.title.clone(),
                slug: r.slug.clone(),
                identifier: r.record.as_ref().and_then(|rec| rec.identifier.clone()),
            })
            .collect();
        found.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        found.truncate(limit);
        Ok(found)
    }

    async fn delete_record(&self, id: DbId) -> Result<DeleteOutcome, CollaboratorError> {
        let mut state = self.state.lock().await;
        if state.undeletable.contains(&id) {
            return Err(CollaboratorError::Rejected(format!("Record {id} is locked")));
        }
        let has_children = state
            .records
            .values()
            .any(|r| r.record.as_ref().and_then(|rec| rec.parent_id) == Some(id));
        if has_children {
            return Err(CollaboratorError::Rejected(format!(
                "Record {id} still has children"
            )));
        }
        match state.records.remove(&id) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::NotFound),
        }
    }
}

// ── Digital objects ──────────────────────────────────────────────────

/// A digital object held by [`MemoryObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub id: DbId,
    pub record_id: DbId,
    pub file_name: String,
    pub checksum: Option<String>,
}

#[derive(Default)]
struct ObjectState {
    next_id: DbId,
    objects: BTreeMap<DbId, StoredObject>,
    failing_names: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    state: Mutex<ObjectState>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject attaching any file with this name.
    pub async fn fail_file(&self, file_name: &str) {
        self.state
            .lock()
            .await
            .failing_names
            .insert(file_name.to_string());
    }

    pub async fn objects(&self) -> Vec<StoredObject> {
        self.state.lock().await.objects.values().cloned().collect()
    }
}

#[async_trait]
impl DigitalObjectStore for MemoryObjectStore {
    async fn attach(&self, object: NewDigitalObject<'_>) -> Result<DbId, CollaboratorError> {
        if !tokio::fs::try_exists(object.source).await? {
            return Err(CollaboratorError::Rejected(format!(
                "Payload file '{}' is missing",
                object.file.relative_path
            )));
        }
        let mut state = self.state.lock().await;
        if state.failing_names.contains(&object.file.file_name) {
            return Err(CollaboratorError::Rejected(format!(
                "Object store refused '{}'",
                object.file.file_name
            )));
        }
        state.next_id += 1;
        let id = state.next_id;
        state.objects.insert(
            id,
            StoredObject {
                id,
                record_id: object.record_id,
                file_name: object.file.file_name.clone(),
                checksum: object.file.checksum.clone(),
            },
        );
        Ok(id)
    }

    async fn delete_object(&self, id: DbId) -> Result<DeleteOutcome, CollaboratorError> {
        match self.state.lock().await.objects.remove(&id) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::NotFound),
        }
    }
}

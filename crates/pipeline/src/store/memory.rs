//! In-process [`IngestStore`].
//!
//! Mirrors the Postgres constraints that the pipeline relies on: unique
//! profile names, one active job per session, monotonic job counters and
//! claim-once job pickup.

use std::collections::{BTreeMap, HashMap};

use archivist_core::commit::{
    CommitJob, ErrorLogEntry, JobCounters, JobStatus, ManifestEntry, PackageKind,
};
use archivist_core::mapping::{ColumnMapping, MappingProfile, ProfileEntry};
use archivist_core::row::DataRow;
use archivist_core::session::{IngestSession, SessionConfig, Stage, Standard};
use archivist_core::types::{DbId, RowNumber};
use archivist_core::upload::UploadedFile;
use archivist_core::validation::ValidationIssue;
use archivist_db::models::manifest::CreateManifestEntry;
use archivist_db::models::upload::CreateUploadedFile;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{IngestStore, StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    next_id: DbId,
    sessions: BTreeMap<DbId, IngestSession>,
    files: BTreeMap<DbId, UploadedFile>,
    rows: HashMap<DbId, BTreeMap<RowNumber, DataRow>>,
    mappings: HashMap<DbId, Vec<ColumnMapping>>,
    profiles: BTreeMap<DbId, MappingProfile>,
    issues: HashMap<DbId, Vec<ValidationIssue>>,
    jobs: BTreeMap<DbId, CommitJob>,
    manifest: BTreeMap<DbId, ManifestEntry>,
}

impl Inner {
    fn id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn session_mut(&mut self, id: DbId) -> StoreResult<&mut IngestSession> {
        self.sessions.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "ingest_session",
            id,
        })
    }

    fn job_mut(&mut self, id: DbId) -> StoreResult<&mut CommitJob> {
        self.jobs.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "ingest_job",
            id,
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IngestStore for MemoryStore {
    async fn create_session(
        &self,
        config: &SessionConfig,
        created_by: Option<DbId>,
    ) -> StoreResult<IngestSession> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let session = IngestSession {
            id: inner.id(),
            config: config.clone(),
            stage: Stage::Configure,
            validation_current: false,
            created_by,
            created_at: now,
            updated_at: now,
        };
        inner.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: DbId) -> StoreResult<Option<IngestSession>> {
        Ok(self.inner.read().await.sessions.get(&id).cloned())
    }

    async fn list_sessions(&self, created_by: Option<DbId>) -> StoreResult<Vec<IngestSession>> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .values()
            .rev()
            .filter(|s| created_by.is_none() || s.created_by == created_by)
            .cloned()
            .collect())
    }

    async fn update_config(&self, id: DbId, config: &SessionConfig) -> StoreResult<IngestSession> {
        let mut inner = self.inner.write().await;
        let session = inner.session_mut(id)?;
        session.config = config.clone();
        session.updated_at = Utc::now();
        Ok(session.clone())
    }

    async fn set_stage(&self, id: DbId, stage: Stage) -> StoreResult<IngestSession> {
        let mut inner = self.inner.write().await;
        let session = inner.session_mut(id)?;
        session.stage = stage;
        session.updated_at = Utc::now();
        Ok(session.clone())
    }

    async fn set_validation_current(&self, id: DbId, current: bool) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.session_mut(id)?.validation_current = current;
        Ok(())
    }

    async fn set_parent_id(&self, id: DbId, parent_id: DbId) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.session_mut(id)?.config.parent_id = Some(parent_id);
        Ok(())
    }

    async fn add_file(&self, input: &CreateUploadedFile) -> StoreResult<UploadedFile> {
        let mut inner = self.inner.write().await;
        let file = UploadedFile {
            id: inner.id(),
            session_id: input.session_id,
            file_type: input.file_type,
            original_name: input.original_name.clone(),
            stored_path: input.stored_path.clone(),
            extracted_path: input.extracted_path.clone(),
            file_size: input.file_size,
            delimiter: input.delimiter.clone(),
            encoding: input.encoding,
            headers: input.headers.clone(),
            row_count: input.row_count,
            created_at: Utc::now(),
        };
        inner.files.insert(file.id, file.clone());
        Ok(file)
    }

    async fn list_files(&self, session_id: DbId) -> StoreResult<Vec<UploadedFile>> {
        let inner = self.inner.read().await;
        Ok(inner
            .files
            .values()
            .filter(|f| f.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn latest_file(&self, session_id: DbId) -> StoreResult<Option<UploadedFile>> {
        let inner = self.inner.read().await;
        Ok(inner
            .files
            .values()
            .rev()
            .find(|f| f.session_id == session_id)
            .cloned())
    }

    async fn clear_upload(&self, session_id: DbId) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.files.retain(|_, f| f.session_id != session_id);
        inner.rows.remove(&session_id);
        inner.mappings.remove(&session_id);
        inner.issues.remove(&session_id);
        Ok(())
    }

    async fn replace_rows(&self, session_id: DbId, rows: &[DataRow]) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let map = rows.iter().map(|r| (r.row_number, r.clone())).collect();
        inner.rows.insert(session_id, map);
        Ok(())
    }

    async fn list_rows(&self, session_id: DbId) -> StoreResult<Vec<DataRow>> {
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .get(&session_id)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_row(&self, session_id: DbId, row_number: RowNumber) -> StoreResult<Option<DataRow>> {
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .get(&session_id)
            .and_then(|rows| rows.get(&row_number))
            .cloned())
    }

    async fn update_rows(&self, session_id: DbId, rows: &[DataRow]) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(stored) = inner.rows.get_mut(&session_id) {
            for row in rows {
                if let Some(existing) = stored.get_mut(&row.row_number) {
                    existing.fields = row.fields.clone();
                    existing.is_valid = row.is_valid;
                    existing.is_excluded = row.is_excluded;
                }
            }
        }
        Ok(())
    }

    async fn list_mappings(&self, session_id: DbId) -> StoreResult<Vec<ColumnMapping>> {
        let inner = self.inner.read().await;
        let mut mappings = inner.mappings.get(&session_id).cloned().unwrap_or_default();
        mappings.sort_by_key(|m| m.sort_order);
        Ok(mappings)
    }

    async fn replace_mappings(&self, session_id: DbId, mappings: &[ColumnMapping]) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.mappings.insert(session_id, mappings.to_vec());
        Ok(())
    }

    async fn create_profile(
        &self,
        name: &str,
        standard: Option<Standard>,
        entries: &[ProfileEntry],
        _created_by: Option<DbId>,
    ) -> StoreResult<MappingProfile> {
        let mut inner = self.inner.write().await;
        if inner.profiles.values().any(|p| p.name == name) {
            return Err(StoreError::Conflict(format!(
                "A mapping profile named '{name}' already exists"
            )));
        }
        let profile = MappingProfile {
            id: inner.id(),
            name: name.to_string(),
            standard,
            entries: entries.to_vec(),
            created_at: Utc::now(),
        };
        inner.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn get_profile(&self, id: DbId) -> StoreResult<Option<MappingProfile>> {
        Ok(self.inner.read().await.profiles.get(&id).cloned())
    }

    async fn list_profiles(&self) -> StoreResult<Vec<MappingProfile>> {
        let inner = self.inner.read().await;
        let mut profiles: Vec<MappingProfile> = inner.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(profiles)
    }

    async fn replace_issues(&self, session_id: DbId, issues: &[ValidationIssue]) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.issues.insert(session_id, issues.to_vec());
        Ok(())
    }

    async fn list_issues(&self, session_id: DbId) -> StoreResult<Vec<ValidationIssue>> {
        let inner = self.inner.read().await;
        Ok(inner.issues.get(&session_id).cloned().unwrap_or_default())
    }

    async fn create_job(&self, session_id: DbId, total_rows: i32) -> StoreResult<CommitJob> {
        let mut inner = self.inner.write().await;
        if inner
            .jobs
            .values()
            .any(|j| j.session_id == session_id && j.status.is_active())
        {
            return Err(StoreError::Conflict(
                "A commit job is already active for this session".into(),
            ));
        }
        let job = CommitJob {
            id: inner.id(),
            session_id,
            status: JobStatus::Queued,
            counters: JobCounters::new(total_rows),
            error_log: Vec::new(),
            sip_package_id: None,
            aip_package_id: None,
            dip_package_id: None,
            started_at: None,
            completed_at: None,
            rolled_back_at: None,
            created_at: Utc::now(),
        };
        inner.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_job(&self, id: DbId) -> StoreResult<Option<CommitJob>> {
        Ok(self.inner.read().await.jobs.get(&id).cloned())
    }

    async fn latest_job(&self, session_id: DbId) -> StoreResult<Option<CommitJob>> {
        let inner = self.inner.read().await;
        Ok(inner
            .jobs
            .values()
            .rev()
            .find(|j| j.session_id == session_id)
            .cloned())
    }

    async fn claim_job(&self, id: DbId) -> StoreResult<Option<CommitJob>> {
        let mut inner = self.inner.write().await;
        let job = inner.job_mut(id)?;
        if job.status != JobStatus::Queued {
            return Ok(None);
        }
        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());
        Ok(Some(job.clone()))
    }

    async fn claim_next_job(&self) -> StoreResult<Option<CommitJob>> {
        let mut inner = self.inner.write().await;
        let Some(job) = inner
            .jobs
            .values_mut()
            .find(|j| j.status == JobStatus::Queued)
        else {
            return Ok(None);
        };
        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());
        Ok(Some(job.clone()))
    }

    async fn update_progress(&self, id: DbId, counters: &JobCounters) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let current = &mut inner.job_mut(id)?.counters;
        current.processed_rows = current.processed_rows.max(counters.processed_rows);
        current.created_records = current.created_records.max(counters.created_records);
        current.created_dos = current.created_dos.max(counters.created_dos);
        current.error_count = current.error_count.max(counters.error_count);
        Ok(())
    }

    async fn append_job_log(&self, id: DbId, entry: &ErrorLogEntry) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.job_mut(id)?.error_log.push(entry.clone());
        Ok(())
    }

    async fn finish_job(&self, id: DbId, status: JobStatus) -> StoreResult<Option<CommitJob>> {
        let mut inner = self.inner.write().await;
        let job = inner.job_mut(id)?;
        if !job.status.is_active() {
            return Ok(None);
        }
        job.status = status;
        job.completed_at = Some(Utc::now());
        Ok(Some(job.clone()))
    }

    async fn set_job_package(&self, id: DbId, kind: PackageKind, package_id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let job = inner.job_mut(id)?;
        let slot = match kind {
            PackageKind::Sip => &mut job.sip_package_id,
            PackageKind::Aip => &mut job.aip_package_id,
            PackageKind::Dip => &mut job.dip_package_id,
        };
        *slot = Some(package_id.to_string());
        Ok(())
    }

    async fn mark_rolled_back(&self, id: DbId) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let job = inner.job_mut(id)?;
        if job.rolled_back_at.is_some() {
            return Ok(false);
        }
        job.rolled_back_at = Some(Utc::now());
        Ok(true)
    }

    async fn add_manifest_entry(&self, input: &CreateManifestEntry) -> StoreResult<ManifestEntry> {
        let mut inner = self.inner.write().await;
        let entry = ManifestEntry {
            id: inner.id(),
            session_id: input.session_id,
            job_id: input.job_id,
            row_number: input.row_number,
            kind: input.kind,
            target_id: input.target_id,
            created_at: Utc::now(),
            deleted_at: None,
        };
        inner.manifest.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn list_manifest(&self, session_id: DbId) -> StoreResult<Vec<ManifestEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .manifest
            .values()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn mark_manifest_deleted(&self, id: DbId) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let entry = inner.manifest.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "ingest_manifest_entry",
            id,
        })?;
        if entry.deleted_at.is_some() {
            return Ok(false);
        }
        entry.deleted_at = Some(Utc::now());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archivist_core::session::Sector;
    use assert_matches::assert_matches;

    fn config() -> SessionConfig {
        SessionConfig::new("Parish registers", Sector::Archive, Standard::Isadg)
    }

    #[tokio::test]
    async fn one_active_job_per_session() {
        let store = MemoryStore::new();
        let session = store.create_session(&config(), None).await.unwrap();
        let job = store.create_job(session.id, 2).await.unwrap();
        assert_matches!(
            store.create_job(session.id, 2).await,
            Err(StoreError::Conflict(_))
        );

        store.claim_job(job.id).await.unwrap().unwrap();
        store.finish_job(job.id, JobStatus::Failed).await.unwrap().unwrap();
        assert!(store.create_job(session.id, 2).await.is_ok());
    }

    #[tokio::test]
    async fn jobs_are_claimed_once() {
        let store = MemoryStore::new();
        let session = store.create_session(&config(), None).await.unwrap();
        let job = store.create_job(session.id, 1).await.unwrap();

        assert_eq!(store.claim_next_job().await.unwrap().unwrap().id, job.id);
        assert!(store.claim_next_job().await.unwrap().is_none());
        assert!(store.claim_job(job.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn progress_never_regresses() {
        let store = MemoryStore::new();
        let session = store.create_session(&config(), None).await.unwrap();
        let job = store.create_job(session.id, 3).await.unwrap();

        let mut counters = JobCounters::new(3);
        counters.processed_rows = 2;
        store.update_progress(job.id, &counters).await.unwrap();
        store.update_progress(job.id, &JobCounters::new(3)).await.unwrap();

        let job = store.get_job(job.id).await.unwrap().unwrap();
        assert_eq!(job.counters.processed_rows, 2);
    }

    #[tokio::test]
    async fn profile_names_are_unique() {
        let store = MemoryStore::new();
        store.create_profile("Parish", None, &[], None).await.unwrap();
        assert_matches!(
            store.create_profile("Parish", None, &[], None).await,
            Err(StoreError::Conflict(_))
        );
    }
}

//! [`IngestStore`] over the `archivist-db` repositories.

use archivist_core::commit::{CommitJob, ErrorLogEntry, JobCounters, JobStatus, ManifestEntry, PackageKind};
use archivist_core::error::CoreError;
use archivist_core::mapping::{ColumnMapping, MappingProfile, ProfileEntry};
use archivist_core::row::DataRow;
use archivist_core::session::{IngestSession, SessionConfig, Stage, Standard};
use archivist_core::types::{DbId, RowNumber};
use archivist_core::upload::UploadedFile;
use archivist_core::validation::ValidationIssue;
use archivist_db::models::manifest::CreateManifestEntry;
use archivist_db::models::upload::CreateUploadedFile;
use archivist_db::repositories::{
    FileRepo, IssueRepo, JobRepo, ManifestRepo, MappingRepo, ProfileRepo, RowRepo, SessionRepo,
};
use archivist_db::DbPool;
use async_trait::async_trait;

use super::{IngestStore, StoreError, StoreResult};

#[derive(Clone)]
pub struct PgIngestStore {
    pool: DbPool,
}

impl PgIngestStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Turn a unique violation on `constraint` into a conflict.
fn conflict_on(err: sqlx::Error, constraint: &str, message: impl FnOnce() -> String) -> StoreError {
    let hit = err
        .as_database_error()
        .and_then(|db| db.constraint())
        .is_some_and(|c| c == constraint);
    if hit {
        StoreError::Conflict(message())
    } else {
        StoreError::Database(err)
    }
}

fn found<T>(value: Option<T>, entity: &'static str, id: DbId) -> StoreResult<T> {
    value.ok_or(StoreError::NotFound { entity, id })
}

fn convert_all<R, T>(rows: Vec<R>, f: impl Fn(R) -> Result<T, CoreError>) -> StoreResult<Vec<T>> {
    rows.into_iter()
        .map(|r| f(r).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl IngestStore for PgIngestStore {
    async fn create_session(
        &self,
        config: &SessionConfig,
        created_by: Option<DbId>,
    ) -> StoreResult<IngestSession> {
        let row = SessionRepo::create(&self.pool, config, created_by).await?;
        Ok(row.into_domain()?)
    }

    async fn get_session(&self, id: DbId) -> StoreResult<Option<IngestSession>> {
        let row = SessionRepo::find_by_id(&self.pool, id).await?;
        Ok(row.map(|r| r.into_domain()).transpose()?)
    }

    async fn list_sessions(&self, created_by: Option<DbId>) -> StoreResult<Vec<IngestSession>> {
        let rows = SessionRepo::list(&self.pool, created_by).await?;
        convert_all(rows, |r| r.into_domain())
    }

    async fn update_config(&self, id: DbId, config: &SessionConfig) -> StoreResult<IngestSession> {
        let row = SessionRepo::update_config(&self.pool, id, config).await?;
        Ok(found(row, "ingest_session", id)?.into_domain()?)
    }

    async fn set_stage(&self, id: DbId, stage: Stage) -> StoreResult<IngestSession> {
        let row = SessionRepo::update_stage(&self.pool, id, stage).await?;
        Ok(found(row, "ingest_session", id)?.into_domain()?)
    }

    async fn set_validation_current(&self, id: DbId, current: bool) -> StoreResult<()> {
        let updated = SessionRepo::set_validation_current(&self.pool, id, current).await?;
        found(updated.then_some(()), "ingest_session", id)
    }

    async fn set_parent_id(&self, id: DbId, parent_id: DbId) -> StoreResult<()> {
        let updated = SessionRepo::set_parent_id(&self.pool, id, parent_id).await?;
        found(updated.then_some(()), "ingest_session", id)
    }

    async fn add_file(&self, input: &CreateUploadedFile) -> StoreResult<UploadedFile> {
        let row = FileRepo::create(&self.pool, input).await?;
        Ok(row.into_domain()?)
    }

    async fn list_files(&self, session_id: DbId) -> StoreResult<Vec<UploadedFile>> {
        let rows = FileRepo::list_by_session(&self.pool, session_id).await?;
        convert_all(rows, |r| r.into_domain())
    }

    async fn latest_file(&self, session_id: DbId) -> StoreResult<Option<UploadedFile>> {
        let row = FileRepo::find_latest(&self.pool, session_id).await?;
        Ok(row.map(|r| r.into_domain()).transpose()?)
    }

    async fn clear_upload(&self, session_id: DbId) -> StoreResult<()> {
        IssueRepo::replace_for_session(&self.pool, session_id, &[]).await?;
        RowRepo::replace_for_session(&self.pool, session_id, &[]).await?;
        MappingRepo::delete_by_session(&self.pool, session_id).await?;
        FileRepo::delete_by_session(&self.pool, session_id).await?;
        Ok(())
    }

    async fn replace_rows(&self, session_id: DbId, rows: &[DataRow]) -> StoreResult<()> {
        RowRepo::replace_for_session(&self.pool, session_id, rows).await?;
        Ok(())
    }

    async fn list_rows(&self, session_id: DbId) -> StoreResult<Vec<DataRow>> {
        let rows = RowRepo::list_by_session(&self.pool, session_id).await?;
        convert_all(rows, |r| r.into_domain())
    }

    async fn get_row(&self, session_id: DbId, row_number: RowNumber) -> StoreResult<Option<DataRow>> {
        let row = RowRepo::find(&self.pool, session_id, row_number).await?;
        Ok(row.map(|r| r.into_domain()).transpose()?)
    }

    async fn update_rows(&self, session_id: DbId, rows: &[DataRow]) -> StoreResult<()> {
        RowRepo::update_many(&self.pool, session_id, rows).await?;
        Ok(())
    }

    async fn list_mappings(&self, session_id: DbId) -> StoreResult<Vec<ColumnMapping>> {
        let rows = MappingRepo::list_by_session(&self.pool, session_id).await?;
        convert_all(rows, |r| r.into_domain())
    }

    async fn replace_mappings(&self, session_id: DbId, mappings: &[ColumnMapping]) -> StoreResult<()> {
        MappingRepo::replace_for_session(&self.pool, session_id, mappings).await?;
        Ok(())
    }

    async fn create_profile(
        &self,
        name: &str,
        standard: Option<Standard>,
        entries: &[ProfileEntry],
        created_by: Option<DbId>,
    ) -> StoreResult<MappingProfile> {
        let row = ProfileRepo::create(&self.pool, name, standard, entries, created_by)
            .await
            .map_err(|e| {
                conflict_on(e, "uq_ingest_mapping_profiles_name", || {
                    format!("A mapping profile named '{name}' already exists")
                })
            })?;
        Ok(row.into_domain()?)
    }

    async fn get_profile(&self, id: DbId) -> StoreResult<Option<MappingProfile>> {
        let row = ProfileRepo::find_by_id(&self.pool, id).await?;
        Ok(row.map(|r| r.into_domain()).transpose()?)
    }

    async fn list_profiles(&self) -> StoreResult<Vec<MappingProfile>> {
        let rows = ProfileRepo::list(&self.pool).await?;
        convert_all(rows, |r| r.into_domain())
    }

    async fn replace_issues(&self, session_id: DbId, issues: &[ValidationIssue]) -> StoreResult<()> {
        IssueRepo::replace_for_session(&self.pool, session_id, issues).await?;
        Ok(())
    }

    async fn list_issues(&self, session_id: DbId) -> StoreResult<Vec<ValidationIssue>> {
        let rows = IssueRepo::list_by_session(&self.pool, session_id).await?;
        convert_all(rows, |r| r.into_domain())
    }

    async fn create_job(&self, session_id: DbId, total_rows: i32) -> StoreResult<CommitJob> {
        let row = JobRepo::create(&self.pool, session_id, total_rows)
            .await
            .map_err(|e| {
                conflict_on(e, "uq_ingest_jobs_active_session", || {
                    "A commit job is already active for this session".to_string()
                })
            })?;
        Ok(row.into_domain()?)
    }

    async fn get_job(&self, id: DbId) -> StoreResult<Option<CommitJob>> {
        let row = JobRepo::find_by_id(&self.pool, id).await?;
        Ok(row.map(|r| r.into_domain()).transpose()?)
    }

    async fn latest_job(&self, session_id: DbId) -> StoreResult<Option<CommitJob>> {
        let row = JobRepo::find_latest_for_session(&self.pool, session_id).await?;
        Ok(row.map(|r| r.into_domain()).transpose()?)
    }

    async fn claim_job(&self, id: DbId) -> StoreResult<Option<CommitJob>> {
        let row = JobRepo::claim(&self.pool, id).await?;
        Ok(row.map(|r| r.into_domain()).transpose()?)
    }

    async fn claim_next_job(&self) -> StoreResult<Option<CommitJob>> {
        let row = JobRepo::claim_next(&self.pool).await?;
        Ok(row.map(|r| r.into_domain()).transpose()?)
    }

    async fn update_progress(&self, id: DbId, counters: &JobCounters) -> StoreResult<()> {
        JobRepo::update_progress(&self.pool, id, counters).await?;
        Ok(())
    }

    async fn append_job_log(&self, id: DbId, entry: &ErrorLogEntry) -> StoreResult<()> {
        JobRepo::append_log(&self.pool, id, entry).await?;
        Ok(())
    }

    async fn finish_job(&self, id: DbId, status: JobStatus) -> StoreResult<Option<CommitJob>> {
        let row = JobRepo::finish(&self.pool, id, status).await?;
        Ok(row.map(|r| r.into_domain()).transpose()?)
    }

    async fn set_job_package(&self, id: DbId, kind: PackageKind, package_id: &str) -> StoreResult<()> {
        JobRepo::set_package(&self.pool, id, kind, package_id).await?;
        Ok(())
    }

    async fn mark_rolled_back(&self, id: DbId) -> StoreResult<bool> {
        Ok(JobRepo::mark_rolled_back(&self.pool, id).await?)
    }

    async fn add_manifest_entry(&self, input: &CreateManifestEntry) -> StoreResult<ManifestEntry> {
        let row = ManifestRepo::create(&self.pool, input).await?;
        Ok(row.into_domain()?)
    }

    async fn list_manifest(&self, session_id: DbId) -> StoreResult<Vec<ManifestEntry>> {
        let rows = ManifestRepo::list_by_session(&self.pool, session_id).await?;
        convert_all(rows, |r| r.into_domain())
    }

    async fn mark_manifest_deleted(&self, id: DbId) -> StoreResult<bool> {
        Ok(ManifestRepo::mark_deleted(&self.pool, id).await?)
    }
}

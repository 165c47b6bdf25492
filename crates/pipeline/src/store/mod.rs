//! Persistence seam of the pipeline.
//!
//! [`IngestStore`] covers everything the wizard keeps between requests.
//! [`postgres::PgIngestStore`] backs it with the `archivist-db`
//! repositories; [`memory::MemoryStore`] keeps it all in process for tests
//! and single-node tooling.

pub mod memory;
pub mod postgres;

use archivist_core::commit::{CommitJob, ErrorLogEntry, JobCounters, JobStatus, ManifestEntry, PackageKind};
use archivist_core::mapping::{ColumnMapping, MappingProfile, ProfileEntry};
use archivist_core::row::DataRow;
use archivist_core::session::{IngestSession, SessionConfig, Stage, Standard};
use archivist_core::types::{DbId, RowNumber};
use archivist_core::upload::UploadedFile;
use archivist_core::validation::ValidationIssue;
use archivist_db::models::manifest::CreateManifestEntry;
use archivist_db::models::upload::CreateUploadedFile;
use async_trait::async_trait;

pub use memory::MemoryStore;
pub use postgres::PgIngestStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// A uniqueness rule was violated (profile name, active job).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data could not be turned back into domain values.
    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait IngestStore: Send + Sync {
    // -- Sessions --

    async fn create_session(
        &self,
        config: &SessionConfig,
        created_by: Option<DbId>,
    ) -> StoreResult<IngestSession>;

    async fn get_session(&self, id: DbId) -> StoreResult<Option<IngestSession>>;

    /// Newest first; `created_by = None` lists every session.
    async fn list_sessions(&self, created_by: Option<DbId>) -> StoreResult<Vec<IngestSession>>;

    async fn update_config(&self, id: DbId, config: &SessionConfig) -> StoreResult<IngestSession>;

    async fn set_stage(&self, id: DbId, stage: Stage) -> StoreResult<IngestSession>;

    async fn set_validation_current(&self, id: DbId, current: bool) -> StoreResult<()>;

    /// Cache the parent created under `new` placement.
    async fn set_parent_id(&self, id: DbId, parent_id: DbId) -> StoreResult<()>;

    // -- Uploads --

    async fn add_file(&self, input: &CreateUploadedFile) -> StoreResult<UploadedFile>;

    async fn list_files(&self, session_id: DbId) -> StoreResult<Vec<UploadedFile>>;

    async fn latest_file(&self, session_id: DbId) -> StoreResult<Option<UploadedFile>>;

    /// Drop every upload-derived artefact: files, rows, mappings, issues.
    async fn clear_upload(&self, session_id: DbId) -> StoreResult<()>;

    // -- Rows --

    async fn replace_rows(&self, session_id: DbId, rows: &[DataRow]) -> StoreResult<()>;

    /// Ordered by row number.
    async fn list_rows(&self, session_id: DbId) -> StoreResult<Vec<DataRow>>;

    async fn get_row(&self, session_id: DbId, row_number: RowNumber) -> StoreResult<Option<DataRow>>;

    /// Persist fields, validity and exclusion of existing rows.
    async fn update_rows(&self, session_id: DbId, rows: &[DataRow]) -> StoreResult<()>;

    // -- Mappings --

    /// Ordered by sort order.
    async fn list_mappings(&self, session_id: DbId) -> StoreResult<Vec<ColumnMapping>>;

    async fn replace_mappings(&self, session_id: DbId, mappings: &[ColumnMapping]) -> StoreResult<()>;

    // -- Profiles --

    async fn create_profile(
        &self,
        name: &str,
        standard: Option<Standard>,
        entries: &[ProfileEntry],
        created_by: Option<DbId>,
    ) -> StoreResult<MappingProfile>;

    async fn get_profile(&self, id: DbId) -> StoreResult<Option<MappingProfile>>;

    async fn list_profiles(&self) -> StoreResult<Vec<MappingProfile>>;

    // -- Issues --

    async fn replace_issues(&self, session_id: DbId, issues: &[ValidationIssue]) -> StoreResult<()>;

    async fn list_issues(&self, session_id: DbId) -> StoreResult<Vec<ValidationIssue>>;

    // -- Jobs --

    /// Fails with [`StoreError::Conflict`] while the session has an active job.
    async fn create_job(&self, session_id: DbId, total_rows: i32) -> StoreResult<CommitJob>;

    async fn get_job(&self, id: DbId) -> StoreResult<Option<CommitJob>>;

    async fn latest_job(&self, session_id: DbId) -> StoreResult<Option<CommitJob>>;

    /// Move a queued job to running. `None` when it is not queued.
    async fn claim_job(&self, id: DbId) -> StoreResult<Option<CommitJob>>;

    /// Claim the oldest queued job, if any.
    async fn claim_next_job(&self) -> StoreResult<Option<CommitJob>>;

    /// Counters never move backwards.
    async fn update_progress(&self, id: DbId, counters: &JobCounters) -> StoreResult<()>;

    async fn append_job_log(&self, id: DbId, entry: &ErrorLogEntry) -> StoreResult<()>;

    /// Move an active job to a terminal status. `None` when it was not active.
    async fn finish_job(&self, id: DbId, status: JobStatus) -> StoreResult<Option<CommitJob>>;

    async fn set_job_package(&self, id: DbId, kind: PackageKind, package_id: &str) -> StoreResult<()>;

    /// Stamp `rolled_back_at`. `false` when it was already set.
    async fn mark_rolled_back(&self, id: DbId) -> StoreResult<bool>;

    // -- Manifest --

    async fn add_manifest_entry(&self, input: &CreateManifestEntry) -> StoreResult<ManifestEntry>;

    /// Oldest first.
    async fn list_manifest(&self, session_id: DbId) -> StoreResult<Vec<ManifestEntry>>;

    /// `false` when the entry was already deleted.
    async fn mark_manifest_deleted(&self, id: DbId) -> StoreResult<bool>;
}

//! External systems the commit and rollback engines drive.
//!
//! Record creation, digital-object storage, package generation and
//! downstream content processing live outside the pipeline. Each sits
//! behind a trait so deployments plug in their own implementations; the
//! [`crate::local`] module provides the ones this workspace ships.

use std::path::Path;

use archivist_core::commit::{ManifestEntry, PackageKind};
use archivist_core::digital_object::PayloadFile;
use archivist_core::row::FieldMap;
use archivist_core::session::{DerivativeOptions, IngestSession, ProcessingFlags};
use archivist_core::types::DbId;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// The collaborator refused the request.
    #[error("{0}")]
    Rejected(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a delete. A missing target counts as already deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// A description to create in the record store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub session_id: DbId,
    pub title: String,
    pub level_of_description: Option<String>,
    pub identifier: Option<String>,
    pub legacy_id: Option<String>,
    pub parent_id: Option<DbId>,
    pub repository_id: Option<DbId>,
    pub security_classification_id: Option<DbId>,
    pub culture: String,
    pub publication_status: String,
    /// All enriched fields of the source row.
    pub fields: FieldMap,
}

/// A record offered as a parent in the configure stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub id: DbId,
    pub title: String,
    pub slug: String,
    pub identifier: Option<String>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_record(&self, record: &NewRecord) -> Result<DbId, CollaboratorError>;

    async fn record_exists(&self, id: DbId) -> Result<bool, CollaboratorError>;

    /// Resolve a parent reference to an existing record. A legacy id or
    /// slug match wins over a title match.
    async fn find_reference(&self, reference: &str) -> Result<Option<DbId>, CollaboratorError>;

    /// Records whose title contains `query`, ignoring case.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RecordSummary>, CollaboratorError>;

    async fn delete_record(&self, id: DbId) -> Result<DeleteOutcome, CollaboratorError>;
}

/// A payload file to attach to a freshly created record.
#[derive(Debug, Clone, Copy)]
pub struct NewDigitalObject<'a> {
    pub record_id: DbId,
    /// Absolute path of the payload file in staging.
    pub source: &'a Path,
    pub file: &'a PayloadFile,
    pub derivatives: &'a DerivativeOptions,
}

#[async_trait]
pub trait DigitalObjectStore: Send + Sync {
    async fn attach(&self, object: NewDigitalObject<'_>) -> Result<DbId, CollaboratorError>;

    async fn delete_object(&self, id: DbId) -> Result<DeleteOutcome, CollaboratorError>;
}

/// Everything a package generator gets to see.
#[derive(Debug, Clone)]
pub struct PackageRequest {
    pub session: IngestSession,
    pub job_id: DbId,
    pub entries: Vec<ManifestEntry>,
}

#[async_trait]
pub trait PackageGenerator: Send + Sync {
    /// Build one package and return its identifier.
    async fn generate(
        &self,
        kind: PackageKind,
        request: &PackageRequest,
    ) -> Result<String, CollaboratorError>;
}

#[async_trait]
pub trait ContentProcessor: Send + Sync {
    /// Run the named processor (`ocr`, `virus_scan`, ...) on a digital object.
    async fn process(
        &self,
        processor: &str,
        digital_object_id: DbId,
        flags: &ProcessingFlags,
    ) -> Result<(), CollaboratorError>;
}

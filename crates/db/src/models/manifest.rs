//! Creation manifest rows.

use archivist_core::commit::{ManifestEntry, ManifestKind};
use archivist_core::error::CoreError;
use archivist_core::types::{DbId, RowNumber, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::parse_column;

/// A row from the `ingest_manifest_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ManifestRow {
    pub id: DbId,
    pub session_id: DbId,
    pub job_id: DbId,
    pub row_number: Option<RowNumber>,
    pub kind: String,
    pub target_id: DbId,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording a created object.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CreateManifestEntry {
    pub session_id: DbId,
    pub job_id: DbId,
    pub row_number: Option<RowNumber>,
    pub kind: ManifestKind,
    pub target_id: DbId,
}

impl ManifestRow {
    pub fn into_domain(self) -> Result<ManifestEntry, CoreError> {
        Ok(ManifestEntry {
            id: self.id,
            session_id: self.session_id,
            job_id: self.job_id,
            row_number: self.row_number,
            kind: parse_column("kind", &self.kind)?,
            target_id: self.target_id,
            created_at: self.created_at,
            deleted_at: self.deleted_at,
        })
    }
}

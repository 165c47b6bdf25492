//! Local record store: archival descriptions and their digital objects.

use archivist_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `archival_records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ArchivalRecord {
    pub id: DbId,
    pub parent_id: Option<DbId>,
    pub repository_id: Option<DbId>,
    pub legacy_id: Option<String>,
    pub identifier: Option<String>,
    pub slug: String,
    pub title: String,
    pub level_of_description: Option<String>,
    pub culture: String,
    pub publication_status: String,
    pub security_classification_id: Option<DbId>,
    pub fields: serde_json::Value,
    pub source_session_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an archival record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateArchivalRecord {
    pub parent_id: Option<DbId>,
    pub repository_id: Option<DbId>,
    pub legacy_id: Option<String>,
    pub identifier: Option<String>,
    /// Slug stem; the row id is appended to keep slugs unique.
    pub slug_base: String,
    pub title: String,
    pub level_of_description: Option<String>,
    pub culture: String,
    pub publication_status: String,
    pub security_classification_id: Option<DbId>,
    pub fields: serde_json::Value,
    pub source_session_id: Option<DbId>,
}

/// A row from the `digital_objects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DigitalObject {
    pub id: DbId,
    pub record_id: DbId,
    pub file_name: String,
    pub stored_path: String,
    pub checksum: Option<String>,
    pub size_bytes: i64,
    pub derivatives: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for attaching a digital object to a record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDigitalObject {
    pub record_id: DbId,
    pub file_name: String,
    pub stored_path: String,
    pub checksum: Option<String>,
    pub size_bytes: i64,
    pub derivatives: serde_json::Value,
}

//! Column mapping and mapping profile rows.

use archivist_core::error::CoreError;
use archivist_core::mapping::{ColumnMapping, MappingProfile};
use archivist_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::{decode_json, parse_column};

/// A row from the `ingest_mappings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MappingRow {
    pub id: DbId,
    pub session_id: DbId,
    pub source_column: String,
    pub target_field: Option<String>,
    pub default_value: Option<String>,
    pub transform: Option<String>,
    pub is_ignored: bool,
    pub sort_order: i32,
    pub confidence: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MappingRow {
    pub fn into_domain(self) -> Result<ColumnMapping, CoreError> {
        Ok(ColumnMapping {
            source_column: self.source_column,
            target_field: self.target_field,
            default_value: self.default_value,
            transform: self
                .transform
                .as_deref()
                .map(|t| parse_column("transform", t))
                .transpose()?,
            is_ignored: self.is_ignored,
            sort_order: self.sort_order,
            confidence: parse_column("confidence", &self.confidence)?,
        })
    }
}

/// A row from the `ingest_mapping_profiles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProfileRow {
    pub id: DbId,
    pub name: String,
    pub standard: Option<String>,
    pub entries: serde_json::Value,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProfileRow {
    pub fn into_domain(self) -> Result<MappingProfile, CoreError> {
        Ok(MappingProfile {
            id: self.id,
            name: self.name,
            standard: self
                .standard
                .as_deref()
                .map(|s| parse_column("standard", s))
                .transpose()?,
            entries: decode_json("entries", self.entries)?,
            created_at: self.created_at,
        })
    }
}

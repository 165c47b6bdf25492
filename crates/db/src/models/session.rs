//! Ingest session rows.

use archivist_core::error::CoreError;
use archivist_core::session::{IngestSession, SessionConfig};
use archivist_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::{decode_json, parse_column};

/// A row from the `ingest_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionRow {
    pub id: DbId,
    pub title: String,
    pub sector: String,
    pub standard: String,
    pub repository_id: Option<DbId>,
    pub parent_placement: String,
    pub parent_id: Option<DbId>,
    pub new_parent_title: Option<String>,
    pub new_parent_level: Option<String>,
    pub output_options: serde_json::Value,
    pub derivative_options: serde_json::Value,
    pub processing_options: serde_json::Value,
    pub identifier_counter: Option<serde_json::Value>,
    pub security_classification_id: Option<DbId>,
    pub do_match_strategy: String,
    pub stage: String,
    pub validation_current: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SessionRow {
    pub fn into_domain(self) -> Result<IngestSession, CoreError> {
        let identifier_counter = self
            .identifier_counter
            .filter(|v| !v.is_null())
            .map(|v| decode_json("identifier_counter", v))
            .transpose()?;
        Ok(IngestSession {
            id: self.id,
            config: SessionConfig {
                title: self.title,
                sector: parse_column("sector", &self.sector)?,
                standard: parse_column("standard", &self.standard)?,
                repository_id: self.repository_id,
                parent_placement: parse_column("parent_placement", &self.parent_placement)?,
                parent_id: self.parent_id,
                new_parent_title: self.new_parent_title,
                new_parent_level: self.new_parent_level,
                output: decode_json("output_options", self.output_options)?,
                derivatives: decode_json("derivative_options", self.derivative_options)?,
                processing: decode_json("processing_options", self.processing_options)?,
                security_classification_id: self.security_classification_id,
                do_match_strategy: parse_column("do_match_strategy", &self.do_match_strategy)?,
                identifier_counter,
            },
            stage: parse_column("stage", &self.stage)?,
            validation_current: self.validation_current,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

//! Parsed data rows and their validation issues.

use archivist_core::error::CoreError;
use archivist_core::row::DataRow;
use archivist_core::types::{DbId, RowNumber, Timestamp};
use archivist_core::validation::ValidationIssue;
use serde::Serialize;
use sqlx::FromRow;

use super::{decode_json, parse_column};

/// A row from the `ingest_rows` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IngestRow {
    pub id: DbId,
    pub session_id: DbId,
    pub row_number: RowNumber,
    pub raw: serde_json::Value,
    pub fields: serde_json::Value,
    pub is_valid: bool,
    pub is_excluded: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl IngestRow {
    pub fn into_domain(self) -> Result<DataRow, CoreError> {
        Ok(DataRow {
            row_number: self.row_number,
            raw: decode_json("raw", self.raw)?,
            fields: decode_json("fields", self.fields)?,
            is_valid: self.is_valid,
            is_excluded: self.is_excluded,
        })
    }
}

/// A row from the `ingest_issues` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IssueRow {
    pub id: DbId,
    pub session_id: DbId,
    pub row_number: RowNumber,
    pub field_name: Option<String>,
    pub severity: String,
    pub rule: String,
    pub message: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl IssueRow {
    pub fn into_domain(self) -> Result<ValidationIssue, CoreError> {
        Ok(ValidationIssue {
            row_number: self.row_number,
            field_name: self.field_name,
            severity: parse_column("severity", &self.severity)?,
            rule: parse_column("rule", &self.rule)?,
            message: self.message,
        })
    }
}

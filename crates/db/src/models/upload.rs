//! Uploaded source file rows.

use archivist_core::error::CoreError;
use archivist_core::types::{DbId, Timestamp};
use archivist_core::upload::{SourceFormat, TextEncoding, UploadedFile};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{decode_json, parse_column};

/// A row from the `ingest_files` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FileRow {
    pub id: DbId,
    pub session_id: DbId,
    pub file_type: String,
    pub original_name: String,
    pub stored_path: String,
    pub extracted_path: Option<String>,
    pub file_size: i64,
    pub delimiter: Option<String>,
    pub encoding: Option<String>,
    pub headers: serde_json::Value,
    pub row_count: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering an upload.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUploadedFile {
    pub session_id: DbId,
    pub file_type: SourceFormat,
    pub original_name: String,
    pub stored_path: String,
    pub extracted_path: Option<String>,
    pub file_size: i64,
    pub delimiter: Option<String>,
    pub encoding: Option<TextEncoding>,
    pub headers: Vec<String>,
    pub row_count: i32,
}

impl FileRow {
    pub fn into_domain(self) -> Result<UploadedFile, CoreError> {
        Ok(UploadedFile {
            id: self.id,
            session_id: self.session_id,
            file_type: parse_column("file_type", &self.file_type)?,
            original_name: self.original_name,
            stored_path: self.stored_path,
            extracted_path: self.extracted_path,
            file_size: self.file_size,
            delimiter: self.delimiter,
            encoding: self
                .encoding
                .as_deref()
                .map(|e| parse_column("encoding", e))
                .transpose()?,
            headers: decode_json("headers", self.headers)?,
            row_count: self.row_count,
            created_at: self.created_at,
        })
    }
}

//! Repository for uploaded source files.

use archivist_core::types::DbId;
use sqlx::PgPool;

use crate::models::encode_json;
use crate::models::upload::{CreateUploadedFile, FileRow};

/// Column list for `ingest_files`.
const COLUMNS: &str = "id, session_id, file_type, original_name, stored_path, extracted_path, \
     file_size, delimiter, encoding, headers, row_count, created_at, updated_at";

/// Provides CRUD operations for uploaded files.
pub struct FileRepo;

impl FileRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateUploadedFile,
    ) -> Result<FileRow, sqlx::Error> {
        let sql = format!(
            "INSERT INTO ingest_files \
                (session_id, file_type, original_name, stored_path, extracted_path, \
                 file_size, delimiter, encoding, headers, row_count) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FileRow>(&sql)
            .bind(input.session_id)
            .bind(input.file_type.as_str())
            .bind(&input.original_name)
            .bind(&input.stored_path)
            .bind(&input.extracted_path)
            .bind(input.file_size)
            .bind(&input.delimiter)
            .bind(input.encoding.map(|e| e.as_str()))
            .bind(encode_json(&input.headers))
            .bind(input.row_count)
            .fetch_one(pool)
            .await
    }

    /// All uploads of a session, oldest first.
    pub async fn list_by_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<FileRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM ingest_files WHERE session_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, FileRow>(&sql)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_latest(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Option<FileRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM ingest_files WHERE session_id = $1 \
             ORDER BY id DESC LIMIT 1"
        );
        sqlx::query_as::<_, FileRow>(&sql)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete_by_session(pool: &PgPool, session_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ingest_files WHERE session_id = $1")
            .bind(session_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

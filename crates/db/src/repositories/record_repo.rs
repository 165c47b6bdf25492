//! Repository for the local record store.

use archivist_core::types::DbId;
use sqlx::PgPool;

use crate::models::record::{
    ArchivalRecord, CreateArchivalRecord, CreateDigitalObject, DigitalObject,
};

/// Column list for `archival_records`.
const RECORD_COLUMNS: &str = "id, parent_id, repository_id, legacy_id, identifier, slug, title, \
     level_of_description, culture, publication_status, security_classification_id, fields, \
     source_session_id, created_at, updated_at";

/// Column list for `digital_objects`.
const OBJECT_COLUMNS: &str = "id, record_id, file_name, stored_path, checksum, size_bytes, \
     derivatives, created_at, updated_at";

// ── RecordRepo ───────────────────────────────────────────────────────

/// Provides CRUD operations for archival records.
pub struct RecordRepo;

impl RecordRepo {
    /// Insert a record. The slug is `{slug_base}-{id}`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateArchivalRecord,
    ) -> Result<ArchivalRecord, sqlx::Error> {
        let sql = format!(
            "WITH next AS ( \
                 SELECT nextval(pg_get_serial_sequence('archival_records', 'id')) AS id \
             ) \
             INSERT INTO archival_records \
                (id, slug, parent_id, repository_id, legacy_id, identifier, title, \
                 level_of_description, culture, publication_status, \
                 security_classification_id, fields, source_session_id) \
             SELECT next.id, $1::TEXT || '-' || next.id::TEXT, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12 \
             FROM next \
             RETURNING {RECORD_COLUMNS}"
        );
        sqlx::query_as::<_, ArchivalRecord>(&sql)
            .bind(&input.slug_base)
            .bind(input.parent_id)
            .bind(input.repository_id)
            .bind(&input.legacy_id)
            .bind(&input.identifier)
            .bind(&input.title)
            .bind(&input.level_of_description)
            .bind(&input.culture)
            .bind(&input.publication_status)
            .bind(input.security_classification_id)
            .bind(&input.fields)
            .bind(input.source_session_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ArchivalRecord>, sqlx::Error> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM archival_records WHERE id = $1");
        sqlx::query_as::<_, ArchivalRecord>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Resolve an external parent reference: a legacy id, a slug or an
    /// exact title. Legacy id and slug matches come before title matches;
    /// the oldest record wins within each.
    pub async fn find_by_reference(
        pool: &PgPool,
        reference: &str,
    ) -> Result<Option<ArchivalRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM archival_records \
             WHERE legacy_id = $1 OR slug = $1 OR title = $1 \
             ORDER BY CASE WHEN legacy_id = $1 OR slug = $1 THEN 0 ELSE 1 END, id \
             LIMIT 1"
        );
        sqlx::query_as::<_, ArchivalRecord>(&sql)
            .bind(reference)
            .fetch_optional(pool)
            .await
    }

    /// Case-insensitive title search, alphabetical. `%` and `_` in the
    /// query match literally.
    pub async fn search_by_title(
        pool: &PgPool,
        query: &str,
        limit: i64,
    ) -> Result<Vec<ArchivalRecord>, sqlx::Error> {
        let pattern = format!(
            "%{}%",
            query
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_")
        );
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM archival_records \
             WHERE title ILIKE $1 \
             ORDER BY title, id LIMIT $2"
        );
        sqlx::query_as::<_, ArchivalRecord>(&sql)
            .bind(pattern)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn list_children(
        pool: &PgPool,
        parent_id: DbId,
    ) -> Result<Vec<ArchivalRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM archival_records WHERE parent_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, ArchivalRecord>(&sql)
            .bind(parent_id)
            .fetch_all(pool)
            .await
    }

    /// Delete a record. Returns `false` if it did not exist.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM archival_records WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ── DigitalObjectRepo ────────────────────────────────────────────────

/// Provides CRUD operations for digital objects.
pub struct DigitalObjectRepo;

impl DigitalObjectRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateDigitalObject,
    ) -> Result<DigitalObject, sqlx::Error> {
        let sql = format!(
            "INSERT INTO digital_objects \
                (record_id, file_name, stored_path, checksum, size_bytes, derivatives) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {OBJECT_COLUMNS}"
        );
        sqlx::query_as::<_, DigitalObject>(&sql)
            .bind(input.record_id)
            .bind(&input.file_name)
            .bind(&input.stored_path)
            .bind(&input.checksum)
            .bind(input.size_bytes)
            .bind(&input.derivatives)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<DigitalObject>, sqlx::Error> {
        let sql = format!("SELECT {OBJECT_COLUMNS} FROM digital_objects WHERE id = $1");
        sqlx::query_as::<_, DigitalObject>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a digital object row, returning it if it existed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<DigitalObject>, sqlx::Error> {
        let sql = format!("DELETE FROM digital_objects WHERE id = $1 RETURNING {OBJECT_COLUMNS}");
        sqlx::query_as::<_, DigitalObject>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

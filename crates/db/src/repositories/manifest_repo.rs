//! Repository for the creation manifest.

use archivist_core::types::DbId;
use sqlx::PgPool;

use crate::models::manifest::{CreateManifestEntry, ManifestRow};

/// Column list for `ingest_manifest_entries`.
const COLUMNS: &str =
    "id, session_id, job_id, row_number, kind, target_id, deleted_at, created_at, updated_at";

/// Provides access to the per-session creation manifest.
pub struct ManifestRepo;

impl ManifestRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateManifestEntry,
    ) -> Result<ManifestRow, sqlx::Error> {
        let sql = format!(
            "INSERT INTO ingest_manifest_entries (session_id, job_id, row_number, kind, target_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ManifestRow>(&sql)
            .bind(input.session_id)
            .bind(input.job_id)
            .bind(input.row_number)
            .bind(input.kind.as_str())
            .bind(input.target_id)
            .fetch_one(pool)
            .await
    }

    /// Every entry of a session, in creation order.
    pub async fn list_by_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<ManifestRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM ingest_manifest_entries WHERE session_id = $1 \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, ManifestRow>(&sql)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    /// Stamp `deleted_at` on a live entry.
    pub async fn mark_deleted(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE ingest_manifest_entries SET deleted_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

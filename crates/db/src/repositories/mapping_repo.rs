//! Repository for column mappings and saved mapping profiles.

use archivist_core::mapping::{ColumnMapping, ProfileEntry};
use archivist_core::session::Standard;
use archivist_core::types::DbId;
use sqlx::PgPool;

use crate::models::encode_json;
use crate::models::mapping::{MappingRow, ProfileRow};

/// Column list for `ingest_mappings`.
const MAPPING_COLUMNS: &str = "id, session_id, source_column, target_field, default_value, \
     transform, is_ignored, sort_order, confidence, created_at, updated_at";

/// Column list for `ingest_mapping_profiles`.
const PROFILE_COLUMNS: &str = "id, name, standard, entries, created_by, created_at, updated_at";

// ── MappingRepo ──────────────────────────────────────────────────────

/// Provides access to a session's column mappings.
pub struct MappingRepo;

impl MappingRepo {
    pub async fn list_by_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<MappingRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {MAPPING_COLUMNS} FROM ingest_mappings \
             WHERE session_id = $1 ORDER BY sort_order, id"
        );
        sqlx::query_as::<_, MappingRow>(&sql)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    /// Replace every mapping of a session in one transaction.
    pub async fn replace_for_session(
        pool: &PgPool,
        session_id: DbId,
        mappings: &[ColumnMapping],
    ) -> Result<Vec<MappingRow>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM ingest_mappings WHERE session_id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            "INSERT INTO ingest_mappings \
                (session_id, source_column, target_field, default_value, transform, \
                 is_ignored, sort_order, confidence) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {MAPPING_COLUMNS}"
        );
        let mut rows = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            let row = sqlx::query_as::<_, MappingRow>(&sql)
                .bind(session_id)
                .bind(&mapping.source_column)
                .bind(&mapping.target_field)
                .bind(&mapping.default_value)
                .bind(mapping.transform.map(|t| t.as_str()))
                .bind(mapping.is_ignored)
                .bind(mapping.sort_order)
                .bind(mapping.confidence.as_str())
                .fetch_one(&mut *tx)
                .await?;
            rows.push(row);
        }
        tx.commit().await?;
        Ok(rows)
    }

    pub async fn delete_by_session(pool: &PgPool, session_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ingest_mappings WHERE session_id = $1")
            .bind(session_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// ── ProfileRepo ──────────────────────────────────────────────────────

/// Provides CRUD operations for mapping profiles.
pub struct ProfileRepo;

impl ProfileRepo {
    /// Create a profile. A duplicate name violates `uq_ingest_mapping_profiles_name`.
    pub async fn create(
        pool: &PgPool,
        name: &str,
        standard: Option<Standard>,
        entries: &[ProfileEntry],
        created_by: Option<DbId>,
    ) -> Result<ProfileRow, sqlx::Error> {
        let sql = format!(
            "INSERT INTO ingest_mapping_profiles (name, standard, entries, created_by) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {PROFILE_COLUMNS}"
        );
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(name.trim())
            .bind(standard.map(|s| s.as_str()))
            .bind(encode_json(&entries))
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ProfileRow>, sqlx::Error> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM ingest_mapping_profiles WHERE id = $1");
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<ProfileRow>, sqlx::Error> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM ingest_mapping_profiles ORDER BY name");
        sqlx::query_as::<_, ProfileRow>(&sql).fetch_all(pool).await
    }
}

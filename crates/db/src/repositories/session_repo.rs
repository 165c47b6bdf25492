//! Repository for ingest sessions.

use archivist_core::session::{SessionConfig, Stage};
use archivist_core::types::DbId;
use sqlx::PgPool;

use crate::models::encode_json;
use crate::models::session::SessionRow;

/// Column list for `ingest_sessions`.
const COLUMNS: &str = "id, title, sector, standard, repository_id, parent_placement, parent_id, \
     new_parent_title, new_parent_level, output_options, derivative_options, \
     processing_options, identifier_counter, security_classification_id, \
     do_match_strategy, stage, validation_current, created_by, created_at, updated_at";

/// Provides CRUD operations for ingest sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Create a session in the `configure` stage.
    pub async fn create(
        pool: &PgPool,
        config: &SessionConfig,
        created_by: Option<DbId>,
    ) -> Result<SessionRow, sqlx::Error> {
        let sql = format!(
            "INSERT INTO ingest_sessions \
                (title, sector, standard, repository_id, parent_placement, parent_id, \
                 new_parent_title, new_parent_level, output_options, derivative_options, \
                 processing_options, identifier_counter, security_classification_id, \
                 do_match_strategy, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SessionRow>(&sql)
            .bind(config.title.trim())
            .bind(config.sector.as_str())
            .bind(config.standard.as_str())
            .bind(config.repository_id)
            .bind(config.parent_placement.as_str())
            .bind(config.parent_id)
            .bind(&config.new_parent_title)
            .bind(&config.new_parent_level)
            .bind(encode_json(&config.output))
            .bind(encode_json(&config.derivatives))
            .bind(encode_json(&config.processing))
            .bind(config.identifier_counter.as_ref().map(encode_json))
            .bind(config.security_classification_id)
            .bind(config.do_match_strategy.as_str())
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a session by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<SessionRow>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM ingest_sessions WHERE id = $1");
        sqlx::query_as::<_, SessionRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List sessions, newest first, optionally only those of one user.
    pub async fn list(
        pool: &PgPool,
        created_by: Option<DbId>,
    ) -> Result<Vec<SessionRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM ingest_sessions \
             WHERE ($1::BIGINT IS NULL OR created_by = $1) \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, SessionRow>(&sql)
            .bind(created_by)
            .fetch_all(pool)
            .await
    }

    /// Replace a session's configuration.
    pub async fn update_config(
        pool: &PgPool,
        id: DbId,
        config: &SessionConfig,
    ) -> Result<Option<SessionRow>, sqlx::Error> {
        let sql = format!(
            "UPDATE ingest_sessions SET \
                title = $2, sector = $3, standard = $4, repository_id = $5, \
                parent_placement = $6, parent_id = $7, new_parent_title = $8, \
                new_parent_level = $9, output_options = $10, derivative_options = $11, \
                processing_options = $12, identifier_counter = $13, \
                security_classification_id = $14, do_match_strategy = $15 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SessionRow>(&sql)
            .bind(id)
            .bind(config.title.trim())
            .bind(config.sector.as_str())
            .bind(config.standard.as_str())
            .bind(config.repository_id)
            .bind(config.parent_placement.as_str())
            .bind(config.parent_id)
            .bind(&config.new_parent_title)
            .bind(&config.new_parent_level)
            .bind(encode_json(&config.output))
            .bind(encode_json(&config.derivatives))
            .bind(encode_json(&config.processing))
            .bind(config.identifier_counter.as_ref().map(encode_json))
            .bind(config.security_classification_id)
            .bind(config.do_match_strategy.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Move a session to `stage`.
    pub async fn update_stage(
        pool: &PgPool,
        id: DbId,
        stage: Stage,
    ) -> Result<Option<SessionRow>, sqlx::Error> {
        let sql = format!(
            "UPDATE ingest_sessions SET stage = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SessionRow>(&sql)
            .bind(id)
            .bind(stage.as_str())
            .fetch_optional(pool)
            .await
    }

    pub async fn set_validation_current(
        pool: &PgPool,
        id: DbId,
        current: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE ingest_sessions SET validation_current = $2 WHERE id = $1")
            .bind(id)
            .bind(current)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Cache the id of the parent created for `new` placement.
    pub async fn set_parent_id(
        pool: &PgPool,
        id: DbId,
        parent_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE ingest_sessions SET parent_id = $2 WHERE id = $1")
            .bind(id)
            .bind(parent_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

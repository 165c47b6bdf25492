//! Repository for commit jobs.

use archivist_core::commit::{ErrorLogEntry, JobCounters, JobStatus, PackageKind};
use archivist_core::types::DbId;
use sqlx::PgPool;

use crate::models::encode_json;
use crate::models::job::JobRow;

/// Column list for `ingest_jobs`.
const COLUMNS: &str = "id, session_id, status, total_rows, processed_rows, created_records, \
     created_dos, error_count, error_log, sip_package_id, aip_package_id, dip_package_id, \
     started_at, completed_at, rolled_back_at, created_at, updated_at";

/// Provides CRUD operations for commit jobs.
pub struct JobRepo;

impl JobRepo {
    /// Queue a new job. A second active job for the same session violates
    /// `uq_ingest_jobs_active_session`.
    pub async fn create(
        pool: &PgPool,
        session_id: DbId,
        total_rows: i32,
    ) -> Result<JobRow, sqlx::Error> {
        let sql = format!(
            "INSERT INTO ingest_jobs (session_id, status, total_rows) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&sql)
            .bind(session_id)
            .bind(JobStatus::Queued.as_str())
            .bind(total_rows)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<JobRow>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM ingest_jobs WHERE id = $1");
        sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Most recent job of a session.
    pub async fn find_latest_for_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Option<JobRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM ingest_jobs WHERE session_id = $1 \
             ORDER BY id DESC LIMIT 1"
        );
        sqlx::query_as::<_, JobRow>(&sql)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    /// Claim a specific queued job. Returns `None` when it is no longer queued.
    pub async fn claim(pool: &PgPool, id: DbId) -> Result<Option<JobRow>, sqlx::Error> {
        let sql = format!(
            "UPDATE ingest_jobs SET status = $2, started_at = NOW() \
             WHERE id = $1 AND status = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .bind(JobStatus::Running.as_str())
            .bind(JobStatus::Queued.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim the oldest queued job.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never
    /// pick the same job.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<JobRow>, sqlx::Error> {
        let sql = format!(
            "UPDATE ingest_jobs \
             SET status = $1, started_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM ingest_jobs \
                 WHERE status = $2 \
                 ORDER BY created_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&sql)
            .bind(JobStatus::Running.as_str())
            .bind(JobStatus::Queued.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Store progress counters. `GREATEST` keeps them monotonic even if
    /// an older snapshot arrives late.
    pub async fn update_progress(
        pool: &PgPool,
        id: DbId,
        counters: &JobCounters,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE ingest_jobs SET \
                processed_rows = GREATEST(processed_rows, $2), \
                created_records = GREATEST(created_records, $3), \
                created_dos = GREATEST(created_dos, $4), \
                error_count = GREATEST(error_count, $5) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(counters.processed_rows)
        .bind(counters.created_records)
        .bind(counters.created_dos)
        .bind(counters.error_count)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Append one entry to the job's error log.
    pub async fn append_log(
        pool: &PgPool,
        id: DbId,
        entry: &ErrorLogEntry,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE ingest_jobs SET error_log = error_log || jsonb_build_array($2::jsonb) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(encode_json(entry))
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Move a running (or queued) job to a terminal status.
    pub async fn finish(
        pool: &PgPool,
        id: DbId,
        status: JobStatus,
    ) -> Result<Option<JobRow>, sqlx::Error> {
        let sql = format!(
            "UPDATE ingest_jobs SET status = $2, completed_at = NOW() \
             WHERE id = $1 AND status IN ($3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(JobStatus::Queued.as_str())
            .bind(JobStatus::Running.as_str())
            .fetch_optional(pool)
            .await
    }

    pub async fn set_package(
        pool: &PgPool,
        id: DbId,
        kind: PackageKind,
        package_id: &str,
    ) -> Result<(), sqlx::Error> {
        let column = match kind {
            PackageKind::Sip => "sip_package_id",
            PackageKind::Aip => "aip_package_id",
            PackageKind::Dip => "dip_package_id",
        };
        let sql = format!("UPDATE ingest_jobs SET {column} = $2 WHERE id = $1");
        sqlx::query(&sql)
            .bind(id)
            .bind(package_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn mark_rolled_back(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE ingest_jobs SET rolled_back_at = NOW() \
             WHERE id = $1 AND rolled_back_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

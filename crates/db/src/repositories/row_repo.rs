//! Repository for parsed data rows and validation issues.

use archivist_core::row::DataRow;
use archivist_core::types::{DbId, RowNumber};
use archivist_core::validation::ValidationIssue;
use sqlx::PgPool;

use crate::models::encode_json;
use crate::models::row::{IngestRow, IssueRow};

/// Column list for `ingest_rows`.
const ROW_COLUMNS: &str =
    "id, session_id, row_number, raw, fields, is_valid, is_excluded, created_at, updated_at";

/// Column list for `ingest_issues`.
const ISSUE_COLUMNS: &str =
    "id, session_id, row_number, field_name, severity, rule, message, created_at, updated_at";

// ── RowRepo ──────────────────────────────────────────────────────────

/// Provides access to a session's data rows.
pub struct RowRepo;

impl RowRepo {
    /// Replace all rows of a session (a new upload) in one transaction.
    pub async fn replace_for_session(
        pool: &PgPool,
        session_id: DbId,
        rows: &[DataRow],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM ingest_rows WHERE session_id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO ingest_rows \
                    (session_id, row_number, raw, fields, is_valid, is_excluded) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(session_id)
            .bind(row.row_number)
            .bind(encode_json(&row.raw))
            .bind(encode_json(&row.fields))
            .bind(row.is_valid)
            .bind(row.is_excluded)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    /// All rows of a session in row order.
    pub async fn list_by_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<IngestRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {ROW_COLUMNS} FROM ingest_rows WHERE session_id = $1 ORDER BY row_number"
        );
        sqlx::query_as::<_, IngestRow>(&sql)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find(
        pool: &PgPool,
        session_id: DbId,
        row_number: RowNumber,
    ) -> Result<Option<IngestRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {ROW_COLUMNS} FROM ingest_rows WHERE session_id = $1 AND row_number = $2"
        );
        sqlx::query_as::<_, IngestRow>(&sql)
            .bind(session_id)
            .bind(row_number)
            .fetch_optional(pool)
            .await
    }

    /// Write back enriched fields and flags of existing rows.
    pub async fn update_many(
        pool: &PgPool,
        session_id: DbId,
        rows: &[DataRow],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut affected = 0;
        for row in rows {
            let result = sqlx::query(
                "UPDATE ingest_rows SET fields = $3, is_valid = $4, is_excluded = $5 \
                 WHERE session_id = $1 AND row_number = $2",
            )
            .bind(session_id)
            .bind(row.row_number)
            .bind(encode_json(&row.fields))
            .bind(row.is_valid)
            .bind(row.is_excluded)
            .execute(&mut *tx)
            .await?;
            affected += result.rows_affected();
        }
        tx.commit().await?;
        Ok(affected)
    }
}

// ── IssueRepo ────────────────────────────────────────────────────────

/// Provides access to validation issues.
pub struct IssueRepo;

impl IssueRepo {
    /// Discard a session's issues and store a fresh set.
    pub async fn replace_for_session(
        pool: &PgPool,
        session_id: DbId,
        issues: &[ValidationIssue],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM ingest_issues WHERE session_id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;
        for issue in issues {
            sqlx::query(
                "INSERT INTO ingest_issues \
                    (session_id, row_number, field_name, severity, rule, message) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(session_id)
            .bind(issue.row_number)
            .bind(&issue.field_name)
            .bind(issue.severity.as_str())
            .bind(issue.rule.as_str())
            .bind(&issue.message)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(issues.len() as u64)
    }

    /// Issues of a session in row order, then insertion order.
    pub async fn list_by_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<IssueRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {ISSUE_COLUMNS} FROM ingest_issues WHERE session_id = $1 \
             ORDER BY row_number, id"
        );
        sqlx::query_as::<_, IssueRow>(&sql)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }
}

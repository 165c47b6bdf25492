//! Commit job rows.

use archivist_core::commit::{CommitJob, JobCounters};
use archivist_core::error::CoreError;
use archivist_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::{decode_json, parse_column};

/// A row from the `ingest_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobRow {
    pub id: DbId,
    pub session_id: DbId,
    pub status: String,
    pub total_rows: i32,
    pub processed_rows: i32,
    pub created_records: i32,
    pub created_dos: i32,
    pub error_count: i32,
    pub error_log: serde_json::Value,
    pub sip_package_id: Option<String>,
    pub aip_package_id: Option<String>,
    pub dip_package_id: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub rolled_back_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl JobRow {
    pub fn into_domain(self) -> Result<CommitJob, CoreError> {
        Ok(CommitJob {
            id: self.id,
            session_id: self.session_id,
            status: parse_column("status", &self.status)?,
            counters: JobCounters {
                total_rows: self.total_rows,
                processed_rows: self.processed_rows,
                created_records: self.created_records,
                created_dos: self.created_dos,
                error_count: self.error_count,
            },
            error_log: decode_json("error_log", self.error_log)?,
            sip_package_id: self.sip_package_id,
            aip_package_id: self.aip_package_id,
            dip_package_id: self.dip_package_id,
            started_at: self.started_at,
            completed_at: self.completed_at,
            rolled_back_at: self.rolled_back_at,
            created_at: self.created_at,
        })
    }
}

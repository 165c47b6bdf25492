//! Commit job lifecycle, progress counters and the creation manifest.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, RowNumber, Timestamp};

// ── Job status ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [Self::Queued, Self::Running, Self::Completed, Self::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Queued or running.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// `queued → running → {completed | failed}`. A queued job may also
    /// fail before it is claimed (e.g. it could not be scheduled).
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Queued, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    pub fn check_transition(&self, next: JobStatus) -> Result<(), CoreError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::transition(self, next))
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown job status '{s}'")))
    }
}

/// Whether a new job may be started given the session's latest job.
///
/// A session gets a new job only when it has none yet or the last one
/// failed. An active job is a conflict; a completed one means the
/// session is done.
pub fn check_can_start(latest: Option<JobStatus>) -> Result<(), CoreError> {
    match latest {
        None | Some(JobStatus::Failed) => Ok(()),
        Some(JobStatus::Completed) => Err(CoreError::transition("completed", "commit")),
        Some(status) => Err(CoreError::Conflict(format!(
            "A commit job is already {status} for this session"
        ))),
    }
}

// ── Progress ─────────────────────────────────────────────────────────

/// Monotonic progress counters of a commit job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounters {
    pub total_rows: i32,
    pub processed_rows: i32,
    pub created_records: i32,
    pub created_dos: i32,
    pub error_count: i32,
}

/// What happened to one row during a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Record created, with or without a digital object.
    Created { digital_object: bool },
    /// Processed without creating anything (record creation disabled).
    Skipped,
    Failed,
}

impl JobCounters {
    pub fn new(total_rows: i32) -> Self {
        Self {
            total_rows,
            ..Self::default()
        }
    }

    /// Count one processed row. Counters only ever grow.
    pub fn record(&mut self, outcome: RowOutcome) {
        self.processed_rows += 1;
        match outcome {
            RowOutcome::Created { digital_object } => {
                self.created_records += 1;
                if digital_object {
                    self.created_dos += 1;
                }
            }
            RowOutcome::Skipped => {}
            RowOutcome::Failed => self.error_count += 1,
        }
    }

    /// Count an error not tied to a processed row.
    pub fn record_error(&mut self) {
        self.error_count += 1;
    }

    pub fn percent(&self) -> u8 {
        if self.total_rows <= 0 {
            return 100;
        }
        let pct = i64::from(self.processed_rows) * 100 / i64::from(self.total_rows);
        pct.clamp(0, 100) as u8
    }
}

// ── Job record ───────────────────────────────────────────────────────

/// A commit job as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitJob {
    pub id: DbId,
    pub session_id: DbId,
    pub status: JobStatus,
    #[serde(flatten)]
    pub counters: JobCounters,
    pub error_log: Vec<ErrorLogEntry>,
    pub sip_package_id: Option<String>,
    pub aip_package_id: Option<String>,
    pub dip_package_id: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub rolled_back_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl CommitJob {
    pub fn view(&self) -> JobStatusView {
        JobStatusView {
            job_id: self.id,
            session_id: self.session_id,
            status: self.status,
            processed_rows: self.counters.processed_rows,
            total_rows: self.counters.total_rows,
            created_records: self.counters.created_records,
            created_dos: self.counters.created_dos,
            error_count: self.counters.error_count,
            percent: self.counters.percent(),
        }
    }
}

/// What a poller sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobStatusView {
    pub job_id: DbId,
    pub session_id: DbId,
    pub status: JobStatus,
    pub processed_rows: i32,
    pub total_rows: i32,
    pub created_records: i32,
    pub created_dos: i32,
    pub error_count: i32,
    pub percent: u8,
}

// ── Error log ────────────────────────────────────────────────────────

/// Append-only job log entry, tagged by row or by stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<RowNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub error: String,
    pub at: Timestamp,
}

impl ErrorLogEntry {
    pub fn for_row(row: RowNumber, error: impl Into<String>, at: Timestamp) -> Self {
        Self {
            row: Some(row),
            stage: None,
            error: error.into(),
            at,
        }
    }

    pub fn for_stage(stage: impl Into<String>, error: impl Into<String>, at: Timestamp) -> Self {
        Self {
            row: None,
            stage: Some(stage.into()),
            error: error.into(),
            at,
        }
    }
}

// ── Creation manifest ────────────────────────────────────────────────

/// Kind of object a commit created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestKind {
    Record,
    DigitalObject,
    /// Parent record created for `new` placement.
    Parent,
}

impl ManifestKind {
    pub const ALL: [ManifestKind; 3] = [Self::Record, Self::DigitalObject, Self::Parent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::DigitalObject => "digital_object",
            Self::Parent => "parent",
        }
    }

    /// Whether the entry is deleted through the record store.
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record | Self::Parent)
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ManifestKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown manifest kind '{s}'")))
    }
}

/// One object created by a commit, in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: DbId,
    pub session_id: DbId,
    pub job_id: DbId,
    pub row_number: Option<RowNumber>,
    pub kind: ManifestKind,
    pub target_id: DbId,
    pub created_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl ManifestEntry {
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Live entries in deletion order: newest first, so digital objects go
/// before their records and children before parents.
pub fn rollback_order(entries: &[ManifestEntry]) -> Vec<&ManifestEntry> {
    let mut live: Vec<&ManifestEntry> = entries.iter().filter(|e| e.is_live()).collect();
    live.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    live
}

// ── Packages ─────────────────────────────────────────────────────────

/// Preservation packages generated after a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageKind {
    Sip,
    Aip,
    Dip,
}

impl PackageKind {
    pub const ALL: [PackageKind; 3] = [Self::Sip, Self::Aip, Self::Dip];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sip => "sip",
            Self::Aip => "aip",
            Self::Dip => "dip",
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Downloadable manifest ────────────────────────────────────────────

/// Header of the per-session manifest CSV.
pub const MANIFEST_CSV_COLUMNS: &[&str] = &[
    "row_number",
    "legacy_id",
    "title",
    "level_of_description",
    "record_id",
    "digital_object_id",
    "excluded",
    "valid",
];

/// Stage tags used in the job error log.
pub mod stage {
    pub const SETUP: &str = "setup";
    pub const PARENT: &str = "parent";
    pub const COMMIT: &str = "commit";
    pub const PACKAGE: &str = "package";
    pub const PROCESSING: &str = "processing";
}

use archivist_core::error::CoreError;
use archivist_core::types::RowNumber;

use crate::collaborators::CollaboratorError;
use crate::store::StoreError;

/// Errors surfaced by pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// A failure confined to one row of a commit. Logged and counted; never
/// aborts the job.
#[derive(Debug, thiserror::Error)]
pub enum CommitRowError {
    #[error("Parent row {0} failed to commit")]
    ParentFailed(RowNumber),

    #[error("Parent reference '{0}' could not be resolved")]
    ParentUnresolved(String),

    #[error("Parent chain loops back on itself")]
    Cycle,

    #[error("Record creation failed: {0}")]
    Record(#[source] CollaboratorError),

    #[error("Digital object could not be attached: {0}")]
    DigitalObject(#[source] CollaboratorError),
}

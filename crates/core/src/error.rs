use crate::types::{DbId, RowNumber};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// An illegal stage or job-state move. Never mutates state.
    #[error("Invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("Unsupported upload format: {0}")]
    UnsupportedFormat(String),

    /// Fix/exclude target is missing (or excluded, for fixes).
    #[error("Row {0} not found")]
    RowNotFound(RowNumber),

    /// Proceed or commit attempted without an eligible row set.
    #[error("Blocked by validation: {0}")]
    ValidationBlocked(String),

    #[error("Session {0} has already been rolled back")]
    AlreadyRolledBack(DbId),

    /// Source columns with neither a target field nor the ignore flag.
    #[error("Unmapped columns: {}", .0.join(", "))]
    MappingIncomplete(Vec<String>),
}

impl CoreError {
    /// Shorthand for [`CoreError::InvalidTransition`] from any displayable states.
    pub fn transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

//! Batch validation engine.
//!
//! Provides issue and statistics types plus a pure-logic evaluator that
//! checks a session's included rows; no database access.

pub mod evaluator;
pub mod rules;

pub use evaluator::{external_parent_refs, summarize, validate_batch, BatchContext, ValidationReport};
pub use rules::{Rule, Severity, ValidationIssue, ValidationStats};

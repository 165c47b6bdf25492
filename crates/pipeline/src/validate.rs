//! Validate stage: run the validator and apply row-level fixes.

use std::collections::{HashMap, HashSet};

use archivist_core::error::CoreError;
use archivist_core::fields::is_target_field;
use archivist_core::row::DataRow;
use archivist_core::session::{IngestSession, ParentPlacement, Stage};
use archivist_core::types::{DbId, RowNumber};
use archivist_core::validation::{
    external_parent_refs, summarize, validate_batch, BatchContext, ValidationIssue,
    ValidationReport, ValidationStats,
};
use serde::Serialize;

use crate::context::IngestContext;
use crate::error::PipelineResult;
use crate::upload::payload_index;

/// Stored issues of a session with stats over its included rows.
#[derive(Debug, Clone, Serialize)]
pub struct IssueReport {
    pub stats: ValidationStats,
    pub validation_current: bool,
    pub issues: Vec<ValidationIssue>,
}

async fn validate_session(ctx: &IngestContext, session_id: DbId) -> PipelineResult<IngestSession> {
    let session = ctx.session(session_id).await?;
    if session.stage != Stage::Validate {
        return Err(CoreError::transition(session.stage, Stage::Validate).into());
    }
    Ok(session)
}

/// Validate every included row, replacing the previous issue set.
pub async fn validate(ctx: &IngestContext, session_id: DbId) -> PipelineResult<ValidationReport> {
    let session = validate_session(ctx, session_id).await?;
    let mut rows = ctx.store.list_rows(session_id).await?;
    let payload = payload_index(ctx, session_id).await?;

    let mut existing_parents = HashSet::new();
    if session.config.parent_placement == ParentPlacement::CsvHierarchy {
        for reference in external_parent_refs(&rows) {
            if ctx.records.find_reference(&reference).await?.is_some() {
                existing_parents.insert(reference);
            }
        }
    }

    let mut missing_parent = None;
    if let (ParentPlacement::Existing | ParentPlacement::New, Some(parent_id)) =
        (session.config.parent_placement, session.config.parent_id)
    {
        if !ctx.records.record_exists(parent_id).await? {
            tracing::warn!(session_id, parent_id, "Chosen parent record does not exist");
            missing_parent = Some(parent_id);
        }
    }

    let batch = BatchContext {
        standard: session.config.standard,
        placement: session.config.parent_placement,
        match_strategy: session.config.do_match_strategy,
        payload: payload.as_ref().map(|(_, index)| index),
        existing_parents: &existing_parents,
        missing_parent,
    };
    let report = validate_batch(&batch, &rows);

    let validity: HashMap<RowNumber, bool> = report.validity.iter().copied().collect();
    for row in &mut rows {
        row.is_valid = validity.get(&row.row_number).copied().unwrap_or(false);
    }
    ctx.store.update_rows(session_id, &rows).await?;
    ctx.store.replace_issues(session_id, &report.issues).await?;
    ctx.store.set_validation_current(session_id, true).await?;

    tracing::info!(
        session_id,
        total = report.stats.total,
        valid = report.stats.valid,
        errors = report.stats.errors,
        warnings = report.stats.warnings,
        "Validation finished",
    );
    Ok(report)
}

/// The last validation's issues, with stats over the currently included rows.
pub async fn issues(ctx: &IngestContext, session_id: DbId) -> PipelineResult<IssueReport> {
    let session = ctx.session(session_id).await?;
    let rows = ctx.store.list_rows(session_id).await?;
    let included: Vec<RowNumber> = rows
        .iter()
        .filter(|r| !r.is_excluded)
        .map(|r| r.row_number)
        .collect();
    let issues = ctx.store.list_issues(session_id).await?;
    Ok(IssueReport {
        stats: summarize(&included, &issues),
        validation_current: session.validation_current,
        issues,
    })
}

async fn load_row(ctx: &IngestContext, session_id: DbId, row_number: RowNumber) -> PipelineResult<DataRow> {
    ctx.store
        .get_row(session_id, row_number)
        .await?
        .ok_or_else(|| CoreError::RowNotFound(row_number).into())
}

/// Overwrite one enriched field of an included row. Validation goes stale;
/// it is not re-run.
pub async fn fix_row(
    ctx: &IngestContext,
    session_id: DbId,
    row_number: RowNumber,
    field: &str,
    value: &str,
) -> PipelineResult<DataRow> {
    let session = validate_session(ctx, session_id).await?;
    let mut row = load_row(ctx, session_id, row_number).await?;
    if row.is_excluded {
        return Err(CoreError::RowNotFound(row_number).into());
    }
    if !is_target_field(session.config.standard, field) {
        return Err(CoreError::Validation(format!(
            "'{field}' is not a {} field",
            session.config.standard.label()
        ))
        .into());
    }

    row.fields.insert(field.to_string(), value.to_string());
    ctx.store.update_rows(session_id, std::slice::from_ref(&row)).await?;
    ctx.store.set_validation_current(session_id, false).await?;
    tracing::debug!(session_id, row_number, field, "Row fixed");
    Ok(row)
}

/// Leave a row out of validation and commit.
pub async fn exclude_row(ctx: &IngestContext, session_id: DbId, row_number: RowNumber) -> PipelineResult<DataRow> {
    set_excluded(ctx, session_id, row_number, true).await
}

/// Take a previously excluded row back in.
pub async fn include_row(ctx: &IngestContext, session_id: DbId, row_number: RowNumber) -> PipelineResult<DataRow> {
    set_excluded(ctx, session_id, row_number, false).await
}

async fn set_excluded(
    ctx: &IngestContext,
    session_id: DbId,
    row_number: RowNumber,
    excluded: bool,
) -> PipelineResult<DataRow> {
    validate_session(ctx, session_id).await?;
    let mut row = load_row(ctx, session_id, row_number).await?;
    row.is_excluded = excluded;
    ctx.store.update_rows(session_id, std::slice::from_ref(&row)).await?;
    ctx.store.set_validation_current(session_id, false).await?;
    tracing::debug!(session_id, row_number, excluded, "Row exclusion changed");
    Ok(row)
}

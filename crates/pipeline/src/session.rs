//! Session lifecycle: configure, step through the wizard, cancel.

use archivist_core::error::CoreError;
use archivist_core::mapping::{unmapped_columns, Enricher};
use archivist_core::session::{check_advance, IngestSession, SessionConfig, Stage};
use archivist_core::types::{DbId, RowNumber};
use archivist_core::validation::summarize;

use crate::collaborators::RecordSummary;
use crate::context::IngestContext;
use crate::error::PipelineResult;
use crate::{commit, mapping};

/// Create a session in the `configure` stage.
pub async fn configure(
    ctx: &IngestContext,
    config: SessionConfig,
    created_by: Option<DbId>,
) -> PipelineResult<IngestSession> {
    config.validate()?;
    let session = ctx.store.create_session(&config, created_by).await?;
    tracing::info!(
        session_id = session.id,
        sector = %session.config.sector,
        standard = %session.config.standard,
        "Ingest session created",
    );
    Ok(session)
}

/// Replace the settings of a session that has not reached commit.
///
/// Changing the standard drops the column mappings so they are
/// auto-mapped again against the new field set.
pub async fn update_config(
    ctx: &IngestContext,
    session_id: DbId,
    config: SessionConfig,
) -> PipelineResult<IngestSession> {
    let session = ctx.session(session_id).await?;
    if !session.stage.is_pre_commit() {
        return Err(CoreError::transition(session.stage, Stage::Configure).into());
    }
    config.validate()?;

    if config.standard != session.config.standard {
        ctx.store.replace_mappings(session_id, &[]).await?;
    }
    let updated = ctx.store.update_config(session_id, &config).await?;
    ctx.store.set_validation_current(session_id, false).await?;
    Ok(IngestSession {
        validation_current: false,
        ..updated
    })
}

pub async fn get(ctx: &IngestContext, session_id: DbId) -> PipelineResult<IngestSession> {
    ctx.session(session_id).await
}

pub async fn list(ctx: &IngestContext, created_by: Option<DbId>) -> PipelineResult<Vec<IngestSession>> {
    Ok(ctx.store.list_sessions(created_by).await?)
}

/// Move the session one stage forward or back.
///
/// Moving to `commit` starts a commit job; everything else checks the
/// stage edge and the target stage's preconditions before touching state.
pub async fn advance(ctx: &IngestContext, session_id: DbId, target: Stage) -> PipelineResult<IngestSession> {
    let session = ctx.session(session_id).await?;
    if target == Stage::Commit {
        commit::start_commit(ctx, session_id).await?;
        return ctx.session(session_id).await;
    }
    check_advance(session.stage, target)?;

    match (session.stage, target) {
        (Stage::Upload, Stage::Map) => {
            if ctx.store.latest_file(session_id).await?.is_none() {
                return Err(CoreError::Validation("Upload a source file first".into()).into());
            }
        }
        (Stage::Map, Stage::Validate) => enrich_rows(ctx, &session).await?,
        (Stage::Validate, Stage::Preview) => check_can_preview(ctx, &session).await?,
        _ => {}
    }

    let moved = ctx.store.set_stage(session_id, target).await?;
    tracing::info!(session_id, from = %session.stage, to = %target, "Session stage changed");
    Ok(moved)
}

/// Abandon a session before commit.
pub async fn cancel(ctx: &IngestContext, session_id: DbId) -> PipelineResult<IngestSession> {
    let session = ctx.session(session_id).await?;
    if !session.stage.is_pre_commit() {
        return Err(CoreError::transition(session.stage, Stage::Cancelled).into());
    }
    let cancelled = ctx.store.set_stage(session_id, Stage::Cancelled).await?;
    tracing::info!(session_id, from = %session.stage, "Session cancelled");
    Ok(cancelled)
}

/// Shortest query [`search_parents`] runs.
pub const PARENT_SEARCH_MIN_CHARS: usize = 2;

/// Most records [`search_parents`] returns.
pub const PARENT_SEARCH_LIMIT: usize = 20;

/// Records whose title contains `query`, as candidates for `existing`
/// placement. Queries shorter than two characters find nothing.
pub async fn search_parents(ctx: &IngestContext, query: &str) -> PipelineResult<Vec<RecordSummary>> {
    let query = query.trim();
    if query.chars().count() < PARENT_SEARCH_MIN_CHARS {
        return Ok(Vec::new());
    }
    Ok(ctx.records.search(query, PARENT_SEARCH_LIMIT).await?)
}

/// Rebuild every row's target fields from the current mappings.
async fn enrich_rows(ctx: &IngestContext, session: &IngestSession) -> PipelineResult<()> {
    let mappings = mapping::mappings(ctx, session.id).await?;
    let unmapped = unmapped_columns(&mappings);
    if !unmapped.is_empty() {
        return Err(CoreError::MappingIncomplete(unmapped).into());
    }

    let mut rows = ctx.store.list_rows(session.id).await?;
    let enricher = Enricher::new(&mappings, session.config.identifier_counter.as_ref());
    for (position, row) in rows.iter_mut().enumerate() {
        row.fields = enricher.enrich(position, &row.raw);
    }
    ctx.store.update_rows(session.id, &rows).await?;
    ctx.store.set_validation_current(session.id, false).await?;
    tracing::debug!(session_id = session.id, rows = rows.len(), "Rows enriched");
    Ok(())
}

async fn check_can_preview(ctx: &IngestContext, session: &IngestSession) -> PipelineResult<()> {
    if !session.validation_current {
        return Err(CoreError::ValidationBlocked(
            "Validation is out of date; run validation again".into(),
        )
        .into());
    }
    let rows = ctx.store.list_rows(session.id).await?;
    let included: Vec<RowNumber> = rows
        .iter()
        .filter(|r| !r.is_excluded)
        .map(|r| r.row_number)
        .collect();
    let issues = ctx.store.list_issues(session.id).await?;
    summarize(&included, &issues).check_proceed()?;
    Ok(())
}

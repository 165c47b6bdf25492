//! Map stage: column mappings and reusable mapping profiles.

use archivist_core::digital_object::MatchStrategy;
use archivist_core::error::CoreError;
use archivist_core::mapping::{
    apply_edits, auto_map, overlay_profile, profile_entries, ColumnMapping, MappingEdit,
    MappingProfile,
};
use archivist_core::session::{IngestSession, Stage};
use archivist_core::types::DbId;

use crate::context::IngestContext;
use crate::error::PipelineResult;

/// The session's mappings. Auto-mapped from the upload's headers the first
/// time they are read.
pub async fn mappings(ctx: &IngestContext, session_id: DbId) -> PipelineResult<Vec<ColumnMapping>> {
    let session = ctx.session(session_id).await?;
    let stored = ctx.store.list_mappings(session_id).await?;
    if !stored.is_empty() {
        return Ok(stored);
    }
    let Some(file) = ctx.store.latest_file(session_id).await? else {
        return Ok(stored);
    };
    if file.headers.is_empty() {
        return Ok(stored);
    }

    let mapped = auto_map(&file.headers, session.config.standard);
    ctx.store.replace_mappings(session_id, &mapped).await?;
    tracing::debug!(
        session_id,
        columns = mapped.len(),
        unmapped = mapped.iter().filter(|m| m.target_field.is_none()).count(),
        "Columns auto-mapped",
    );
    Ok(mapped)
}

async fn map_session(ctx: &IngestContext, session_id: DbId) -> PipelineResult<IngestSession> {
    let session = ctx.session(session_id).await?;
    if session.stage != Stage::Map {
        return Err(CoreError::transition(session.stage, Stage::Map).into());
    }
    Ok(session)
}

/// Apply user edits, optionally switching the digital-object match strategy.
pub async fn save_mappings(
    ctx: &IngestContext,
    session_id: DbId,
    edits: &[MappingEdit],
    match_strategy: Option<MatchStrategy>,
) -> PipelineResult<Vec<ColumnMapping>> {
    let session = map_session(ctx, session_id).await?;
    let mut current = mappings(ctx, session_id).await?;
    apply_edits(&mut current, edits, session.config.standard)?;
    ctx.store.replace_mappings(session_id, &current).await?;

    if let Some(strategy) = match_strategy.filter(|s| *s != session.config.do_match_strategy) {
        let mut config = session.config.clone();
        config.do_match_strategy = strategy;
        ctx.store.update_config(session_id, &config).await?;
    }
    ctx.store.set_validation_current(session_id, false).await?;
    Ok(current)
}

/// Overlay a saved profile. Returns the mappings and how many columns it set.
///
/// Entries that target a field the session's standard does not have (a
/// profile saved under another standard, say) are left out.
pub async fn load_profile(
    ctx: &IngestContext,
    session_id: DbId,
    profile_id: DbId,
) -> PipelineResult<(Vec<ColumnMapping>, usize)> {
    let session = map_session(ctx, session_id).await?;
    let profile = ctx
        .store
        .get_profile(profile_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "mapping_profile",
            id: profile_id,
        })?;

    let mut current = mappings(ctx, session_id).await?;
    let standard = session.config.standard;
    let applied = overlay_profile(&mut current, &profile.entries, standard);
    if profile.standard.is_some_and(|s| s != standard) {
        tracing::debug!(
            session_id,
            profile_id,
            profile_standard = ?profile.standard,
            "Profile saved under another standard",
        );
    }
    ctx.store.replace_mappings(session_id, &current).await?;
    ctx.store.set_validation_current(session_id, false).await?;
    tracing::info!(session_id, profile_id, applied, "Mapping profile loaded");
    Ok((current, applied))
}

/// Save the session's active mappings as a named profile.
pub async fn save_profile(
    ctx: &IngestContext,
    session_id: DbId,
    name: &str,
    created_by: Option<DbId>,
) -> PipelineResult<MappingProfile> {
    let session = ctx.session(session_id).await?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::Validation("Profile name is required".into()).into());
    }
    let entries = profile_entries(&mappings(ctx, session_id).await?);
    if entries.is_empty() {
        return Err(CoreError::Validation("There are no active mappings to save".into()).into());
    }
    let profile = ctx
        .store
        .create_profile(name, Some(session.config.standard), &entries, created_by)
        .await?;
    tracing::info!(session_id, profile_id = profile.id, "Mapping profile saved");
    Ok(profile)
}

pub async fn list_profiles(ctx: &IngestContext) -> PipelineResult<Vec<MappingProfile>> {
    Ok(ctx.store.list_profiles().await?)
}

//! Rollback engine: undo what a commit created.

use archivist_core::commit::{rollback_order, ManifestKind};
use archivist_core::error::CoreError;
use archivist_core::session::Stage;
use archivist_core::types::DbId;
use serde::Serialize;

use crate::collaborators::DeleteOutcome;
use crate::context::IngestContext;
use crate::error::PipelineResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RollbackOutcome {
    /// Manifest entries removed by this call.
    pub deleted: usize,
    /// Entries whose deletion failed; they stay live for a retry.
    pub failed: usize,
    /// Whether nothing created by the commit remains.
    pub complete: bool,
}

/// Delete everything in the session's creation manifest, newest first.
///
/// Legal once the session is `completed` or `failed`. When every entry is
/// gone the job is stamped rolled back and the session cancelled; a second
/// call then fails with `AlreadyRolledBack`. Targets the collaborator no
/// longer knows count as deleted.
pub async fn rollback(ctx: &IngestContext, session_id: DbId) -> PipelineResult<RollbackOutcome> {
    let session = ctx.session(session_id).await?;
    let latest = ctx.store.latest_job(session_id).await?;
    if latest.as_ref().is_some_and(|j| j.rolled_back_at.is_some()) {
        return Err(CoreError::AlreadyRolledBack(session_id).into());
    }
    if !matches!(session.stage, Stage::Completed | Stage::Failed) {
        return Err(CoreError::transition(session.stage, Stage::Cancelled).into());
    }

    let entries = ctx.store.list_manifest(session_id).await?;
    let mut outcome = RollbackOutcome::default();
    for entry in rollback_order(&entries) {
        let result = match entry.kind {
            ManifestKind::DigitalObject => ctx.objects.delete_object(entry.target_id).await,
            ManifestKind::Record | ManifestKind::Parent => ctx.records.delete_record(entry.target_id).await,
        };
        match result {
            Ok(deleted) => {
                if deleted == DeleteOutcome::NotFound {
                    tracing::debug!(
                        session_id,
                        kind = entry.kind.as_str(),
                        target_id = entry.target_id,
                        "Rollback target already gone",
                    );
                }
                ctx.store.mark_manifest_deleted(entry.id).await?;
                outcome.deleted += 1;
            }
            Err(e) => {
                tracing::warn!(
                    session_id,
                    kind = entry.kind.as_str(),
                    target_id = entry.target_id,
                    error = %e,
                    "Rollback deletion failed",
                );
                outcome.failed += 1;
            }
        }
    }

    outcome.complete = outcome.failed == 0;
    if outcome.complete {
        if let Some(job) = &latest {
            ctx.store.mark_rolled_back(job.id).await?;
        }
        ctx.store.set_stage(session_id, Stage::Cancelled).await?;
    }
    tracing::info!(
        session_id,
        deleted = outcome.deleted,
        failed = outcome.failed,
        complete = outcome.complete,
        "Rollback finished",
    );
    Ok(outcome)
}

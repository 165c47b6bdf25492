//! Preview: the hierarchy that a commit would create.

use archivist_core::hierarchy::{build_tree, TreeNode};
use archivist_core::row::DataRow;
use archivist_core::types::DbId;
use serde::Serialize;

use crate::context::IngestContext;
use crate::error::PipelineResult;
use crate::upload::payload_index;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PreviewSummary {
    pub included_rows: usize,
    pub eligible_rows: usize,
    pub matched_digital_objects: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub summary: PreviewSummary,
    pub tree: Vec<TreeNode>,
}

pub async fn preview(ctx: &IngestContext, session_id: DbId) -> PipelineResult<Preview> {
    let session = ctx.session(session_id).await?;
    let rows = ctx.store.list_rows(session_id).await?;
    let payload = payload_index(ctx, session_id).await?;
    let strategy = session.config.do_match_strategy;

    let has_object = |row: &DataRow| {
        payload
            .as_ref()
            .is_some_and(|(_, index)| index.resolve(strategy, row.match_keys()).is_some())
    };

    let included: Vec<&DataRow> = rows.iter().filter(|r| !r.is_excluded).collect();
    let summary = PreviewSummary {
        included_rows: included.len(),
        eligible_rows: included.iter().filter(|r| r.is_eligible()).count(),
        matched_digital_objects: included.iter().filter(|r| has_object(r)).count(),
    };
    Ok(Preview {
        summary,
        tree: build_tree(&included, has_object),
    })
}

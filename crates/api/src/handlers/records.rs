//! Handlers for looking up records already in the record store.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use archivist_pipeline::collaborators::RecordSummary;
use archivist_pipeline::session;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// GET /api/v1/ingest/records/search?q=
///
/// Title search for picking the parent of `existing` placement. Queries
/// under two characters return an empty list.
pub async fn search_records(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<DataResponse<Vec<RecordSummary>>>> {
    let found = session::search_parents(&state.ingest, &params.q).await?;
    Ok(Json(DataResponse { data: found }))
}

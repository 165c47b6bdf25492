//! Handlers for ingest wizard sessions: configure, step through, cancel.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use archivist_core::session::{IngestSession, SessionConfig, Stage};
use archivist_core::types::DbId;
use archivist_pipeline::session;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `POST /sessions` and `PUT /sessions/{id}`. The configuration
/// is checked by the pipeline.
#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    #[serde(flatten)]
    pub config: SessionConfig,
    /// Who started the session. Unauthenticated deployments leave it empty.
    #[serde(default)]
    pub created_by: Option<DbId>,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub stage: Stage,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsParams {
    pub created_by: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/ingest/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<ListSessionsParams>,
) -> AppResult<Json<DataResponse<Vec<IngestSession>>>> {
    let sessions = session::list(&state.ingest, params.created_by).await?;
    Ok(Json(DataResponse { data: sessions }))
}

/// POST /api/v1/ingest/sessions
///
/// Create a session in the `configure` stage.
pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<SessionRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<IngestSession>>)> {
    let created = session::configure(&state.ingest, body.config, body.created_by).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/ingest/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<IngestSession>>> {
    let found = session::get(&state.ingest, id).await?;
    Ok(Json(DataResponse { data: found }))
}

/// PUT /api/v1/ingest/sessions/{id}
///
/// Replace the configuration of a session that has not been committed.
pub async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<SessionRequest>,
) -> AppResult<Json<DataResponse<IngestSession>>> {
    let updated = session::update_config(&state.ingest, id, body.config).await?;
    Ok(Json(DataResponse { data: updated }))
}

/// POST /api/v1/ingest/sessions/{id}/advance
///
/// Move one stage forward or back. Advancing to `commit` queues a job.
pub async fn advance_session(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<AdvanceRequest>,
) -> AppResult<Json<DataResponse<IngestSession>>> {
    if body.stage == Stage::Commit {
        let job = crate::handlers::commit::queue(&state, id).await?;
        tracing::debug!(session_id = id, job_id = job.id, "Commit queued via advance");
        let moved = session::get(&state.ingest, id).await?;
        return Ok(Json(DataResponse { data: moved }));
    }
    let moved = session::advance(&state.ingest, id, body.stage).await?;
    Ok(Json(DataResponse { data: moved }))
}

/// POST /api/v1/ingest/sessions/{id}/cancel
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<IngestSession>>> {
    let cancelled = session::cancel(&state.ingest, id).await?;
    Ok(Json(DataResponse { data: cancelled }))
}

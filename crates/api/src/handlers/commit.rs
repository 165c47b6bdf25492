//! Handlers for commit jobs, rollback and CSV downloads.

use axum::extract::{Path, Query, State};
use axum::http::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use archivist_core::commit::{CommitJob, JobStatusView};
use archivist_core::session::{Sector, Standard};
use archivist_core::types::DbId;
use archivist_pipeline::rollback::{self, RollbackOutcome};
use archivist_pipeline::{commit, export};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

type CsvResponse = (StatusCode, [(HeaderName, String); 2], String);

fn csv_download(file_name: &str, body: String) -> CsvResponse {
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        body,
    )
}

/// Queue a commit job for the session and, with inline commits enabled,
/// start it on this runtime. Otherwise the worker picks it up.
pub(crate) async fn queue(state: &AppState, session_id: DbId) -> AppResult<CommitJob> {
    let job = commit::start_commit(&state.ingest, session_id).await?;
    if state.config.inline_commit {
        commit::spawn_job(state.ingest.clone(), job.id);
    }
    Ok(job)
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// A job with its poll view.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    #[serde(flatten)]
    pub job: CommitJob,
    pub progress: JobStatusView,
}

impl From<CommitJob> for JobResponse {
    fn from(job: CommitJob) -> Self {
        let progress = job.view();
        Self { job, progress }
    }
}

/// POST /api/v1/ingest/sessions/{id}/commit
///
/// Returns `202 Accepted` with the queued job; poll `GET /jobs/{id}`.
pub async fn start_commit(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<DataResponse<JobResponse>>)> {
    let job = queue(&state, id).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: job.into() })))
}

/// GET /api/v1/ingest/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<JobResponse>>> {
    let job = commit::job_status(&state.ingest, id).await?;
    Ok(Json(DataResponse { data: job.into() }))
}

// ---------------------------------------------------------------------------
// Rollback
// ---------------------------------------------------------------------------

/// POST /api/v1/ingest/sessions/{id}/rollback
///
/// Delete everything the session's commit created. A partial rollback
/// reports `complete: false` and can be retried.
pub async fn rollback_session(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<RollbackOutcome>>> {
    let outcome = rollback::rollback(&state.ingest, id).await?;
    Ok(Json(DataResponse { data: outcome }))
}

// ---------------------------------------------------------------------------
// Downloads
// ---------------------------------------------------------------------------

/// GET /api/v1/ingest/sessions/{id}/manifest
pub async fn download_manifest(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<CsvResponse> {
    let csv = export::manifest_csv(&state.ingest, id).await?;
    Ok(csv_download(&format!("ingest-{id}-manifest.csv"), csv))
}

#[derive(Debug, Deserialize)]
pub struct TemplateParams {
    pub sector: Sector,
    pub standard: Standard,
}

/// GET /api/v1/ingest/template?sector=&standard=
pub async fn download_template(Query(params): Query<TemplateParams>) -> AppResult<CsvResponse> {
    let csv = export::csv_template(params.sector, params.standard)?;
    Ok(csv_download(
        &format!("ingest-template-{}-{}.csv", params.sector, params.standard),
        csv,
    ))
}

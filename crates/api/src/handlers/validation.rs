//! Handlers for the validate and preview stages.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use archivist_core::row::DataRow;
use archivist_core::types::{DbId, RowNumber};
use archivist_core::validation::ValidationReport;
use archivist_pipeline::preview::{self, Preview};
use archivist_pipeline::validate::{self, IssueReport};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /sessions/{id}/rows/{n}/fix`.
#[derive(Debug, Deserialize, Validate)]
pub struct FixRowRequest {
    #[validate(length(min = 1, max = 128, message = "Field name must not be empty"))]
    pub field: String,
    #[serde(default)]
    pub value: String,
}

/// POST /api/v1/ingest/sessions/{id}/validate
///
/// Run the validator over every included row. Replaces the stored issues.
pub async fn run_validation(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ValidationReport>>> {
    let report = validate::validate(&state.ingest, id).await?;
    Ok(Json(DataResponse { data: report }))
}

/// GET /api/v1/ingest/sessions/{id}/issues
pub async fn list_issues(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<IssueReport>>> {
    let report = validate::issues(&state.ingest, id).await?;
    Ok(Json(DataResponse { data: report }))
}

/// POST /api/v1/ingest/sessions/{id}/rows/{n}/fix
///
/// Overwrite one field of a row. Validation must be run again afterwards.
pub async fn fix_row(
    State(state): State<AppState>,
    Path((id, row)): Path<(DbId, RowNumber)>,
    Json(body): Json<FixRowRequest>,
) -> AppResult<Json<DataResponse<DataRow>>> {
    body.validate()?;
    let fixed = validate::fix_row(&state.ingest, id, row, body.field.trim(), &body.value).await?;
    Ok(Json(DataResponse { data: fixed }))
}

/// POST /api/v1/ingest/sessions/{id}/rows/{n}/exclude
pub async fn exclude_row(
    State(state): State<AppState>,
    Path((id, row)): Path<(DbId, RowNumber)>,
) -> AppResult<Json<DataResponse<DataRow>>> {
    let updated = validate::exclude_row(&state.ingest, id, row).await?;
    Ok(Json(DataResponse { data: updated }))
}

/// POST /api/v1/ingest/sessions/{id}/rows/{n}/include
pub async fn include_row(
    State(state): State<AppState>,
    Path((id, row)): Path<(DbId, RowNumber)>,
) -> AppResult<Json<DataResponse<DataRow>>> {
    let updated = validate::include_row(&state.ingest, id, row).await?;
    Ok(Json(DataResponse { data: updated }))
}

/// GET /api/v1/ingest/sessions/{id}/preview
pub async fn get_preview(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Preview>>> {
    let preview = preview::preview(&state.ingest, id).await?;
    Ok(Json(DataResponse { data: preview }))
}

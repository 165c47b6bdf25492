//! Handlers for the upload stage.

use std::path::PathBuf;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use archivist_core::types::DbId;
use archivist_core::upload::UploadedFile;
use archivist_pipeline::upload;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /sessions/{id}/upload`: a file or directory on the server.
#[derive(Debug, Deserialize, Validate)]
pub struct UploadPathRequest {
    #[validate(length(min = 1, max = 4096, message = "Path must not be empty"))]
    pub path: String,
}

/// POST /api/v1/ingest/sessions/{id}/upload
///
/// Register a CSV, ZIP or EAD file, or a directory, that is already on the
/// server. Replaces any earlier upload and moves the session to `map`.
pub async fn upload_path(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<UploadPathRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UploadedFile>>)> {
    body.validate()?;
    let path = PathBuf::from(body.path.trim());
    let file = upload::upload_path(&state.ingest, id, &path).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: file })))
}

/// POST /api/v1/ingest/sessions/{id}/upload/file
///
/// Multipart variant: the first field carrying a file name is the source.
pub async fn upload_file(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<UploadedFile>>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let file = upload::upload_bytes(&state.ingest, id, &file_name, &data).await?;
        return Ok((StatusCode::CREATED, Json(DataResponse { data: file })));
    }

    Err(AppError::BadRequest(
        "No file received in multipart upload".to_string(),
    ))
}

/// GET /api/v1/ingest/sessions/{id}/files
pub async fn list_files(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<UploadedFile>>>> {
    let files = upload::files(&state.ingest, id).await?;
    Ok(Json(DataResponse { data: files }))
}

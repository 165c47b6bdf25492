//! Handlers for the map stage: column mappings and mapping profiles.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use archivist_core::digital_object::MatchStrategy;
use archivist_core::mapping::{ColumnMapping, MappingEdit, MappingProfile};
use archivist_core::types::DbId;
use archivist_pipeline::mapping;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SaveMappingsRequest {
    pub mappings: Vec<MappingEdit>,
    /// Switch how rows without a `digitalObjectPath` find their file.
    #[serde(default)]
    pub match_strategy: Option<MatchStrategy>,
}

#[derive(Debug, Deserialize)]
pub struct LoadProfileRequest {
    pub profile_id: DbId,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SaveProfileRequest {
    #[validate(length(min = 1, max = 255, message = "Profile name must be between 1 and 255 characters"))]
    pub name: String,
    #[serde(default)]
    pub created_by: Option<DbId>,
}

#[derive(Debug, Serialize)]
pub struct LoadedProfile {
    pub mappings: Vec<ColumnMapping>,
    /// Columns the profile set.
    pub applied: usize,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/ingest/sessions/{id}/mappings
///
/// Auto-maps the upload's columns the first time it is called.
pub async fn get_mappings(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ColumnMapping>>>> {
    let mappings = mapping::mappings(&state.ingest, id).await?;
    Ok(Json(DataResponse { data: mappings }))
}

/// PUT /api/v1/ingest/sessions/{id}/mappings
pub async fn save_mappings(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<SaveMappingsRequest>,
) -> AppResult<Json<DataResponse<Vec<ColumnMapping>>>> {
    let mappings =
        mapping::save_mappings(&state.ingest, id, &body.mappings, body.match_strategy).await?;
    Ok(Json(DataResponse { data: mappings }))
}

/// POST /api/v1/ingest/sessions/{id}/mappings/profile
pub async fn load_profile(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<LoadProfileRequest>,
) -> AppResult<Json<DataResponse<LoadedProfile>>> {
    let (mappings, applied) = mapping::load_profile(&state.ingest, id, body.profile_id).await?;
    Ok(Json(DataResponse {
        data: LoadedProfile { mappings, applied },
    }))
}

/// POST /api/v1/ingest/sessions/{id}/profiles
///
/// Save the session's active mappings under a unique name.
pub async fn save_profile(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<SaveProfileRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<MappingProfile>>)> {
    body.validate()?;
    let profile = mapping::save_profile(&state.ingest, id, &body.name, body.created_by).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: profile })))
}

/// GET /api/v1/ingest/profiles
pub async fn list_profiles(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<MappingProfile>>>> {
    let profiles = mapping::list_profiles(&state.ingest).await?;
    Ok(Json(DataResponse { data: profiles }))
}

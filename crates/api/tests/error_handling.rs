//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server needed.

use archivist_api::error::AppError;
use archivist_core::error::CoreError;
use archivist_pipeline::store::StoreError;
use archivist_pipeline::PipelineError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Domain errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "ingest_session",
        id: 42,
    });
    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "ingest_session with id 42 not found");
}

#[tokio::test]
async fn invalid_transition_returns_409() {
    let err = AppError::Core(CoreError::transition("configure", "preview"));
    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "INVALID_TRANSITION");
    assert_eq!(json["error"], "Invalid transition from 'configure' to 'preview'");
}

#[tokio::test]
async fn blocked_and_incomplete_return_422() {
    let (status, json) =
        error_to_response(AppError::Core(CoreError::ValidationBlocked("1 row(s) have errors".into()))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "VALIDATION_BLOCKED");

    let (status, json) = error_to_response(AppError::Core(CoreError::MappingIncomplete(vec![
        "Box label".into(),
        "Shelf".into(),
    ])))
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "Unmapped columns: Box label, Shelf");
}

#[tokio::test]
async fn already_rolled_back_returns_409() {
    let (status, json) = error_to_response(AppError::Core(CoreError::AlreadyRolledBack(7))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "ALREADY_ROLLED_BACK");
}

#[tokio::test]
async fn internal_error_is_sanitized() {
    let (status, json) =
        error_to_response(AppError::Core(CoreError::Internal("connection string leaked".into()))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Pipeline errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_conflict_becomes_409() {
    let err: AppError = PipelineError::Store(StoreError::Conflict("Profile name taken".into())).into();
    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "Profile name taken");
}

#[tokio::test]
async fn io_failure_becomes_500() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "/srv/ingest");
    let err: AppError = PipelineError::Io(io).into();
    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");
}

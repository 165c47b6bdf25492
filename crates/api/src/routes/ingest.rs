//! Route definitions for the `/ingest` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{commit, mapping, records, sessions, upload, validation};
use crate::state::AppState;

/// Routes mounted at `/ingest`.
///
/// ```text
/// GET    /sessions                          -> list_sessions    (?created_by)
/// POST   /sessions                          -> create_session
/// GET    /sessions/{id}                     -> get_session
/// PUT    /sessions/{id}                     -> update_session
/// POST   /sessions/{id}/advance             -> advance_session
/// POST   /sessions/{id}/cancel              -> cancel_session
/// POST   /sessions/{id}/upload              -> upload_path      (server path)
/// POST   /sessions/{id}/upload/file         -> upload_file      (multipart)
/// GET    /sessions/{id}/files               -> list_files
/// GET    /sessions/{id}/mappings            -> get_mappings
/// PUT    /sessions/{id}/mappings            -> save_mappings
/// POST   /sessions/{id}/mappings/profile    -> load_profile
/// POST   /sessions/{id}/profiles            -> save_profile
/// GET    /profiles                          -> list_profiles
/// POST   /sessions/{id}/validate            -> run_validation
/// GET    /sessions/{id}/issues              -> list_issues
/// POST   /sessions/{id}/rows/{n}/fix        -> fix_row
/// POST   /sessions/{id}/rows/{n}/exclude    -> exclude_row
/// POST   /sessions/{id}/rows/{n}/include    -> include_row
/// GET    /sessions/{id}/preview             -> get_preview
/// POST   /sessions/{id}/commit              -> start_commit     (202)
/// GET    /jobs/{id}                         -> get_job
/// GET    /sessions/{id}/manifest            -> download_manifest (CSV)
/// POST   /sessions/{id}/rollback            -> rollback_session
/// GET    /template                          -> download_template (CSV)
/// GET    /records/search                    -> search_records   (?q)
/// ```
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route(
            "/sessions/{id}",
            get(sessions::get_session).put(sessions::update_session),
        )
        .route("/sessions/{id}/advance", post(sessions::advance_session))
        .route("/sessions/{id}/cancel", post(sessions::cancel_session))
        .route("/sessions/{id}/upload", post(upload::upload_path))
        .route(
            "/sessions/{id}/upload/file",
            post(upload::upload_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/sessions/{id}/files", get(upload::list_files))
        .route(
            "/sessions/{id}/mappings",
            get(mapping::get_mappings).put(mapping::save_mappings),
        )
        .route("/sessions/{id}/mappings/profile", post(mapping::load_profile))
        .route("/sessions/{id}/profiles", post(mapping::save_profile))
        .route("/profiles", get(mapping::list_profiles))
        .route("/sessions/{id}/validate", post(validation::run_validation))
        .route("/sessions/{id}/issues", get(validation::list_issues))
        .route("/sessions/{id}/rows/{row}/fix", post(validation::fix_row))
        .route("/sessions/{id}/rows/{row}/exclude", post(validation::exclude_row))
        .route("/sessions/{id}/rows/{row}/include", post(validation::include_row))
        .route("/sessions/{id}/preview", get(validation::get_preview))
        .route("/sessions/{id}/commit", post(commit::start_commit))
        .route("/jobs/{id}", get(commit::get_job))
        .route("/sessions/{id}/manifest", get(commit::download_manifest))
        .route("/sessions/{id}/rollback", post(commit::rollback_session))
        .route("/template", get(commit::download_template))
        .route("/records/search", get(records::search_records))
}

pub mod health;
pub mod ingest;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ingest/...        ingest wizard (see [`ingest::router`])
/// ```
pub fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new().nest("/ingest", ingest::router(max_upload_bytes))
}

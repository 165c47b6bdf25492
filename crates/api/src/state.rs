use std::sync::Arc;

use archivist_db::DbPool;
use archivist_pipeline::IngestContext;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything inside is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Store and collaborators of the ingest pipeline.
    pub ingest: IngestContext,
    /// Database pool, when the pipeline is backed by PostgreSQL.
    pub pool: Option<DbPool>,
    pub config: Arc<ServerConfig>,
}

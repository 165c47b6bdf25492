use archivist_pipeline::PipelineSettings;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Run commit jobs on the API's runtime instead of leaving them to the
    /// worker (default: `true`).
    pub inline_commit: bool,
    /// Staging, storage and package locations of the pipeline.
    pub ingest: PipelineSettings,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `INGEST_INLINE_COMMIT` | `true`                     |
    ///
    /// The `INGEST_*` directories and upload limit are read by
    /// [`PipelineSettings::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let inline_commit: bool = std::env::var("INGEST_INLINE_COMMIT")
            .unwrap_or_else(|_| "true".into())
            .parse()
            .expect("INGEST_INLINE_COMMIT must be true or false");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            inline_commit,
            ingest: PipelineSettings::from_env(),
        }
    }
}

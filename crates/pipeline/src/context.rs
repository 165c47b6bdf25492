use std::path::PathBuf;
use std::sync::Arc;

use archivist_core::error::CoreError;
use archivist_core::session::IngestSession;
use archivist_core::types::DbId;
use archivist_db::DbPool;

use crate::collaborators::{ContentProcessor, DigitalObjectStore, PackageGenerator, RecordStore};
use crate::error::PipelineResult;
use crate::local::{
    FsObjectStore, FsPackageGenerator, MemoryObjectStore, MemoryRecordStore, PgRecordStore,
    TracingProcessor,
};
use crate::store::{IngestStore, MemoryStore, PgIngestStore};

const DEFAULT_MAX_UPLOAD_BYTES: u64 = 512 * 1024 * 1024;

/// File-system locations and limits of the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Staging root; each session stages under `session-{id}`.
    pub upload_dir: PathBuf,
    /// Where stored digital objects are copied.
    pub storage_dir: PathBuf,
    /// Where SIP/AIP/DIP packages are written.
    pub package_dir: PathBuf,
    /// Upper bound for a single uploaded file.
    pub max_upload_bytes: u64,
}

impl PipelineSettings {
    /// All three directories under one root.
    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            upload_dir: root.join("uploads"),
            storage_dir: root.join("storage"),
            package_dir: root.join("packages"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Load settings from environment variables with defaults.
    ///
    /// | Env Var                   | Default                   |
    /// |---------------------------|---------------------------|
    /// | `INGEST_UPLOAD_DIR`       | `/tmp/archivist/ingest`   |
    /// | `INGEST_STORAGE_DIR`      | `/tmp/archivist/storage`  |
    /// | `INGEST_PACKAGE_DIR`      | `/tmp/archivist/packages` |
    /// | `INGEST_MAX_UPLOAD_BYTES` | `536870912`               |
    pub fn from_env() -> Self {
        let dir = |var: &str, default: &str| {
            PathBuf::from(std::env::var(var).unwrap_or_else(|_| default.into()))
        };

        let max_upload_bytes: u64 = std::env::var("INGEST_MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_BYTES.to_string())
            .parse()
            .expect("INGEST_MAX_UPLOAD_BYTES must be a valid u64");

        Self {
            upload_dir: dir("INGEST_UPLOAD_DIR", "/tmp/archivist/ingest"),
            storage_dir: dir("INGEST_STORAGE_DIR", "/tmp/archivist/storage"),
            package_dir: dir("INGEST_PACKAGE_DIR", "/tmp/archivist/packages"),
            max_upload_bytes,
        }
    }

    pub fn staging_dir(&self, session_id: DbId) -> PathBuf {
        self.upload_dir.join(format!("session-{session_id}"))
    }
}

/// Everything a pipeline operation needs. Cheap to clone.
#[derive(Clone)]
pub struct IngestContext {
    pub store: Arc<dyn IngestStore>,
    pub records: Arc<dyn RecordStore>,
    pub objects: Arc<dyn DigitalObjectStore>,
    pub packages: Arc<dyn PackageGenerator>,
    pub processors: Arc<dyn ContentProcessor>,
    pub settings: Arc<PipelineSettings>,
}

impl IngestContext {
    /// PostgreSQL-backed store and collaborators.
    pub fn postgres(pool: DbPool, settings: PipelineSettings) -> Self {
        Self {
            store: Arc::new(PgIngestStore::new(pool.clone())),
            records: Arc::new(PgRecordStore::new(pool.clone())),
            objects: Arc::new(FsObjectStore::new(pool, settings.storage_dir.clone())),
            packages: Arc::new(FsPackageGenerator::new(settings.package_dir.clone())),
            processors: Arc::new(TracingProcessor),
            settings: Arc::new(settings),
        }
    }

    /// Everything in process; packages still go to `package_dir`.
    pub fn in_memory(settings: PipelineSettings) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            records: Arc::new(MemoryRecordStore::new()),
            objects: Arc::new(MemoryObjectStore::new()),
            packages: Arc::new(FsPackageGenerator::new(settings.package_dir.clone())),
            processors: Arc::new(TracingProcessor),
            settings: Arc::new(settings),
        }
    }

    /// Load a session or fail with `NotFound`.
    pub async fn session(&self, id: DbId) -> PipelineResult<IngestSession> {
        self.store
            .get_session(id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "ingest_session",
                    id,
                }
                .into()
            })
    }
}

//! Shared fixtures for the pipeline integration tests.
//!
//! Every test gets its own temp directory and an all-in-memory context;
//! the record and object fakes are kept so tests can inject failures and
//! inspect what a commit created.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use archivist_core::session::{IngestSession, Sector, SessionConfig, Stage, Standard};
use archivist_core::types::DbId;
use archivist_pipeline::local::{FsPackageGenerator, MemoryObjectStore, MemoryRecordStore, TracingProcessor};
use archivist_pipeline::store::MemoryStore;
use archivist_pipeline::{session, upload, IngestContext, PipelineSettings};
use tempfile::TempDir;

/// Three rows; the second has no title.
pub const THREE_ROWS_ONE_UNTITLED: &str = "\
legacyId,identifier,title,levelOfDescription
A1,REF-1,Minutes 1901,Item
A2,REF-2,,Item
A3,REF-3,Ledger,File
";

/// Three complete rows.
pub const THREE_GOOD_ROWS: &str = "\
legacyId,identifier,title,levelOfDescription
A1,REF-1,Minutes 1901,Item
A2,REF-2,Letter book,Item
A3,REF-3,Ledger,File
";

pub struct Harness {
    pub ctx: IngestContext,
    pub records: Arc<MemoryRecordStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let settings = PipelineSettings::under(dir.path().join("work"));
        let records = Arc::new(MemoryRecordStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let ctx = IngestContext {
            store: Arc::new(MemoryStore::new()),
            records: records.clone(),
            objects: objects.clone(),
            packages: Arc::new(FsPackageGenerator::new(settings.package_dir.clone())),
            processors: Arc::new(TracingProcessor),
            settings: Arc::new(settings),
        };
        Self {
            ctx,
            records,
            objects,
            dir,
        }
    }

    /// Write a file into the harness' temp directory.
    pub fn write(&self, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    /// A configured session moved to the upload stage.
    pub async fn session_at_upload(&self, config: SessionConfig) -> IngestSession {
        let created = session::configure(&self.ctx, config, Some(7)).await.unwrap();
        session::advance(&self.ctx, created.id, Stage::Upload).await.unwrap()
    }

    /// A session with `source` uploaded and mapped, sitting in `validate`.
    pub async fn session_at_validate(&self, config: SessionConfig, source: &Path) -> DbId {
        let created = self.session_at_upload(config).await;
        upload::upload_path(&self.ctx, created.id, source).await.unwrap();
        session::advance(&self.ctx, created.id, Stage::Validate).await.unwrap();
        created.id
    }

    /// Upload a CSV body and advance to `validate`.
    pub async fn csv_session(&self, config: SessionConfig, csv: &str) -> DbId {
        let path = self.write("batch.csv", csv);
        self.session_at_validate(config, &path).await
    }

    pub async fn stage(&self, session_id: DbId) -> Stage {
        session::get(&self.ctx, session_id).await.unwrap().stage
    }
}

pub fn archive_config() -> SessionConfig {
    SessionConfig::new("Harbour board minutes", Sector::Archive, Standard::Isadg)
}

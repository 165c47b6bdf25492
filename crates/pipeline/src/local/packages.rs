//! Package generator writing one JSON package description per request.

use std::path::PathBuf;

use archivist_core::commit::PackageKind;
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::collaborators::{CollaboratorError, PackageGenerator, PackageRequest};

#[derive(Debug, Clone)]
pub struct FsPackageGenerator {
    package_dir: PathBuf,
}

impl FsPackageGenerator {
    pub fn new(package_dir: impl Into<PathBuf>) -> Self {
        Self {
            package_dir: package_dir.into(),
        }
    }
}

#[derive(Serialize)]
struct PackageDocument<'a> {
    package_id: &'a str,
    kind: PackageKind,
    session_id: i64,
    job_id: i64,
    title: &'a str,
    standard: &'a str,
    records: Vec<i64>,
    digital_objects: Vec<i64>,
}

#[async_trait]
impl PackageGenerator for FsPackageGenerator {
    async fn generate(
        &self,
        kind: PackageKind,
        request: &PackageRequest,
    ) -> Result<String, CollaboratorError> {
        let package_id = format!("{}-{}", kind.as_str(), Uuid::now_v7());
        let live = request.entries.iter().filter(|e| e.is_live());
        let (records, objects): (Vec<_>, Vec<_>) = live.partition(|e| e.kind.is_record());

        let document = PackageDocument {
            package_id: &package_id,
            kind,
            session_id: request.session.id,
            job_id: request.job_id,
            title: &request.session.config.title,
            standard: request.session.config.standard.as_str(),
            records: records.iter().map(|e| e.target_id).collect(),
            digital_objects: objects.iter().map(|e| e.target_id).collect(),
        };
        let body = serde_json::to_vec_pretty(&document)
            .map_err(|e| CollaboratorError::Rejected(format!("Unencodable package: {e}")))?;

        tokio::fs::create_dir_all(&self.package_dir).await?;
        tokio::fs::write(self.package_dir.join(format!("{package_id}.json")), body).await?;
        Ok(package_id)
    }
}

//! Digital-object store: copies payload files into the storage root and
//! registers them in `digital_objects`.

use std::io::ErrorKind;
use std::path::PathBuf;

use archivist_core::types::DbId;
use archivist_db::models::record::CreateDigitalObject;
use archivist_db::repositories::DigitalObjectRepo;
use archivist_db::DbPool;
use async_trait::async_trait;

use crate::collaborators::{CollaboratorError, DeleteOutcome, DigitalObjectStore, NewDigitalObject};

#[derive(Clone)]
pub struct FsObjectStore {
    pool: DbPool,
    storage_dir: PathBuf,
}

impl FsObjectStore {
    pub fn new(pool: DbPool, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            storage_dir: storage_dir.into(),
        }
    }
}

#[async_trait]
impl DigitalObjectStore for FsObjectStore {
    async fn attach(&self, object: NewDigitalObject<'_>) -> Result<DbId, CollaboratorError> {
        let dir = self.storage_dir.join(format!("record-{}", object.record_id));
        tokio::fs::create_dir_all(&dir).await?;
        let target = dir.join(&object.file.file_name);
        tokio::fs::copy(object.source, &target).await?;

        let derivatives = serde_json::to_value(object.derivatives)
            .map_err(|e| CollaboratorError::Rejected(format!("Unencodable derivative options: {e}")))?;
        let input = CreateDigitalObject {
            record_id: object.record_id,
            file_name: object.file.file_name.clone(),
            stored_path: target.to_string_lossy().into_owned(),
            checksum: object.file.checksum.clone(),
            size_bytes: i64::try_from(object.file.size_bytes).unwrap_or(i64::MAX),
            derivatives,
        };
        let created = DigitalObjectRepo::create(&self.pool, &input).await?;
        tracing::debug!(
            digital_object_id = created.id,
            record_id = object.record_id,
            path = %created.stored_path,
            "Digital object stored",
        );
        Ok(created.id)
    }

    async fn delete_object(&self, id: DbId) -> Result<DeleteOutcome, CollaboratorError> {
        let Some(deleted) = DigitalObjectRepo::delete(&self.pool, id).await? else {
            return Ok(DeleteOutcome::NotFound);
        };
        match tokio::fs::remove_file(&deleted.stored_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    digital_object_id = id,
                    path = %deleted.stored_path,
                    error = %e,
                    "Stored file could not be removed",
                );
            }
        }
        Ok(DeleteOutcome::Deleted)
    }
}

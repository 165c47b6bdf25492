//! Record store backed by the `archival_records` table.

use archivist_core::types::DbId;
use archivist_db::models::record::CreateArchivalRecord;
use archivist_db::repositories::RecordRepo;
use archivist_db::DbPool;
use async_trait::async_trait;

use crate::collaborators::{CollaboratorError, DeleteOutcome, NewRecord, RecordStore, RecordSummary};

/// Slug stem for a title: lower-case ASCII alphanumerics joined by `-`.
pub fn slug_base(title: &str) -> String {
    let slug = title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

#[derive(Clone)]
pub struct PgRecordStore {
    pool: DbPool,
}

impl PgRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn create_record(&self, record: &NewRecord) -> Result<DbId, CollaboratorError> {
        let fields = serde_json::to_value(&record.fields)
            .map_err(|e| CollaboratorError::Rejected(format!("Unencodable fields: {e}")))?;
        let input = CreateArchivalRecord {
            parent_id: record.parent_id,
            repository_id: record.repository_id,
            legacy_id: record.legacy_id.clone(),
            identifier: record.identifier.clone(),
            slug_base: slug_base(&record.title),
            title: record.title.clone(),
            level_of_description: record.level_of_description.clone(),
            culture: record.culture.clone(),
            publication_status: record.publication_status.clone(),
            security_classification_id: record.security_classification_id,
            fields,
            source_session_id: Some(record.session_id),
        };
        let created = RecordRepo::create(&self.pool, &input).await?;
        Ok(created.id)
    }

    async fn record_exists(&self, id: DbId) -> Result<bool, CollaboratorError> {
        Ok(RecordRepo::find_by_id(&self.pool, id).await?.is_some())
    }

    async fn find_reference(&self, reference: &str) -> Result<Option<DbId>, CollaboratorError> {
        let found = RecordRepo::find_by_reference(&self.pool, reference).await?;
        Ok(found.map(|r| r.id))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RecordSummary>, CollaboratorError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let found = RecordRepo::search_by_title(&self.pool, query, limit).await?;
        Ok(found
            .into_iter()
            .map(|r| RecordSummary {
                id: r.id,
                title: r.title,
                slug: r.slug,
                identifier: r.identifier,
            })
            .collect())
    }

    async fn delete_record(&self, id: DbId) -> Result<DeleteOutcome, CollaboratorError> {
        if RecordRepo::delete(&self.pool, id).await? {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_from_titles() {
        assert_eq!(slug_base("Harbour Board: Minutes (1901)"), "harbour-board-minutes-1901");
        assert_eq!(slug_base("  "), "untitled");
        assert_eq!(slug_base("Café"), "caf");
    }
}

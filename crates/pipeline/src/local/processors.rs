use archivist_core::session::ProcessingFlags;
use archivist_core::types::DbId;
use async_trait::async_trait;

use crate::collaborators::{CollaboratorError, ContentProcessor};

/// Records each processor request in the trace log. Deployments with real
/// OCR, NER or scanning services plug in their own [`ContentProcessor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProcessor;

#[async_trait]
impl ContentProcessor for TracingProcessor {
    async fn process(
        &self,
        processor: &str,
        digital_object_id: DbId,
        flags: &ProcessingFlags,
    ) -> Result<(), CollaboratorError> {
        tracing::info!(
            processor,
            digital_object_id,
            translate_language = flags.translate_language.as_deref(),
            "Content processor requested",
        );
        Ok(())
    }
}

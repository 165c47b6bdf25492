//! CSV downloads: the per-session manifest and blank import templates.

use std::collections::HashMap;

use archivist_core::commit::{ManifestKind, MANIFEST_CSV_COLUMNS};
use archivist_core::error::CoreError;
use archivist_core::fields::template_columns;
use archivist_core::session::{Sector, Standard};
use archivist_core::types::{DbId, RowNumber};

use crate::context::IngestContext;
use crate::error::{PipelineError, PipelineResult};

fn finish(writer: csv::Writer<Vec<u8>>) -> PipelineResult<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| CoreError::Internal(format!("CSV is not UTF-8: {e}")).into())
}

/// One line per source row with the ids a commit created for it.
pub async fn manifest_csv(ctx: &IngestContext, session_id: DbId) -> PipelineResult<String> {
    ctx.session(session_id).await?;
    let rows = ctx.store.list_rows(session_id).await?;
    let entries = ctx.store.list_manifest(session_id).await?;

    let mut records: HashMap<RowNumber, DbId> = HashMap::new();
    let mut objects: HashMap<RowNumber, DbId> = HashMap::new();
    for entry in entries.iter().filter(|e| e.is_live()) {
        let Some(row) = entry.row_number else {
            continue;
        };
        match entry.kind {
            ManifestKind::Record => records.insert(row, entry.target_id),
            ManifestKind::DigitalObject => objects.insert(row, entry.target_id),
            ManifestKind::Parent => None,
        };
    }

    let id = |map: &HashMap<RowNumber, DbId>, row: RowNumber| {
        map.get(&row).map(|id| id.to_string()).unwrap_or_default()
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(MANIFEST_CSV_COLUMNS)?;
    for row in &rows {
        writer.write_record([
            row.row_number.to_string(),
            row.legacy_id().unwrap_or_default().to_string(),
            row.title().unwrap_or_default().to_string(),
            row.level_of_description().unwrap_or_default().to_string(),
            id(&records, row.row_number),
            id(&objects, row.row_number),
            row.is_excluded.to_string(),
            row.is_valid.to_string(),
        ])?;
    }
    finish(writer)
}

/// Header of sector fields then standard fields, plus one empty row.
pub fn csv_template(sector: Sector, standard: Standard) -> PipelineResult<String> {
    if !standard.supports(sector) {
        return Err(CoreError::Validation(format!(
            "Standard '{}' is not applicable to the '{sector}' sector",
            standard.label()
        ))
        .into());
    }
    let columns = template_columns(sector, standard);
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns)?;
    writer.write_record(columns.iter().map(|_| ""))?;
    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_has_header_and_blank_row() {
        let csv = csv_template(Sector::Archive, Standard::Isadg).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].split(',').any(|c| c == "title"));
        assert!(lines[1].chars().all(|c| c == ','));
    }

    #[test]
    fn template_rejects_incompatible_pair() {
        assert!(csv_template(Sector::Museum, Standard::Rad).is_err());
    }
}

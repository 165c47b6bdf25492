//! Reading uploaded sources: CSV parsing, ZIP extraction and payload scans.
//!
//! Everything here is blocking; async callers go through
//! `tokio::task::spawn_blocking`.

use std::fs::File;
use std::path::{Path, PathBuf};

use archivist_core::digital_object::{is_ignored_file, sha256_hex, PayloadFile};
use archivist_core::row::{DataRow, FieldMap};
use archivist_core::types::RowNumber;
use archivist_core::upload::{
    decode_text, detect_delimiter, title_from_file_name, TextEncoding, PAYLOAD_COLUMNS,
};

use crate::error::PipelineResult;

/// Directory entries never treated as payload.
const IGNORED_DIRS: &[&str] = &["__MACOSX"];

/// A parsed metadata table.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSource {
    pub headers: Vec<String>,
    pub rows: Vec<DataRow>,
    /// `None` for rows synthesised from a payload.
    pub delimiter: Option<u8>,
    pub encoding: Option<TextEncoding>,
}

/// Parse CSV bytes. Encoding and delimiter are sniffed; blank records are
/// skipped and the remaining rows numbered from 1.
pub fn parse_csv(bytes: &[u8]) -> PipelineResult<ParsedSource> {
    let (text, encoding) = decode_text(bytes);
    let header_line = text.lines().next().unwrap_or_default();
    let delimiter = detect_delimiter(header_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| match h.trim() {
            "" => format!("column_{}", i + 1),
            name => name.to_string(),
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        let raw: FieldMap = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(DataRow::new(rows.len() as RowNumber + 1, raw));
    }

    Ok(ParsedSource {
        headers,
        rows,
        delimiter: Some(delimiter),
        encoding: Some(encoding),
    })
}

/// One row per payload file: a title derived from the file name and the
/// file's relative path.
pub fn synthesize_rows(files: &[PayloadFile]) -> ParsedSource {
    let rows = files
        .iter()
        .enumerate()
        .map(|(i, file)| {
            let mut raw = FieldMap::new();
            raw.insert(PAYLOAD_COLUMNS[0].to_string(), title_from_file_name(&file.file_name));
            raw.insert(PAYLOAD_COLUMNS[1].to_string(), file.relative_path.clone());
            DataRow::new(i as RowNumber + 1, raw)
        })
        .collect();
    ParsedSource {
        headers: PAYLOAD_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
        delimiter: None,
        encoding: None,
    }
}

/// Extract a ZIP archive into `dest`.
pub fn extract_zip(archive: &Path, dest: &Path) -> PipelineResult<()> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    std::fs::create_dir_all(dest)?;
    zip.extract(dest)?;
    Ok(())
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// All regular files under `root`, sorted, skipping ignored names.
fn walk(root: &Path) -> PipelineResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                if !IGNORED_DIRS.contains(&name.as_str()) && !name.starts_with('.') {
                    pending.push(entry.path());
                }
            } else if file_type.is_file() && !is_ignored_file(&name) {
                found.push(entry.path());
            }
        }
    }
    found.sort();
    Ok(found)
}

/// The metadata CSV of a payload: the first `.csv` in path order.
pub fn find_metadata_csv(root: &Path) -> PipelineResult<Option<PathBuf>> {
    Ok(walk(root)?.into_iter().find(|p| is_csv(p)))
}

/// Every non-CSV file under `root`, with its SHA-256.
pub fn scan_payload(root: &Path) -> PipelineResult<Vec<PayloadFile>> {
    let mut files = Vec::new();
    for path in walk(root)? {
        if is_csv(&path) {
            continue;
        }
        let content = std::fs::read(&path)?;
        let relative = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(PayloadFile {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| relative.clone()),
            relative_path: relative,
            size_bytes: content.len() as u64,
            checksum: Some(sha256_hex(&content)),
        });
    }
    Ok(files)
}

/// Metadata and payload of an extracted ZIP or a server-side directory.
/// Without a metadata CSV, one row is synthesised per payload file.
pub fn read_payload_root(root: &Path) -> PipelineResult<(ParsedSource, Vec<PayloadFile>)> {
    let payload = scan_payload(root)?;
    let parsed = match find_metadata_csv(root)? {
        Some(csv) => parse_csv(&std::fs::read(csv)?)?,
        None => synthesize_rows(&payload),
    };
    Ok((parsed, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn semicolon_latin1_csv() {
        let bytes = b"legacyId;Title\nA1;Caf\xe9 minutes\n;\nA2;Ledger\n";
        let parsed = parse_csv(bytes).unwrap();
        assert_eq!(parsed.headers, vec!["legacyId", "Title"]);
        assert_eq!(parsed.delimiter, Some(b';'));
        assert_eq!(parsed.encoding, Some(TextEncoding::Latin1));
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].raw["Title"], "Café minutes");
        assert_eq!(parsed.rows[1].row_number, 2);
        assert_eq!(parsed.rows[1].raw["legacyId"], "A2");
    }

    #[test]
    fn short_records_leave_trailing_columns_absent() {
        let parsed = parse_csv(b"a,b,c\n1,2\n").unwrap();
        assert_eq!(parsed.rows[0].raw.len(), 2);
        assert!(!parsed.rows[0].raw.contains_key("c"));
    }

    #[test]
    fn blank_headers_get_positional_names() {
        let parsed = parse_csv(b"title,,notes\nx,y,z\n").unwrap();
        assert_eq!(parsed.headers[1], "column_2");
    }

    #[test]
    fn payload_scan_skips_csv_and_system_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("scans/__MACOSX")).unwrap();
        std::fs::write(dir.path().join("metadata.csv"), "title\nA\n").unwrap();
        std::fs::write(dir.path().join(".DS_Store"), "x").unwrap();
        std::fs::write(dir.path().join("scans/__MACOSX/junk.jpg"), "x").unwrap();
        std::fs::write(dir.path().join("scans/letter_001.tif"), "tiff").unwrap();

        let files = scan_payload(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path, "scans/letter_001.tif");
        assert_eq!(files[0].checksum.as_deref(), Some(sha256_hex(b"tiff").as_str()));
        assert_eq!(
            find_metadata_csv(dir.path()).unwrap(),
            Some(dir.path().join("metadata.csv"))
        );
    }

    #[test]
    fn payload_without_csv_synthesises_rows() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("harbour_view-1901.jpg"), "jpg").unwrap();
        let (parsed, payload) = read_payload_root(dir.path()).unwrap();
        assert_eq!(payload.len(), 1);
        assert_eq!(parsed.headers, vec!["title", "digitalObjectPath"]);
        assert_eq!(parsed.rows[0].raw["title"], "harbour view 1901");
        assert_eq!(parsed.rows[0].raw["digitalObjectPath"], "harbour_view-1901.jpg");
    }

    #[test]
    fn zip_is_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("batch.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("batch/metadata.csv", options).unwrap();
            zip.write_all(b"title,digitalObjectPath\nLetter,letter.tif\n").unwrap();
            zip.start_file("batch/letter.tif", options).unwrap();
            zip.write_all(b"tiff").unwrap();
            zip.finish().unwrap();
        }
        let dest = dir.path().join("extracted");
        extract_zip(&archive, &dest).unwrap();
        let (parsed, payload) = read_payload_root(&dest).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(payload[0].relative_path, "batch/letter.tif");
    }
}

//! Source file classification and CSV sniffing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::digital_object::file_stem;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Delimiters considered by [`detect_delimiter`], in tie-break order.
pub const CANDIDATE_DELIMITERS: &[u8] = b",;\t|";

/// Columns of the rows synthesised for a payload without a metadata CSV.
pub const PAYLOAD_COLUMNS: &[&str] = &["title", "digitalObjectPath"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Csv,
    /// CSV plus digital-object payload.
    Zip,
    /// EAD XML finding aid; registered, not parsed into rows.
    Ead,
    /// Server-side directory; treated like an extracted ZIP.
    Directory,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Zip => "zip",
            Self::Ead => "ead",
            Self::Directory => "directory",
        }
    }

    /// Whether the upload carries files that rows can be matched against.
    pub fn has_payload(&self) -> bool {
        matches!(self, Self::Zip | Self::Directory)
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Self::Csv),
            "zip" => Ok(Self::Zip),
            "ead" => Ok(Self::Ead),
            "directory" => Ok(Self::Directory),
            other => Err(CoreError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Classify an uploaded file by its extension.
pub fn detect_format(file_name: &str) -> Result<SourceFormat, CoreError> {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => Ok(SourceFormat::Csv),
        "zip" => Ok(SourceFormat::Zip),
        "xml" | "ead" => Ok(SourceFormat::Ead),
        "" => Err(CoreError::UnsupportedFormat(format!(
            "'{file_name}' has no file extension"
        ))),
        other => Err(CoreError::UnsupportedFormat(format!(".{other}"))),
    }
}

/// Pick the candidate delimiter occurring most often in the header line.
/// Falls back to `,` when none occurs.
pub fn detect_delimiter(header_line: &str) -> u8 {
    let mut best = b',';
    let mut best_count = 0;
    for &d in CANDIDATE_DELIMITERS {
        let count = header_line.bytes().filter(|b| *b == d).count();
        if count > best_count {
            best = d;
            best_count = count;
        }
    }
    best
}

/// Character encodings recognised in source CSVs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "UTF-8")]
    Utf8,
    #[serde(rename = "ISO-8859-1")]
    Latin1,
}

impl TextEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Latin1 => "ISO-8859-1",
        }
    }
}

impl FromStr for TextEncoding {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UTF-8" => Ok(Self::Utf8),
            "ISO-8859-1" => Ok(Self::Latin1),
            other => Err(CoreError::Validation(format!("Unknown encoding '{other}'"))),
        }
    }
}

/// Decode CSV bytes as UTF-8 (stripping a BOM), falling back to Latin-1.
pub fn decode_text(bytes: &[u8]) -> (String, TextEncoding) {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), TextEncoding::Utf8),
        Err(_) => (
            bytes.iter().map(|&b| char::from(b)).collect(),
            TextEncoding::Latin1,
        ),
    }
}

/// Readable title for a payload file: stem with separators turned to spaces.
pub fn title_from_file_name(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(pos) if pos > 0 => &file_name[..pos],
        _ => file_name,
    };
    let spaced: String = stem
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();
    let title = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        file_stem(file_name)
    } else {
        title
    }
}

/// A registered upload. A session keeps only its latest upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: DbId,
    pub session_id: DbId,
    pub file_type: SourceFormat,
    pub original_name: String,
    pub stored_path: String,
    /// Root of the digital-object payload for ZIP and directory uploads.
    pub extracted_path: Option<String>,
    pub file_size: i64,
    pub delimiter: Option<String>,
    pub encoding: Option<TextEncoding>,
    pub headers: Vec<String>,
    pub row_count: i32,
    pub created_at: Timestamp,
}

//! Digital-object payload indexing and row-to-file matching.
//!
//! A ZIP or directory upload carries a payload of files next to (or instead
//! of) the metadata CSV. Rows are associated with payload files by a
//! per-session [`MatchStrategy`], resolved lazily (preview, validation and
//! commit all call [`FileIndex::resolve`] against the current row data).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// File names skipped when scanning a payload.
const IGNORED_FILE_NAMES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

// ── Match strategy ───────────────────────────────────────────────────

/// How rows without an explicit `digitalObjectPath` find their file.
///
/// A row that declares a path is always matched by that path's file name;
/// the strategy only applies to rows that leave the path empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    #[default]
    Filename,
    #[serde(alias = "legacyId")]
    LegacyId,
    Title,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filename => "filename",
            Self::LegacyId => "legacy_id",
            Self::Title => "title",
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filename" => Ok(Self::Filename),
            "legacy_id" | "legacyId" => Ok(Self::LegacyId),
            "title" => Ok(Self::Title),
            other => Err(CoreError::Validation(format!(
                "Unknown digital object match strategy '{other}'"
            ))),
        }
    }
}

// ── Payload ──────────────────────────────────────────────────────────

/// One file found in an upload payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadFile {
    /// Path relative to the payload root, `/`-separated.
    pub relative_path: String,
    pub file_name: String,
    pub size_bytes: u64,
    /// Hex SHA-256 of the content, when it has been computed.
    pub checksum: Option<String>,
}

/// Whether a scanned file should be left out of the payload.
pub fn is_ignored_file(file_name: &str) -> bool {
    file_name.starts_with('.') || IGNORED_FILE_NAMES.contains(&file_name)
}

/// Hex-encoded SHA-256 of a file's content.
pub fn sha256_hex(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Lower-cased file name stem (everything before the last `.`).
pub fn file_stem(file_name: &str) -> String {
    let lower = file_name.to_lowercase();
    match lower.rfind('.') {
        Some(pos) if pos > 0 => lower[..pos].to_string(),
        _ => lower,
    }
}

/// Last segment of a `/` or `\` separated path.
pub fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Comparison key for the title strategy: lower-cased ASCII alphanumerics.
pub fn title_key(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Fields of a row that take part in matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchKeys<'a> {
    pub digital_object_path: Option<&'a str>,
    pub legacy_id: Option<&'a str>,
    pub title: Option<&'a str>,
}

// ── Index ────────────────────────────────────────────────────────────

/// Case-insensitive lookup over a payload's files.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    files: Vec<PayloadFile>,
    by_name: HashMap<String, usize>,
    by_stem: HashMap<String, usize>,
    by_title: HashMap<String, usize>,
}

impl FileIndex {
    /// Build an index. When two files share a key the first one wins.
    pub fn new(files: Vec<PayloadFile>) -> Self {
        let mut by_name = HashMap::new();
        let mut by_stem = HashMap::new();
        let mut by_title = HashMap::new();
        for (i, file) in files.iter().enumerate() {
            by_name.entry(file.file_name.to_lowercase()).or_insert(i);
            let stem = file_stem(&file.file_name);
            by_title.entry(title_key(&stem)).or_insert(i);
            by_stem.entry(stem).or_insert(i);
        }
        Self {
            files,
            by_name,
            by_stem,
            by_title,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn files(&self) -> &[PayloadFile] {
        &self.files
    }

    /// Look a declared path up by its file name, falling back to the stem.
    pub fn find_by_path(&self, path: &str) -> Option<&PayloadFile> {
        let name = base_name(path.trim()).to_lowercase();
        if name.is_empty() {
            return None;
        }
        self.by_name
            .get(&name)
            .or_else(|| self.by_stem.get(&name))
            .or_else(|| self.by_stem.get(&file_stem(&name)))
            .map(|&i| &self.files[i])
    }

    /// Resolve the payload file for a row.
    pub fn resolve(&self, strategy: MatchStrategy, keys: MatchKeys<'_>) -> Option<&PayloadFile> {
        if let Some(path) = keys.digital_object_path.filter(|p| !p.trim().is_empty()) {
            return self.find_by_path(path);
        }
        match strategy {
            MatchStrategy::Filename => None,
            MatchStrategy::LegacyId => keys
                .legacy_id
                .filter(|id| !id.trim().is_empty())
                .and_then(|id| self.find_by_path(id)),
            MatchStrategy::Title => keys
                .title
                .map(title_key)
                .filter(|k| !k.is_empty())
                .and_then(|k| self.by_title.get(&k))
                .map(|&i| &self.files[i]),
        }
    }

    /// Groups of files sharing a checksum, for duplicate-content warnings.
    pub fn duplicate_checksums(&self) -> Vec<Vec<&PayloadFile>> {
        let mut groups: HashMap<&str, Vec<&PayloadFile>> = HashMap::new();
        for file in &self.files {
            if let Some(sum) = file.checksum.as_deref() {
                groups.entry(sum).or_default().push(file);
            }
        }
        let mut dupes: Vec<Vec<&PayloadFile>> =
            groups.into_values().filter(|g| g.len() > 1).collect();
        dupes.sort_by(|a, b| a[0].relative_path.cmp(&b[0].relative_path));
        dupes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, checksum: Option<&str>) -> PayloadFile {
        PayloadFile {
            relative_path: path.to_string(),
            file_name: base_name(path).to_string(),
            size_bytes: 10,
            checksum: checksum.map(str::to_string),
        }
    }

    fn index() -> FileIndex {
        FileIndex::new(vec![
            file("images/Letter_001.TIF", Some("aa")),
            file("images/ref-42.jpg", Some("bb")),
            file("Harbour View 1901.png", Some("aa")),
        ])
    }

    #[test]
    fn declared_path_matches_case_insensitively() {
        let idx = index();
        let keys = MatchKeys {
            digital_object_path: Some("C:\\scans\\letter_001.tif"),
            ..Default::default()
        };
        let found = idx.resolve(MatchStrategy::Filename, keys).unwrap();
        assert_eq!(found.relative_path, "images/Letter_001.TIF");
    }

    #[test]
    fn declared_path_without_extension_matches_stem() {
        let idx = index();
        assert!(idx.find_by_path("letter_001").is_some());
        assert!(idx.find_by_path("letter_001.jpg").is_some());
        assert!(idx.find_by_path("missing.tif").is_none());
    }

    #[test]
    fn legacy_id_strategy_uses_stem() {
        let idx = index();
        let keys = MatchKeys {
            legacy_id: Some("REF-42"),
            ..Default::default()
        };
        let found = idx.resolve(MatchStrategy::LegacyId, keys).unwrap();
        assert_eq!(found.file_name, "ref-42.jpg");
        assert!(idx.resolve(MatchStrategy::Filename, keys).is_none());
    }

    #[test]
    fn title_strategy_ignores_punctuation_and_case() {
        let idx = index();
        let keys = MatchKeys {
            title: Some("Harbour view, 1901"),
            ..Default::default()
        };
        let found = idx.resolve(MatchStrategy::Title, keys).unwrap();
        assert_eq!(found.file_name, "Harbour View 1901.png");
    }

    #[test]
    fn blank_declared_path_falls_through_to_strategy() {
        let idx = index();
        let keys = MatchKeys {
            digital_object_path: Some("  "),
            legacy_id: Some("ref-42"),
            title: None,
        };
        assert!(idx.resolve(MatchStrategy::LegacyId, keys).is_some());
    }

    #[test]
    fn duplicate_checksums_grouped() {
        let idx = index();
        let dupes = idx.duplicate_checksums();
        assert_eq!(dupes.len(), 1);
        assert_eq!(dupes[0].len(), 2);
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hidden_and_system_files_ignored() {
        assert!(is_ignored_file(".DS_Store"));
        assert!(is_ignored_file("Thumbs.db"));
        assert!(is_ignored_file(".hidden.jpg"));
        assert!(!is_ignored_file("scan.jpg"));
    }

    #[test]
    fn strategy_parses_both_spellings() {
        assert_eq!("legacyId".parse::<MatchStrategy>().unwrap(), MatchStrategy::LegacyId);
        assert_eq!("legacy_id".parse::<MatchStrategy>().unwrap(), MatchStrategy::LegacyId);
        assert!("checksum".parse::<MatchStrategy>().is_err());
    }
}

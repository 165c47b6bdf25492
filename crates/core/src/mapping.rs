//! Column-to-field mapping: auto-mapping heuristics, user edits, saved
//! profiles, value transforms and row enrichment.
//!
//! Pure logic. The pipeline crate persists [`ColumnMapping`]s and calls
//! [`Enricher`] when a session moves from map to validate.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::fields::{
    is_target_field, normalize_date, target_fields, CULTURE, DEFAULT_CULTURE,
    DEFAULT_PUBLICATION_STATUS, IDENTIFIER, PUBLICATION_STATUS,
};
use crate::row::FieldMap;
use crate::session::Standard;
use crate::types::{DbId, Timestamp};

/// Source column spellings that map onto a target field, keyed lower-case.
const ALIASES: &[(&str, &str)] = &[
    ("legacy_id", "legacyId"),
    ("legacyid", "legacyId"),
    ("parent_id", "parentId"),
    ("parentid", "parentId"),
    ("parent_slug", "qubitParentSlug"),
    ("level_of_description", "levelOfDescription"),
    ("levelofdescription", "levelOfDescription"),
    ("level", "levelOfDescription"),
    ("extent_and_medium", "extentAndMedium"),
    ("extent", "extentAndMedium"),
    ("scope_and_content", "scopeAndContent"),
    ("scope", "scopeAndContent"),
    ("description", "scopeAndContent"),
    ("archival_history", "archivalHistory"),
    ("custodial_history", "archivalHistory"),
    ("access_conditions", "accessConditions"),
    ("conditions_of_access", "accessConditions"),
    ("reproduction_conditions", "reproductionConditions"),
    ("conditions_of_reproduction", "reproductionConditions"),
    ("finding_aids", "findingAids"),
    ("publication_status", "publicationStatus"),
    ("digital_object_path", "digitalObjectPath"),
    ("digital_object_uri", "digitalObjectURI"),
    ("digital_object", "digitalObjectPath"),
    ("filename", "digitalObjectPath"),
    ("file_path", "digitalObjectPath"),
    ("subject_access_points", "subjectAccessPoints"),
    ("subjects", "subjectAccessPoints"),
    ("place_access_points", "placeAccessPoints"),
    ("places", "placeAccessPoints"),
    ("name_access_points", "nameAccessPoints"),
    ("names", "nameAccessPoints"),
    ("genre_access_points", "genreAccessPoints"),
    ("genres", "genreAccessPoints"),
    ("creator", "creators"),
    ("date", "creationDates"),
    ("creation_date", "creationDates"),
    ("start_date", "creationDatesStart"),
    ("end_date", "creationDatesEnd"),
    ("accession_number", "accessionNumber"),
    ("copyright_status", "copyrightStatus"),
    ("physical_location", "physicalObjectLocation"),
    ("storage_location", "physicalObjectLocation"),
    ("alternate_title", "alternateTitle"),
    ("ref_code", "identifier"),
    ("reference_code", "identifier"),
    ("ref", "identifier"),
];

static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid html tag regex"));

fn alias_for(key: &str) -> Option<&'static str> {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, target)| *target)
}

// ── Transforms ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Trim,
    Uppercase,
    Lowercase,
    Titlecase,
    DateIso,
    StripHtml,
}

impl Transform {
    pub const ALL: [Transform; 6] = [
        Self::Trim,
        Self::Uppercase,
        Self::Lowercase,
        Self::Titlecase,
        Self::DateIso,
        Self::StripHtml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trim => "trim",
            Self::Uppercase => "uppercase",
            Self::Lowercase => "lowercase",
            Self::Titlecase => "titlecase",
            Self::DateIso => "date_iso",
            Self::StripHtml => "strip_html",
        }
    }

    pub fn apply(&self, value: &str) -> String {
        match self {
            Self::Trim => value.trim().to_string(),
            Self::Uppercase => value.to_uppercase(),
            Self::Lowercase => value.to_lowercase(),
            Self::Titlecase => title_case(value),
            // Unparseable dates pass through for the validator to flag.
            Self::DateIso => normalize_date(value).unwrap_or_else(|| value.to_string()),
            Self::StripHtml => HTML_TAG_RE.replace_all(value, "").into_owned(),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown transform '{s}'")))
    }
}

/// Lower-case the value, then upper-case the first letter of each word.
fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for c in value.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        at_word_start = c.is_whitespace();
    }
    out
}

// ── Column mappings ──────────────────────────────────────────────────

/// How sure auto-mapping was about a suggestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    Exact,
    Fuzzy,
    #[default]
    None,
}

impl MatchConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::None => "none",
        }
    }
}

impl FromStr for MatchConfidence {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "fuzzy" => Ok(Self::Fuzzy),
            "none" => Ok(Self::None),
            other => Err(CoreError::Validation(format!("Unknown confidence '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub source_column: String,
    pub target_field: Option<String>,
    pub default_value: Option<String>,
    pub transform: Option<Transform>,
    pub is_ignored: bool,
    pub sort_order: i32,
    #[serde(default)]
    pub confidence: MatchConfidence,
}

impl ColumnMapping {
    /// Mapped to a field and not ignored.
    pub fn is_active(&self) -> bool {
        !self.is_ignored && self.target_field.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Propose a target field for one source column.
///
/// Order: exact field name, alias, alias after stripping spaces, dashes
/// and underscores, then a case-insensitive field name match.
pub fn suggest_target(column: &str, standard: Standard) -> (Option<&'static str>, MatchConfidence) {
    let fields = target_fields(standard);
    let trimmed = column.trim();

    if let Some(field) = fields.iter().copied().find(|f| *f == trimmed) {
        return (Some(field), MatchConfidence::Exact);
    }

    let lower = trimmed.to_lowercase();
    if let Some(target) = alias_for(&lower) {
        return (Some(target), MatchConfidence::Exact);
    }

    let normalized: String = lower.chars().filter(|c| !matches!(c, ' ' | '-' | '_')).collect();
    if let Some(target) = alias_for(&normalized) {
        return (Some(target), MatchConfidence::Fuzzy);
    }

    if let Some(field) = fields
        .iter()
        .copied()
        .find(|f| f.to_lowercase() == lower || f.to_lowercase() == normalized)
    {
        return (Some(field), MatchConfidence::Fuzzy);
    }

    (None, MatchConfidence::None)
}

/// Initial mappings for a freshly uploaded file, in column order.
///
/// Columns without a suggestion get no target and are not ignored; the user
/// has to decide before the session can move on to validation.
pub fn auto_map(columns: &[String], standard: Standard) -> Vec<ColumnMapping> {
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let (target, confidence) = suggest_target(column, standard);
            ColumnMapping {
                source_column: column.clone(),
                target_field: target.map(str::to_string),
                default_value: None,
                transform: None,
                is_ignored: false,
                sort_order: i as i32 + 1,
                confidence,
            }
        })
        .collect()
}

/// Columns that have neither a target nor the ignore flag.
pub fn unmapped_columns(mappings: &[ColumnMapping]) -> Vec<String> {
    mappings
        .iter()
        .filter(|m| !m.is_ignored && !has_text(m.target_field.as_deref()))
        .map(|m| m.source_column.clone())
        .collect()
}

/// One user edit from the map stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEdit {
    pub source_column: String,
    #[serde(default)]
    pub target_field: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub is_ignored: bool,
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Apply edits to the session's mappings.
///
/// All edits are checked before any is applied, so a bad edit leaves the
/// mappings untouched. Applying the same edits twice yields the same state.
pub fn apply_edits(
    mappings: &mut [ColumnMapping],
    edits: &[MappingEdit],
    standard: Standard,
) -> Result<(), CoreError> {
    let known: HashSet<&str> = mappings.iter().map(|m| m.source_column.as_str()).collect();
    for edit in edits {
        if !known.contains(edit.source_column.as_str()) {
            return Err(CoreError::Validation(format!(
                "Unknown source column '{}'",
                edit.source_column
            )));
        }
        if let Some(target) = non_blank(edit.target_field.as_deref()) {
            if !is_target_field(standard, &target) {
                return Err(CoreError::Validation(format!(
                    "'{target}' is not a {} field",
                    standard.label()
                )));
            }
        }
    }

    for edit in edits {
        if let Some(mapping) = mappings
            .iter_mut()
            .find(|m| m.source_column == edit.source_column)
        {
            mapping.target_field = non_blank(edit.target_field.as_deref());
            mapping.default_value = edit.default_value.clone().filter(|v| !v.is_empty());
            mapping.transform = edit.transform;
            mapping.is_ignored = edit.is_ignored;
        }
    }
    Ok(())
}

// ── Profiles ─────────────────────────────────────────────────────────

/// One entry of a saved, reusable mapping profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub transform: Option<Transform>,
}

/// Overlay a profile onto the current mappings by column name (exact
/// first, then case-insensitive). Entries whose target is not a field of
/// `standard` are skipped. Returns how many columns changed.
pub fn overlay_profile(
    mappings: &mut [ColumnMapping],
    entries: &[ProfileEntry],
    standard: Standard,
) -> usize {
    let usable: Vec<&ProfileEntry> = entries
        .iter()
        .filter(|e| is_target_field(standard, e.target.trim()))
        .collect();
    let mut applied = 0;
    for mapping in mappings.iter_mut() {
        let entry = usable
            .iter()
            .find(|e| e.source == mapping.source_column)
            .or_else(|| {
                usable
                    .iter()
                    .find(|e| e.source.eq_ignore_ascii_case(&mapping.source_column))
            });
        if let Some(entry) = entry {
            mapping.target_field = Some(entry.target.trim().to_string());
            mapping.is_ignored = false;
            mapping.default_value = entry.default.clone().filter(|v| !v.is_empty());
            mapping.transform = entry.transform;
            applied += 1;
        }
    }
    applied
}

/// Capture the active mappings as profile entries.
pub fn profile_entries(mappings: &[ColumnMapping]) -> Vec<ProfileEntry> {
    mappings
        .iter()
        .filter(|m| m.is_active())
        .filter_map(|m| {
            Some(ProfileEntry {
                source: m.source_column.clone(),
                target: m.target_field.clone()?,
                default: m.default_value.clone(),
                transform: m.transform,
            })
        })
        .collect()
}

/// A named, reusable set of profile entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingProfile {
    pub id: DbId,
    pub name: String,
    pub standard: Option<Standard>,
    pub entries: Vec<ProfileEntry>,
    pub created_at: Timestamp,
}

// ── Enrichment ───────────────────────────────────────────────────────

/// Sequential identifiers for rows that do not carry one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierCounter {
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_counter_start")]
    pub start: u32,
    #[serde(default = "default_counter_padding")]
    pub padding: usize,
}

fn default_counter_start() -> u32 {
    1
}

fn default_counter_padding() -> usize {
    4
}

impl IdentifierCounter {
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(1..=10).contains(&self.padding) {
            return Err(CoreError::Validation(
                "Identifier counter padding must be between 1 and 10".into(),
            ));
        }
        Ok(())
    }

    /// Identifier for the row at `position` (0-based, in row order).
    pub fn identifier(&self, position: usize) -> String {
        let n = u64::from(self.start) + position as u64;
        format!("{}{:0width$}", self.prefix, n, width = self.padding)
    }
}

/// Turns raw source values into target field values.
pub struct Enricher<'a> {
    mappings: Vec<&'a ColumnMapping>,
    counter: Option<&'a IdentifierCounter>,
}

impl<'a> Enricher<'a> {
    pub fn new(mappings: &'a [ColumnMapping], counter: Option<&'a IdentifierCounter>) -> Self {
        let mut active: Vec<&ColumnMapping> = mappings.iter().filter(|m| m.is_active()).collect();
        active.sort_by_key(|m| m.sort_order);
        Self {
            mappings: active,
            counter,
        }
    }

    /// Enrich one row. `position` is the row's 0-based index in row order.
    ///
    /// Empty values take the column default; transforms apply to non-empty
    /// values; `culture` and `publicationStatus` get their defaults. When two
    /// columns target the same field, a later blank value never overwrites an
    /// earlier non-blank one.
    pub fn enrich(&self, position: usize, raw: &FieldMap) -> FieldMap {
        let mut fields = FieldMap::new();
        for mapping in &self.mappings {
            let Some(target) = mapping.target_field.as_deref() else {
                continue;
            };
            let mut value = raw
                .get(&mapping.source_column)
                .cloned()
                .unwrap_or_default();
            if value.trim().is_empty() {
                if let Some(default) = mapping.default_value.as_deref() {
                    value = default.to_string();
                }
            }
            if let Some(transform) = mapping.transform {
                if !value.trim().is_empty() {
                    value = transform.apply(&value);
                }
            }
            let keep_existing = value.trim().is_empty()
                && fields.get(target).is_some_and(|v| !v.trim().is_empty());
            if !keep_existing {
                fields.insert(target.to_string(), value);
            }
        }

        if let Some(counter) = self.counter {
            if !has_text(fields.get(IDENTIFIER).map(String::as_str)) {
                fields.insert(IDENTIFIER.to_string(), counter.identifier(position));
            }
        }
        if !has_text(fields.get(CULTURE).map(String::as_str)) {
            fields.insert(CULTURE.to_string(), DEFAULT_CULTURE.to_string());
        }
        if !has_text(fields.get(PUBLICATION_STATUS).map(String::as_str)) {
            fields.insert(
                PUBLICATION_STATUS.to_string(),
                DEFAULT_PUBLICATION_STATUS.to_string(),
            );
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn raw(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // -- Auto-mapping --

    #[test]
    fn exact_field_names_map_exactly() {
        let m = auto_map(&cols(&["title", "scopeAndContent"]), Standard::Isadg);
        assert_eq!(m[0].target_field.as_deref(), Some("title"));
        assert_eq!(m[0].confidence, MatchConfidence::Exact);
        assert_eq!(m[1].sort_order, 2);
    }

    #[test]
    fn aliases_map_exactly() {
        let m = auto_map(&cols(&["Legacy_ID", "scope", "ref_code"]), Standard::Isadg);
        assert_eq!(m[0].target_field.as_deref(), Some("legacyId"));
        assert_eq!(m[1].target_field.as_deref(), Some("scopeAndContent"));
        assert_eq!(m[2].target_field.as_deref(), Some("identifier"));
        assert!(m.iter().all(|c| c.confidence == MatchConfidence::Exact));
    }

    #[test]
    fn normalized_alias_is_fuzzy() {
        let m = auto_map(&cols(&["Level Of-Description"]), Standard::Isadg);
        assert_eq!(m[0].target_field.as_deref(), Some("levelOfDescription"));
        assert_eq!(m[0].confidence, MatchConfidence::Fuzzy);
    }

    #[test]
    fn case_insensitive_field_is_fuzzy() {
        let m = auto_map(&cols(&["ACCESSIONNUMBER", "object_number"]), Standard::Spectrum);
        assert_eq!(m[0].target_field.as_deref(), Some("accessionNumber"));
        assert_eq!(m[0].confidence, MatchConfidence::Fuzzy);
        assert_eq!(m[1].target_field.as_deref(), Some("objectNumber"));
    }

    #[test]
    fn unknown_column_left_unmapped_not_ignored() {
        let m = auto_map(&cols(&["box_barcode"]), Standard::Isadg);
        assert_eq!(m[0].target_field, None);
        assert!(!m[0].is_ignored);
        assert_eq!(m[0].confidence, MatchConfidence::None);
        assert_eq!(unmapped_columns(&m), vec!["box_barcode".to_string()]);
    }

    #[test]
    fn standard_extras_only_for_their_standard() {
        let dc = auto_map(&cols(&["publisher"]), Standard::Dc);
        assert_eq!(dc[0].target_field.as_deref(), Some("publisher"));
        let isad = auto_map(&cols(&["publisher"]), Standard::Isadg);
        assert_eq!(isad[0].target_field, None);
    }

    // -- Edits --

    #[test]
    fn edits_are_idempotent() {
        let mut m = auto_map(&cols(&["title", "box_barcode"]), Standard::Isadg);
        let edits = vec![
            MappingEdit {
                source_column: "box_barcode".into(),
                target_field: None,
                default_value: None,
                transform: None,
                is_ignored: true,
            },
            MappingEdit {
                source_column: "title".into(),
                target_field: Some("title".into()),
                default_value: Some("Untitled".into()),
                transform: Some(Transform::Trim),
                is_ignored: false,
            },
        ];
        apply_edits(&mut m, &edits, Standard::Isadg).unwrap();
        let once = m.clone();
        apply_edits(&mut m, &edits, Standard::Isadg).unwrap();
        assert_eq!(m, once);
        assert!(unmapped_columns(&m).is_empty());
    }

    #[test]
    fn unknown_column_edit_rejected_without_changes() {
        let mut m = auto_map(&cols(&["title"]), Standard::Isadg);
        let before = m.clone();
        let edits = vec![
            MappingEdit {
                source_column: "title".into(),
                target_field: None,
                default_value: None,
                transform: None,
                is_ignored: true,
            },
            MappingEdit {
                source_column: "nope".into(),
                target_field: None,
                default_value: None,
                transform: None,
                is_ignored: true,
            },
        ];
        assert_matches!(
            apply_edits(&mut m, &edits, Standard::Isadg),
            Err(CoreError::Validation(_))
        );
        assert_eq!(m, before);
    }

    #[test]
    fn foreign_target_rejected() {
        let mut m = auto_map(&cols(&["maker"]), Standard::Isadg);
        let edits = vec![MappingEdit {
            source_column: "maker".into(),
            target_field: Some("workType".into()),
            default_value: None,
            transform: None,
            is_ignored: false,
        }];
        assert!(apply_edits(&mut m, &edits, Standard::Isadg).is_err());
        assert!(apply_edits(&mut m, &edits, Standard::Cco).is_ok());
    }

    // -- Profiles --

    #[test]
    fn profile_overlays_by_name_and_keeps_others() {
        let mut m = auto_map(&cols(&["Title", "Box", "Notes"]), Standard::Isadg);
        m[2].is_ignored = true;
        let entries = vec![
            ProfileEntry {
                source: "box".into(),
                target: "physicalObjectLocation".into(),
                default: Some("Stack A".into()),
                transform: Some(Transform::Uppercase),
            },
            ProfileEntry {
                source: "Unused".into(),
                target: "title".into(),
                default: None,
                transform: None,
            },
        ];
        let applied = overlay_profile(&mut m, &entries, Standard::Isadg);
        assert_eq!(applied, 1);
        assert_eq!(m[1].target_field.as_deref(), Some("physicalObjectLocation"));
        assert_eq!(m[1].default_value.as_deref(), Some("Stack A"));
        assert_eq!(m[0].target_field.as_deref(), Some("title"));
        assert!(m[2].is_ignored);
    }

    #[test]
    fn profile_targets_outside_standard_are_skipped() {
        let mut m = auto_map(&cols(&["Name", "Title"]), Standard::Isadg);
        let entries = vec![
            ProfileEntry {
                source: "Name".into(),
                target: "objectName".into(),
                default: None,
                transform: None,
            },
            ProfileEntry {
                source: "Title".into(),
                target: " title ".into(),
                default: None,
                transform: None,
            },
        ];
        let before = m[0].clone();
        let applied = overlay_profile(&mut m, &entries, Standard::Isadg);
        assert_eq!(applied, 1);
        assert_eq!(m[0], before);
        assert_eq!(m[1].target_field.as_deref(), Some("title"));
    }

    #[test]
    fn profile_capture_skips_inactive() {
        let mut m = auto_map(&cols(&["title", "junk"]), Standard::Isadg);
        m[1].is_ignored = true;
        let entries = profile_entries(&m);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target, "title");
    }

    // -- Transforms --

    #[test]
    fn transforms() {
        assert_eq!(Transform::Trim.apply("  a b "), "a b");
        assert_eq!(Transform::Uppercase.apply("fonds"), "FONDS");
        assert_eq!(Transform::Lowercase.apply("FONDS"), "fonds");
        assert_eq!(Transform::Titlecase.apply("hARBOUR board  minutes"), "Harbour Board  Minutes");
        assert_eq!(Transform::DateIso.apply("3 February 1901"), "1901-02-03");
        assert_eq!(Transform::DateIso.apply("sometime"), "sometime");
        assert_eq!(Transform::StripHtml.apply("<p>Minutes <b>1901</b></p>"), "Minutes 1901");
    }

    // -- Enrichment --

    #[test]
    fn enrich_applies_defaults_transforms_and_fixed_fields() {
        let mut m = auto_map(&cols(&["title", "level", "notes"]), Standard::Isadg);
        m[1].default_value = Some("Item".into());
        m[0].transform = Some(Transform::Titlecase);
        m[2].is_ignored = true;
        let enricher = Enricher::new(&m, None);
        let out = enricher.enrich(0, &raw(&[("title", "harbour minutes"), ("level", ""), ("notes", "x")]));
        assert_eq!(out["title"], "Harbour Minutes");
        assert_eq!(out["levelOfDescription"], "Item");
        assert_eq!(out["culture"], "en");
        assert_eq!(out["publicationStatus"], "Draft");
        assert!(!out.contains_key("notes"));
    }

    #[test]
    fn enrich_keeps_explicit_publication_status() {
        let m = auto_map(&cols(&["title", "publication_status"]), Standard::Isadg);
        let out = Enricher::new(&m, None)
            .enrich(0, &raw(&[("title", "A"), ("publication_status", "Published")]));
        assert_eq!(out["publicationStatus"], "Published");
    }

    #[test]
    fn counter_fills_missing_identifiers() {
        let m = auto_map(&cols(&["title", "identifier"]), Standard::Isadg);
        let counter = IdentifierCounter {
            prefix: "OBJ-".into(),
            start: 1,
            padding: 4,
        };
        let enricher = Enricher::new(&m, Some(&counter));
        let first = enricher.enrich(0, &raw(&[("title", "A"), ("identifier", "")]));
        let third = enricher.enrich(2, &raw(&[("title", "C"), ("identifier", "KEEP")]));
        assert_eq!(first["identifier"], "OBJ-0001");
        assert_eq!(third["identifier"], "KEEP");
        assert!(IdentifierCounter { padding: 0, ..counter }.validate().is_err());
    }

    #[test]
    fn later_blank_column_does_not_clobber_earlier_value() {
        let m = auto_map(&cols(&["scope", "description"]), Standard::Isadg);
        let out = Enricher::new(&m, None).enrich(0, &raw(&[("scope", "Minutes"), ("description", "")]));
        assert_eq!(out["scopeAndContent"], "Minutes");
    }
}

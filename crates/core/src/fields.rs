//! Target field schema per descriptive standard.
//!
//! Field names follow the record store's CSV import vocabulary
//! (`legacyId`, `scopeAndContent`, ...). Each field carries a
//! [`FieldKind`] which the validator uses for format checks.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::session::{Sector, Standard};

// ── Field names used by the pipeline itself ──────────────────────────

pub const LEGACY_ID: &str = "legacyId";
pub const PARENT_ID: &str = "parentId";
pub const PARENT_SLUG: &str = "qubitParentSlug";
pub const IDENTIFIER: &str = "identifier";
pub const TITLE: &str = "title";
pub const LEVEL_OF_DESCRIPTION: &str = "levelOfDescription";
pub const PUBLICATION_STATUS: &str = "publicationStatus";
pub const DESCRIPTION_STATUS: &str = "descriptionStatus";
pub const CULTURE: &str = "culture";
pub const DIGITAL_OBJECT_PATH: &str = "digitalObjectPath";

/// Fields shared by every standard.
pub const COMMON_FIELDS: &[&str] = &[
    "legacyId", "parentId", "qubitParentSlug", "identifier",
    "title", "levelOfDescription", "extentAndMedium",
    "repository", "archivalHistory", "acquisition",
    "scopeAndContent", "appraisal", "accruals",
    "arrangement", "accessConditions", "reproductionConditions",
    "physicalCharacteristics", "findingAids", "relatedUnitsOfDescription",
    "locationOfOriginals", "locationOfCopies", "rules",
    "descriptionIdentifier", "descriptionStatus", "publicationStatus",
    "levelOfDetail", "revisionHistory", "sources",
    "culture", "alternateTitle",
    "digitalObjectPath", "digitalObjectURI", "digitalObjectChecksum",
    "subjectAccessPoints", "placeAccessPoints", "nameAccessPoints",
    "genreAccessPoints", "creators", "creatorDates",
    "creatorDatesStart", "creatorDatesEnd", "creatorDateNotes",
    "creationDates", "creationDatesStart", "creationDatesEnd",
    "eventActors", "eventTypes", "eventDates",
    "eventStartDates", "eventEndDates", "eventPlaces",
    "physicalObjectName", "physicalObjectLocation", "physicalObjectType",
    "accessionNumber", "copyrightStatus", "copyrightExpires", "copyrightHolder",
];

const RAD_FIELDS: &[&str] = &[
    "radOtherTitleInformation", "radTitleStatementOfResponsibility",
    "radStatementOfProjection", "radStatementOfCoordinates",
    "radEdition", "radStatementOfScaleCartographic",
];

const DACS_FIELDS: &[&str] = &["unitDates", "unitDateActuated"];

const DC_FIELDS: &[&str] = &[
    "type", "format", "language", "relation", "coverage",
    "contributor", "publisher", "rights", "date",
];

const SPECTRUM_FIELDS: &[&str] = &[
    "objectNumber", "objectName", "objectType",
    "materialComponent", "technique", "dimension",
    "inscription", "condition", "completeness",
];

const CCO_FIELDS: &[&str] = &[
    "workType", "measurements", "materialsTechniques",
    "stylePeriod", "culturalContext",
];

/// Fields validated as dates.
pub const DATE_FIELDS: &[&str] = &[
    "creationDatesStart",
    "creationDatesEnd",
    "eventStartDates",
    "eventEndDates",
    "creatorDatesStart",
    "creatorDatesEnd",
    "copyrightExpires",
];

pub const LEVELS_OF_DESCRIPTION: &[&str] = &[
    "Fonds", "Subfonds", "Collection", "Series", "Subseries",
    "File", "Item", "Part", "Class", "Sub-item",
];

pub const PUBLICATION_STATUSES: &[&str] = &["Draft", "Published"];

pub const DESCRIPTION_STATUSES: &[&str] = &["Final", "Revised", "Draft"];

/// Value given to `culture` when a row leaves it empty.
pub const DEFAULT_CULTURE: &str = "en";

/// Value given to `publicationStatus` when a row leaves it empty.
pub const DEFAULT_PUBLICATION_STATUS: &str = "Draft";

/// Every field a column may be mapped to under `standard`.
pub fn target_fields(standard: Standard) -> Vec<&'static str> {
    let extras: &[&str] = match standard {
        Standard::Isadg => &[],
        Standard::Rad => RAD_FIELDS,
        Standard::Dacs => DACS_FIELDS,
        Standard::Dc => DC_FIELDS,
        Standard::Spectrum => SPECTRUM_FIELDS,
        Standard::Cco => CCO_FIELDS,
    };
    COMMON_FIELDS.iter().chain(extras).copied().collect()
}

pub fn is_target_field(standard: Standard, name: &str) -> bool {
    target_fields(standard).contains(&name)
}

/// Fields that must be non-empty for a row to be committed.
pub fn required_fields(standard: Standard) -> &'static [&'static str] {
    match standard {
        Standard::Isadg => &[TITLE, LEVEL_OF_DESCRIPTION, IDENTIFIER],
        Standard::Dc => &[TITLE],
        _ => &[TITLE, LEVEL_OF_DESCRIPTION],
    }
}

/// Sector-specific columns prepended to the downloadable CSV template.
pub fn sector_template_fields(sector: Sector) -> &'static [&'static str] {
    match sector {
        Sector::Museum | Sector::Gallery => {
            &["objectNumber", "objectName", "artist", "medium", "dimensions"]
        }
        Sector::Library => &["isbn", "author", "publisher", "callNumber"],
        Sector::Dam => &["assetId", "assetType", "resolution", "colorSpace"],
        Sector::Archive => &[],
    }
}

/// Header row of the CSV template: sector columns, then the standard's
/// target fields, without repeats.
pub fn template_columns(sector: Sector, standard: Standard) -> Vec<&'static str> {
    let mut columns: Vec<&'static str> = sector_template_fields(sector).to_vec();
    for field in target_fields(standard) {
        if !columns.contains(&field) {
            columns.push(field);
        }
    }
    columns
}

// ── Field kinds ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    /// Closed list; `strict` vocabularies reject, others only warn.
    Vocabulary {
        values: &'static [&'static str],
        strict: bool,
    },
}

pub fn field_kind(name: &str) -> FieldKind {
    match name {
        n if DATE_FIELDS.contains(&n) => FieldKind::Date,
        LEVEL_OF_DESCRIPTION => FieldKind::Vocabulary {
            values: LEVELS_OF_DESCRIPTION,
            strict: false,
        },
        PUBLICATION_STATUS => FieldKind::Vocabulary {
            values: PUBLICATION_STATUSES,
            strict: true,
        },
        DESCRIPTION_STATUS => FieldKind::Vocabulary {
            values: DESCRIPTION_STATUSES,
            strict: false,
        },
        _ => FieldKind::Text,
    }
}

/// Find the canonical vocabulary entry for `value`, ignoring case.
pub fn vocabulary_match(values: &'static [&'static str], value: &str) -> Option<&'static str> {
    let value = value.trim();
    values
        .iter()
        .copied()
        .find(|v| v.eq_ignore_ascii_case(value))
}

// ── Dates ────────────────────────────────────────────────────────────

static PARTIAL_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})(?:-(\d{2})(?:-(\d{2}))?)?$").expect("valid partial date regex")
});

/// Formats accepted by the `date_iso` transform besides ISO itself.
const LOOSE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// A year, year-month or full date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDate {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl PartialDate {
    /// Parse `YYYY`, `YYYY-MM` or `YYYY-MM-DD`, checking the calendar.
    pub fn parse_iso(value: &str) -> Option<Self> {
        let caps = PARTIAL_DATE_RE.captures(value.trim())?;
        let year: i32 = caps[1].parse().ok()?;
        let month: Option<u32> = caps.get(2).and_then(|m| m.as_str().parse().ok());
        let day: Option<u32> = caps.get(3).and_then(|d| d.as_str().parse().ok());
        match (month, day) {
            (None, _) => {}
            (Some(m), None) if (1..=12).contains(&m) => {}
            (Some(m), Some(d)) => {
                NaiveDate::from_ymd_opt(year, m, d)?;
            }
            _ => return None,
        }
        Some(Self { year, month, day })
    }
}

impl fmt::Display for PartialDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(m) = self.month {
            write!(f, "-{m:02}")?;
            if let Some(d) = self.day {
                write!(f, "-{d:02}")?;
            }
        }
        Ok(())
    }
}

/// Normalise a loosely written date to `YYYY-MM-DD`.
pub fn normalize_date(value: &str) -> Option<String> {
    let value = value.trim();
    if let Some(date) = PartialDate::parse_iso(value) {
        return Some(date.to_string());
    }
    LOOSE_DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(value, fmt)
            .ok()
            .or_else(|| {
                chrono::NaiveDateTime::parse_from_str(value, fmt)
                    .ok()
                    .map(|dt| dt.date())
            })
            .map(|d| d.format("%Y-%m-%d").to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_extras_are_added() {
        let dc = target_fields(Standard::Dc);
        assert!(dc.contains(&"publisher"));
        assert!(dc.contains(&"title"));
        assert!(!target_fields(Standard::Isadg).contains(&"publisher"));
        assert!(target_fields(Standard::Spectrum).contains(&"objectNumber"));
    }

    #[test]
    fn required_fields_per_standard() {
        assert_eq!(
            required_fields(Standard::Isadg),
            &["title", "levelOfDescription", "identifier"]
        );
        assert_eq!(required_fields(Standard::Dc), &["title"]);
        assert_eq!(required_fields(Standard::Rad), &["title", "levelOfDescription"]);
    }

    #[test]
    fn template_starts_with_sector_columns() {
        let cols = template_columns(Sector::Museum, Standard::Spectrum);
        assert_eq!(&cols[..5], &["objectNumber", "objectName", "artist", "medium", "dimensions"]);
        // objectNumber is also a SPECTRUM field but appears once.
        assert_eq!(cols.iter().filter(|c| **c == "objectNumber").count(), 1);
        assert_eq!(template_columns(Sector::Archive, Standard::Isadg)[0], "legacyId");
    }

    #[test]
    fn partial_dates() {
        assert_eq!(
            PartialDate::parse_iso("1901"),
            Some(PartialDate { year: 1901, month: None, day: None })
        );
        assert!(PartialDate::parse_iso("1901-02").is_some());
        assert!(PartialDate::parse_iso("1901-02-28").is_some());
        assert!(PartialDate::parse_iso("1901-02-30").is_none());
        assert!(PartialDate::parse_iso("1901-13").is_none());
        assert!(PartialDate::parse_iso("c. 1901").is_none());
    }

    #[test]
    fn normalize_loose_dates() {
        assert_eq!(normalize_date("1901/02/03").as_deref(), Some("1901-02-03"));
        assert_eq!(normalize_date("3 February 1901").as_deref(), Some("1901-02-03"));
        assert_eq!(normalize_date("Feb 03, 1901").as_deref(), Some("1901-02-03"));
        assert_eq!(normalize_date("1901").as_deref(), Some("1901"));
        assert_eq!(normalize_date("circa 1900"), None);
    }

    #[test]
    fn vocabulary_lookup_ignores_case() {
        assert_eq!(vocabulary_match(LEVELS_OF_DESCRIPTION, "sub-item"), Some("Sub-item"));
        assert_eq!(vocabulary_match(LEVELS_OF_DESCRIPTION, " FONDS "), Some("Fonds"));
        assert_eq!(vocabulary_match(LEVELS_OF_DESCRIPTION, "Box"), None);
    }
}

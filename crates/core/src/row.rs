//! Parsed source rows and their derived accessors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::digital_object::MatchKeys;
use crate::fields::{DIGITAL_OBJECT_PATH, LEGACY_ID, LEVEL_OF_DESCRIPTION, PARENT_ID, PARENT_SLUG, TITLE};
use crate::types::RowNumber;

/// Field name → value bag. Ordered so serialisation is stable.
pub type FieldMap = BTreeMap<String, String>;

/// One record from the source file.
///
/// `raw` holds the values as parsed, keyed by source column. `fields` holds
/// the enriched values keyed by target field; it is rebuilt whenever the
/// session moves from map to validate and edited in place by fixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
    pub row_number: RowNumber,
    pub raw: FieldMap,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub is_excluded: bool,
}

impl DataRow {
    pub fn new(row_number: RowNumber, raw: FieldMap) -> Self {
        Self {
            row_number,
            raw,
            fields: FieldMap::new(),
            is_valid: false,
            is_excluded: false,
        }
    }

    /// Enriched value of `name`, if present and not blank.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.field(TITLE)
    }

    pub fn level_of_description(&self) -> Option<&str> {
        self.field(LEVEL_OF_DESCRIPTION)
    }

    pub fn legacy_id(&self) -> Option<&str> {
        self.field(LEGACY_ID)
    }

    /// Declared parent: `parentId` first, then `qubitParentSlug`.
    pub fn parent_ref(&self) -> Option<&str> {
        self.field(PARENT_ID).or_else(|| self.field(PARENT_SLUG))
    }

    pub fn digital_object_path(&self) -> Option<&str> {
        self.field(DIGITAL_OBJECT_PATH)
    }

    pub fn match_keys(&self) -> MatchKeys<'_> {
        MatchKeys {
            digital_object_path: self.digital_object_path(),
            legacy_id: self.legacy_id(),
            title: self.title(),
        }
    }

    /// Included and free of error-severity issues.
    pub fn is_eligible(&self) -> bool {
        self.is_valid && !self.is_excluded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_read_as_absent() {
        let mut row = DataRow::new(1, FieldMap::new());
        row.fields.insert("title".into(), "   ".into());
        row.fields.insert("legacyId".into(), " A1 ".into());
        assert_eq!(row.title(), None);
        assert_eq!(row.legacy_id(), Some("A1"));
    }

    #[test]
    fn parent_ref_prefers_parent_id() {
        let mut row = DataRow::new(1, FieldMap::new());
        row.fields.insert("qubitParentSlug".into(), "harbour-board".into());
        assert_eq!(row.parent_ref(), Some("harbour-board"));
        row.fields.insert("parentId".into(), "P1".into());
        assert_eq!(row.parent_ref(), Some("P1"));
    }
}

//! Validation issue, severity and statistics types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::RowNumber;

/// Whether an issue blocks the row from commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            other => Err(CoreError::Validation(format!("Unknown severity '{other}'"))),
        }
    }
}

/// The check that produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Required,
    DateFormat,
    Vocabulary,
    Culture,
    DuplicateLegacyId,
    ParentNotFound,
    HierarchyCycle,
    ParentIgnored,
    DigitalObjectMissing,
    DuplicateChecksum,
}

impl Rule {
    pub const ALL: [Rule; 10] = [
        Self::Required,
        Self::DateFormat,
        Self::Vocabulary,
        Self::Culture,
        Self::DuplicateLegacyId,
        Self::ParentNotFound,
        Self::HierarchyCycle,
        Self::ParentIgnored,
        Self::DigitalObjectMissing,
        Self::DuplicateChecksum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::DateFormat => "date_format",
            Self::Vocabulary => "vocabulary",
            Self::Culture => "culture",
            Self::DuplicateLegacyId => "duplicate_legacy_id",
            Self::ParentNotFound => "parent_not_found",
            Self::HierarchyCycle => "hierarchy_cycle",
            Self::ParentIgnored => "parent_ignored",
            Self::DigitalObjectMissing => "digital_object_missing",
            Self::DuplicateChecksum => "duplicate_checksum",
        }
    }
}

impl FromStr for Rule {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown validation rule '{s}'")))
    }
}

/// One detected problem on one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub row_number: RowNumber,
    pub field_name: Option<String>,
    pub severity: Severity,
    pub rule: Rule,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        row_number: RowNumber,
        field_name: Option<&str>,
        severity: Severity,
        rule: Rule,
        message: impl Into<String>,
    ) -> Self {
        Self {
            row_number,
            field_name: field_name.map(str::to_string),
            severity,
            rule,
            message: message.into(),
        }
    }
}

/// Counts over the included rows of one validation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStats {
    /// Included rows checked.
    pub total: i32,
    /// Rows without error-severity issues (eligible for commit).
    pub valid: i32,
    /// Valid rows that carry at least one warning.
    pub warning_rows: i32,
    /// Rows with at least one error.
    pub error_rows: i32,
    /// Error-severity issues.
    pub errors: i32,
    /// Warning-severity issues.
    pub warnings: i32,
    /// Info-severity issues.
    pub infos: i32,
}

impl ValidationStats {
    /// Whether the session may move on to preview.
    pub fn check_proceed(&self) -> Result<(), CoreError> {
        if self.error_rows > 0 {
            return Err(CoreError::ValidationBlocked(format!(
                "{} row(s) have errors; fix or exclude them first",
                self.error_rows
            )));
        }
        self.check_committable()
    }

    /// Whether at least one row could be committed.
    pub fn check_committable(&self) -> Result<(), CoreError> {
        if self.valid == 0 {
            return Err(CoreError::ValidationBlocked(
                "There are no valid rows to commit".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn proceed_blocked_by_error_rows() {
        let stats = ValidationStats {
            total: 3,
            valid: 2,
            error_rows: 1,
            errors: 1,
            ..Default::default()
        };
        assert_matches!(stats.check_proceed(), Err(CoreError::ValidationBlocked(_)));
        assert!(stats.check_committable().is_ok());
    }

    #[test]
    fn proceed_blocked_without_valid_rows() {
        let stats = ValidationStats::default();
        assert_matches!(stats.check_proceed(), Err(CoreError::ValidationBlocked(_)));
    }

    #[test]
    fn proceed_allowed_with_warnings_only() {
        let stats = ValidationStats {
            total: 2,
            valid: 2,
            warning_rows: 1,
            warnings: 3,
            ..Default::default()
        };
        assert!(stats.check_proceed().is_ok());
    }

    #[test]
    fn rule_names_round_trip() {
        for rule in Rule::ALL {
            assert_eq!(rule.as_str().parse::<Rule>().unwrap(), rule);
        }
    }
}

//! Batch evaluator: pure logic, no database access.
//!
//! The caller resolves parent references that leave the batch (through the
//! record store) and hands them in as [`BatchContext::existing_parents`], so
//! a run is a deterministic function of its inputs.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::rules::{Rule, Severity, ValidationIssue, ValidationStats};
use crate::digital_object::{base_name, FileIndex, MatchStrategy};
use crate::fields::{
    field_kind, normalize_date, required_fields, vocabulary_match, FieldKind, CULTURE,
    DATE_FIELDS, LEGACY_ID, PARENT_ID,
};
use crate::hierarchy::{legacy_index, plan_commit_order};
use crate::row::DataRow;
use crate::session::{ParentPlacement, Standard};
use crate::types::{DbId, RowNumber};

static CULTURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]{2,3}(?:[_-][A-Za-z]{2})?$").expect("valid culture regex")
});

/// Session settings a validation run depends on.
#[derive(Debug, Clone, Copy)]
pub struct BatchContext<'a> {
    pub standard: Standard,
    pub placement: ParentPlacement,
    pub match_strategy: MatchStrategy,
    /// Digital-object payload of a ZIP or directory upload.
    pub payload: Option<&'a FileIndex>,
    /// Parent references outside the batch known to the record store.
    pub existing_parents: &'a HashSet<String>,
    /// The session's chosen parent record, when the record store does not
    /// have it. Every row is then blocked.
    pub missing_parent: Option<DbId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub stats: ValidationStats,
    /// Sorted by row number; generation order within a row.
    pub issues: Vec<ValidationIssue>,
    /// Validity of every included row, in row order.
    #[serde(skip)]
    pub validity: Vec<(RowNumber, bool)>,
}

/// Parent references of included rows that no included row's `legacyId`
/// satisfies. Only meaningful under `csv_hierarchy` placement.
pub fn external_parent_refs(rows: &[DataRow]) -> Vec<String> {
    let included: Vec<&DataRow> = rows.iter().filter(|r| !r.is_excluded).collect();
    let index = legacy_index(&included);
    let mut refs: Vec<String> = included
        .iter()
        .filter_map(|r| r.parent_ref())
        .filter(|p| !index.contains_key(p))
        .map(str::to_string)
        .collect();
    refs.sort();
    refs.dedup();
    refs
}

/// Validate every included row. Excluded rows are skipped entirely.
pub fn validate_batch(ctx: &BatchContext<'_>, rows: &[DataRow]) -> ValidationReport {
    let mut included: Vec<&DataRow> = rows.iter().filter(|r| !r.is_excluded).collect();
    included.sort_by_key(|r| r.row_number);

    let mut issues: Vec<ValidationIssue> = Vec::new();
    for row in &included {
        check_row(ctx, row, &mut issues);
    }
    check_duplicates(ctx, &included, &mut issues);
    check_hierarchy(ctx, &included, &mut issues);

    issues.sort_by_key(|i| i.row_number);

    let included_numbers: Vec<RowNumber> = included.iter().map(|r| r.row_number).collect();
    let stats = summarize(&included_numbers, &issues);
    let error_rows = rows_with(&issues, Severity::Error);
    let validity: Vec<(RowNumber, bool)> = included_numbers
        .iter()
        .map(|n| (*n, !error_rows.contains(n)))
        .collect();

    ValidationReport {
        stats,
        issues,
        validity,
    }
}

fn rows_with<'a>(
    issues: impl IntoIterator<Item = &'a ValidationIssue>,
    severity: Severity,
) -> HashSet<RowNumber> {
    issues
        .into_iter()
        .filter(|i| i.severity == severity)
        .map(|i| i.row_number)
        .collect()
}

/// Stats for a set of included rows and the issues reported on them.
/// Issues on rows outside `included` are ignored.
pub fn summarize(included: &[RowNumber], issues: &[ValidationIssue]) -> ValidationStats {
    let rows: HashSet<RowNumber> = included.iter().copied().collect();
    let issues: Vec<&ValidationIssue> = issues.iter().filter(|i| rows.contains(&i.row_number)).collect();
    let count = |sev: Severity| issues.iter().filter(|i| i.severity == sev).count() as i32;
    let error_rows = rows_with(issues.iter().copied(), Severity::Error);
    let warning_rows = rows_with(issues.iter().copied(), Severity::Warning);

    ValidationStats {
        total: rows.len() as i32,
        valid: rows.difference(&error_rows).count() as i32,
        warning_rows: warning_rows.difference(&error_rows).count() as i32,
        error_rows: error_rows.len() as i32,
        errors: count(Severity::Error),
        warnings: count(Severity::Warning),
        infos: count(Severity::Info),
    }
}

/// Checks that look at one row in isolation.
fn check_row(ctx: &BatchContext<'_>, row: &DataRow, issues: &mut Vec<ValidationIssue>) {
    let n = row.row_number;

    for &field in required_fields(ctx.standard) {
        if row.field(field).is_none() {
            issues.push(ValidationIssue::new(
                n,
                Some(field),
                Severity::Error,
                Rule::Required,
                format!("Required field '{field}' is empty"),
            ));
        }
    }

    for (field, value) in &row.fields {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if let FieldKind::Vocabulary { values, strict } = field_kind(field) {
            if vocabulary_match(values, value).is_none() {
                let (severity, message) = if strict {
                    (
                        Severity::Error,
                        format!("'{value}' is not a valid {field}; expected one of {}", values.join(", ")),
                    )
                } else {
                    (
                        Severity::Warning,
                        format!("{field} '{value}' may not be recognized"),
                    )
                };
                issues.push(ValidationIssue::new(
                    n,
                    Some(field.as_str()),
                    severity,
                    Rule::Vocabulary,
                    message,
                ));
            }
        }
    }

    for &field in DATE_FIELDS {
        if let Some(value) = row.field(field) {
            if normalize_date(value).is_none() {
                issues.push(ValidationIssue::new(
                    n,
                    Some(field),
                    Severity::Warning,
                    Rule::DateFormat,
                    format!("Date '{value}' may not be in a recognized format (YYYY-MM-DD preferred)"),
                ));
            }
        }
    }

    if let Some(culture) = row.field(CULTURE) {
        if !CULTURE_RE.is_match(culture) {
            issues.push(ValidationIssue::new(
                n,
                Some(CULTURE),
                Severity::Warning,
                Rule::Culture,
                format!("Culture '{culture}' is not a two or three letter language code"),
            ));
        }
    }

    if let Some(parent_id) = ctx.missing_parent {
        issues.push(ValidationIssue::new(
            n,
            None,
            Severity::Error,
            Rule::ParentNotFound,
            format!("Parent record {parent_id} selected for '{}' placement does not exist", ctx.placement),
        ));
    }

    if let Some(parent) = row.parent_ref() {
        if ctx.placement != ParentPlacement::CsvHierarchy {
            issues.push(ValidationIssue::new(
                n,
                Some(PARENT_ID),
                Severity::Info,
                Rule::ParentIgnored,
                format!(
                    "Parent reference '{parent}' is ignored under '{}' placement",
                    ctx.placement
                ),
            ));
        }
    }
}

/// Duplicate legacy ids and duplicate or missing digital objects.
fn check_duplicates(ctx: &BatchContext<'_>, rows: &[&DataRow], issues: &mut Vec<ValidationIssue>) {
    let mut seen_ids: HashMap<&str, RowNumber> = HashMap::new();
    let mut seen_sums: HashMap<&str, RowNumber> = HashMap::new();

    for row in rows {
        let n = row.row_number;

        if let Some(id) = row.legacy_id() {
            match seen_ids.get(id) {
                Some(first) => issues.push(ValidationIssue::new(
                    n,
                    Some(LEGACY_ID),
                    Severity::Error,
                    Rule::DuplicateLegacyId,
                    format!("Duplicate legacyId '{id}' (also on row {first})"),
                )),
                None => {
                    seen_ids.insert(id, n);
                }
            }
        }

        let matched = ctx
            .payload
            .and_then(|index| index.resolve(ctx.match_strategy, row.match_keys()));

        if let Some(path) = row.digital_object_path() {
            if matched.is_none() {
                issues.push(ValidationIssue::new(
                    n,
                    Some(crate::fields::DIGITAL_OBJECT_PATH),
                    Severity::Warning,
                    Rule::DigitalObjectMissing,
                    format!("Digital object file not found: {}", base_name(path)),
                ));
            }
        }

        if let Some(sum) = matched.and_then(|f| f.checksum.as_deref()) {
            match seen_sums.get(sum) {
                Some(first) => issues.push(ValidationIssue::new(
                    n,
                    Some(crate::fields::DIGITAL_OBJECT_PATH),
                    Severity::Warning,
                    Rule::DuplicateChecksum,
                    format!("Duplicate file checksum (same file as row {first})"),
                )),
                None => {
                    seen_sums.insert(sum, n);
                }
            }
        }
    }
}

/// Parent references and cycles, under `csv_hierarchy` placement only.
fn check_hierarchy(ctx: &BatchContext<'_>, rows: &[&DataRow], issues: &mut Vec<ValidationIssue>) {
    if ctx.placement != ParentPlacement::CsvHierarchy {
        return;
    }
    let index = legacy_index(rows);
    for row in rows {
        if let Some(parent) = row.parent_ref() {
            if !index.contains_key(parent) && !ctx.existing_parents.contains(parent) {
                issues.push(ValidationIssue::new(
                    row.row_number,
                    Some(PARENT_ID),
                    Severity::Error,
                    Rule::ParentNotFound,
                    format!("Parent reference '{parent}' not found in batch or existing records"),
                ));
            }
        }
    }

    for n in plan_commit_order(rows).cyclic {
        issues.push(ValidationIssue::new(
            n,
            Some(PARENT_ID),
            Severity::Error,
            Rule::HierarchyCycle,
            "Parent chain loops back on itself",
        ));
    }
}

//! Ingest session configuration and the wizard's stage machine.
//!
//! A session walks `configure → upload → map → validate → preview → commit`
//! and ends in `completed`, `failed` or `cancelled`. Before commit the user
//! may step back one stage at a time; from commit onwards only the commit
//! engine and rollback move the stage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::digital_object::MatchStrategy;
use crate::error::CoreError;
use crate::mapping::IdentifierCounter;
use crate::types::{DbId, Timestamp};

/// Level of description used for a newly created parent when none is given.
pub const DEFAULT_NEW_PARENT_LEVEL: &str = "Fonds";

// ── Stage ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Configure,
    Upload,
    Map,
    Validate,
    Preview,
    Commit,
    Completed,
    Failed,
    Cancelled,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Self::Configure,
        Self::Upload,
        Self::Map,
        Self::Validate,
        Self::Preview,
        Self::Commit,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::Upload => "upload",
            Self::Map => "map",
            Self::Validate => "validate",
            Self::Preview => "preview",
            Self::Commit => "commit",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Stages in which the user still edits the session.
    pub fn is_pre_commit(&self) -> bool {
        matches!(
            self,
            Self::Configure | Self::Upload | Self::Map | Self::Validate | Self::Preview
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Next stage on the wizard path.
    pub fn successor(&self) -> Option<Stage> {
        match self {
            Self::Configure => Some(Self::Upload),
            Self::Upload => Some(Self::Map),
            Self::Map => Some(Self::Validate),
            Self::Validate => Some(Self::Preview),
            Self::Preview => Some(Self::Commit),
            _ => None,
        }
    }

    /// The one "back" edge a stage offers.
    pub fn back(&self) -> Option<Stage> {
        match self {
            Self::Upload => Some(Self::Configure),
            Self::Map => Some(Self::Upload),
            Self::Validate => Some(Self::Map),
            Self::Preview => Some(Self::Validate),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown stage '{s}'")))
    }
}

/// Check a user-requested wizard move (forward one stage or back one stage).
pub fn check_advance(from: Stage, to: Stage) -> Result<(), CoreError> {
    if from.successor() == Some(to) || from.back() == Some(to) {
        Ok(())
    } else {
        Err(CoreError::transition(from, to))
    }
}

/// Check any stage move, including the ones made by commit, rollback
/// and cancellation.
pub fn check_transition(from: Stage, to: Stage) -> Result<(), CoreError> {
    let allowed = match (from, to) {
        (f, t) if f.successor() == Some(t) || f.back() == Some(t) => true,
        // Commit may start straight from validate; a failed job may be retried.
        (Stage::Validate | Stage::Failed, Stage::Commit) => true,
        (Stage::Commit, Stage::Completed | Stage::Failed) => true,
        (f, Stage::Cancelled) if f.is_pre_commit() => true,
        // Rollback.
        (Stage::Completed | Stage::Failed, Stage::Cancelled) => true,
        _ => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(CoreError::transition(from, to))
    }
}

// ── Sector & standard ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Archive,
    Museum,
    Library,
    Gallery,
    Dam,
}

impl Sector {
    pub const ALL: [Sector; 5] = [
        Self::Archive,
        Self::Museum,
        Self::Library,
        Self::Gallery,
        Self::Dam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Museum => "museum",
            Self::Library => "library",
            Self::Gallery => "gallery",
            Self::Dam => "dam",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sector {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sector| sector.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown sector '{s}'")))
    }
}

/// Descriptive standard the imported records follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standard {
    Isadg,
    Dc,
    Rad,
    Dacs,
    Spectrum,
    Cco,
}

impl Standard {
    pub const ALL: [Standard; 6] = [
        Self::Isadg,
        Self::Dc,
        Self::Rad,
        Self::Dacs,
        Self::Spectrum,
        Self::Cco,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Isadg => "isadg",
            Self::Dc => "dc",
            Self::Rad => "rad",
            Self::Dacs => "dacs",
            Self::Spectrum => "spectrum",
            Self::Cco => "cco",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Isadg => "ISAD(G)",
            Self::Dc => "Dublin Core",
            Self::Rad => "RAD",
            Self::Dacs => "DACS",
            Self::Spectrum => "SPECTRUM",
            Self::Cco => "CCO",
        }
    }

    /// Sectors this standard may be used for.
    pub fn sectors(&self) -> &'static [Sector] {
        match self {
            Self::Isadg => &[Sector::Archive, Sector::Library],
            Self::Rad | Self::Dacs => &[Sector::Archive],
            Self::Dc => &Sector::ALL,
            Self::Spectrum | Self::Cco => &[Sector::Museum, Sector::Gallery],
        }
    }

    pub fn supports(&self, sector: Sector) -> bool {
        self.sectors().contains(&sector)
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Standard {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|std| std.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown descriptive standard '{s}'")))
    }
}

/// Standards offered for a sector.
pub fn standards_for(sector: Sector) -> Vec<Standard> {
    Standard::ALL
        .into_iter()
        .filter(|s| s.supports(sector))
        .collect()
}

// ── Hierarchy placement ──────────────────────────────────────────────

/// Where imported records attach in the existing record tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentPlacement {
    #[default]
    TopLevel,
    Existing,
    New,
    CsvHierarchy,
}

impl ParentPlacement {
    pub const ALL: [ParentPlacement; 4] = [
        Self::TopLevel,
        Self::Existing,
        Self::New,
        Self::CsvHierarchy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopLevel => "top_level",
            Self::Existing => "existing",
            Self::New => "new",
            Self::CsvHierarchy => "csv_hierarchy",
        }
    }
}

impl fmt::Display for ParentPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParentPlacement {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown parent placement '{s}'")))
    }
}

// ── Options ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    pub create_records: bool,
    pub generate_sip: bool,
    pub generate_aip: bool,
    pub generate_dip: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            create_records: true,
            generate_sip: false,
            generate_aip: false,
            generate_dip: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivativeOptions {
    pub thumbnails: bool,
    pub reference: bool,
    pub normalize_format: Option<String>,
}

/// Downstream processors to run on each attached digital object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingFlags {
    pub virus_scan: bool,
    pub ocr: bool,
    pub ner: bool,
    pub summarize: bool,
    pub spellcheck: bool,
    pub translate: bool,
    pub translate_language: Option<String>,
    pub format_id: bool,
    pub face_detect: bool,
}

impl ProcessingFlags {
    /// Names of the enabled processors, in execution order.
    pub fn enabled(&self) -> Vec<&'static str> {
        [
            (self.virus_scan, "virus_scan"),
            (self.format_id, "format_id"),
            (self.ocr, "ocr"),
            (self.ner, "ner"),
            (self.summarize, "summarize"),
            (self.spellcheck, "spellcheck"),
            (self.translate, "translate"),
            (self.face_detect, "face_detect"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

// ── Session configuration ────────────────────────────────────────────

/// Everything the configure stage captures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub title: String,
    pub sector: Sector,
    pub standard: Standard,
    #[serde(default)]
    pub repository_id: Option<DbId>,
    #[serde(default)]
    pub parent_placement: ParentPlacement,
    #[serde(default)]
    pub parent_id: Option<DbId>,
    #[serde(default)]
    pub new_parent_title: Option<String>,
    #[serde(default)]
    pub new_parent_level: Option<String>,
    #[serde(default)]
    pub output: OutputOptions,
    #[serde(default)]
    pub derivatives: DerivativeOptions,
    #[serde(default)]
    pub processing: ProcessingFlags,
    #[serde(default)]
    pub security_classification_id: Option<DbId>,
    #[serde(default)]
    pub do_match_strategy: MatchStrategy,
    /// Fills `identifier` on rows that leave it empty.
    #[serde(default)]
    pub identifier_counter: Option<IdentifierCounter>,
}

impl SessionConfig {
    /// Top-level placement with default options.
    pub fn new(title: impl Into<String>, sector: Sector, standard: Standard) -> Self {
        Self {
            title: title.into(),
            sector,
            standard,
            repository_id: None,
            parent_placement: ParentPlacement::default(),
            parent_id: None,
            new_parent_title: None,
            new_parent_level: None,
            output: OutputOptions::default(),
            derivatives: DerivativeOptions::default(),
            processing: ProcessingFlags::default(),
            security_classification_id: None,
            do_match_strategy: MatchStrategy::default(),
            identifier_counter: None,
        }
    }

    /// Reject configurations the wizard cannot carry through to commit.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::Validation("Session title is required".into()));
        }
        if !self.standard.supports(self.sector) {
            return Err(CoreError::Validation(format!(
                "Standard '{}' is not applicable to the '{}' sector",
                self.standard.label(),
                self.sector
            )));
        }
        if self.parent_placement == ParentPlacement::Existing && self.parent_id.is_none() {
            return Err(CoreError::Validation(
                "An existing parent must be selected for 'existing' placement".into(),
            ));
        }
        if self.processing.translate
            && !self
                .processing
                .translate_language
                .as_deref()
                .is_some_and(|l| !l.trim().is_empty())
        {
            return Err(CoreError::Validation(
                "A target language is required when translation is enabled".into(),
            ));
        }
        if let Some(counter) = &self.identifier_counter {
            counter.validate()?;
        }
        Ok(())
    }

    /// Title and level for the parent created under `new` placement.
    pub fn new_parent(&self) -> (String, String) {
        let title = self
            .new_parent_title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(self.title.trim())
            .to_string();
        let level = self
            .new_parent_level
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_NEW_PARENT_LEVEL)
            .to_string();
        (title, level)
    }
}

// ── Stored session ───────────────────────────────────────────────────

/// A wizard session as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestSession {
    pub id: DbId,
    #[serde(flatten)]
    pub config: SessionConfig,
    pub stage: Stage,
    /// Set by a validation run, cleared by anything that edits rows or mappings.
    pub validation_current: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn config(sector: Sector, standard: Standard) -> SessionConfig {
        SessionConfig {
            title: "Harbour board minutes".into(),
            sector,
            standard,
            repository_id: None,
            parent_placement: ParentPlacement::TopLevel,
            parent_id: None,
            new_parent_title: None,
            new_parent_level: None,
            output: OutputOptions::default(),
            derivatives: DerivativeOptions::default(),
            processing: ProcessingFlags::default(),
            security_classification_id: None,
            do_match_strategy: MatchStrategy::Filename,
            identifier_counter: None,
        }
    }

    // -- Stage edges --

    #[test]
    fn forward_path_is_accepted() {
        let path = [
            Stage::Configure,
            Stage::Upload,
            Stage::Map,
            Stage::Validate,
            Stage::Preview,
            Stage::Commit,
        ];
        for pair in path.windows(2) {
            assert!(check_advance(pair[0], pair[1]).is_ok(), "{:?}", pair);
        }
    }

    #[test]
    fn back_edges_are_accepted() {
        assert!(check_advance(Stage::Upload, Stage::Configure).is_ok());
        assert!(check_advance(Stage::Map, Stage::Upload).is_ok());
        assert!(check_advance(Stage::Validate, Stage::Map).is_ok());
        assert!(check_advance(Stage::Preview, Stage::Validate).is_ok());
    }

    #[test]
    fn every_other_wizard_move_is_rejected() {
        for from in Stage::ALL {
            for to in Stage::ALL {
                let legal = from.successor() == Some(to) || from.back() == Some(to);
                if !legal {
                    assert_matches!(
                        check_advance(from, to),
                        Err(CoreError::InvalidTransition { .. }),
                        "{from} -> {to}"
                    );
                }
            }
        }
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        assert_matches!(
            check_advance(Stage::Upload, Stage::Validate),
            Err(CoreError::InvalidTransition { from, to }) if from == "upload" && to == "validate"
        );
    }

    #[test]
    fn engine_edges() {
        assert!(check_transition(Stage::Validate, Stage::Commit).is_ok());
        assert!(check_transition(Stage::Failed, Stage::Commit).is_ok());
        assert!(check_transition(Stage::Commit, Stage::Completed).is_ok());
        assert!(check_transition(Stage::Completed, Stage::Cancelled).is_ok());
        assert!(check_transition(Stage::Completed, Stage::Commit).is_err());
        assert!(check_transition(Stage::Commit, Stage::Cancelled).is_err());
        assert!(check_transition(Stage::Cancelled, Stage::Configure).is_err());
    }

    #[test]
    fn terminal_stages_have_no_wizard_edges() {
        for stage in [Stage::Completed, Stage::Failed, Stage::Cancelled] {
            assert!(stage.is_terminal());
            assert!(stage.successor().is_none());
            assert!(stage.back().is_none());
        }
    }

    #[test]
    fn stage_names_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
        assert!("review".parse::<Stage>().is_err());
    }

    // -- Compatibility table --

    #[test]
    fn compatibility_table() {
        assert!(Standard::Isadg.supports(Sector::Archive));
        assert!(Standard::Isadg.supports(Sector::Library));
        assert!(!Standard::Isadg.supports(Sector::Museum));
        assert!(!Standard::Rad.supports(Sector::Library));
        assert!(Standard::Spectrum.supports(Sector::Gallery));
        assert!(!Standard::Cco.supports(Sector::Dam));
        for sector in Sector::ALL {
            assert!(Standard::Dc.supports(sector));
        }
    }

    #[test]
    fn standards_for_dam_is_dublin_core_only() {
        assert_eq!(standards_for(Sector::Dam), vec![Standard::Dc]);
    }

    // -- Config validation --

    #[test]
    fn incompatible_pair_rejected() {
        let cfg = config(Sector::Museum, Standard::Isadg);
        assert_matches!(cfg.validate(), Err(CoreError::Validation(msg)) if msg.contains("ISAD(G)"));
    }

    #[test]
    fn existing_placement_needs_parent() {
        let mut cfg = config(Sector::Archive, Standard::Isadg);
        cfg.parent_placement = ParentPlacement::Existing;
        assert!(cfg.validate().is_err());
        cfg.parent_id = Some(7);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn translate_needs_language() {
        let mut cfg = config(Sector::Archive, Standard::Dc);
        cfg.processing.translate = true;
        assert!(cfg.validate().is_err());
        cfg.processing.translate_language = Some("fr".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn blank_title_rejected() {
        let mut cfg = config(Sector::Archive, Standard::Dc);
        cfg.title = "   ".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn new_parent_defaults_to_session_title_and_fonds() {
        let mut cfg = config(Sector::Archive, Standard::Isadg);
        cfg.parent_placement = ParentPlacement::New;
        assert_eq!(
            cfg.new_parent(),
            ("Harbour board minutes".to_string(), "Fonds".to_string())
        );
        cfg.new_parent_title = Some("Board records".into());
        cfg.new_parent_level = Some("Collection".into());
        assert_eq!(
            cfg.new_parent(),
            ("Board records".to_string(), "Collection".to_string())
        );
    }

    #[test]
    fn enabled_processors_in_order() {
        let flags = ProcessingFlags {
            ocr: true,
            virus_scan: true,
            translate: true,
            translate_language: Some("fr".into()),
            ..Default::default()
        };
        assert_eq!(flags.enabled(), vec!["virus_scan", "ocr", "translate"]);
    }
}

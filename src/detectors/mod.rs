//! Gap detectors.
//!
//! Each detector is a stateless strategy behind the [`Detector`] trait. It
//! extracts structural tokens from one rule regex, synthesizes alternative
//! phrasings of the same dangerous command, and reports a [`Gap`] for every
//! phrasing the regex does not cover. Detectors never look at other rules and
//! never execute anything.
//!
//! | Detector | Extracts | Coverage test |
//! |----------|----------|---------------|
//! | [`argument`] | flags | full regex match on a synthesized command |
//! | [`path`] | path fragments | normalized substring of the regex text |
//! | [`wildcard`] | glob metacharacters | substring of the regex text |
//! | [`platform`] | nothing (static table) | command-name probes on the regex text |

pub mod argument;
pub mod coverage;
pub mod path;
pub mod platform;
pub mod severity;
pub mod wildcard;

use crate::rules::Pattern;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info};

pub use argument::ArgumentOrderDetector;
pub use path::PathVariantDetector;
pub use platform::PlatformEquivalentDetector;
pub use severity::GapSeverity;
pub use wildcard::WildcardDetector;

/// Which detector produced a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    ArgumentOrder,
    PathVariant,
    Wildcard,
    Platform,
}

impl GapType {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ArgumentOrder => "argument_order",
            Self::PathVariant => "path_variant",
            Self::Wildcard => "wildcard",
            Self::Platform => "platform",
        }
    }

    /// Title-cased label for report headings ("Argument Order").
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::ArgumentOrder => "Argument Order",
            Self::PathVariant => "Path Variant",
            Self::Wildcard => "Wildcard",
            Self::Platform => "Platform",
        }
    }
}

/// A synthesized alternative phrasing of a rule's command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// Human-readable shape of the variant (becomes `Gap::missing_variant`).
    pub description: String,
    /// What the coverage test is run against: a full command for the
    /// argument detector, a regex fragment for path/wildcard.
    pub test_input: String,
    /// Concrete command demonstrating the bypass.
    pub example: String,
    /// Suggested regex change.
    pub recommendation: String,
}

/// A rule regex failing to match a realistic variant.
///
/// All fields are copies of the originating pattern so that gaps serialize
/// on their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    #[serde(rename = "type")]
    pub gap_type: GapType,
    pub severity: GapSeverity,
    pub original_pattern: String,
    pub missing_variant: String,
    pub example_command: String,
    pub recommendation: String,
    pub affected_command: String,
    pub source_location: usize,
}

impl Gap {
    #[must_use]
    pub fn new(
        pattern: &Pattern,
        gap_type: GapType,
        severity: GapSeverity,
        missing_variant: impl Into<String>,
        example_command: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            gap_type,
            severity,
            original_pattern: pattern.regex().to_string(),
            missing_variant: missing_variant.into(),
            example_command: example_command.into(),
            recommendation: recommendation.into(),
            affected_command: pattern.command_base().to_string(),
            source_location: pattern.source_location(),
        }
    }
}

/// A gap detector: `Pattern -> Vec<Gap>`, no shared state.
pub trait Detector: Send + Sync {
    fn kind(&self) -> DetectorKind;

    /// Gaps for one pattern. Returns an empty list when the pattern has
    /// nothing this detector can vary.
    fn detect(&self, pattern: &Pattern) -> Vec<Gap>;
}

/// Detector selector, as used by `--detector` and the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Argument,
    Path,
    Wildcard,
    Platform,
}

impl DetectorKind {
    /// Run order when all detectors are selected.
    pub const ALL: [Self; 4] = [Self::Argument, Self::Path, Self::Wildcard, Self::Platform];

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Argument => "argument",
            Self::Path => "path",
            Self::Wildcard => "wildcard",
            Self::Platform => "platform",
        }
    }

    #[must_use]
    pub const fn summary(&self) -> &'static str {
        match self {
            Self::Argument => "flag/argument order permutations (rm /path -rf, rm -r -f)",
            Self::Path => "path spellings (../, ../., /*, trailing slashes)",
            Self::Wildcard => "glob and brace-expansion shapes (**, ./*, {a,b})",
            Self::Platform => "equivalent commands on PowerShell and cmd.exe",
        }
    }

    #[must_use]
    pub fn detector(&self) -> &'static dyn Detector {
        match self {
            Self::Argument => &ArgumentOrderDetector,
            Self::Path => &PathVariantDetector,
            Self::Wildcard => &WildcardDetector,
            Self::Platform => &PlatformEquivalentDetector,
        }
    }
}

/// Which detectors a run uses: every detector, or exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorSelection {
    #[default]
    All,
    Only(DetectorKind),
}

impl DetectorSelection {
    #[must_use]
    pub fn kinds(&self) -> Vec<DetectorKind> {
        match self {
            Self::All => DetectorKind::ALL.to_vec(),
            Self::Only(kind) => vec![*kind],
        }
    }
}

impl From<Option<DetectorKind>> for DetectorSelection {
    fn from(kind: Option<DetectorKind>) -> Self {
        kind.map_or(Self::All, Self::Only)
    }
}

/// Runs the selected detectors over a rule set.
#[derive(Debug, Clone)]
pub struct Analyzer {
    detectors: Vec<DetectorKind>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(&DetectorKind::ALL)
    }
}

impl Analyzer {
    /// Build an analyzer for the given detectors. Duplicates are dropped and
    /// run order always follows [`DetectorKind::ALL`].
    #[must_use]
    pub fn new(selected: &[DetectorKind]) -> Self {
        let detectors = DetectorKind::ALL
            .into_iter()
            .filter(|kind| selected.contains(kind))
            .collect();
        Self { detectors }
    }

    #[must_use]
    pub fn from_selection(selection: DetectorSelection) -> Self {
        Self::new(&selection.kinds())
    }

    #[must_use]
    pub fn detectors(&self) -> &[DetectorKind] {
        &self.detectors
    }

    /// Gaps for every (detector, pattern) pair, in detector order then
    /// pattern order. Deterministic for a given input.
    #[must_use]
    pub fn analyze(&self, patterns: &[Pattern]) -> Vec<Gap> {
        let mut gaps = Vec::new();

        for kind in &self.detectors {
            info!(detector = kind.label(), "running detector");
            let detector = kind.detector();
            let before = gaps.len();

            for pattern in patterns {
                gaps.extend(run_isolated(detector, pattern));
            }

            debug!(
                detector = kind.label(),
                gaps = gaps.len() - before,
                "detector finished"
            );
        }

        gaps
    }
}

/// Run one detector on one pattern; a panic is logged and yields no gaps.
fn run_isolated(detector: &dyn Detector, pattern: &Pattern) -> Vec<Gap> {
    std::panic::catch_unwind(AssertUnwindSafe(|| detector.detect(pattern))).unwrap_or_else(|_| {
        error!(
            detector = detector.kind().label(),
            line = pattern.source_location(),
            regex = pattern.regex(),
            "detector panicked; skipping pattern"
        );
        Vec::new()
    })
}

/// True for base commands that delete files (last word of the base, so
/// `sudo rm` counts).
#[must_use]
pub fn is_deletion_command(command_base: &str) -> bool {
    const DELETION_COMMANDS: &[&str] = &[
        "rm", "rmdir", "unlink", "shred", "remove-item", "del", "erase", "rd",
    ];
    command_base
        .split_whitespace()
        .last()
        .is_some_and(|word| DELETION_COMMANDS.contains(&word.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RiskLevel, ShellScope};

    struct PanickingDetector;

    impl Detector for PanickingDetector {
        fn kind(&self) -> DetectorKind {
            DetectorKind::Argument
        }

        fn detect(&self, _pattern: &Pattern) -> Vec<Gap> {
            panic!("boom");
        }
    }

    #[test]
    fn gap_copies_pattern_fields() {
        let pattern = Pattern::new(r"rm\s+-rf", "d", RiskLevel::High, None, 12);
        let gap = Gap::new(&pattern, GapType::Wildcard, GapSeverity::Low, "v", "e", "r");
        assert_eq!(gap.original_pattern, r"rm\s+-rf");
        assert_eq!(gap.affected_command, "rm");
        assert_eq!(gap.source_location, 12);
    }

    #[test]
    fn gap_serializes_type_key() {
        let pattern = Pattern::new(r"rm\s+-rf", "d", RiskLevel::High, None, 1);
        let gap = Gap::new(&pattern, GapType::PathVariant, GapSeverity::High, "v", "e", "r");
        let json = serde_json::to_value(&gap).unwrap();
        assert_eq!(json["type"], "path_variant");
        assert_eq!(json["severity"], "high");
    }

    #[test]
    fn analyzer_dedups_and_orders_detectors() {
        let analyzer = Analyzer::new(&[
            DetectorKind::Platform,
            DetectorKind::Argument,
            DetectorKind::Platform,
        ]);
        assert_eq!(
            analyzer.detectors(),
            &[DetectorKind::Argument, DetectorKind::Platform]
        );
    }

    #[test]
    fn selection_from_cli_flag() {
        assert_eq!(DetectorSelection::from(None), DetectorSelection::All);
        assert_eq!(
            DetectorSelection::from(Some(DetectorKind::Wildcard)).kinds(),
            vec![DetectorKind::Wildcard]
        );
        assert_eq!(
            Analyzer::from_selection(DetectorSelection::All).detectors(),
            &DetectorKind::ALL
        );
    }

    #[test]
    fn analyzer_runs_only_selected_detector() {
        let patterns = vec![Pattern::new(r"rm\s+-rf\s+\.\.", "d", RiskLevel::Critical, None, 1)];
        let gaps = Analyzer::new(&[DetectorKind::Path]).analyze(&patterns);
        assert!(!gaps.is_empty());
        assert!(gaps.iter().all(|g| g.gap_type == GapType::PathVariant));
    }

    #[test]
    fn panicking_detector_is_contained() {
        let pattern = Pattern::new(r"rm\s+-rf", "d", RiskLevel::High, Some(ShellScope::Bash), 1);
        assert!(run_isolated(&PanickingDetector, &pattern).is_empty());
    }

    #[test]
    fn deletion_command_detection() {
        assert!(is_deletion_command("rm"));
        assert!(is_deletion_command("sudo rm"));
        assert!(is_deletion_command("Remove-Item"));
        assert!(!is_deletion_command("chmod"));
        assert!(!is_deletion_command("format"));
    }
}

//! Report assembly and rendering.
//!
//! Gaps from every detector are filtered by a minimum severity, sorted
//! (critical first, discovery order within a tier) and rendered as JSON or
//! Markdown together with a summary of the analyzed rule set.

use crate::detectors::{Gap, GapSeverity};
use crate::error::Result;
use crate::rules::{Pattern, PatternSummary};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Version written into report metadata.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of base commands listed in the Markdown summary.
const TOP_COMMANDS: usize = 10;

/// Output format for `pga analyze`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
}

impl ReportFormat {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportMetadata {
    /// RFC 3339, UTC.
    pub generated_at: String,
    pub patterns_analyzed: usize,
    pub gaps_found: usize,
    pub tool_version: String,
}

/// Gap counts per severity tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    #[must_use]
    pub fn from_gaps(gaps: &[Gap]) -> Self {
        let mut counts = Self::default();
        for gap in gaps {
            match gap.severity {
                GapSeverity::Critical => counts.critical += 1,
                GapSeverity::High => counts.high += 1,
                GapSeverity::Medium => counts.medium += 1,
                GapSeverity::Low => counts.low += 1,
            }
        }
        counts
    }

    #[must_use]
    pub const fn get(&self, severity: GapSeverity) -> usize {
        match severity {
            GapSeverity::Critical => self.critical,
            GapSeverity::High => self.high,
            GapSeverity::Medium => self.medium,
            GapSeverity::Low => self.low,
        }
    }
}

/// A finished gap-analysis report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub pattern_summary: PatternSummary,
    pub severity_counts: SeverityCounts,
    pub gaps: Vec<Gap>,
    #[serde(skip)]
    generated: DateTime<Utc>,
}

impl Report {
    /// Assemble a report stamped with the current time. Gaps are sorted.
    #[must_use]
    pub fn build(patterns: &[Pattern], gaps: Vec<Gap>) -> Self {
        Self::build_at(patterns, gaps, Utc::now())
    }

    /// Assemble a report with an explicit timestamp.
    #[must_use]
    pub fn build_at(patterns: &[Pattern], mut gaps: Vec<Gap>, generated: DateTime<Utc>) -> Self {
        sort_gaps(&mut gaps);
        Self {
            metadata: ReportMetadata {
                generated_at: generated.to_rfc3339_opts(SecondsFormat::Secs, true),
                patterns_analyzed: patterns.len(),
                gaps_found: gaps.len(),
                tool_version: TOOL_VERSION.to_string(),
            },
            pattern_summary: PatternSummary::from_patterns(patterns),
            severity_counts: SeverityCounts::from_gaps(&gaps),
            gaps,
            generated,
        }
    }

    /// Gaps of one severity, in report order.
    pub fn gaps_with(&self, severity: GapSeverity) -> impl Iterator<Item = &Gap> {
        self.gaps.iter().filter(move |gap| gap.severity == severity)
    }

    /// Render in the requested format.
    ///
    /// # Errors
    /// Returns [`crate::AnalyzerError::Serialize`] if JSON serialization fails.
    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Json => render_json(self),
            ReportFormat::Markdown => Ok(render_markdown(self)),
        }
    }
}

/// Keep gaps with `severity >= min`.
#[must_use]
pub fn filter_by_min_severity(gaps: Vec<Gap>, min: GapSeverity) -> Vec<Gap> {
    gaps.into_iter().filter(|gap| gap.severity >= min).collect()
}

/// Stable sort, critical first. Discovery order is kept within a tier.
pub fn sort_gaps(gaps: &mut [Gap]) {
    gaps.sort_by_key(|gap| gap.severity.rank());
}

/// Pretty-printed JSON.
///
/// # Errors
/// Returns [`crate::AnalyzerError::Serialize`] if serialization fails.
pub fn render_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

const fn severity_marker(severity: GapSeverity) -> &'static str {
    match severity {
        GapSeverity::Critical => "🔴",
        GapSeverity::High => "🟠",
        GapSeverity::Medium => "🟡",
        GapSeverity::Low => "⚪",
    }
}

/// Markdown report for humans.
#[must_use]
pub fn render_markdown(report: &Report) -> String {
    let counts = &report.severity_counts;
    let summary = &report.pattern_summary;
    let mut lines: Vec<String> = Vec::new();

    lines.push("# Safety Pattern Gap Analysis Report".to_string());
    lines.push(String::new());
    lines.push(format!(
        "**Generated**: {}",
        report.generated.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.push(format!(
        "**Patterns Analyzed**: {}",
        report.metadata.patterns_analyzed
    ));
    lines.push(format!(
        "**Gaps Found**: {} ({} critical, {} high, {} medium, {} low)",
        report.gaps.len(),
        counts.critical,
        counts.high,
        counts.medium,
        counts.low
    ));
    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());

    lines.push("## Pattern Summary".to_string());
    lines.push(String::new());
    lines.push(format!("- **Total Patterns**: {}", summary.total));
    lines.push("- **By Risk Level**:".to_string());
    for (risk, count) in ordered_risk_counts(summary) {
        lines.push(format!("  - {risk}: {count}"));
    }
    lines.push("- **By Shell**:".to_string());
    for (shell, count) in &summary.by_shell {
        lines.push(format!("  - {shell}: {count}"));
    }
    let top = summary.top_commands(TOP_COMMANDS);
    if !top.is_empty() {
        lines.push("- **Top Commands**:".to_string());
        for (command, count) in top {
            lines.push(format!("  - `{command}`: {count}"));
        }
    }
    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());

    for severity in GapSeverity::DESCENDING {
        let tier_count = counts.get(severity);
        if tier_count == 0 {
            continue;
        }

        lines.push(format!(
            "## {} {} Severity Gaps ({tier_count})",
            severity_marker(severity),
            severity.label().to_uppercase()
        ));
        lines.push(String::new());

        for (i, gap) in report.gaps_with(severity).enumerate() {
            push_gap(&mut lines, i + 1, gap);
        }
    }

    lines.push("## Summary & Next Steps".to_string());
    lines.push(String::new());
    if counts.critical > 0 {
        lines.push("### ⚠️ Critical Gaps Require Immediate Attention".to_string());
        lines.push(String::new());
        lines.push(format!(
            "Found {} critical gaps. These should be fixed ASAP.",
            counts.critical
        ));
        lines.push(String::new());
    }
    if report.gaps.is_empty() {
        lines.push("✅ **No gaps detected!** All patterns have comprehensive coverage.".to_string());
        lines.push(String::new());
    } else {
        lines.push("### Action Items".to_string());
        lines.push(String::new());
        lines.push("1. Review each gap starting with Critical severity".to_string());
        lines.push("2. Add test cases for missing variants".to_string());
        lines.push("3. Update patterns to cover gaps".to_string());
        lines.push("4. Re-run this analyzer to verify fixes".to_string());
        lines.push(String::new());
    }

    lines.push("---".to_string());
    lines.push(String::new());
    lines.push(format!("*Generated by Pattern Gap Analyzer v{TOOL_VERSION}*"));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn push_gap(lines: &mut Vec<String>, index: usize, gap: &Gap) {
    lines.push(format!(
        "### Gap {index}: {} - {}",
        gap.gap_type.title(),
        gap.affected_command
    ));
    lines.push(String::new());
    lines.push(format!("**Type**: {}", gap.gap_type.label()));
    lines.push(format!("**Severity**: {}", gap.severity.label()));
    lines.push(format!("**Command**: `{}`", gap.affected_command));
    lines.push(format!("**Rule Line**: {}", gap.source_location));
    lines.push(String::new());
    lines.push("**Original Pattern**:".to_string());
    lines.push("```regex".to_string());
    lines.push(gap.original_pattern.clone());
    lines.push("```".to_string());
    lines.push(String::new());
    lines.push(format!("**Missing Variant**: `{}`", gap.missing_variant));
    lines.push(String::new());
    lines.push("**Example Command That Would Bypass**:".to_string());
    lines.push("```bash".to_string());
    lines.push(gap.example_command.clone());
    lines.push("```".to_string());
    lines.push(String::new());
    lines.push("**Recommendation**:".to_string());
    lines.push(format!("> {}", gap.recommendation));
    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());
}

/// Risk counts in Critical, High, Medium order (the map itself is sorted by
/// name).
fn ordered_risk_counts(summary: &PatternSummary) -> Vec<(&'static str, usize)> {
    crate::rules::RiskLevel::ALL
        .iter()
        .map(|risk| {
            let label = risk.label();
            (label, summary.by_risk.get(label).copied().unwrap_or(0))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::GapType;
    use crate::rules::RiskLevel;
    use chrono::TimeZone;

    fn pattern() -> Pattern {
        Pattern::new(r"rm\s+-rf\s+\.\.", "delete parent", RiskLevel::Critical, None, 7)
    }

    fn gap(severity: GapSeverity, variant: &str) -> Gap {
        Gap::new(&pattern(), GapType::PathVariant, severity, variant, "rm -rf ../", "fix it")
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn filter_keeps_at_least_min() {
        let gaps = vec![
            gap(GapSeverity::Low, "a"),
            gap(GapSeverity::Critical, "b"),
            gap(GapSeverity::Medium, "c"),
            gap(GapSeverity::High, "d"),
        ];
        let kept = filter_by_min_severity(gaps, GapSeverity::High);
        let variants: Vec<&str> = kept.iter().map(|g| g.missing_variant.as_str()).collect();
        assert_eq!(variants, vec!["b", "d"]);
    }

    #[test]
    fn sort_is_stable_within_tier() {
        let mut gaps = vec![
            gap(GapSeverity::Medium, "m1"),
            gap(GapSeverity::Critical, "c1"),
            gap(GapSeverity::Medium, "m2"),
            gap(GapSeverity::Critical, "c2"),
        ];
        sort_gaps(&mut gaps);
        let variants: Vec<&str> = gaps.iter().map(|g| g.missing_variant.as_str()).collect();
        assert_eq!(variants, vec!["c1", "c2", "m1", "m2"]);
    }

    #[test]
    fn json_has_metadata_summary_and_gaps() {
        let report = Report::build_at(
            &[pattern()],
            vec![gap(GapSeverity::High, "../")],
            fixed_time(),
        );
        let json: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();

        assert_eq!(json["metadata"]["generated_at"], "2026-01-02T03:04:05Z");
        assert_eq!(json["metadata"]["patterns_analyzed"], 1);
        assert_eq!(json["metadata"]["gaps_found"], 1);
        assert_eq!(json["metadata"]["tool_version"], TOOL_VERSION);
        assert_eq!(json["pattern_summary"]["total"], 1);
        assert_eq!(json["pattern_summary"]["by_risk"]["Critical"], 1);
        assert_eq!(json["severity_counts"]["high"], 1);
        assert_eq!(json["gaps"][0]["type"], "path_variant");
        assert_eq!(json["gaps"][0]["source_location"], 7);
    }

    #[test]
    fn markdown_groups_by_tier() {
        let report = Report::build_at(
            &[pattern()],
            vec![gap(GapSeverity::Medium, "m"), gap(GapSeverity::Critical, "c")],
            fixed_time(),
        );
        let md = render_markdown(&report);

        assert!(md.starts_with("# Safety Pattern Gap Analysis Report\n"));
        assert!(md.contains("**Generated**: 2026-01-02 03:04:05 UTC"));
        assert!(md.contains("**Gaps Found**: 2 (1 critical, 0 high, 1 medium, 0 low)"));
        assert!(md.contains("## 🔴 CRITICAL Severity Gaps (1)"));
        assert!(md.contains("## 🟡 MEDIUM Severity Gaps (1)"));
        assert!(!md.contains("HIGH Severity Gaps"));
        assert!(md.contains("### Gap 1: Path Variant - rm"));
        assert!(md.contains("**Rule Line**: 7"));
        assert!(md.contains("Found 1 critical gaps"));

        let critical = md.find("CRITICAL Severity").unwrap();
        let medium = md.find("MEDIUM Severity").unwrap();
        assert!(critical < medium);
    }

    #[test]
    fn markdown_without_gaps() {
        let report = Report::build_at(&[pattern()], Vec::new(), fixed_time());
        let md = render_markdown(&report);
        assert!(md.contains("No gaps detected!"));
        assert!(!md.contains("Action Items"));
        assert!(md.contains("  - Critical: 1"));
        assert!(md.contains("  - `rm`: 1"));
    }

    #[test]
    fn format_parses_from_cli_value() {
        assert_eq!(
            ReportFormat::from_str("json", true).unwrap(),
            ReportFormat::Json
        );
        assert_eq!(ReportFormat::default(), ReportFormat::Markdown);
    }
}

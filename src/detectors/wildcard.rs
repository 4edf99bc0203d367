//! Wildcard detector.
//!
//! Rules that already mention a glob metacharacter usually cover one shape of
//! it (`rm -rf *`) and miss its siblings (`./*`, `**`, `[a-z]*`, `{a,b}`).

use super::coverage::contains_literal_or_unescaped;
use super::{Detector, DetectorKind, Gap, GapSeverity, GapType, Variant, is_deletion_command};
use crate::rules::{Pattern, RiskLevel, ShellScope};

/// Glob features a shell may or may not expand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobKind {
    /// `*`
    Star,
    /// `?`
    Question,
    /// `[...]`
    CharClass,
    /// `{a,b}` / `{1..10}`
    Brace,
    /// `**`
    Globstar,
}

impl GlobKind {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Star => "*",
            Self::Question => "?",
            Self::CharClass => "[...]",
            Self::Brace => "{...}",
            Self::Globstar => "**",
        }
    }
}

/// Whether `shell` expands `glob` with default settings.
///
/// `None` (a rule for every shell) supports everything.
#[must_use]
pub const fn shell_supports_glob(shell: Option<ShellScope>, glob: GlobKind) -> bool {
    match shell {
        None | Some(ShellScope::Zsh) => true,
        Some(ShellScope::Bash) => !matches!(glob, GlobKind::Globstar),
        Some(ShellScope::Fish) => !matches!(glob, GlobKind::Globstar | GlobKind::Brace),
        Some(ShellScope::PowerShell) => !matches!(glob, GlobKind::CharClass | GlobKind::Brace),
    }
}

/// Detects rules that cover only some glob shapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct WildcardDetector;

impl Detector for WildcardDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Wildcard
    }

    fn detect(&self, pattern: &Pattern) -> Vec<Gap> {
        let regex = pattern.regex();
        if !regex.contains(['*', '?', '[']) {
            return Vec::new();
        }

        let shell = pattern.shell_specific();
        let mut gaps = Vec::new();

        for (glob, variant) in wildcard_variants(regex, shell) {
            if contains_literal_or_unescaped(regex, &variant.test_input) {
                continue;
            }

            let severity = severity_for(
                &variant.description,
                pattern.command_base(),
                pattern.risk_level(),
            );
            let mut recommendation = variant.recommendation;
            if let Some(scope) = shell.filter(|_| !shell_supports_glob(shell, glob)) {
                recommendation.push_str(&format!(
                    " (note: {} does not expand {} by default)",
                    scope.label(),
                    glob.label()
                ));
            }

            gaps.push(Gap::new(
                pattern,
                GapType::Wildcard,
                severity,
                variant.description,
                format!("{} {}", pattern.command_base(), variant.example),
                recommendation,
            ));
        }

        gaps
    }
}

fn variant(glob: GlobKind, shape: &str, test_input: &str, recommendation: &str) -> (GlobKind, Variant) {
    (
        glob,
        Variant {
            description: shape.to_string(),
            test_input: test_input.to_string(),
            example: shape.to_string(),
            recommendation: recommendation.to_string(),
        },
    )
}

/// Variant shapes for every glob class present in `regex`.
fn wildcard_variants(regex: &str, shell: Option<ShellScope>) -> Vec<(GlobKind, Variant)> {
    let expands_bash_style = shell.is_none_or(|s| s.is_posix_like());
    let mut variants = Vec::new();

    if regex.contains('*') {
        variants.push(variant(GlobKind::Star, "./*", r"\./\*", r"Add \./\* for explicit current directory"));
        variants.push(variant(GlobKind::Star, "*.txt", r"\*\.txt", r"Add \*\.\w+ for extension wildcards"));
        variants.push(variant(GlobKind::Globstar, "**", r"\*\*", r"Add \*\* for recursive glob"));
        variants.push(variant(GlobKind::Star, "file*", r"\\w+\*", r"Add \w+\* for prefix wildcards"));
        if expands_bash_style {
            variants.push(variant(GlobKind::Globstar, "**/*", r"\*\*/\*", r"Add \*\*/\* for recursive glob"));
        }
    }

    if regex.contains('?') {
        variants.push(variant(GlobKind::Question, "file?.txt", r"\\w+\?\\.\w+", r"Add \w+\?\.\w+ for single-char wildcards"));
        variants.push(variant(GlobKind::Question, "???", r"\?\?\?", r"Add \?+ for multi-char wildcards"));
    }

    if regex.contains('[') && regex.contains(']') {
        variants.push(variant(GlobKind::CharClass, "[abc]*", r"\[[a-z]+\]\*", r"Add \[[^\]]+\]\* for character classes"));
        variants.push(variant(GlobKind::CharClass, "[0-9]*", r"\[0-9\]\*", r"Add \[[^\]]+\]\* for range classes"));
    }

    if regex.contains('{') && regex.contains('}') && expands_bash_style {
        variants.push(variant(GlobKind::Brace, "{a,b}", r"\{[a-z,]+\}", r"Add \{[^}]+\} for brace expansion"));
        variants.push(variant(GlobKind::Brace, "{1..10}", r"\{\d+\.\.\d+\}", r"Add \{\d+\.\.\d+\} for sequence expansion"));
    }

    variants
}

/// `**` on deletion commands reaches the rule's tier, `.*`/`./` shapes reach
/// high on critical rules, the rest sit one notch below.
fn severity_for(shape: &str, command_base: &str, risk: RiskLevel) -> GapSeverity {
    let critical = risk == RiskLevel::Critical;

    let severity = if shape.contains("**") {
        if !is_deletion_command(command_base) {
            GapSeverity::Medium
        } else if critical {
            GapSeverity::Critical
        } else {
            GapSeverity::High
        }
    } else if shape.contains(".*") || shape.contains("./") {
        if critical { GapSeverity::High } else { GapSeverity::Medium }
    } else {
        GapSeverity::one_below(risk)
    };

    severity.capped_at(risk)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(regex: &str, risk: RiskLevel, shell: Option<ShellScope>) -> Vec<Gap> {
        WildcardDetector.detect(&Pattern::new(regex, "d", risk, shell, 1))
    }

    fn shapes(gaps: &[Gap]) -> Vec<&str> {
        gaps.iter().map(|g| g.missing_variant.as_str()).collect()
    }

    #[test]
    fn no_metacharacters_no_gaps() {
        assert!(detect(r"rm\s+-rf\s+/", RiskLevel::Critical, None).is_empty());
    }

    #[test]
    fn star_rule_misses_globstar() {
        let gaps = detect(r"rm\s+-rf\s+\*", RiskLevel::Critical, None);
        assert_eq!(shapes(&gaps), vec!["./*", "*.txt", "**", "file*", "**/*"]);

        let globstar = gaps.iter().find(|g| g.missing_variant == "**").unwrap();
        assert_eq!(globstar.severity, GapSeverity::Critical);
        assert_eq!(globstar.example_command, "rm **");

        let dot_slash = gaps.iter().find(|g| g.missing_variant == "./*").unwrap();
        assert_eq!(dot_slash.severity, GapSeverity::High);

        let ext = gaps.iter().find(|g| g.missing_variant == "*.txt").unwrap();
        assert_eq!(ext.severity, GapSeverity::High);
    }

    #[test]
    fn covered_shapes_are_skipped() {
        let gaps = detect(r"rm\s+-rf\s+(\./\*|\*\*)", RiskLevel::High, None);
        let found = shapes(&gaps);
        assert!(!found.contains(&"./*"));
        assert!(!found.contains(&"**"));
    }

    #[test]
    fn globstar_on_other_commands_is_medium() {
        let gaps = detect(r"chmod\s+777\s+\*", RiskLevel::Critical, None);
        let globstar = gaps.iter().find(|g| g.missing_variant == "**").unwrap();
        assert_eq!(globstar.severity, GapSeverity::Medium);
    }

    #[test]
    fn escalation_capped_for_medium_rules() {
        let gaps = detect(r"rm\s+\*", RiskLevel::Medium, None);
        assert!(gaps.iter().all(|g| g.severity <= GapSeverity::Medium));
    }

    #[test]
    fn fish_and_powershell_skip_bash_only_shapes() {
        let fish = detect(r"rm\s+\*\s+\{x\}", RiskLevel::High, Some(ShellScope::Fish));
        let found = shapes(&fish);
        assert!(!found.contains(&"**/*"));
        assert!(!found.contains(&"{a,b}"));

        let bash = detect(r"rm\s+\*\s+\{x\}", RiskLevel::High, Some(ShellScope::Bash));
        let found = shapes(&bash);
        assert!(found.contains(&"**/*"));
        assert!(found.contains(&"{a,b}"));
    }

    #[test]
    fn unsupported_glob_is_noted_in_recommendation() {
        let gaps = detect(r"rm\s+\*", RiskLevel::High, Some(ShellScope::Bash));
        let globstar = gaps.iter().find(|g| g.missing_variant == "**").unwrap();
        assert!(globstar.recommendation.contains("bash does not expand **"));

        let star = gaps.iter().find(|g| g.missing_variant == "./*").unwrap();
        assert!(!star.recommendation.contains("note:"));
    }

    #[test]
    fn question_and_class_shapes() {
        let gaps = detect(r"rm\s+[a-z]?", RiskLevel::High, None);
        let found = shapes(&gaps);
        assert!(found.contains(&"file?.txt"));
        assert!(found.contains(&"???"));
        assert!(found.contains(&"[abc]*"));
        assert!(found.contains(&"[0-9]*"));
    }

    #[test]
    fn glob_support_matrix() {
        assert!(shell_supports_glob(None, GlobKind::Globstar));
        assert!(shell_supports_glob(Some(ShellScope::Zsh), GlobKind::Brace));
        assert!(!shell_supports_glob(Some(ShellScope::Bash), GlobKind::Globstar));
        assert!(shell_supports_glob(Some(ShellScope::Bash), GlobKind::Brace));
        assert!(!shell_supports_glob(Some(ShellScope::Fish), GlobKind::Brace));
        assert!(shell_supports_glob(Some(ShellScope::Fish), GlobKind::Question));
        assert!(!shell_supports_glob(Some(ShellScope::PowerShell), GlobKind::CharClass));
        assert!(shell_supports_glob(Some(ShellScope::PowerShell), GlobKind::Star));
    }
}

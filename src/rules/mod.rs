//! Rule records consumed by the gap detectors.
//!
//! A rule file contains `DangerPattern { ... }` blocks. The [`parser`] turns
//! them into [`Pattern`] values, each carrying its regex text, a compiled
//! matcher, the risk level, an optional shell scope and the base command the
//! regex targets.

pub mod parser;
pub mod regex_engine;

use regex_engine::CompiledRegex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

pub use parser::{extract_command_base, normalize_regex, parse_patterns_file, parse_patterns_source};

/// Risk level declared by a rule.
///
/// Missing or unrecognized values default to [`RiskLevel::High`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum RiskLevel {
    Critical,
    #[default]
    High,
    Medium,
}

impl RiskLevel {
    /// Label as written in rule sources (`Critical`, `High`, `Medium`).
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
        }
    }

    pub const ALL: [Self; 3] = [Self::Critical, Self::High, Self::Medium];
}

/// Shell a rule is restricted to. Rules without a scope apply to every shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellScope {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

impl ShellScope {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::Zsh => "zsh",
            Self::Fish => "fish",
            Self::PowerShell => "powershell",
        }
    }

    /// True for shells with bash-style globstar and brace expansion.
    #[must_use]
    pub const fn is_posix_like(&self) -> bool {
        matches!(self, Self::Bash | Self::Zsh)
    }

    pub const ALL: [Self; 4] = [Self::Bash, Self::Zsh, Self::Fish, Self::PowerShell];
}

/// One parsed danger rule.
///
/// Immutable after construction. The regex is compiled once; if compilation
/// fails the error is kept and every full-match coverage test fails closed.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: String,
    description: String,
    risk_level: RiskLevel,
    shell_specific: Option<ShellScope>,
    command_base: String,
    source_location: usize,
    compiled: Result<CompiledRegex, String>,
}

impl Pattern {
    /// Build a pattern, deriving `command_base` from the regex.
    #[must_use]
    pub fn new(
        regex: impl Into<String>,
        description: impl Into<String>,
        risk_level: RiskLevel,
        shell_specific: Option<ShellScope>,
        source_location: usize,
    ) -> Self {
        let regex = regex.into();
        let command_base = extract_command_base(&regex);
        let compiled = CompiledRegex::new(&regex);
        Self {
            regex,
            description: description.into(),
            risk_level,
            shell_specific,
            command_base,
            source_location,
            compiled,
        }
    }

    /// Replace the inferred base command.
    #[must_use]
    pub fn with_command_base(mut self, command_base: impl Into<String>) -> Self {
        self.command_base = command_base.into();
        self
    }

    #[must_use]
    pub fn regex(&self) -> &str {
        &self.regex
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub const fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    #[must_use]
    pub const fn shell_specific(&self) -> Option<ShellScope> {
        self.shell_specific
    }

    #[must_use]
    pub fn command_base(&self) -> &str {
        &self.command_base
    }

    /// 1-based line of the block-opening line in the rule source.
    #[must_use]
    pub const fn source_location(&self) -> usize {
        self.source_location
    }

    /// The compiled matcher, or `None` if the regex did not compile.
    #[must_use]
    pub fn compiled(&self) -> Option<&CompiledRegex> {
        self.compiled.as_ref().ok()
    }

    /// The compile error message, if the regex did not compile.
    #[must_use]
    pub fn compile_error(&self) -> Option<&str> {
        self.compiled.as_ref().err().map(String::as_str)
    }

    /// Full-match coverage test: does the rule regex match `command`?
    ///
    /// A rule whose regex failed to compile never matches.
    #[must_use]
    pub fn matches(&self, command: &str) -> bool {
        self.compiled().is_some_and(|re| re.is_match(command))
    }
}

/// Counts over a rule set, grouped by risk, shell and base command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub total: usize,
    pub by_risk: BTreeMap<String, usize>,
    pub by_shell: BTreeMap<String, usize>,
    pub by_command: BTreeMap<String, usize>,
}

/// Key used in `by_shell` for rules without a shell scope.
pub const ALL_SHELLS_KEY: &str = "all";

static EMPTY_SUMMARY: LazyLock<PatternSummary> = LazyLock::new(|| {
    let by_risk = RiskLevel::ALL
        .iter()
        .map(|r| (r.label().to_string(), 0))
        .collect();
    let by_shell = std::iter::once(ALL_SHELLS_KEY)
        .chain(ShellScope::ALL.iter().map(ShellScope::label))
        .map(|s| (s.to_string(), 0))
        .collect();
    PatternSummary {
        total: 0,
        by_risk,
        by_shell,
        by_command: BTreeMap::new(),
    }
});

impl PatternSummary {
    /// Summarize a rule set. Every risk and shell key is present, even at 0.
    #[must_use]
    pub fn from_patterns(patterns: &[Pattern]) -> Self {
        let mut summary = EMPTY_SUMMARY.clone();
        summary.total = patterns.len();

        for pattern in patterns {
            *summary
                .by_risk
                .entry(pattern.risk_level().label().to_string())
                .or_default() += 1;

            let shell = pattern
                .shell_specific()
                .map_or(ALL_SHELLS_KEY, |s| s.label());
            *summary.by_shell.entry(shell.to_string()).or_default() += 1;

            *summary
                .by_command
                .entry(pattern.command_base().to_string())
                .or_default() += 1;
        }

        summary
    }

    /// Base commands ordered by rule count (descending), then name.
    #[must_use]
    pub fn top_commands(&self, limit: usize) -> Vec<(&str, usize)> {
        let mut commands: Vec<(&str, usize)> = self
            .by_command
            .iter()
            .map(|(cmd, count)| (cmd.as_str(), *count))
            .collect();
        commands.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        commands.truncate(limit);
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_derives_command_base() {
        let p = Pattern::new(r"sudo\s+rm\s+-rf", "desc", RiskLevel::Critical, None, 3);
        assert_eq!(p.command_base(), "sudo rm");
        assert_eq!(p.source_location(), 3);
        assert!(p.matches("sudo rm -rf /"));
    }

    #[test]
    fn invalid_regex_never_matches() {
        let p = Pattern::new(r"rm\s+(-rf", "broken", RiskLevel::High, None, 1);
        assert!(p.compiled().is_none());
        assert!(p.compile_error().is_some());
        assert!(!p.matches("rm -rf /"));
    }

    #[test]
    fn summary_counts_by_risk_shell_and_command() {
        let patterns = vec![
            Pattern::new(r"rm\s+-rf", "a", RiskLevel::Critical, None, 1),
            Pattern::new(r"dd\s+if=", "b", RiskLevel::High, None, 2),
            Pattern::new(
                r"Remove-Item\s+-Recurse",
                "c",
                RiskLevel::High,
                Some(ShellScope::PowerShell),
                3,
            ),
        ];

        let summary = PatternSummary::from_patterns(&patterns);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_risk["Critical"], 1);
        assert_eq!(summary.by_risk["High"], 2);
        assert_eq!(summary.by_risk["Medium"], 0);
        assert_eq!(summary.by_shell["all"], 2);
        assert_eq!(summary.by_shell["powershell"], 1);
        assert_eq!(summary.by_shell["fish"], 0);
        assert_eq!(summary.by_command["rm"], 1);
        assert_eq!(summary.by_command["Remove-Item"], 1);
    }

    #[test]
    fn top_commands_orders_by_count() {
        let patterns = vec![
            Pattern::new(r"rm\s+-rf", "a", RiskLevel::Critical, None, 1),
            Pattern::new(r"rm\s+-r\s+-f", "b", RiskLevel::Critical, None, 2),
            Pattern::new(r"chmod\s+777", "c", RiskLevel::High, None, 3),
        ];
        let summary = PatternSummary::from_patterns(&patterns);
        assert_eq!(summary.top_commands(1), vec![("rm", 2)]);
    }
}

//! Path-variant detector.
//!
//! A rule written for `rm -rf ..` misses `rm -rf ../`, `rm -rf ../.` and
//! friends. For each path token in the regex, a fixed set of spellings is
//! checked against the regex text with [`contains_normalized`].

use super::coverage::contains_normalized;
use super::{Detector, DetectorKind, Gap, GapSeverity, GapType, Variant, is_deletion_command};
use crate::rules::{Pattern, RiskLevel};
use regex::Regex;
use std::sync::LazyLock;

static ABSOLUTE_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(/[a-z/]*)").expect("absolute path regex"));

/// Path tokens a rule regex can reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathToken {
    Parent,
    Current,
    Absolute(String),
    Glob,
}

impl PathToken {
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Parent => "..",
            Self::Current => ".",
            Self::Absolute(path) => path,
            Self::Glob => "*",
        }
    }
}

/// Detects rules that only match one spelling of a path.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathVariantDetector;

impl Detector for PathVariantDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Path
    }

    fn detect(&self, pattern: &Pattern) -> Vec<Gap> {
        let mut gaps = Vec::new();

        for token in extract_path_tokens(pattern.regex()) {
            for variant in path_variants(&token) {
                if contains_normalized(pattern.regex(), &variant.test_input) {
                    continue;
                }
                let severity =
                    severity_for(&variant.test_input, pattern.command_base(), pattern.risk_level());
                gaps.push(Gap::new(
                    pattern,
                    GapType::PathVariant,
                    severity,
                    variant.description,
                    format!("{} {}", pattern.command_base(), variant.example),
                    variant.recommendation,
                ));
            }
        }

        gaps
    }
}

/// Path tokens in a rule regex, deduplicated and sorted by their text.
#[must_use]
pub fn extract_path_tokens(regex: &str) -> Vec<PathToken> {
    let mut tokens = Vec::new();

    if regex.contains(r"\.\.") {
        tokens.push(PathToken::Parent);
    }

    if has_literal_dot(regex) {
        tokens.push(PathToken::Current);
    }

    if regex.contains('/') {
        let unescaped = regex.replace("\\/", "/");
        for m in ABSOLUTE_PATH_RE.find_iter(&unescaped) {
            let path = m.as_str().trim_end_matches('/');
            let path = if path.is_empty() { "/" } else { path };
            tokens.push(PathToken::Absolute(path.to_string()));
        }
    }

    if regex.contains('*') {
        tokens.push(PathToken::Glob);
    }

    tokens.sort_by(|a, b| a.label().cmp(b.label()));
    tokens.dedup();
    tokens
}

/// `\.` not followed by a quantifier.
fn has_literal_dot(regex: &str) -> bool {
    regex.match_indices(r"\.").any(|(i, _)| {
        !matches!(
            regex.as_bytes().get(i + 2),
            Some(b'*' | b'+' | b'?')
        )
    })
}

fn variant(test_input: &str, description: &str, example: &str, recommendation: &str) -> Variant {
    Variant {
        description: description.to_string(),
        test_input: test_input.to_string(),
        example: example.to_string(),
        recommendation: recommendation.to_string(),
    }
}

/// Spellings of a path token that a rule should also cover.
fn path_variants(token: &PathToken) -> Vec<Variant> {
    match token {
        PathToken::Parent => vec![
            variant(r"\.\.\/", "../ (trailing slash)", "-rf ../", r"Add \.\.\/? to match trailing slash"),
            variant(r"\.\./\.", "../. (parent's current dir)", "-rf ../.", r"Add (\.\./\.|\.\.) alternation"),
            variant(r"\.\./\.\.\/", "../../ (grandparent)", "-rf ../../", r"Use (\.\./)+ to match multiple levels"),
            variant(r"\.\/\.\.", "./.. (current then parent)", "-rf ./..", r"Add (\./)*\.\. to match ./ prefixes"),
        ],
        PathToken::Current => vec![
            variant(r"\./", "./ (trailing slash)", "-rf ./", r"Add \./? to match trailing slash"),
            variant(r"\./\*", "./* (contents)", "-rf ./*", r"Add \./\* alternation"),
        ],
        PathToken::Absolute(path) if path == "/" => vec![
            variant(r"/\*", "/* (root contents)", "-rf /*", r"Add /\*? to match root contents"),
            variant(r"/\.", "/. (root current dir)", "-rf /.", r"Add /\.? to match root dot"),
        ],
        PathToken::Absolute(path) => vec![
            Variant {
                description: format!("{path}/ (with trailing slash)"),
                test_input: format!("{path}/"),
                example: format!("-rf {path}/"),
                recommendation: format!("Add {path}/? to match trailing slash"),
            },
            Variant {
                description: format!("{path}/* (contents)"),
                test_input: format!(r"{path}/\*"),
                example: format!("-rf {path}/*"),
                recommendation: format!(r"Add {path}(/\*)? to match contents"),
            },
        ],
        PathToken::Glob => vec![
            variant(r"\./\*", "./* (current dir contents)", "-rf ./*", r"Add \./\* to match explicit current dir"),
            variant(r"\*\*", "** (recursive glob)", "-rf **", r"Add \*\* to match globstar"),
        ],
    }
}

/// Trailing slashes and parent recursion on deletion commands reach the
/// rule's tier; `./*` reaches high on critical rules; everything else sits
/// one notch below.
fn severity_for(test_input: &str, command_base: &str, risk: RiskLevel) -> GapSeverity {
    let escalated = |critical, other| {
        let severity = if risk == RiskLevel::Critical { critical } else { other };
        GapSeverity::capped_at(severity, risk)
    };

    if test_input.ends_with('/') {
        escalated(GapSeverity::Critical, GapSeverity::High)
    } else if test_input.contains(r"\.\.") && is_deletion_command(command_base) {
        escalated(GapSeverity::Critical, GapSeverity::High)
    } else if test_input.contains(r"\./\*") {
        escalated(GapSeverity::High, GapSeverity::Medium)
    } else {
        GapSeverity::one_below(risk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(regex: &str, risk: RiskLevel) -> Vec<Gap> {
        PathVariantDetector.detect(&Pattern::new(regex, "d", risk, None, 1))
    }

    #[test]
    fn extracts_tokens_sorted() {
        let tokens = extract_path_tokens(r"rm\s+-rf\s+\.\./\*");
        assert_eq!(
            tokens,
            vec![
                PathToken::Glob,
                PathToken::Current,
                PathToken::Parent,
                PathToken::Absolute("/".to_string()),
            ]
        );
    }

    #[test]
    fn quantified_dot_is_not_a_path() {
        assert!(!has_literal_dot(r"rm\s+\.*"));
        assert!(!has_literal_dot(r"rm\s+\.+"));
        assert!(has_literal_dot(r"rm\s+\."));
        assert!(has_literal_dot(r"rm\s+\./"));
    }

    #[test]
    fn absolute_paths_drop_trailing_slash() {
        let tokens = extract_path_tokens(r"rm\s+-rf\s+/home/");
        assert!(tokens.contains(&PathToken::Absolute("/home".to_string())));
    }

    #[test]
    fn parent_dir_rule_misses_trailing_slash() {
        let gaps = detect(r"rm\s+-rf\s+\.\.", RiskLevel::Critical);
        let gap = gaps
            .iter()
            .find(|g| g.missing_variant.starts_with("../ "))
            .expect("trailing slash gap");
        assert_eq!(gap.example_command, "rm -rf ../");
        assert_eq!(gap.severity, GapSeverity::Critical);
        assert_eq!(gap.gap_type, GapType::PathVariant);
    }

    #[test]
    fn parent_recursion_on_deletion_is_escalated() {
        let gaps = detect(r"rm\s+-rf\s+\.\.", RiskLevel::Critical);
        let gap = gaps
            .iter()
            .find(|g| g.missing_variant.starts_with("../. "))
            .expect("parent dot gap");
        assert_eq!(gap.severity, GapSeverity::Critical);
    }

    #[test]
    fn escalation_never_exceeds_rule_tier() {
        let gaps = detect(r"rm\s+-rf\s+\.\.", RiskLevel::Medium);
        assert!(!gaps.is_empty());
        assert!(gaps.iter().all(|g| g.severity <= GapSeverity::Medium));
    }

    #[test]
    fn covered_spelling_is_not_reported() {
        let gaps = detect(r"rm\s+-rf\s+\.\./", RiskLevel::Critical);
        assert!(gaps.iter().all(|g| !g.missing_variant.starts_with("../ ")));
    }

    #[test]
    fn root_variants() {
        let gaps = detect(r"rm\s+-rf\s+/", RiskLevel::Critical);
        let examples: Vec<&str> = gaps.iter().map(|g| g.example_command.as_str()).collect();
        assert_eq!(examples, vec!["rm -rf /*", "rm -rf /."]);
        assert!(gaps.iter().all(|g| g.severity == GapSeverity::High));
    }

    #[test]
    fn no_path_tokens_no_gaps() {
        assert!(detect(r"git\s+reset\s+--hard", RiskLevel::High).is_empty());
    }
}

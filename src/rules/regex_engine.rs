//! Dual regex engine for compiling rule expressions.
//!
//! Rule files are written against a backtracking regex dialect, so a minority
//! of rules use lookaround or backreferences. This module compiles each rule
//! with the linear-time `regex` crate when possible and falls back to
//! `fancy_regex` only when the syntax requires it.
//!
//! Compile failures are returned as values. The analyzer stores them on the
//! pattern and treats every match test against a broken rule as "not covered".

/// A compiled rule regex backed by whichever engine the syntax needs.
#[derive(Debug, Clone)]
pub enum CompiledRegex {
    /// Linear-time regex (no lookaround, no backreferences).
    Linear(regex::Regex),
    /// Backtracking regex (lookaround, backreferences, atomic groups).
    Backtracking(fancy_regex::Regex),
}

impl CompiledRegex {
    /// Compile a pattern, auto-selecting the engine.
    ///
    /// # Errors
    /// Returns the engine's error message if the pattern fails to compile.
    pub fn new(pattern: &str) -> Result<Self, String> {
        if needs_backtracking_engine(pattern) {
            fancy_regex::Regex::new(pattern)
                .map(Self::Backtracking)
                .map_err(|e| format!("fancy_regex compile error: {e}"))
        } else {
            regex::Regex::new(pattern)
                .map(Self::Linear)
                .map_err(|e| format!("regex compile error: {e}"))
        }
    }

    /// Search semantics: true if the pattern matches anywhere in `text`.
    ///
    /// Backtracking execution errors (e.g. hitting the backtrack limit) count
    /// as no match.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Linear(re) => re.is_match(text),
            Self::Backtracking(re) => re.is_match(text).unwrap_or(false),
        }
    }

    #[must_use]
    pub const fn uses_backtracking(&self) -> bool {
        matches!(self, Self::Backtracking(_))
    }
}

/// Lookaround and atomic group openers.
const GROUP_MARKERS: [&str; 5] = ["(?=", "(?!", "(?<=", "(?<!", "(?>"];

/// Possessive quantifiers.
const POSSESSIVE_MARKERS: [&str; 4] = ["*+", "++", "?+", "}+"];

/// True when `pattern` uses syntax only the backtracking engine accepts:
/// lookaround, atomic groups, possessive quantifiers, or `\1`..`\9`
/// backreferences. False positives only cost speed.
#[must_use]
pub fn needs_backtracking_engine(pattern: &str) -> bool {
    GROUP_MARKERS
        .iter()
        .chain(POSSESSIVE_MARKERS.iter())
        .any(|marker| pattern.contains(marker))
        || pattern
            .as_bytes()
            .windows(2)
            .any(|pair| pair[0] == b'\\' && matches!(pair[1], b'1'..=b'9'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_engine_for_plain_rules() {
        let re = CompiledRegex::new(r"rm\s+-rf\s+/").unwrap();
        assert!(!re.uses_backtracking());
        assert!(re.is_match("sudo rm -rf /"));
        assert!(!re.is_match("rm / -rf"));
    }

    #[test]
    fn backtracking_engine_for_lookahead_rules() {
        let re = CompiledRegex::new(r"rm(?!\s+--dry-run)\s+-rf").unwrap();
        assert!(re.uses_backtracking());
        assert!(re.is_match("rm -rf build"));
        assert!(!re.is_match("rm --dry-run -rf"));
    }

    #[test]
    fn backreference_selects_backtracking() {
        let re = CompiledRegex::new(r"(\w+)\s+\1").unwrap();
        assert!(re.uses_backtracking());
        assert!(re.is_match("rm rm"));
    }

    #[test]
    fn detection_heuristic() {
        assert!(!needs_backtracking_engine(r"dd\s+if=/dev/zero"));
        assert!(!needs_backtracking_engine(r"\d+\.\d+"));
        assert!(!needs_backtracking_engine(r"foo\0bar"));
        assert!(needs_backtracking_engine(r"(?<=sudo\s)rm"));
        assert!(needs_backtracking_engine(r"(?<!echo\s)rm"));
        assert!(needs_backtracking_engine(r"a++"));
    }

    #[test]
    fn compile_errors_are_values() {
        let err = CompiledRegex::new(r"rm\s+(unclosed").unwrap_err();
        assert!(err.contains("regex compile error"));

        let err = CompiledRegex::new(r"(?=unclosed").unwrap_err();
        assert!(err.contains("fancy_regex compile error"));
    }

    #[test]
    fn character_classes_stay_linear() {
        let re = CompiledRegex::new(r"rm\s+-[rf]+\s+\d").unwrap();
        assert!(!re.uses_backtracking());
        assert!(re.is_match("rm -fr 1"));
    }
}

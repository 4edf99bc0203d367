//! Substring coverage heuristics shared by the path and wildcard detectors.
//!
//! These inspect the regex *text*, not its language: a fragment counts as
//! covered if its escaped form appears in the rule source. This is
//! deliberately weaker than a full regex match and errs toward reporting.

use crate::rules::normalize_regex;
use memchr::memmem;

/// True if `fragment` appears in `regex` after both have their whitespace
/// classes normalized (`\s+` / `\s*` -> one space) and `\/` unescaped.
#[must_use]
pub fn contains_normalized(regex: &str, fragment: &str) -> bool {
    let haystack = normalize_regex(regex).replace("\\/", "/");
    let needle = normalize_regex(fragment).replace("\\/", "/");
    memmem::find(haystack.as_bytes(), needle.as_bytes()).is_some()
}

/// True if `fragment` appears in `regex` as written, or with all of its
/// backslashes removed.
#[must_use]
pub fn contains_literal_or_unescaped(regex: &str, fragment: &str) -> bool {
    if memmem::find(regex.as_bytes(), fragment.as_bytes()).is_some() {
        return true;
    }
    let unescaped = fragment.replace('\\', "");
    memmem::find(regex.as_bytes(), unescaped.as_bytes()).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_containment_ignores_whitespace_class() {
        assert!(contains_normalized(r"rm\s+-rf\s+\.\./", r"-rf \.\./"));
        assert!(contains_normalized(r"rm\s*-rf", r"rm\s+-rf"));
        assert!(!contains_normalized(r"rm\s+-rf\s+\.\.", r"\.\.\/"));
        assert!(contains_normalized(r"rm\s+-rf\s+\.\./", r"\.\.\/"));
    }

    #[test]
    fn unescaped_form_counts_as_covered() {
        assert!(contains_literal_or_unescaped(r"rm\s+\./\*", r"\./\*"));
        assert!(contains_literal_or_unescaped(r"rm\s+**", r"\*\*"));
        assert!(!contains_literal_or_unescaped(r"rm\s+-rf\s+\*", r"\*\*"));
    }
}

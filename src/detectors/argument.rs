//! Argument-order detector.
//!
//! Most rules are written for the canonical `cmd -flags <path>` order. Shells
//! and most coreutils accept flags anywhere, split or combined, so each rule
//! is probed with four rearrangements built from its own flags:
//!
//! 1. flags after the argument (`rm /path -rf`)
//! 2. flags separated (`rm -r -f /path`)
//! 3. flag characters swapped (`rm -fr /path`)
//! 4. argument between flags (`rm -r /path -f`)
//!
//! Coverage is a full regex search of the synthesized command.

use super::{Detector, DetectorKind, Gap, GapSeverity, GapType, Variant};
use crate::rules::{Pattern, RiskLevel};
use regex::Regex;
use std::sync::LazyLock;

/// `-[rfRF]` style character classes standing in for a flag cluster.
static CHAR_CLASS_FLAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\[([a-zA-Z]+)\]").expect("flag class regex"));

/// A single-dash cluster at the start, after a `\s` escape, or after any
/// char that is neither a word char nor a dash.
static SHORT_FLAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\\s|[^-\w])-([a-zA-Z]+)\b").expect("short flag regex")
});

static LONG_FLAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--[a-z][a-z-]*").expect("long flag regex"));

/// `key=` operands such as `if=` / `of=`, also directly after a `\s`.
static KEY_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\\s|\b)([a-z]{2,})=").expect("key=value regex"));

static PATH_FRAGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[./][^\s\\)]*").expect("path fragment regex"));

/// Clusters longer than this are one word-style flag (`-Recurse`, `-delete`).
const MAX_COMBINED_CLUSTER: usize = 3;

const DEFAULT_SAMPLE_PATH: &str = "/path";

/// The four rearrangements a rule is probed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderShape {
    FlagsAfter,
    Separated,
    Swapped,
    Interleaved,
}

impl OrderShape {
    /// Shapes that move the argument in among or before the flags.
    const fn moves_argument(self) -> bool {
        matches!(self, Self::FlagsAfter | Self::Interleaved)
    }
}

/// Detects rules that only match one ordering of flags and arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgumentOrderDetector;

impl Detector for ArgumentOrderDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Argument
    }

    fn detect(&self, pattern: &Pattern) -> Vec<Gap> {
        let flags = extract_flags(pattern.regex());
        if flags.is_empty() {
            return Vec::new();
        }

        let path = sample_path(pattern.regex());

        order_variants(pattern.command_base(), &flags, &path)
            .into_iter()
            .filter(|(_, variant)| !pattern.matches(&variant.test_input))
            .map(|(shape, variant)| {
                Gap::new(
                    pattern,
                    GapType::ArgumentOrder,
                    severity_for(shape, pattern.risk_level()),
                    variant.description,
                    variant.example,
                    variant.recommendation,
                )
            })
            .collect()
    }
}

/// Flags referenced by a rule regex, in first-appearance order, deduplicated.
///
/// Short clusters (`-rf`) are split into single flags (`-r`, `-f`); long
/// flags (`--force`) and `key=` operands (`if=`) are kept whole.
#[must_use]
pub fn extract_flags(regex: &str) -> Vec<String> {
    let mut flags = Vec::new();

    for caps in CHAR_CLASS_FLAG_RE.captures_iter(regex) {
        for c in caps[1].chars() {
            push_unique(&mut flags, format!("-{c}"));
        }
    }

    for caps in SHORT_FLAG_RE.captures_iter(regex) {
        let cluster = &caps[1];
        if cluster.len() <= MAX_COMBINED_CLUSTER {
            for c in cluster.chars() {
                push_unique(&mut flags, format!("-{c}"));
            }
        } else {
            push_unique(&mut flags, format!("-{cluster}"));
        }
    }

    for m in LONG_FLAG_RE.find_iter(regex) {
        push_unique(&mut flags, m.as_str().to_string());
    }

    for caps in KEY_VALUE_RE.captures_iter(regex) {
        push_unique(&mut flags, format!("{}=", &caps[1]));
    }

    flags
}

fn push_unique(flags: &mut Vec<String>, flag: String) {
    if !flags.contains(&flag) {
        flags.push(flag);
    }
}

/// True for a single-character short flag (`-r`).
fn is_short_flag(flag: &str) -> bool {
    flag.len() == 2 && flag.starts_with('-') && !flag.starts_with("--")
}

/// A literal path the rule mentions, or `/path`.
///
/// Literal fragments starting with `.` or `/` are taken from the
/// unescaped regex; fragments still containing regex syntax are skipped.
#[must_use]
pub fn sample_path(regex: &str) -> String {
    let unescaped = regex.replace("\\/", "/").replace("\\.", ".");
    PATH_FRAGMENT_RE
        .find_iter(&unescaped)
        .map(|m| m.as_str())
        .find(|fragment| {
            *fragment != "."
                && !fragment
                    .chars()
                    .any(|c| "*+?|()[]{}^$".contains(c))
        })
        .map_or_else(|| DEFAULT_SAMPLE_PATH.to_string(), str::to_string)
}

/// The four order variants; a variant whose preconditions fail is omitted.
fn order_variants(command: &str, flags: &[String], path: &str) -> Vec<(OrderShape, Variant)> {
    let mut variants = Vec::new();
    let cmd_regex = command.replace(' ', r"\s+");
    let path_regex = regex::escape(path);

    let short: Vec<&str> = flags
        .iter()
        .map(String::as_str)
        .filter(|f| is_short_flag(f))
        .collect();
    let combined: String = short.iter().map(|f| &f[1..]).collect();

    if !combined.is_empty() {
        variants.push(shaped(
            OrderShape::FlagsAfter,
            "Flags after the argument",
            format!("{command} {path} -{combined}"),
            format!(
                r"Add alternation: ({cmd_regex}\s+-\S+\s+{path_regex}|{cmd_regex}\s+{path_regex}\s+-\S+)"
            ),
        ));
    }

    if let [first, second, ..] = flags {
        variants.push(shaped(
            OrderShape::Separated,
            "Flags given separately",
            format!("{command} {first} {second} {path}"),
            format!(
                r"Allow optional whitespace between flags: -{}\s*-{}",
                first.trim_start_matches('-'),
                second.trim_start_matches('-')
            ),
        ));

        if is_short_flag(first) && is_short_flag(second) {
            let (a, b) = (&first[1..], &second[1..]);
            variants.push(shaped(
                OrderShape::Swapped,
                "Flag characters swapped",
                format!("{command} -{b}{a} {path}"),
                format!("Use a character class: -[{a}{b}]+"),
            ));
        }

        variants.push(shaped(
            OrderShape::Interleaved,
            "Argument between flags",
            format!("{command} {first} {path} {second}"),
            format!(r"Allow the argument anywhere: {cmd_regex}(\s+\S+)*\s+{path_regex}(\s+\S+)*"),
        ));
    }

    variants
}

fn shaped(
    shape: OrderShape,
    description: &str,
    test: String,
    recommendation: String,
) -> (OrderShape, Variant) {
    (
        shape,
        Variant {
            description: description.to_string(),
            example: test.clone(),
            test_input: test,
            recommendation,
        },
    )
}

/// Shapes that move the argument reach the rule's tier; the rest sit one
/// notch below, floored at medium.
fn severity_for(shape: OrderShape, risk: RiskLevel) -> GapSeverity {
    if shape.moves_argument() {
        GapSeverity::tier(risk)
    } else {
        GapSeverity::one_below(risk).max(GapSeverity::Medium)
    }
}

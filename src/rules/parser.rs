//! Rule source parser.
//!
//! Scans a rule source line by line with a two-state machine:
//!
//! - `Seeking`: looking for a line that starts with `DangerPattern {`
//! - `InBlock`: collecting fields until the block's braces balance
//!
//! Braces are counted outside string literals and `//` comments, so regex
//! text such as `\{` never unbalances the scanner. Fields may appear in any
//! order; `pattern` and `description` are required, everything else has a
//! default.

use super::regex_engine::CompiledRegex;
use super::{Pattern, RiskLevel, ShellScope};
use crate::error::{AnalyzerError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

const BLOCK_OPENER: &str = "DangerPattern {";

static COMMAND_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z_-]+)(?:\\s[+*]?([a-zA-Z_][a-zA-Z_-]*))?").expect("static regex")
});

static LOWERCASE_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z]{2,}").expect("static regex"));

/// Parse a rule file from disk.
///
/// # Errors
/// - [`AnalyzerError::SourceNotFound`] if the file does not exist
/// - [`AnalyzerError::Io`] if it cannot be read
/// - [`AnalyzerError::EmptyRuleSet`] if no valid block was found
pub fn parse_patterns_file(path: &Path) -> Result<Vec<Pattern>> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            AnalyzerError::SourceNotFound {
                path: path.to_path_buf(),
            }
        } else {
            AnalyzerError::Io {
                path: Some(path.to_path_buf()),
                source,
            }
        }
    })?;

    parse_patterns_source(&content, path)
}

/// Parse rule text. `origin` only names the source in errors and logs.
///
/// # Errors
/// Returns [`AnalyzerError::EmptyRuleSet`] if the text yields no patterns.
pub fn parse_patterns_source(content: &str, origin: &Path) -> Result<Vec<Pattern>> {
    let mut patterns = Vec::new();
    let mut state = ScanState::Seeking;

    for (idx, raw_line) in content.lines().enumerate() {
        let line_number = idx + 1;
        let line = raw_line.trim();

        state = match state {
            ScanState::Seeking => {
                if !line.starts_with(BLOCK_OPENER) {
                    continue;
                }
                let depth = brace_delta(line);
                let block = BlockFields::default();
                if depth <= 0 {
                    finish_block(block, line_number, origin, &mut patterns);
                    ScanState::Seeking
                } else {
                    ScanState::InBlock {
                        depth,
                        start_line: line_number,
                        fields: block,
                    }
                }
            }
            ScanState::InBlock {
                depth,
                start_line,
                mut fields,
            } => {
                fields.absorb(line);
                let depth = depth + brace_delta(line);
                if depth <= 0 {
                    finish_block(fields, start_line, origin, &mut patterns);
                    ScanState::Seeking
                } else {
                    ScanState::InBlock {
                        depth,
                        start_line,
                        fields,
                    }
                }
            }
        };
    }

    if let ScanState::InBlock {
        start_line, fields, ..
    } = state
    {
        warn!(
            source = %origin.display(),
            line = start_line,
            "unterminated DangerPattern block"
        );
        finish_block(fields, start_line, origin, &mut patterns);
    }

    if patterns.is_empty() {
        return Err(AnalyzerError::EmptyRuleSet {
            path: origin.to_path_buf(),
        });
    }

    debug!(source = %origin.display(), count = patterns.len(), "parsed rule source");
    Ok(patterns)
}

enum ScanState {
    Seeking,
    InBlock {
        depth: i64,
        start_line: usize,
        fields: BlockFields,
    },
}

#[derive(Debug, Default)]
struct BlockFields {
    regex: Option<String>,
    description: Option<String>,
    risk_level: Option<RiskLevel>,
    shell_specific: Option<ShellScope>,
}

impl BlockFields {
    fn absorb(&mut self, line: &str) {
        if let Some(value) = line.strip_prefix("pattern:") {
            self.regex = Some(extract_string_literal(value).unwrap_or_default());
        } else if let Some(value) = line.strip_prefix("description:") {
            self.description = Some(extract_string_literal(value).unwrap_or_default());
        } else if let Some(value) = line.strip_prefix("risk_level:") {
            self.risk_level = Some(parse_risk_level(value));
        } else if let Some(value) = line.strip_prefix("shell_specific:") {
            self.shell_specific = parse_shell_scope(value);
        }
    }
}

fn finish_block(fields: BlockFields, start_line: usize, origin: &Path, out: &mut Vec<Pattern>) {
    let (Some(regex), Some(description)) = (fields.regex, fields.description) else {
        warn!(
            source = %origin.display(),
            line = start_line,
            "dropping DangerPattern block without pattern/description"
        );
        return;
    };

    let pattern = Pattern::new(
        regex,
        description,
        fields.risk_level.unwrap_or_default(),
        fields.shell_specific,
        start_line,
    );

    if let Some(err) = pattern.compile_error() {
        warn!(
            source = %origin.display(),
            line = start_line,
            regex = pattern.regex(),
            error = err,
            "rule regex does not compile; coverage tests will fail closed"
        );
    } else if pattern.compiled().is_some_and(CompiledRegex::uses_backtracking) {
        debug!(line = start_line, regex = pattern.regex(), "using backtracking engine");
    }

    out.push(pattern);
}

fn parse_risk_level(value: &str) -> RiskLevel {
    if value.contains("Critical") {
        RiskLevel::Critical
    } else if value.contains("High") {
        RiskLevel::High
    } else if value.contains("Medium") {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

fn parse_shell_scope(value: &str) -> Option<ShellScope> {
    if value.contains("None") {
        None
    } else if value.contains("Bash") {
        Some(ShellScope::Bash)
    } else if value.contains("Zsh") {
        Some(ShellScope::Zsh)
    } else if value.contains("PowerShell") {
        Some(ShellScope::PowerShell)
    } else if value.contains("Fish") {
        Some(ShellScope::Fish)
    } else {
        None
    }
}

/// Net `{` minus `}` on a line, ignoring string literals and `//` comments.
fn brace_delta(line: &str) -> i64 {
    let bytes = line.as_bytes();
    let mut delta = 0i64;
    let mut i = 0;

    while i < bytes.len() {
        if matches!(bytes[i], b'r' | b'"') {
            if let Some(lit) = literal_at(line, i) {
                i = lit.end;
                continue;
            }
        }
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => break,
            b'{' => delta += 1,
            b'}' => delta -= 1,
            _ => {}
        }
        i += 1;
    }

    delta
}

struct Literal {
    value: String,
    /// Byte offset just past the closing delimiter.
    end: usize,
}

/// Recognize a string literal starting at byte `i`: `r#"..."#`, `r"..."`
/// or `"..."` (with `\"`, `\\`, `\n`, `\t` escapes).
fn literal_at(line: &str, i: usize) -> Option<Literal> {
    let rest = &line[i..];
    let bytes = line.as_bytes();
    let prev_is_ident = i > 0 && (bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_');

    if !prev_is_ident {
        if let Some(body) = rest.strip_prefix("r#\"") {
            let close = body.find("\"#")?;
            return Some(Literal {
                value: body[..close].to_string(),
                end: i + 3 + close + 2,
            });
        }
        if let Some(body) = rest.strip_prefix("r\"") {
            let close = body.find('"')?;
            return Some(Literal {
                value: body[..close].to_string(),
                end: i + 2 + close + 1,
            });
        }
    }

    let body = rest.strip_prefix('"')?;
    let mut value = String::new();
    let mut chars = body.char_indices();
    while let Some((offset, c)) = chars.next() {
        match c {
            '"' => {
                return Some(Literal {
                    value,
                    end: i + 1 + offset + 1,
                });
            }
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, escaped)) => value.push(escaped),
                None => return None,
            },
            other => value.push(other),
        }
    }
    None
}

/// First string literal in a field value.
fn extract_string_literal(value: &str) -> Option<String> {
    value
        .char_indices()
        .filter(|(_, c)| matches!(c, 'r' | '"'))
        .find_map(|(i, _)| literal_at(value, i))
        .map(|lit| lit.value)
}

/// Infer the base command a rule regex targets.
///
/// Strips anchors, then takes the leading identifier, optionally followed by
/// a second identifier after a `\s+` (e.g. `sudo\s+rm` → `sudo rm`). A
/// second token that is really an argument (`-rf`, `if=`) is not included.
/// Falls back to the first lowercase word, then `"unknown"`.
///
/// ```
/// use pattern_gap_analyzer::rules::extract_command_base;
///
/// assert_eq!(extract_command_base(r"rm\s+-rf"), "rm");
/// assert_eq!(extract_command_base(r"dd\s+if="), "dd");
/// assert_eq!(extract_command_base(r"sudo\s+rm"), "sudo rm");
/// ```
#[must_use]
pub fn extract_command_base(regex: &str) -> String {
    let trimmed = regex.trim_start_matches('^').trim_end_matches('$');

    if let Some(caps) = COMMAND_PREFIX_RE.captures(trimmed) {
        let first = caps.get(1).map_or("", |m| m.as_str());
        let whole_end = caps.get(0).map_or(0, |m| m.end());
        let second = caps
            .get(2)
            .filter(|_| !trimmed[whole_end..].starts_with('='))
            .map(|m| m.as_str());

        return match second {
            Some(second) => format!("{first} {second}"),
            None => first.to_string(),
        };
    }

    let lower = regex.to_lowercase();
    LOWERCASE_WORD_RE
        .find(&lower)
        .map_or_else(|| "unknown".to_string(), |m| m.as_str().to_string())
}

/// Collapse whitespace escapes (`\s+`, `\s*`) to literal spaces.
///
/// Substring-based coverage tests compare fragments in this form so that
/// `rm\s+-rf` and `rm -rf` are treated alike.
#[must_use]
pub fn normalize_regex(regex: &str) -> String {
    regex.replace("\\s+", " ").replace("\\s*", " ")
}

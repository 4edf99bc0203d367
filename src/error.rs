//! Error taxonomy for the analyzer.
//!
//! Only conditions that abort a run live here. Per-block and per-regex
//! problems (malformed rule blocks, regexes that fail to compile) are
//! recovered where they occur and only logged.

use std::path::PathBuf;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Fatal analyzer error.
#[derive(Debug)]
pub enum AnalyzerError {
    /// The rule source file does not exist.
    SourceNotFound { path: PathBuf },
    /// The rule source parsed, but produced zero patterns.
    EmptyRuleSet { path: PathBuf },
    /// Reading the rule source or writing the report failed.
    Io {
        path: Option<PathBuf>,
        source: std::io::Error,
    },
    /// JSON report serialization failed.
    Serialize(serde_json::Error),
    /// An explicitly requested config file could not be parsed.
    Config { path: PathBuf, message: String },
}

impl std::fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceNotFound { path } => write!(
                f,
                "Patterns file not found: {}\nExpected a rule source such as src/safety/patterns.rs",
                path.display()
            ),
            Self::EmptyRuleSet { path } => write!(
                f,
                "No patterns found in {}\nExpected to find DangerPattern {{ ... }} blocks",
                path.display()
            ),
            Self::Io {
                path: Some(path),
                source,
            } => write!(f, "I/O error on {}: {source}", path.display()),
            Self::Io { path: None, source } => write!(f, "I/O error: {source}"),
            Self::Serialize(e) => write!(f, "Failed to serialize report: {e}"),
            Self::Config { path, message } => {
                write!(f, "Invalid config file {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for AnalyzerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AnalyzerError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }
}

impl From<serde_json::Error> for AnalyzerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialize(e)
    }
}

impl AnalyzerError {
    /// Process exit code for this error.
    ///
    /// Every fatal error maps to 1; finding gaps is never an error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        1
    }
}

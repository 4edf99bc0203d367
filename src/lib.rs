#![forbid(unsafe_code)]
//! Pattern gap analyzer library.
//!
//! Danger-pattern rules are regexes that flag hazardous shell commands
//! (recursive deletes, permission changes, disk wipes) before they run. A rule
//! written for `rm -rf ..` says nothing about `rm .. -rf`, `rm -rf ../` or
//! `rd /s /q ..`. This library parses a rule source, synthesizes realistic
//! alternative phrasings of each rule's command and reports every phrasing
//! the rule's own regex would miss.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Configuration                            │
//! │   (CLI → env vars → PGA_CONFIG → project → user → defaults)     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//!                                  ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Rule Parser                             │
//! │   DangerPattern { ... } blocks → Pattern (regex compiled once)  │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//!                                  ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Analyzer                               │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐            │
//! │  │ Argument │ │   Path   │ │ Wildcard │ │ Platform │            │
//! │  └──────────┘ └──────────┘ └──────────┘ └──────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//!                                  ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Report                                │
//! │     severity filter → stable sort → JSON / Markdown             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use pattern_gap_analyzer::{Analyzer, Report, ReportFormat, parse_patterns_source};
//! use std::path::Path;
//!
//! let source = r#"
//! DangerPattern {
//!     pattern: r"rm\s+-rf\s+\.\.",
//!     description: "Delete parent directory",
//!     risk_level: RiskLevel::Critical,
//!     shell_specific: None,
//! },
//! "#;
//!
//! let patterns = parse_patterns_source(source, Path::new("patterns.rs")).unwrap();
//! let gaps = Analyzer::default().analyze(&patterns);
//! assert!(gaps.iter().any(|g| g.example_command == "rm .. -rf"));
//!
//! let report = Report::build(&patterns, gaps);
//! let json = report.render(ReportFormat::Json).unwrap();
//! assert!(json.contains("\"patterns_analyzed\": 1"));
//! ```

pub mod cli;
pub mod config;
pub mod detectors;
pub mod error;
pub mod logging;
pub mod report;
pub mod rules;

pub use config::Config;
pub use detectors::{
    Analyzer, Detector, DetectorKind, DetectorSelection, Gap, GapSeverity, GapType,
};
pub use error::{AnalyzerError, Result};
pub use report::{Report, ReportFormat, filter_by_min_severity, render_json, render_markdown, sort_gaps};
pub use rules::{
    Pattern, PatternSummary, RiskLevel, ShellScope, extract_command_base, parse_patterns_file,
    parse_patterns_source,
};

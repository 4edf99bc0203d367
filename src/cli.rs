//! CLI argument parsing and command handling.
//!
//! This module provides the command-line interface for pga (pattern gap
//! analyzer): the `analyze` subcommand that turns a rule source into a gap
//! report, and `detectors` to list what can be run.

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{Config, LoadedConfig};
use crate::detectors::{Analyzer, DetectorKind, DetectorSelection, GapSeverity};
use crate::error::{AnalyzerError, Result};
use crate::logging::{init_logging, verbosity_directive};
use crate::report::{Report, ReportFormat, filter_by_min_severity};
use crate::rules::parse_patterns_file;

/// Coverage-gap analyzer for danger-pattern rule sets.
///
/// pga reads `DangerPattern { ... }` blocks from a rule source, generates
/// realistic alternative phrasings of each dangerous command and reports
/// every phrasing the rule's regex would miss.
#[derive(Parser, Debug)]
#[command(name = "pga")]
#[command(version, about, long_about = None)]
#[command(after_help = "Run 'pga detectors' to list the available gap detectors.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a rule source and report coverage gaps
    #[command(name = "analyze")]
    Analyze(AnalyzeCommand),

    /// List the available gap detectors
    #[command(name = "detectors")]
    Detectors,
}

#[derive(Args, Debug, Default)]
pub struct AnalyzeCommand {
    /// Rule source containing `DangerPattern { ... }` blocks
    #[arg(value_name = "RULES_FILE")]
    pub rules_file: PathBuf,

    /// Write the report to a file instead of stdout
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report format [default: markdown]
    #[arg(long, short = 'f', value_enum)]
    pub format: Option<ReportFormat>,

    /// Only report gaps at or above this severity
    #[arg(long, value_enum)]
    pub min_severity: Option<GapSeverity>,

    /// Run a single detector (default: all)
    #[arg(long, value_enum)]
    pub detector: Option<DetectorKind>,

    /// Verbose diagnostics on stderr
    #[arg(long, short = 'v', conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress progress messages; errors only
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

/// Analysis settings after merging CLI flags over the loaded config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeSettings {
    pub format: ReportFormat,
    pub min_severity: Option<GapSeverity>,
    pub detectors: Vec<DetectorKind>,
}

impl AnalyzeSettings {
    /// CLI flags win; unset flags fall back to the config.
    #[must_use]
    pub fn resolve(cmd: &AnalyzeCommand, config: &Config) -> Self {
        let detectors = match cmd.detector {
            Some(kind) => DetectorSelection::Only(kind).kinds(),
            None if config.analysis.detectors.is_empty() => DetectorSelection::All.kinds(),
            None => config.analysis.detectors.clone(),
        };

        Self {
            format: cmd.format.unwrap_or(config.output.format),
            min_severity: cmd.min_severity.or(config.output.min_severity),
            detectors,
        }
    }
}

/// Run the parsed command line.
///
/// # Errors
/// Returns the first fatal error: a missing or empty rule source, an invalid
/// explicit config file, or a failed report write.
pub fn run_command(cli: Cli) -> Result<()> {
    let loaded = Config::load()?;

    match cli.command {
        Command::Analyze(cmd) => {
            init_and_report_config(&loaded, cmd.verbose, cmd.quiet);
            handle_analyze(&loaded.config, &cmd)
        }
        Command::Detectors => {
            init_and_report_config(&loaded, false, false);
            list_detectors();
            Ok(())
        }
    }
}

fn init_and_report_config(loaded: &LoadedConfig, verbose: bool, quiet: bool) {
    init_logging(&verbosity_directive(
        verbose,
        quiet,
        &loaded.config.logging.level,
    ));
    for path in &loaded.loaded_from {
        debug!(path = %path.display(), "loaded config");
    }
    for warning in &loaded.warnings {
        warn!("{warning}");
    }
}

/// Parse, analyze, filter, render, write.
///
/// # Errors
/// See [`run_command`].
pub fn handle_analyze(config: &Config, cmd: &AnalyzeCommand) -> Result<()> {
    let settings = AnalyzeSettings::resolve(cmd, config);
    let progress = |message: String| {
        if !cmd.quiet {
            eprintln!("{message}");
        }
    };

    progress(format!(
        "{} Parsing patterns from {}",
        "->".cyan(),
        cmd.rules_file.display()
    ));
    let patterns = parse_patterns_file(&cmd.rules_file)?;
    progress(format!(
        "   Found {} patterns",
        patterns.len().to_string().bold()
    ));

    progress(format!("{} Analyzing for gaps...", "->".cyan()));
    let analyzer = Analyzer::new(&settings.detectors);
    let mut gaps = analyzer.analyze(&patterns);
    let found = gaps.len();
    if let Some(min) = settings.min_severity {
        gaps = filter_by_min_severity(gaps, min);
        debug!(
            min_severity = min.label(),
            kept = gaps.len(),
            dropped = found - gaps.len(),
            "applied severity filter"
        );
    }

    let report = Report::build(&patterns, gaps);
    progress(format!(
        "   Found {} gaps ({} critical, {} high)",
        report.gaps.len().to_string().bold(),
        report.severity_counts.critical.to_string().red(),
        report.severity_counts.high.to_string().yellow()
    ));

    let rendered = report.render(settings.format)?;
    write_output(cmd.output.as_deref(), &rendered)?;

    if let Some(path) = &cmd.output {
        progress(format!(
            "{} Report written to {}",
            "ok".green(),
            path.display()
        ));
    }

    Ok(())
}

/// Write the rendered report in one buffered write, to `path` or stdout.
fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    let io_error = |source| AnalyzerError::Io {
        path: path.map(Path::to_path_buf),
        source,
    };

    match path {
        Some(path) => {
            let file = File::create(path).map_err(io_error)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content.as_bytes()).map_err(io_error)?;
            writer.flush().map_err(io_error)
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            writer.write_all(content.as_bytes()).map_err(io_error)?;
            writer.flush().map_err(io_error)
        }
    }
}

fn list_detectors() {
    println!("{}", "Available detectors:".bold());
    println!();
    for kind in DetectorKind::ALL {
        println!("  {:<10} {}", kind.label().green(), kind.summary());
    }
    println!();
    println!("Select one with: pga analyze <RULES_FILE> --detector <NAME>");
}

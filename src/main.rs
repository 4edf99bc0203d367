#![forbid(unsafe_code)]
//! pga: coverage-gap analyzer for danger-pattern rule sets.
//!
//! Exit behavior:
//!   - 0: analysis completed (with or without gaps)
//!   - 1: missing or empty rule source, invalid explicit config, I/O failure
//!   - 2: invalid command line (reported by clap)

use clap::Parser;
use colored::Colorize;
use pattern_gap_analyzer::cli::{self, Cli};
use std::io::{self, IsTerminal};

/// Configure colored output based on TTY detection.
///
/// Disables colors if stderr is not a terminal (e.g., piped to a file).
fn configure_colors() {
    if !io::stderr().is_terminal() {
        colored::control::set_override(false);
    }
}

fn main() {
    configure_colors();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    if let Err(e) = cli::run_command(cli) {
        eprintln!("{} {e}", "Error:".red().bold());
        std::process::exit(e.exit_code());
    }
}

//! Configuration for pga.
//!
//! Supports layered configuration from multiple sources:
//! 1. Command-line flags (highest priority, applied by the CLI)
//! 2. Environment variables (`PGA_FORMAT`, `PGA_MIN_SEVERITY`, `PGA_DETECTOR`, `PGA_LOG`)
//! 3. Explicit config file (`PGA_CONFIG`)
//! 4. Project config (`.pga.toml`, searched upward to the repo root)
//! 5. User config (`~/.config/pga/config.toml`)
//! 6. Compiled defaults (lowest priority)

use crate::detectors::{DetectorKind, GapSeverity};
use crate::error::{AnalyzerError, Result};
use crate::report::ReportFormat;
use clap::ValueEnum;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable prefix for all config options.
const ENV_PREFIX: &str = "PGA";

/// Default config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Project-level config file name.
const PROJECT_CONFIG_NAME: &str = ".pga.toml";

/// Default tracing filter directive.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Effective configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub analysis: AnalysisConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Report format when `--format` is not given.
    pub format: ReportFormat,
    /// Drop gaps below this severity.
    pub min_severity: Option<GapSeverity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Detectors to run when `--detector` is not given.
    pub detectors: Vec<DetectorKind>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            detectors: DetectorKind::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive (`warn`, `pattern_gap_analyzer=debug`, ...).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// One config file as written: every key optional so that a layer only
/// overrides what it sets.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    output: OutputLayer,
    analysis: AnalysisLayer,
    logging: LoggingLayer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OutputLayer {
    format: Option<ReportFormat>,
    min_severity: Option<GapSeverity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnalysisLayer {
    detectors: Option<Vec<DetectorKind>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggingLayer {
    level: Option<String>,
}

/// Config file locations to consult, lowest priority first.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub user: Option<PathBuf>,
    pub project: Option<PathBuf>,
    /// An explicitly requested file (`PGA_CONFIG`). Parse errors are fatal.
    pub explicit: Option<PathBuf>,
}

impl ConfigSources {
    /// Locate the standard config files for the current process.
    #[must_use]
    pub fn discover() -> Self {
        Self {
            user: Config::user_config_path(),
            project: env::current_dir()
                .ok()
                .and_then(|cwd| find_project_config(&cwd)),
            explicit: env::var_os(format!("{ENV_PREFIX}_CONFIG")).map(PathBuf::from),
        }
    }
}

/// Result of loading: the merged config plus what happened along the way.
///
/// Loading runs before the tracing subscriber exists, so non-fatal problems
/// are returned for the caller to log.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: Config,
    /// Files that were read and merged, in merge order.
    pub loaded_from: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl Config {
    /// Load configuration from all standard sources and the process
    /// environment.
    ///
    /// # Errors
    /// Returns [`AnalyzerError::Config`] if the `PGA_CONFIG` file is missing
    /// or invalid.
    pub fn load() -> Result<LoadedConfig> {
        Self::load_with(&ConfigSources::discover(), |key| env::var(key).ok())
    }

    /// Load configuration from explicit sources and an environment lookup.
    ///
    /// # Errors
    /// Returns [`AnalyzerError::Config`] if the explicit file is missing or
    /// invalid.
    pub fn load_with(
        sources: &ConfigSources,
        env_lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<LoadedConfig> {
        let mut loaded = LoadedConfig::default();

        for path in [&sources.user, &sources.project].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            match read_layer(path) {
                Ok(layer) => {
                    loaded.config.merge(layer);
                    loaded.loaded_from.push(path.clone());
                }
                Err(message) => loaded
                    .warnings
                    .push(format!("ignoring config {}: {message}", path.display())),
            }
        }

        if let Some(path) = &sources.explicit {
            let layer = read_layer(path).map_err(|message| AnalyzerError::Config {
                path: path.clone(),
                message,
            })?;
            loaded.config.merge(layer);
            loaded.loaded_from.push(path.clone());
        }

        loaded.warnings.extend(loaded.config.apply_env_overrides(env_lookup));
        Ok(loaded)
    }

    /// Merge a file layer into this config (the layer takes priority).
    fn merge(&mut self, layer: ConfigLayer) {
        if let Some(format) = layer.output.format {
            self.output.format = format;
        }
        if layer.output.min_severity.is_some() {
            self.output.min_severity = layer.output.min_severity;
        }
        if let Some(detectors) = layer.analysis.detectors {
            self.analysis.detectors = detectors;
        }
        if let Some(level) = layer.logging.level {
            self.logging.level = level;
        }
    }

    /// Apply environment variable overrides. Returns a warning for every
    /// value that could not be parsed.
    fn apply_env_overrides(&mut self, env_lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut warnings = Vec::new();
        let var = |name: &str| {
            let key = format!("{ENV_PREFIX}_{name}");
            env_lookup(&key).map(|value| (key, value))
        };

        // PGA_FORMAT=json
        if let Some((key, value)) = var("FORMAT") {
            match ReportFormat::from_str(value.trim(), true) {
                Ok(format) => self.output.format = format,
                Err(_) => warnings.push(format!("ignoring {key}={value}: unknown format")),
            }
        }

        // PGA_MIN_SEVERITY=high
        if let Some((key, value)) = var("MIN_SEVERITY") {
            match GapSeverity::from_str(value.trim(), true) {
                Ok(severity) => self.output.min_severity = Some(severity),
                Err(_) => warnings.push(format!("ignoring {key}={value}: unknown severity")),
            }
        }

        // PGA_DETECTOR="argument,path"
        if let Some((key, value)) = var("DETECTOR") {
            let parsed: std::result::Result<Vec<DetectorKind>, String> = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| DetectorKind::from_str(s, true))
                .collect();
            match parsed {
                Ok(detectors) if !detectors.is_empty() => self.analysis.detectors = detectors,
                Ok(_) => warnings.push(format!("ignoring {key}: empty detector list")),
                Err(e) => warnings.push(format!("ignoring {key}={value}: {e}")),
            }
        }

        // PGA_LOG=debug
        if let Some((_, value)) = var("LOG") {
            self.logging.level = value;
        }

        warnings
    }

    /// Path of the user config file, if a config directory exists.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("pga").join(CONFIG_FILE_NAME))
    }
}

fn read_layer(path: &Path) -> std::result::Result<ConfigLayer, String> {
    let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
    toml::from_str(&content).map_err(|e| e.to_string())
}

/// Search `start` and its parents for `.pga.toml`, stopping at the first
/// directory containing `.git`.
#[must_use]
pub fn find_project_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(PROJECT_CONFIG_NAME);
        if config_path.is_file() {
            return Some(config_path);
        }

        if current.join(".git").exists() {
            return None;
        }

        if !current.pop() {
            return None;
        }
    }
}

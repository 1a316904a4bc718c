//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.tradelens.toml` files.

use crate::analysis::growth::{AnchorPolicy, DEFAULT_RATE_BOUND, DEFAULT_WINDOW_START};
use crate::analysis::projector::DEFAULT_HORIZON_END;
use crate::analysis::ranker::DEFAULT_TOP_N;
use crate::analysis::{AnalysisSettings, GrowthEstimator, PeriodRange};
use crate::cache::DEFAULT_TTL_SECONDS;
use crate::loader::{COL_EXPORTER_REPORTED, COL_IMPORTER_REPORTED, COL_VALUE};
use crate::models::{year_in_bounds, MAX_YEAR, MIN_YEAR};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".tradelens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Dataset discovery settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Default trade direction, e.g. "Turkey_to_Poland".
    #[serde(default = "default_direction")]
    pub direction: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            direction: default_direction(),
        }
    }
}

fn default_output() -> String {
    "trade_report.md".to_string()
}

fn default_direction() -> String {
    "Turkey_to_Poland".to_string()
}

/// Dataset discovery and caching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Dataset file or directory.
    #[serde(default = "default_data_path")]
    pub path: String,

    /// File extensions to include.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Names to exclude.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    /// Maximum dataset files to load.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Seconds a loaded table stays cached.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,

    /// Column holding the trade value to analyse.
    #[serde(default = "default_value_column")]
    pub value_column: String,

    /// Exporter-reported value column, for discrepancies.
    #[serde(default = "default_exporter_reported_column")]
    pub exporter_reported_column: String,

    /// Importer-reported value column, for discrepancies.
    #[serde(default = "default_importer_reported_column")]
    pub importer_reported_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            extensions: default_extensions(),
            excludes: default_excludes(),
            max_files: default_max_files(),
            max_file_size: default_max_file_size(),
            cache_ttl_seconds: default_cache_ttl(),
            value_column: default_value_column(),
            exporter_reported_column: default_exporter_reported_column(),
            importer_reported_column: default_importer_reported_column(),
        }
    }
}

fn default_data_path() -> String {
    "data".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["csv".to_string()]
}

fn default_excludes() -> Vec<String> {
    vec!["archive", "tmp"].into_iter().map(String::from).collect()
}

fn default_max_files() -> usize {
    50
}

fn default_max_file_size() -> u64 {
    256 * 1024 * 1024 // 256MB
}

fn default_cache_ttl() -> u64 {
    DEFAULT_TTL_SECONDS
}

fn default_value_column() -> String {
    COL_VALUE.to_string()
}

fn default_exporter_reported_column() -> String {
    COL_EXPORTER_REPORTED.to_string()
}

fn default_importer_reported_column() -> String {
    COL_IMPORTER_REPORTED.to_string()
}

/// Aggregation, growth and projection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// First year of the historical range.
    #[serde(default = "default_first_year")]
    pub first_year: i32,

    /// Last year of the historical range.
    #[serde(default = "default_last_year")]
    pub last_year: i32,

    /// Last projected year.
    #[serde(default = "default_horizon_end")]
    pub horizon_end: i32,

    /// Number of categories in rankings.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// CAGR anchor policy.
    #[serde(default)]
    pub anchor: AnchorPolicy,

    /// First year of the trailing CAGR window.
    #[serde(default = "default_window_start")]
    pub window_start: i32,

    /// Symmetric clamp on the projected growth rate.
    #[serde(default = "default_rate_bound")]
    pub rate_bound: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            first_year: default_first_year(),
            last_year: default_last_year(),
            horizon_end: default_horizon_end(),
            top_n: default_top_n(),
            anchor: AnchorPolicy::default(),
            window_start: default_window_start(),
            rate_bound: default_rate_bound(),
        }
    }
}

fn default_first_year() -> i32 {
    2013
}

fn default_last_year() -> i32 {
    2024
}

fn default_horizon_end() -> i32 {
    DEFAULT_HORIZON_END
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_window_start() -> i32 {
    DEFAULT_WINDOW_START
}

fn default_rate_bound() -> f64 {
    DEFAULT_RATE_BOUND
}

impl AnalysisConfig {
    /// Validated pipeline settings.
    pub fn settings(&self) -> Result<AnalysisSettings> {
        for (name, year) in [
            ("first_year", self.first_year),
            ("last_year", self.last_year),
            ("horizon_end", self.horizon_end),
            ("window_start", self.window_start),
        ] {
            if !year_in_bounds(year) {
                bail!("{} must be within {}–{}, got {}", name, MIN_YEAR, MAX_YEAR, year);
            }
        }
        let range = PeriodRange::new(self.first_year, self.last_year)?;

        if !(self.rate_bound.is_finite() && self.rate_bound >= 0.0) {
            bail!("rate_bound must be a non-negative number, got {}", self.rate_bound);
        }
        if self.top_n == 0 {
            bail!("top_n must be at least 1");
        }

        Ok(AnalysisSettings {
            range,
            growth: GrowthEstimator {
                anchor: self.anchor,
                window_start: self.window_start,
                bound: self.rate_bound,
            },
            horizon_end: self.horizon_end,
        })
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the per-year time series table.
    #[serde(default = "default_true")]
    pub include_series: bool,

    /// Include the share structure table.
    #[serde(default = "default_true")]
    pub include_shares: bool,

    /// Include the growth vs size table.
    #[serde(default = "default_true")]
    pub include_growth: bool,

    /// Include the yearly reporting discrepancy table, when the data has one.
    #[serde(default = "default_true")]
    pub include_discrepancies: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_series: true,
            include_shares: true,
            include_growth: true,
            include_discrepancies: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data) = args.data {
            self.data.path = data.display().to_string();
        }
        if let Some(ref direction) = args.direction {
            self.general.direction = direction.clone();
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if let Some(top) = args.top {
            self.analysis.top_n = top;
        }
        if let Some(anchor) = args.anchor {
            self.analysis.anchor = anchor;
        }
        if let Some(horizon) = args.horizon {
            self.analysis.horizon_end = horizon;
        }

        if let Some(ref extensions) = args.extensions {
            self.data.extensions = extensions.clone();
        }
        if let Some(ref column) = args.value_column {
            self.data.value_column = column.clone();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::{AnchorPolicy, Selection};
use crate::models::{Direction, GroupBy, Level, Measure};
use clap::Parser;
use std::path::PathBuf;

/// TradeLens - bilateral trade explorer
///
/// Rank, chart and project HS-coded trade flows between two countries.
/// Markdown/JSON reports. Built in Rust.
///
/// Examples:
///   tradelens --data ./data
///   tradelens --data trade.csv --direction Poland_to_Turkey --level hs4
///   tradelens --data trade.csv --code 870323 --projection
///   tradelens --data trade.csv --list-codes --level hs2
///   tradelens --data eu.csv --direction "Turkey_to_*" --by partner --measure combined
///   tradelens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Dataset file or directory of CSV files
    ///
    /// Defaults to the `data.path` setting ("data").
    #[arg(short, long, value_name = "PATH")]
    pub data: Option<PathBuf>,

    /// Trade direction, e.g. Turkey_to_Poland
    ///
    /// A `*` side matches every partner, e.g. Turkey_to_* or *_to_Turkey.
    /// Can also be set via TRADELENS_DIRECTION env var or .tradelens.toml config.
    #[arg(long, value_name = "DIRECTION", env = "TRADELENS_DIRECTION")]
    pub direction: Option<String>,

    /// Product classification level
    #[arg(short, long, value_enum, default_value_t = Level::Hs6)]
    pub level: Level,

    /// Group categories by product code or by partner country
    #[arg(long = "by", value_enum, default_value_t = GroupBy::Code, value_name = "GROUPING")]
    pub group_by: GroupBy,

    /// Sum the direction alone, or both directions as total trade volume
    #[arg(long, value_enum, default_value_t = Measure::Directed)]
    pub measure: Measure,

    /// Category to chart; omit for the home view of top categories
    ///
    /// Accepts "870323", a listed option such as "870323 – Motor cars",
    /// or a partner country with --by partner.
    #[arg(long, value_name = "CODE")]
    pub code: Option<String>,

    /// Extra category charted next to the selection, e.g. Poland
    #[arg(long, value_name = "CODE")]
    pub compare: Option<String>,

    /// Extend charted series with a CAGR projection
    #[arg(short, long)]
    pub projection: bool,

    /// Year of the share structure (defaults to the latest year)
    #[arg(long, value_name = "YEAR")]
    pub share_year: Option<i32>,

    /// Number of top categories in the home view
    #[arg(short, long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// CAGR anchor policy
    #[arg(long, value_enum, value_name = "POLICY")]
    pub anchor: Option<AnchorPolicy>,

    /// Last projected year
    #[arg(long, value_name = "YEAR")]
    pub horizon: Option<i32>,

    /// Dataset column holding the values, e.g. Turkey_Reported_Value
    #[arg(long, value_name = "COLUMN")]
    pub value_column: Option<String>,

    /// Dataset file extensions to include (comma-separated)
    ///
    /// Example: --extensions csv,txt
    #[arg(long, value_name = "EXTS", value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .tradelens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the code options for the direction and level, then exit
    #[arg(long)]
    pub list_codes: bool,

    /// Dry run: list the dataset files that would be loaded and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .tradelens.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// File extension of reports in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref direction) = self.direction {
            direction.parse::<Direction>()?;
        }

        if let Some(top) = self.top {
            if top == 0 {
                return Err("Top count must be at least 1".to_string());
            }
        }

        // Validate codes against the requested level
        if self.group_by == GroupBy::Code {
            if let Selection::Code(code) = self.selection()? {
                self.validate_code(&code)?;
            }
            if let Some(ref compare) = self.compare {
                self.validate_code(compare.trim())?;
            }
        }

        if let Some(ref column) = self.value_column {
            if column.trim().is_empty() {
                return Err("Value column cannot be empty".to_string());
            }
        }

        if self.list_codes && self.code.is_some() {
            return Err("Cannot use --list-codes together with --code".to_string());
        }

        Ok(())
    }

    fn validate_code(&self, code: &str) -> Result<(), String> {
        if !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("Code must be numeric: {}", code));
        }
        if code.len() > self.level.width() {
            return Err(format!(
                "Code {} is longer than a {} code ({} digits)",
                code,
                self.level,
                self.level.width()
            ));
        }
        Ok(())
    }

    /// The requested selection: a single code, or the home view.
    pub fn selection(&self) -> Result<Selection, String> {
        match self.code {
            Some(ref code) => code.parse(),
            None => Ok(Selection::All),
        }
    }

    /// Returns the log level based on verbosity settings. `config_verbose`
    /// is the configured default; `--quiet` wins over both.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

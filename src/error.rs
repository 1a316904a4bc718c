//! Error types for the analysis pipeline and the dataset loader.
//!
//! Structural failures abort a query and surface as one of these errors.
//! Per-category failures (too little history, zero base) are not errors:
//! they travel inside [`crate::models::GrowthEstimate`] and are reported as
//! notices next to the successful results.

use crate::models::Direction;
use thiserror::Error;

/// A specialized Result type for pipeline operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Failures of a single analysis query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The filtered record set is empty.
    #[error("No trade data available for {direction} by {grouping}{}", selection_suffix(.code))]
    EmptySelection {
        direction: Direction,
        /// Category grouping, e.g. "HS4" or "partner".
        grouping: String,
        code: Option<String>,
    },

    /// Shares are undefined because the period total is zero.
    #[error("Total trade value for {period} is zero; shares are undefined")]
    ZeroDenominator { period: i32 },

    /// Declared period range is inverted.
    #[error("Invalid period range: {min_year} > {max_year}")]
    InvalidPeriodRange { min_year: i32, max_year: i32 },
}

fn selection_suffix(code: &Option<String>) -> String {
    match code {
        Some(code) => format!(" for code {}", code),
        None => String::new(),
    }
}

/// Failures while turning a dataset file into a record table.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The input lacks an expected column.
    #[error("Missing required column '{column}' in {source_name}")]
    MissingColumn { column: String, source_name: String },

    /// A row could not be interpreted.
    #[error("Invalid row at line {line} in {source_name}: {reason}")]
    InvalidRow {
        line: u64,
        source_name: String,
        reason: String,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

//! Report rendering.

mod generator;

pub use generator::{generate_json_report, generate_markdown_report, write_report};

use crate::analysis::TradeAnalysis;
use crate::models::ReportMetadata;
use serde::{Deserialize, Serialize};

/// A query result together with how it was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeReport {
    pub metadata: ReportMetadata,
    pub analysis: TradeAnalysis,
}

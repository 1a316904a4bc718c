//! Analysis modules.
//!
//! Aggregation feeds three independent consumers: ranking, growth
//! estimation (and projection on top of it), and share structure. The
//! pipeline module wires them together for one query.

pub mod aggregator;
pub mod growth;
pub mod pipeline;
pub mod projector;
pub mod ranker;
pub mod shares;

pub use aggregator::PeriodRange;
pub use growth::{AnchorPolicy, GrowthEstimator};
pub use pipeline::{code_options, run_query, AnalysisSettings, Query, Selection, TradeAnalysis};

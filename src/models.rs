//! Data models for the trade explorer.
//!
//! This module contains the core data structures shared by the loader,
//! the analysis pipeline and the report generator: observations, series,
//! growth estimates, projections and share rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Description used when the dataset has no text for a code.
pub const UNKNOWN_DESCRIPTION: &str = "Unknown";

/// Direction side matching any partner except the named one.
pub const ANY_PARTNER: &str = "*";

/// Earliest year accepted anywhere in the pipeline.
pub const MIN_YEAR: i32 = 1900;

/// Latest year accepted anywhere in the pipeline.
pub const MAX_YEAR: i32 = 2100;

/// Whether `year` lies inside the accepted calendar bounds.
pub fn year_in_bounds(year: i32) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&year)
}

/// Product-classification granularity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    /// Two-digit chapter.
    Hs2,
    /// Four-digit heading.
    Hs4,
    /// Six-digit subheading.
    Hs6,
}

impl Level {
    /// Number of digits in a code of this level.
    pub fn width(&self) -> usize {
        match self {
            Level::Hs2 => 2,
            Level::Hs4 => 4,
            Level::Hs6 => 6,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Hs2 => write!(f, "HS2"),
            Level::Hs4 => write!(f, "HS4"),
            Level::Hs6 => write!(f, "HS6"),
        }
    }
}

/// Direction of a trade flow, from exporter to importer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Direction {
    pub exporter: String,
    pub importer: String,
}

impl Direction {
    pub fn new(exporter: impl Into<String>, importer: impl Into<String>) -> Self {
        Self {
            exporter: exporter.into(),
            importer: importer.into(),
        }
    }

    /// The same pair of partners, flowing the other way.
    pub fn reversed(&self) -> Self {
        Self::new(self.importer.clone(), self.exporter.clone())
    }

    /// Whether a recorded flow fits this direction. A `*` side matches any
    /// country; flows from a country to itself never match.
    pub fn matches(&self, flow: &Direction) -> bool {
        let side = |pattern: &str, name: &str| pattern == ANY_PARTNER || pattern == name;
        flow.exporter != flow.importer
            && side(&self.exporter, &flow.exporter)
            && side(&self.importer, &flow.importer)
    }

    /// The named side partners are measured against: the exporter unless
    /// it is the wildcard.
    pub fn home(&self) -> &str {
        if self.exporter == ANY_PARTNER {
            &self.importer
        } else {
            &self.exporter
        }
    }

    /// The side of `flow` that is not the home country.
    pub fn partner_of<'a>(&self, flow: &'a Direction) -> &'a str {
        if flow.exporter == self.home() {
            &flow.importer
        } else {
            &flow.exporter
        }
    }

    /// Human-readable form, e.g. "from Turkey to Poland".
    pub fn describe(&self) -> String {
        format!("from {} to {}", side_name(&self.exporter), side_name(&self.importer))
    }

    /// Both-ways form, e.g. "between Turkey and Poland".
    pub fn describe_both(&self) -> String {
        format!("between {} and {}", side_name(&self.exporter), side_name(&self.importer))
    }
}

fn side_name(name: &str) -> &str {
    if name == ANY_PARTNER {
        "any partner"
    } else {
        name
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_to_{}", self.exporter, self.importer)
    }
}

impl FromStr for Direction {
    type Err = String;

    /// Accepts `"Turkey_to_Poland"`, `"Turkey to Poland"` and wildcard
    /// forms such as `"*_to_Turkey"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace(' ', "_");
        let (exporter, importer) = normalized
            .split_once("_to_")
            .ok_or_else(|| format!("Direction must look like 'A_to_B', got '{}'", s))?;

        let exporter = exporter.trim_matches('_');
        let importer = importer.trim_matches('_');
        if exporter.is_empty() || importer.is_empty() {
            return Err(format!("Direction is missing a partner: '{}'", s));
        }
        if exporter == importer {
            return Err(format!("Direction needs two different partners: '{}'", s));
        }

        Ok(Self::new(exporter, importer))
    }
}

/// Which flows a query sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Measure {
    /// Flows in the query direction only.
    #[default]
    Directed,
    /// Both directions summed into a total trade volume.
    Combined,
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::Directed => write!(f, "Directed flow"),
            Measure::Combined => write!(f, "Total trade volume (both directions)"),
        }
    }
}

/// What observations are grouped into categories by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// Product code at the query level.
    #[default]
    Code,
    /// Partner country of the home side.
    Partner,
}

/// One trade observation as loaded from the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Calendar year.
    pub period: i32,
    /// Six-digit code, zero-padded.
    pub hs6: String,
    /// Four-digit code, zero-padded.
    pub hs4: String,
    /// Two-digit code, zero-padded.
    pub hs2: String,
    pub hs6_description: String,
    pub hs4_description: String,
    pub hs2_description: String,
    pub direction: Direction,
    /// Trade value in USD, from the configured value column.
    pub value: f64,
    /// Exporter-reported minus importer-reported value, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discrepancy: Option<f64>,
}

impl Observation {
    /// Category code at the given level.
    pub fn code(&self, level: Level) -> &str {
        match level {
            Level::Hs2 => &self.hs2,
            Level::Hs4 => &self.hs4,
            Level::Hs6 => &self.hs6,
        }
    }

    /// Description of the code at the given level.
    pub fn description(&self, level: Level) -> &str {
        match level {
            Level::Hs2 => &self.hs2_description,
            Level::Hs4 => &self.hs4_description,
            Level::Hs6 => &self.hs6_description,
        }
    }
}

/// Which part of a chart line a point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    Historical,
    Projected,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Historical => write!(f, "Historical"),
            Segment::Projected => write!(f, "Projection"),
        }
    }
}

/// A single `(period, value)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub period: i32,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(period: i32, value: f64) -> Self {
        Self { period, value }
    }
}

/// Ordered values of one category, ascending by period, no duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub category: String,
    pub points: Vec<SeriesPoint>,
}

impl Series {
    /// Build a series, sorting by period. Later duplicates are summed into
    /// the first occurrence.
    pub fn new(category: impl Into<String>, mut points: Vec<SeriesPoint>) -> Self {
        points.sort_by_key(|p| p.period);
        points.dedup_by(|later, earlier| {
            if later.period == earlier.period {
                earlier.value += later.value;
                true
            } else {
                false
            }
        });

        Self {
            category: category.into(),
            points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[allow(dead_code)] // Read by tests
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// The most recent point.
    pub fn last(&self) -> Option<SeriesPoint> {
        self.points.last().copied()
    }
}

/// Why a growth estimate could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrowthIssue {
    /// Fewer than two qualifying points, or they span zero periods.
    InsufficientHistory { points: usize },
    /// The starting value is zero or negative.
    DegenerateBase { start: f64 },
}

impl fmt::Display for GrowthIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrowthIssue::InsufficientHistory { points } => {
                write!(f, "insufficient history ({} qualifying points)", points)
            }
            GrowthIssue::DegenerateBase { start } => {
                write!(f, "non-positive starting value ({})", start)
            }
        }
    }
}

/// Compound annual growth rate for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthEstimate {
    pub category: String,
    /// Clamped fractional growth per period. Zero when invalid.
    pub rate: f64,
    /// Unclamped rate, when one could be computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_rate: Option<f64>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<GrowthIssue>,
}

impl GrowthEstimate {
    pub fn valid(category: impl Into<String>, rate: f64, raw_rate: f64) -> Self {
        Self {
            category: category.into(),
            rate,
            raw_rate: Some(raw_rate),
            valid: true,
            issue: None,
        }
    }

    pub fn invalid(category: impl Into<String>, issue: GrowthIssue) -> Self {
        Self {
            category: category.into(),
            rate: 0.0,
            raw_rate: None,
            valid: false,
            issue: Some(issue),
        }
    }
}

/// Forward extrapolation of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub category: String,
    pub rate: f64,
    /// Last historical point, shared by both segments of a chart line.
    pub anchor: SeriesPoint,
    /// Projected points, strictly after the anchor period.
    pub points: Vec<SeriesPoint>,
}

/// Share of one category in a period's total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareRow {
    pub category: String,
    pub raw_value: f64,
    pub share_percent: f64,
}

/// Ranked category for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCategory {
    pub category: String,
    pub total: f64,
}

/// Severity of a notice attached to a query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
}

impl NoticeLevel {
    /// Returns an emoji representation of the level.
    pub fn emoji(&self) -> &'static str {
        match self {
            NoticeLevel::Info => "ℹ️",
            NoticeLevel::Warning => "⚠️",
        }
    }
}

/// Non-fatal message reported alongside results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub message: String,
}

impl Notice {
    pub fn info(category: Option<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            category,
            message: message.into(),
        }
    }

    pub fn warning(category: Option<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            category,
            message: message.into(),
        }
    }
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Dataset files the table was loaded from.
    pub sources: Vec<String>,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of observations in the loaded table.
    pub observations: usize,
    /// Growth anchor policy and clamp used for the estimates.
    pub growth_policy: String,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

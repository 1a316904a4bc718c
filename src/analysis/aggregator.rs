//! Trade value aggregation.
//!
//! This module groups observations by (period, category) and turns the
//! totals into per-category series, zero-filling any period of the declared
//! range that has no observations. A category is a product code or a
//! partner country. Reporting discrepancies are summed per period.

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{Level, Observation, Series, SeriesPoint};
use crate::table::Records;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Contiguous, inclusive range of years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub min_year: i32,
    pub max_year: i32,
}

impl PeriodRange {
    pub fn new(min_year: i32, max_year: i32) -> AnalysisResult<Self> {
        if min_year > max_year {
            return Err(AnalysisError::InvalidPeriodRange { min_year, max_year });
        }
        Ok(Self { min_year, max_year })
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.min_year..=self.max_year
    }

    pub fn contains(&self, period: i32) -> bool {
        (self.min_year..=self.max_year).contains(&period)
    }
}

/// Summed values per category and period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTotals {
    totals: BTreeMap<String, BTreeMap<i32, f64>>,
}

impl CategoryTotals {
    /// Total for one (period, category) pair, if present.
    pub fn total(&self, period: i32, category: &str) -> Option<f64> {
        self.totals
            .get(category)
            .and_then(|by_period| by_period.get(&period))
            .copied()
    }

    /// Per-category totals of one period, code ascending. Categories with no
    /// rows in that period are omitted.
    pub fn totals_for_period(&self, period: i32) -> Vec<(String, f64)> {
        self.totals
            .iter()
            .filter_map(|(category, by_period)| {
                by_period
                    .get(&period)
                    .map(|value| (category.clone(), *value))
            })
            .collect()
    }

    /// Series of the periods actually present for a category.
    pub fn observed_series(&self, category: &str) -> Series {
        let points = self
            .totals
            .get(category)
            .map(|by_period| {
                by_period
                    .iter()
                    .map(|(period, value)| SeriesPoint::new(*period, *value))
                    .collect()
            })
            .unwrap_or_default();

        Series::new(category, points)
    }

    /// Series with one entry per period of `range`, absent periods as zero.
    pub fn filled_series(&self, category: &str, range: PeriodRange) -> Series {
        let by_period = self.totals.get(category);
        let points = range
            .years()
            .map(|period| {
                let value = by_period
                    .and_then(|m| m.get(&period))
                    .copied()
                    .unwrap_or(0.0);
                SeriesPoint::new(period, value)
            })
            .collect();

        Series::new(category, points)
    }
}

/// Sum values by (period, category code at `level`).
pub fn aggregate(records: &Records<'_>, level: Level) -> CategoryTotals {
    aggregate_by(records, |row| row.code(level))
}

/// Sum values by (period, category) for any category key.
pub fn aggregate_by<'a, F>(records: &Records<'a>, key: F) -> CategoryTotals
where
    F: Fn(&'a Observation) -> &'a str,
{
    let mut totals: BTreeMap<String, BTreeMap<i32, f64>> = BTreeMap::new();

    for row in records.iter() {
        *totals
            .entry(key(row).to_string())
            .or_default()
            .entry(row.period)
            .or_default() += row.value;
    }

    CategoryTotals { totals }
}

/// Reporting discrepancy summed per period, over rows that carry one.
/// `None` when no row does.
pub fn discrepancy_series(records: &Records<'_>) -> Option<Series> {
    let points = records
        .iter()
        .filter_map(|row| row.discrepancy.map(|gap| SeriesPoint::new(row.period, gap)))
        .collect();

    let series = Series::new("discrepancy", points);
    (!series.is_empty()).then_some(series)
}

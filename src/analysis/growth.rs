//! Compound annual growth rate estimation.
//!
//! Two anchor policies are available. The trailing window policy (default)
//! takes the first and last points at or after `window_start`. The
//! first/last positive policy takes the first and last strictly positive
//! points of the whole series, which tolerates intermittent zero years.
//! Both clamp the resulting rate to `[-bound, +bound]`.

use crate::models::{GrowthEstimate, GrowthIssue, Series, SeriesPoint};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default first year of the trailing analysis window.
pub const DEFAULT_WINDOW_START: i32 = 2020;

/// Default symmetric clamp on the per-period rate.
pub const DEFAULT_RATE_BOUND: f64 = 0.35;

/// How the start and end points of a CAGR are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorPolicy {
    /// First and last points at or after the window start.
    #[default]
    TrailingWindow,
    /// First and last strictly positive points of the whole series.
    FirstLastPositive,
}

impl fmt::Display for AnchorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorPolicy::TrailingWindow => write!(f, "trailing-window"),
            AnchorPolicy::FirstLastPositive => write!(f, "first-last-positive"),
        }
    }
}

/// Growth estimator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthEstimator {
    pub anchor: AnchorPolicy,
    pub window_start: i32,
    pub bound: f64,
}

impl Default for GrowthEstimator {
    fn default() -> Self {
        Self {
            anchor: AnchorPolicy::default(),
            window_start: DEFAULT_WINDOW_START,
            bound: DEFAULT_RATE_BOUND,
        }
    }
}

impl GrowthEstimator {
    /// Human-readable summary of the policy, e.g. for report headers.
    pub fn describe(&self) -> String {
        let clamp = format!("clamped to ±{:.0}%", self.bound * 100.0);
        match self.anchor {
            AnchorPolicy::TrailingWindow => {
                format!("{} from {}, {}", self.anchor, self.window_start, clamp)
            }
            AnchorPolicy::FirstLastPositive => format!("{}, {}", self.anchor, clamp),
        }
    }

    /// Estimate the clamped CAGR of a series.
    pub fn estimate(&self, series: &Series) -> GrowthEstimate {
        let qualifying: Vec<SeriesPoint> = match self.anchor {
            AnchorPolicy::TrailingWindow => series
                .points
                .iter()
                .filter(|p| p.period >= self.window_start)
                .copied()
                .collect(),
            AnchorPolicy::FirstLastPositive => series
                .points
                .iter()
                .filter(|p| p.value > 0.0)
                .copied()
                .collect(),
        };

        let (first, last) = match (qualifying.first(), qualifying.last()) {
            (Some(first), Some(last)) if qualifying.len() >= 2 => (*first, *last),
            _ => {
                return GrowthEstimate::invalid(
                    &series.category,
                    GrowthIssue::InsufficientHistory {
                        points: qualifying.len(),
                    },
                )
            }
        };

        if first.value <= 0.0 {
            return GrowthEstimate::invalid(
                &series.category,
                GrowthIssue::DegenerateBase { start: first.value },
            );
        }

        // Zero spans, and spans too wide for an i32, cannot carry a rate.
        let years = match last.period.checked_sub(first.period) {
            Some(years) if years > 0 => years,
            _ => {
                return GrowthEstimate::invalid(
                    &series.category,
                    GrowthIssue::InsufficientHistory {
                        points: qualifying.len(),
                    },
                )
            }
        };

        let raw = cagr(first.value, last.value, years);
        if !raw.is_finite() {
            // Negative end values have no real root.
            return GrowthEstimate::invalid(
                &series.category,
                GrowthIssue::DegenerateBase { start: first.value },
            );
        }

        let bound = self.bound.abs();
        GrowthEstimate::valid(&series.category, raw.clamp(-bound, bound), raw)
    }
}

/// Constant per-period rate turning `start` into `end` over `years`.
pub fn cagr(start: f64, end: f64, years: i32) -> f64 {
    (end / start).powf(1.0 / f64::from(years)) - 1.0
}

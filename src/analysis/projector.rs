//! Forward projection of a historical series.

use crate::models::{GrowthEstimate, Projection, Series, SeriesPoint};

/// Default last projected year.
pub const DEFAULT_HORIZON_END: i32 = 2030;

/// Extend `series` from its last point through `horizon_end`, compounding
/// by the estimate's rate and flooring at zero.
///
/// Returns `None` when the estimate is invalid or the series is empty.
/// A series already ending at or after the horizon yields an empty
/// projection.
pub fn project(series: &Series, estimate: &GrowthEstimate, horizon_end: i32) -> Option<Projection> {
    if !estimate.valid {
        return None;
    }

    let anchor = series.last()?;
    let points = project_from(anchor, estimate.rate, horizon_end);

    Some(Projection {
        category: series.category.clone(),
        rate: estimate.rate,
        anchor,
        points,
    })
}

/// Compound `anchor` forward one period at a time. Empty when the anchor
/// is the last representable period.
pub fn project_from(anchor: SeriesPoint, rate: f64, horizon_end: i32) -> Vec<SeriesPoint> {
    let Some(first) = anchor.period.checked_add(1) else {
        return Vec::new();
    };
    let mut value = anchor.value;

    (first..=horizon_end)
        .map(|period| {
            value = (value * (1.0 + rate)).max(0.0);
            SeriesPoint::new(period, value)
        })
        .collect()
}

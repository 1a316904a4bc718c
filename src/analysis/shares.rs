//! Category share structure of one period.
//!
//! Shares below [`LABEL_THRESHOLD_PERCENT`] keep their place in the data but
//! get no chart label. In the display table, shares below
//! [`TINY_SHARE_PERCENT`] sink to the bottom and print as
//! [`TINY_SHARE_PLACEHOLDER`].

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::ShareRow;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Minimum share (percent) that gets a chart label.
pub const LABEL_THRESHOLD_PERCENT: f64 = 1.0;

/// Shares (percent) below this print as a placeholder.
pub const TINY_SHARE_PERCENT: f64 = 0.01;

pub const TINY_SHARE_PLACEHOLDER: &str = "<0.01";

/// Shares of every category in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareTable {
    pub period: i32,
    pub total: f64,
    pub rows: Vec<ShareRow>,
}

/// A share row formatted for a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareDisplayRow {
    pub category: String,
    pub share_percent: f64,
    /// Two-decimal share, or the tiny-share placeholder.
    pub display: String,
}

impl ShareTable {
    /// Mean share across categories.
    pub fn average_share(&self) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        self.rows.iter().map(|r| r.share_percent).sum::<f64>() / self.rows.len() as f64
    }

    /// Chart label per row; `None` for shares under the label threshold.
    pub fn chart_labels(&self) -> Vec<(String, Option<String>)> {
        self.rows
            .iter()
            .map(|row| {
                let label = (row.share_percent >= LABEL_THRESHOLD_PERCENT)
                    .then(|| format!("{} ({:.1}%)", row.category, row.share_percent));
                (row.category.clone(), label)
            })
            .collect()
    }

    /// Rows sorted by share descending, tiny shares last.
    pub fn display_rows(&self) -> Vec<ShareDisplayRow> {
        let mut sorted: Vec<&ShareRow> = self.rows.iter().collect();
        sorted.sort_by(|a, b| {
            b.share_percent
                .partial_cmp(&a.share_percent)
                .unwrap_or(Ordering::Equal)
        });

        let (normal, tiny): (Vec<&ShareRow>, Vec<&ShareRow>) = sorted
            .into_iter()
            .partition(|row| row.share_percent >= TINY_SHARE_PERCENT);

        normal
            .into_iter()
            .chain(tiny)
            .map(|row| ShareDisplayRow {
                category: row.category.clone(),
                share_percent: row.share_percent,
                display: format_share(row.share_percent),
            })
            .collect()
    }
}

/// Two-decimal share, or the placeholder for near-zero shares.
pub fn format_share(share_percent: f64) -> String {
    if share_percent < TINY_SHARE_PERCENT {
        TINY_SHARE_PLACEHOLDER.to_string()
    } else {
        format!("{:.2}", share_percent)
    }
}

/// Convert per-category totals of one period into percentage shares.
pub fn compute_shares(period: i32, totals: &[(String, f64)]) -> AnalysisResult<ShareTable> {
    let total: f64 = totals.iter().map(|(_, value)| value).sum();

    if total == 0.0 || !total.is_finite() {
        return Err(AnalysisError::ZeroDenominator { period });
    }

    let rows = totals
        .iter()
        .map(|(category, value)| ShareRow {
            category: category.clone(),
            raw_value: *value,
            share_percent: 100.0 * value / total,
        })
        .collect();

    Ok(ShareTable {
        period,
        total,
        rows,
    })
}

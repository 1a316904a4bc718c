//! In-memory record table of trade observations.
//!
//! The table is immutable once loaded. Every filter produces a new,
//! borrowed view; nothing mutates the loaded rows.

use crate::models::{Direction, Level, Measure, Observation, UNKNOWN_DESCRIPTION};
use std::collections::BTreeMap;

/// Description shown for codes absent from the table.
pub const DESCRIPTION_NOT_AVAILABLE: &str = "Description not available";

/// Owned set of observations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    rows: Vec<Observation>,
}

impl RecordTable {
    pub fn new(rows: Vec<Observation>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[allow(dead_code)] // Read by tests
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Borrow every row.
    pub fn rows(&self) -> Records<'_> {
        Records {
            rows: self.rows.iter().collect(),
        }
    }

    /// Distinct directions present, in first-seen order.
    pub fn directions(&self) -> Vec<Direction> {
        let mut seen: Vec<Direction> = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.direction) {
                seen.push(row.direction.clone());
            }
        }
        seen
    }

    /// Append the rows of another table.
    pub fn extend(&mut self, other: RecordTable) {
        self.rows.extend(other.rows);
    }
}

/// A filtered, borrowed view over a [`RecordTable`].
#[derive(Debug, Clone, Default)]
pub struct Records<'a> {
    rows: Vec<&'a Observation>,
}

impl<'a> Records<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Observation> + '_ {
        self.rows.iter().copied()
    }

    /// Keep rows whose flow fits `direction` (`*` sides included).
    pub fn with_direction(&self, direction: &Direction) -> Records<'a> {
        self.filter(|row| direction.matches(&row.direction))
    }

    /// Keep the rows a measure sums: the direction alone, or both ways.
    pub fn with_flow(&self, direction: &Direction, measure: Measure) -> Records<'a> {
        match measure {
            Measure::Directed => self.with_direction(direction),
            Measure::Combined => {
                let reversed = direction.reversed();
                self.filter(|row| {
                    direction.matches(&row.direction) || reversed.matches(&row.direction)
                })
            }
        }
    }

    /// Keep rows traded with one partner of the direction's home side.
    pub fn with_partner(&self, direction: &Direction, partner: &str) -> Records<'a> {
        self.filter(|row| direction.partner_of(&row.direction) == partner)
    }

    /// Keep rows whose code at `level` equals `code`.
    pub fn with_code(&self, level: Level, code: &str) -> Records<'a> {
        self.filter(|row| row.code(level) == code)
    }

    /// Most recent period present.
    pub fn latest_period(&self) -> Option<i32> {
        self.rows.iter().map(|row| row.period).max()
    }

    /// Distinct periods present, ascending.
    pub fn periods(&self) -> Vec<i32> {
        let mut periods: Vec<i32> = self.rows.iter().map(|row| row.period).collect();
        periods.sort_unstable();
        periods.dedup();
        periods
    }

    /// Code → description at `level`, taking the first informative
    /// description seen for each code.
    pub fn descriptions(&self, level: Level) -> BTreeMap<String, String> {
        let mut map: BTreeMap<String, String> = BTreeMap::new();

        for row in &self.rows {
            let description = row.description(level);
            let entry = map
                .entry(row.code(level).to_string())
                .or_insert_with(|| description.to_string());

            if *entry == UNKNOWN_DESCRIPTION && description != UNKNOWN_DESCRIPTION {
                *entry = description.to_string();
            }
        }

        map
    }

    fn filter(&self, keep: impl Fn(&Observation) -> bool) -> Records<'a> {
        Records {
            rows: self.rows.iter().copied().filter(|row| keep(row)).collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Build an observation with an HS6 code; HS4/HS2 are its prefixes.
    pub fn obs(period: i32, hs6: &str, direction: &str, value: f64) -> Observation {
        Observation {
            period,
            hs6: hs6.to_string(),
            hs4: hs6[..4].to_string(),
            hs2: hs6[..2].to_string(),
            hs6_description: format!("Goods {}", hs6),
            hs4_description: format!("Heading {}", &hs6[..4]),
            hs2_description: UNKNOWN_DESCRIPTION.to_string(),
            direction: direction.parse().unwrap(),
            value,
            discrepancy: None,
        }
    }
}

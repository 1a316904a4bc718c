//! Top-N category ranking for a single period.

use crate::analysis::aggregator::CategoryTotals;
use crate::models::RankedCategory;
use std::cmp::Ordering;

/// Default number of ranked categories.
pub const DEFAULT_TOP_N: usize = 10;

/// Rank categories by total descending; equal totals are ordered by
/// category code ascending.
pub fn rank(totals: &[(String, f64)], n: usize) -> Vec<RankedCategory> {
    let mut ranked: Vec<RankedCategory> = totals
        .iter()
        .map(|(category, total)| RankedCategory {
            category: category.clone(),
            total: *total,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });
    ranked.truncate(n);

    ranked
}

/// Top `n` categories of `period`. Empty when the period has no rows.
pub fn top_categories(totals: &CategoryTotals, period: i32, n: usize) -> Vec<RankedCategory> {
    rank(&totals.totals_for_period(period), n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::aggregate;
    use crate::models::Level;
    use crate::table::fixtures::obs;
    use crate::table::RecordTable;

    fn totals(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|(c, v)| (c.to_string(), *v)).collect()
    }

    #[test]
    fn test_rank_descending() {
        let ranked = rank(&totals(&[("A", 10.0), ("B", 30.0), ("C", 20.0)]), 3);
        let order: Vec<&str> = ranked.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_ties_ordered_by_code() {
        let ranked = rank(
            &totals(&[("A", 10.0), ("B", 30.0), ("C", 20.0), ("D", 30.0)]),
            2,
        );
        let order: Vec<&str> = ranked.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(order, vec!["B", "D"]);

        // Input order does not matter.
        let ranked = rank(&totals(&[("D", 30.0), ("B", 30.0)]), 2);
        assert_eq!(ranked[0].category, "B");
    }

    #[test]
    fn test_rank_fewer_than_n() {
        let ranked = rank(&totals(&[("A", 1.0)]), DEFAULT_TOP_N);
        assert_eq!(ranked.len(), 1);
        assert!(rank(&[], 5).is_empty());
    }

    #[test]
    fn test_top_categories_for_period() {
        let table = RecordTable::new(vec![
            obs(2023, "870323", "Turkey_to_Poland", 5.0),
            obs(2024, "870323", "Turkey_to_Poland", 1.0),
            obs(2024, "610910", "Turkey_to_Poland", 9.0),
        ]);
        let totals = aggregate(&table.rows(), Level::Hs4);

        let top = top_categories(&totals, 2024, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].category, "6109");
        assert_eq!(top[0].total, 9.0);

        assert!(top_categories(&totals, 2019, 10).is_empty());
    }
}

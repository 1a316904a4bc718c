//! One analysis query over the record table.
//!
//! A query filters the table by direction (one way, or both ways for a
//! total trade volume) and optionally a single category, then runs the
//! aggregator and feeds its totals to the ranker, the growth estimator and
//! projector, and the share calculator. Categories are product codes or
//! partner countries. Structural failures abort with an [`AnalysisError`];
//! per-category failures become notices.

use crate::analysis::aggregator::{
    aggregate, aggregate_by, discrepancy_series, CategoryTotals, PeriodRange,
};
use crate::analysis::growth::GrowthEstimator;
use crate::analysis::projector::{project, DEFAULT_HORIZON_END};
use crate::analysis::ranker::{top_categories, DEFAULT_TOP_N};
use crate::analysis::shares::{compute_shares, ShareTable};
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{
    Direction, GroupBy, GrowthEstimate, Level, Measure, Notice, Observation, Projection,
    RankedCategory, Series,
};
use crate::table::{RecordTable, Records};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Which categories a query looks at.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code", rename_all = "lowercase")]
pub enum Selection {
    /// Overview: top categories of the latest year.
    #[default]
    All,
    /// A single category code.
    Code(String),
}

impl Selection {
    pub fn code(&self) -> Option<&str> {
        match self {
            Selection::All => None,
            Selection::Code(code) => Some(code),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => write!(f, "All categories"),
            Selection::Code(code) => write!(f, "{}", code),
        }
    }
}

impl FromStr for Selection {
    type Err = String;

    /// `"all"` / `"home"` select the overview; anything else is a code.
    /// A `"code – description"` option string keeps only the code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("Selection cannot be empty".to_string());
        }

        match trimmed.to_lowercase().as_str() {
            "all" | "home" => Ok(Selection::All),
            _ => {
                let code = trimmed
                    .split(" – ")
                    .next()
                    .unwrap_or(trimmed)
                    .trim()
                    .to_string();
                Ok(Selection::Code(code))
            }
        }
    }
}

/// Parameters supplied by the caller for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub direction: Direction,
    pub level: Level,
    pub group_by: GroupBy,
    pub measure: Measure,
    pub selection: Selection,
    /// Extra category charted next to the selection.
    pub compare: Option<String>,
    pub show_projection: bool,
    /// Year of the share structure; defaults to the latest year.
    pub share_year: Option<i32>,
    pub top_n: usize,
}

impl Query {
    pub fn new(direction: Direction, level: Level) -> Self {
        Self {
            direction,
            level,
            group_by: GroupBy::Code,
            measure: Measure::Directed,
            selection: Selection::All,
            compare: None,
            show_projection: false,
            share_year: None,
            top_n: DEFAULT_TOP_N,
        }
    }

    /// Category a row is counted under.
    pub fn category_of<'a>(&self, row: &'a Observation) -> &'a str {
        match self.group_by {
            GroupBy::Code => row.code(self.level),
            GroupBy::Partner => self.direction.partner_of(&row.direction),
        }
    }

    /// What categories are, e.g. "HS6" or "partner".
    pub fn grouping_label(&self) -> String {
        match self.group_by {
            GroupBy::Code => self.level.to_string(),
            GroupBy::Partner => "partner".to_string(),
        }
    }

    /// Rows the query's measure sums.
    fn flows<'a>(&self, table: &'a RecordTable) -> Records<'a> {
        table.rows().with_flow(&self.direction, self.measure)
    }

    /// Rows of one category.
    fn select<'a>(&self, records: &Records<'a>, category: &str) -> Records<'a> {
        match self.group_by {
            GroupBy::Code => records.with_code(self.level, category),
            GroupBy::Partner => records.with_partner(&self.direction, category),
        }
    }

    fn partner_label(&self, partner: &str) -> String {
        let home = self.direction.home();
        match self.measure {
            Measure::Combined => format!("Total trade between {} and {}", home, partner),
            Measure::Directed if self.direction.exporter == home => {
                format!("{} exports to {}", home, partner)
            }
            Measure::Directed => format!("{} exports to {}", partner, home),
        }
    }
}

/// Settings that stay fixed across queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisSettings {
    pub range: PeriodRange,
    pub growth: GrowthEstimator,
    pub horizon_end: i32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            range: PeriodRange {
                min_year: 2013,
                max_year: 2024,
            },
            growth: GrowthEstimator::default(),
            horizon_end: DEFAULT_HORIZON_END,
        }
    }
}

/// Top categories of one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub period: i32,
    pub entries: Vec<RankedCategory>,
}

/// History, growth and projection of one charted category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTrend {
    pub category: String,
    /// Zero-filled series over the declared range.
    pub history: Series,
    pub estimate: GrowthEstimate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<Projection>,
}

/// Growth versus size of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthRow {
    pub category: String,
    /// Value in the latest year.
    pub size: f64,
    pub rate: f64,
    pub raw_rate: f64,
}

/// Everything one query produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAnalysis {
    pub query: Query,
    pub range: PeriodRange,
    pub horizon_end: i32,
    pub latest_year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<Ranking>,
    pub trends: Vec<CategoryTrend>,
    pub growth: Vec<GrowthRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares: Option<ShareTable>,
    /// Reporting discrepancy per year, when the dataset carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discrepancies: Option<Series>,
    /// Descriptions of every listed code.
    pub descriptions: BTreeMap<String, String>,
    pub notices: Vec<Notice>,
}

impl TradeAnalysis {
    /// Description of a listed code.
    pub fn description(&self, code: &str) -> &str {
        self.descriptions
            .get(code)
            .map(String::as_str)
            .unwrap_or(crate::table::DESCRIPTION_NOT_AVAILABLE)
    }
}

/// Run one query over `table`.
pub fn run_query(
    table: &RecordTable,
    query: &Query,
    settings: &AnalysisSettings,
) -> AnalysisResult<TradeAnalysis> {
    let flows = query.flows(table);
    let records = match query.selection.code() {
        Some(code) => query.select(&flows, code),
        None => flows.clone(),
    };

    let latest_year = match records.latest_period() {
        Some(year) => year,
        None => {
            return Err(AnalysisError::EmptySelection {
                direction: query.direction.clone(),
                grouping: query.grouping_label(),
                code: query.selection.code().map(String::from),
            })
        }
    };

    info!(
        "Analysing {} rows for {} by {} (latest year {})",
        records.len(),
        query.direction,
        query.grouping_label(),
        latest_year
    );

    let totals = match query.group_by {
        GroupBy::Code => aggregate(&flows, query.level),
        GroupBy::Partner => aggregate_by(&flows, |row| query.category_of(row)),
    };
    let mut notices = Vec::new();

    if !settings.range.contains(latest_year) {
        notices.push(Notice::warning(
            None,
            format!(
                "Latest data year {} is outside the charted range {}–{}.",
                latest_year, settings.range.min_year, settings.range.max_year
            ),
        ));
    }

    let ranking = match query.selection {
        Selection::All => Some(Ranking {
            period: latest_year,
            entries: top_categories(&totals, latest_year, query.top_n),
        }),
        Selection::Code(_) => None,
    };

    let mut charted: Vec<String> = match (&ranking, &query.selection) {
        (Some(ranking), _) => ranking.entries.iter().map(|r| r.category.clone()).collect(),
        (None, Selection::Code(code)) => vec![code.clone()],
        (None, Selection::All) => Vec::new(),
    };

    if let Some(ref compare) = query.compare {
        if query.select(&flows, compare).is_empty() {
            notices.push(Notice::warning(
                Some(compare.clone()),
                format!("No data available for comparison {}.", compare),
            ));
        } else if !charted.contains(compare) {
            charted.push(compare.clone());
        }
    }

    let trends = build_trends(&totals, &charted, query.show_projection, settings, &mut notices);
    let growth = growth_rows(&totals, &trends, latest_year);

    let shares = match query.selection {
        Selection::All => {
            let year = query.share_year.unwrap_or(latest_year);
            share_structure(&totals, year, &mut notices)
        }
        Selection::Code(_) => None,
    };

    let discrepancies = discrepancy_series(&records);
    let descriptions = listed_descriptions(&flows, query, &charted, shares.as_ref());

    Ok(TradeAnalysis {
        query: query.clone(),
        range: settings.range,
        horizon_end: settings.horizon_end,
        latest_year,
        ranking,
        trends,
        growth,
        shares,
        discrepancies,
        descriptions,
        notices,
    })
}

/// Category options of a query, as `(code, description)`.
pub fn code_options(table: &RecordTable, query: &Query) -> Vec<(String, String)> {
    category_descriptions(&query.flows(table), query)
        .into_iter()
        .collect()
}

/// Category → description over `records`.
fn category_descriptions(records: &Records<'_>, query: &Query) -> BTreeMap<String, String> {
    match query.group_by {
        GroupBy::Code => records.descriptions(query.level),
        GroupBy::Partner => records
            .iter()
            .map(|row| {
                let partner = query.category_of(row);
                (partner.to_string(), query.partner_label(partner))
            })
            .collect(),
    }
}

fn build_trends(
    totals: &CategoryTotals,
    categories: &[String],
    show_projection: bool,
    settings: &AnalysisSettings,
    notices: &mut Vec<Notice>,
) -> Vec<CategoryTrend> {
    categories
        .iter()
        .map(|category| {
            let history = totals.filled_series(category, settings.range);
            // Growth runs on the periods actually reported, not the zero fill.
            let observed = totals.observed_series(category);
            let estimate = settings.growth.estimate(&observed);

            let projection = if show_projection {
                let projection = project(&observed, &estimate, settings.horizon_end);
                if let Some(issue) = &estimate.issue {
                    debug!("No projection for {}: {}", category, issue);
                    notices.push(Notice::info(
                        Some(category.clone()),
                        format!(
                            "Not enough data to create projections for code {} ({}). Showing historical data only.",
                            category, issue
                        ),
                    ));
                }
                projection
            } else {
                None
            };

            CategoryTrend {
                category: category.clone(),
                history,
                estimate,
                projection,
            }
        })
        .collect()
}

fn growth_rows(totals: &CategoryTotals, trends: &[CategoryTrend], latest_year: i32) -> Vec<GrowthRow> {
    let mut rows: Vec<GrowthRow> = trends
        .iter()
        .filter(|t| t.estimate.valid)
        .map(|t| GrowthRow {
            category: t.category.clone(),
            size: totals.total(latest_year, &t.category).unwrap_or(0.0),
            rate: t.estimate.rate,
            raw_rate: t.estimate.raw_rate.unwrap_or(t.estimate.rate),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.raw_rate
            .partial_cmp(&a.raw_rate)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });

    rows
}

fn share_structure(totals: &CategoryTotals, year: i32, notices: &mut Vec<Notice>) -> Option<ShareTable> {
    let period_totals = totals.totals_for_period(year);

    if period_totals.is_empty() {
        notices.push(Notice::warning(
            None,
            format!("No data available for {}.", year),
        ));
        return None;
    }

    match compute_shares(year, &period_totals) {
        Ok(table) => Some(table),
        Err(e) => {
            notices.push(Notice::warning(None, e.to_string()));
            None
        }
    }
}

fn listed_descriptions(
    records: &Records<'_>,
    query: &Query,
    charted: &[String],
    shares: Option<&ShareTable>,
) -> BTreeMap<String, String> {
    let all = category_descriptions(records, query);
    let share_codes = shares
        .map(|s| s.rows.iter().map(|r| r.category.clone()).collect::<Vec<_>>())
        .unwrap_or_default();

    charted
        .iter()
        .chain(share_codes.iter())
        .filter_map(|code| all.get(code).map(|d| (code.clone(), d.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::growth::AnchorPolicy;
    use crate::models::{GrowthIssue, NoticeLevel, SeriesPoint};
    use crate::table::fixtures::obs;
    use approx::assert_relative_eq;

    const TR_PL: &str = "Turkey_to_Poland";

    fn sample() -> RecordTable {
        let mut rows = Vec::new();
        // Steady grower: +10% a year from 2020.
        for (i, year) in (2020..=2024).enumerate() {
            rows.push(obs(year, "870323", TR_PL, 100.0 * 1.1f64.powi(i as i32)));
        }
        // Only reported once.
        rows.push(obs(2024, "610910", TR_PL, 50.0));
        // Starts at zero inside the window.
        rows.push(obs(2021, "030211", TR_PL, 0.0));
        rows.push(obs(2024, "030211", TR_PL, 20.0));
        // Tiny share.
        rows.push(obs(2024, "999999", TR_PL, 0.00001));
        // Other direction.
        rows.push(obs(2024, "870323", "Poland_to_Turkey", 1_000_000.0));
        RecordTable::new(rows)
    }

    fn query() -> Query {
        Query::new(Direction::new("Turkey", "Poland"), Level::Hs6)
    }

    #[test]
    fn test_overview_ranking_and_trends() {
        let table = sample();
        let result = run_query(&table, &query(), &AnalysisSettings::default()).unwrap();

        assert_eq!(result.latest_year, 2024);
        let ranking = result.ranking.as_ref().unwrap();
        assert_eq!(ranking.period, 2024);
        let order: Vec<&str> = ranking.entries.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(order, vec!["870323", "610910", "030211", "999999"]);

        assert_eq!(result.trends.len(), 4);
        for trend in &result.trends {
            assert_eq!(trend.history.len(), 12);
            assert!(trend.projection.is_none());
        }
        // Projections were not requested, so no notices.
        assert!(result.notices.is_empty());
    }

    #[test]
    fn test_projection_notices_for_short_history() {
        let table = sample();
        let mut q = query();
        q.show_projection = true;

        let result = run_query(&table, &q, &AnalysisSettings::default()).unwrap();

        let grower = result.trends.iter().find(|t| t.category == "870323").unwrap();
        let projection = grower.projection.as_ref().unwrap();
        assert_relative_eq!(projection.rate, 0.1, epsilon = 1e-9);
        assert_eq!(projection.anchor.period, 2024);
        assert_eq!(projection.points.len(), 6);

        let single = result.trends.iter().find(|t| t.category == "610910").unwrap();
        assert!(single.projection.is_none());
        assert_eq!(
            single.estimate.issue,
            Some(GrowthIssue::InsufficientHistory { points: 1 })
        );

        let zero_base = result.trends.iter().find(|t| t.category == "030211").unwrap();
        assert_eq!(
            zero_base.estimate.issue,
            Some(GrowthIssue::DegenerateBase { start: 0.0 })
        );

        let flagged: Vec<&str> = result
            .notices
            .iter()
            .filter(|n| n.level == NoticeLevel::Info)
            .filter_map(|n| n.category.as_deref())
            .collect();
        assert_eq!(flagged, vec!["610910", "030211", "999999"]);
    }

    #[test]
    fn test_share_structure() {
        let table = sample();
        let result = run_query(&table, &query(), &AnalysisSettings::default()).unwrap();

        let shares = result.shares.as_ref().unwrap();
        assert_eq!(shares.period, 2024);
        let total: f64 = shares.rows.iter().map(|r| r.share_percent).sum();
        assert_relative_eq!(total, 100.0, epsilon = 1e-9);

        let display = shares.display_rows();
        assert_eq!(display.last().unwrap().category, "999999");
        assert_eq!(display.last().unwrap().display, "<0.01");
        assert_eq!(result.description("870323"), "Goods 870323");
    }

    #[test]
    fn test_share_year_without_rows_warns() {
        let table = sample();
        let mut q = query();
        q.share_year = Some(2015);

        let result = run_query(&table, &q, &AnalysisSettings::default()).unwrap();
        assert!(result.shares.is_none());
        assert!(result
            .notices
            .iter()
            .any(|n| n.level == NoticeLevel::Warning && n.message.contains("2015")));
    }

    #[test]
    fn test_zero_share_year_warns() {
        let table = RecordTable::new(vec![obs(2024, "870323", TR_PL, 0.0)]);
        let result = run_query(&table, &query(), &AnalysisSettings::default()).unwrap();

        assert!(result.shares.is_none());
        assert_eq!(result.notices.len(), 1);
        assert!(result.notices[0].message.contains("zero"));
    }

    #[test]
    fn test_single_code_selection() {
        let table = sample();
        let mut q = query();
        q.level = Level::Hs4;
        q.selection = Selection::Code("8703".to_string());

        let result = run_query(&table, &q, &AnalysisSettings::default()).unwrap();
        assert!(result.ranking.is_none());
        assert!(result.shares.is_none());
        assert_eq!(result.trends.len(), 1);
        assert_eq!(result.trends[0].category, "8703");
        assert_eq!(result.growth.len(), 1);
    }

    #[test]
    fn test_empty_selection_aborts() {
        let table = sample();
        let mut q = query();
        q.selection = Selection::Code("000000".to_string());

        assert_eq!(
            run_query(&table, &q, &AnalysisSettings::default()),
            Err(AnalysisError::EmptySelection {
                direction: Direction::new("Turkey", "Poland"),
                grouping: "HS6".to_string(),
                code: Some("000000".to_string()),
            })
        );

        let empty = RecordTable::default();
        assert!(matches!(
            run_query(&empty, &query(), &AnalysisSettings::default()),
            Err(AnalysisError::EmptySelection { code: None, .. })
        ));
    }

    #[test]
    fn test_growth_table_sorted_by_rate() {
        let table = RecordTable::new(vec![
            obs(2020, "100000", TR_PL, 100.0),
            obs(2024, "100000", TR_PL, 110.0),
            obs(2020, "200000", TR_PL, 100.0),
            obs(2024, "200000", TR_PL, 300.0),
        ]);

        let result = run_query(&table, &query(), &AnalysisSettings::default()).unwrap();
        let order: Vec<&str> = result.growth.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(order, vec!["200000", "100000"]);
        assert_eq!(result.growth[0].size, 300.0);
    }

    #[test]
    fn test_anchor_policy_from_settings() {
        let table = RecordTable::new(vec![
            obs(2014, "100000", TR_PL, 100.0),
            obs(2016, "100000", TR_PL, 121.0),
            obs(2022, "100000", TR_PL, 0.0),
        ]);
        let mut settings = AnalysisSettings::default();
        settings.growth.anchor = AnchorPolicy::FirstLastPositive;

        let result = run_query(&table, &query(), &settings).unwrap();
        assert!(result.trends[0].estimate.valid);
        assert_relative_eq!(result.trends[0].estimate.rate, 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_selection_parsing() {
        assert_eq!("Home".parse::<Selection>().unwrap(), Selection::All);
        assert_eq!("all".parse::<Selection>().unwrap(), Selection::All);
        assert_eq!(
            "870323 – Motor cars".parse::<Selection>().unwrap(),
            Selection::Code("870323".to_string())
        );
        assert!("  ".parse::<Selection>().is_err());
    }

    #[test]
    fn test_code_options() {
        let table = sample();
        let mut q = query();
        q.level = Level::Hs4;
        let options = code_options(&table, &q);
        let codes: Vec<&str> = options.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(codes, vec!["0302", "6109", "8703", "9999"]);
    }

    fn eu_table() -> RecordTable {
        RecordTable::new(vec![
            obs(2013, "870323", "Germany_to_Turkey", 100.0),
            obs(2013, "870323", "Turkey_to_Germany", 50.0),
            obs(2024, "870323", "Germany_to_Turkey", 200.0),
            obs(2024, "870323", "Turkey_to_Germany", 100.0),
            obs(2013, "870323", "Poland_to_Turkey", 10.0),
            obs(2024, "870323", "Poland_to_Turkey", 40.0),
            obs(2024, "610910", "Turkey_to_Poland", 20.0),
            obs(2024, "610910", "Turkey_to_Spain", 5.0),
            obs(2024, "610910", "Germany_to_Poland", 999.0),
        ])
    }

    fn partner_query(direction: &str, measure: Measure) -> Query {
        Query {
            group_by: GroupBy::Partner,
            measure,
            ..Query::new(direction.parse().unwrap(), Level::Hs6)
        }
    }

    #[test]
    fn test_combined_measure_sums_both_directions() {
        let table = eu_table();
        let q = Query {
            measure: Measure::Combined,
            ..Query::new(Direction::new("Turkey", "Germany"), Level::Hs6)
        };

        let result = run_query(&table, &q, &AnalysisSettings::default()).unwrap();
        let ranking = result.ranking.as_ref().unwrap();
        assert_eq!(ranking.entries.len(), 1);
        assert_eq!(ranking.entries[0].total, 300.0);
        assert_eq!(result.trends[0].history.points[0].value, 150.0);

        let directed = Query::new(Direction::new("Turkey", "Germany"), Level::Hs6);
        let result = run_query(&table, &directed, &AnalysisSettings::default()).unwrap();
        assert_eq!(result.ranking.unwrap().entries[0].total, 100.0);
    }

    #[test]
    fn test_partner_ranking_and_growth() {
        let table = eu_table();
        let mut settings = AnalysisSettings::default();
        settings.growth.anchor = AnchorPolicy::FirstLastPositive;

        let q = partner_query("Turkey_to_*", Measure::Combined);
        let result = run_query(&table, &q, &settings).unwrap();

        let ranking = result.ranking.as_ref().unwrap();
        let order: Vec<(&str, f64)> = ranking
            .entries
            .iter()
            .map(|r| (r.category.as_str(), r.total))
            .collect();
        assert_eq!(order, vec![("Germany", 300.0), ("Poland", 60.0), ("Spain", 5.0)]);

        // Poland grows faster than Germany over 2013–2024.
        let growth: Vec<&str> = result.growth.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(growth, vec!["Poland", "Germany"]);
        assert_eq!(result.growth[1].size, 300.0);

        assert_eq!(result.description("Germany"), "Total trade between Turkey and Germany");
        assert!(result.shares.is_some());
    }

    #[test]
    fn test_partner_directed_views() {
        let table = eu_table();

        let imports = partner_query("*_to_Turkey", Measure::Directed);
        let result = run_query(&table, &imports, &AnalysisSettings::default()).unwrap();
        let partners: Vec<&str> = result
            .ranking
            .as_ref()
            .unwrap()
            .entries
            .iter()
            .map(|r| r.category.as_str())
            .collect();
        assert_eq!(partners, vec!["Germany", "Poland"]);
        assert_eq!(result.description("Poland"), "Poland exports to Turkey");

        let exports = partner_query("Turkey_to_*", Measure::Directed);
        let options = code_options(&table, &exports);
        assert_eq!(
            options,
            vec![
                ("Germany".to_string(), "Turkey exports to Germany".to_string()),
                ("Poland".to_string(), "Turkey exports to Poland".to_string()),
                ("Spain".to_string(), "Turkey exports to Spain".to_string()),
            ]
        );
    }

    #[test]
    fn test_focus_partner_with_comparison() {
        let table = eu_table();
        let mut q = partner_query("Turkey_to_*", Measure::Combined);
        q.selection = Selection::Code("Germany".to_string());
        q.compare = Some("Poland".to_string());

        let result = run_query(&table, &q, &AnalysisSettings::default()).unwrap();
        let charted: Vec<&str> = result.trends.iter().map(|t| t.category.as_str()).collect();
        assert_eq!(charted, vec!["Germany", "Poland"]);
        assert_eq!(result.trends[1].history.points.last().unwrap().value, 60.0);
        assert!(result.notices.is_empty());

        q.compare = Some("Atlantis".to_string());
        let result = run_query(&table, &q, &AnalysisSettings::default()).unwrap();
        assert_eq!(result.trends.len(), 1);
        assert!(result
            .notices
            .iter()
            .any(|n| n.category.as_deref() == Some("Atlantis")));

        q.selection = Selection::Code("Atlantis".to_string());
        assert!(matches!(
            run_query(&table, &q, &AnalysisSettings::default()),
            Err(AnalysisError::EmptySelection { ref grouping, .. }) if grouping == "partner"
        ));
    }

    #[test]
    fn test_compare_code_next_to_overview() {
        let table = sample();
        let mut q = query();
        q.top_n = 1;
        q.compare = Some("610910".to_string());

        let result = run_query(&table, &q, &AnalysisSettings::default()).unwrap();
        let charted: Vec<&str> = result.trends.iter().map(|t| t.category.as_str()).collect();
        assert_eq!(charted, vec!["870323", "610910"]);
        assert_eq!(result.description("610910"), "Goods 610910");
    }

    #[test]
    fn test_discrepancies_follow_selection() {
        let mut rows = vec![
            obs(2023, "930190", TR_PL, 10.0),
            obs(2024, "930190", TR_PL, 12.0),
            obs(2024, "880240", TR_PL, 30.0),
        ];
        rows[0].discrepancy = Some(1.0);
        rows[1].discrepancy = Some(-2.0);
        rows[2].discrepancy = Some(5.0);
        let table = RecordTable::new(rows);

        let result = run_query(&table, &query(), &AnalysisSettings::default()).unwrap();
        let gaps = result.discrepancies.as_ref().unwrap();
        assert_eq!(gaps.points, vec![SeriesPoint::new(2023, 1.0), SeriesPoint::new(2024, 3.0)]);

        let mut q = query();
        q.selection = Selection::Code("930190".to_string());
        let result = run_query(&table, &q, &AnalysisSettings::default()).unwrap();
        assert_eq!(result.discrepancies.unwrap().points[1], SeriesPoint::new(2024, -2.0));

        let plain = run_query(&sample(), &query(), &AnalysisSettings::default()).unwrap();
        assert!(plain.discrepancies.is_none());
    }

    #[test]
    fn test_latest_year_outside_range_warns() {
        let table = RecordTable::new(vec![obs(2025, "870323", TR_PL, 5.0)]);
        let result = run_query(&table, &query(), &AnalysisSettings::default()).unwrap();

        assert_eq!(result.latest_year, 2025);
        assert!(result
            .notices
            .iter()
            .any(|n| n.level == NoticeLevel::Warning && n.message.contains("outside the charted range")));
    }
}

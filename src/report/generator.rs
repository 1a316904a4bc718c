//! Markdown and JSON report generation.
//!
//! This module renders a [`TradeReport`] as a Markdown document with one
//! section per analysis output, or as pretty-printed JSON.

use super::TradeReport;
use crate::analysis::pipeline::{CategoryTrend, GrowthRow, Ranking};
use crate::analysis::shares::ShareTable;
use crate::analysis::{Selection, TradeAnalysis};
use crate::config::ReportConfig;
use crate::models::{GroupBy, Measure, Notice, ReportMetadata, Segment, Series};
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &TradeReport, sections: &ReportConfig) -> String {
    let analysis = &report.analysis;
    let mut output = String::new();

    // Title
    output.push_str("# TradeLens Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata, analysis));
    output.push_str(&generate_notices_section(&analysis.notices));

    if let Some(ref ranking) = analysis.ranking {
        output.push_str(&generate_ranking_section(ranking, analysis));
    }

    if sections.include_series {
        output.push_str(&generate_series_section(&analysis.trends, analysis));
    }

    if sections.include_growth {
        output.push_str(&generate_growth_section(&analysis.growth, analysis));
    }

    if sections.include_shares {
        if let Some(ref shares) = analysis.shares {
            output.push_str(&generate_shares_section(shares, analysis));
        }
    }

    if sections.include_discrepancies {
        if let Some(ref discrepancies) = analysis.discrepancies {
            output.push_str(&generate_discrepancy_section(discrepancies));
        }
    }

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata, analysis: &TradeAnalysis) -> String {
    let mut section = String::new();
    let query = &analysis.query;

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.sources.join(", ")));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    let direction = match query.measure {
        Measure::Directed => query.direction.describe(),
        Measure::Combined => query.direction.describe_both(),
    };
    section.push_str(&format!("- **Direction:** {}\n", capitalize(&direction)));
    section.push_str(&format!("- **Measure:** {}\n", query.measure));
    match query.group_by {
        GroupBy::Code => section.push_str(&format!("- **Level:** {}\n", query.level)),
        GroupBy::Partner => section.push_str("- **Grouping:** Partner country\n"),
    }

    let selection = match query.selection {
        Selection::All => query.selection.to_string(),
        Selection::Code(ref code) => format!("{} – {}", code, analysis.description(code)),
    };
    section.push_str(&format!("- **Selection:** {}\n", selection));
    if let Some(ref compare) = query.compare {
        section.push_str(&format!("- **Compared With:** {}\n", compare));
    }
    section.push_str(&format!(
        "- **Period Range:** {}–{} (latest data: {})\n",
        analysis.range.min_year, analysis.range.max_year, analysis.latest_year
    ));
    section.push_str(&format!("- **Growth Policy:** {}\n", metadata.growth_policy));
    if query.show_projection {
        section.push_str(&format!(
            "- **Projection Horizon:** {}\n",
            analysis.horizon_end
        ));
    }
    section.push_str(&format!("- **Observations:** {}\n", metadata.observations));
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the notices section, if there are any.
fn generate_notices_section(notices: &[Notice]) -> String {
    if notices.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Notices\n\n");

    for notice in notices {
        section.push_str(&format!("- {} {}\n", notice.level.emoji(), notice.message));
    }
    section.push('\n');

    section
}

/// Generate the top-N table.
fn generate_ranking_section(ranking: &Ranking, analysis: &TradeAnalysis) -> String {
    let mut section = String::new();

    let categories = match analysis.query.group_by {
        GroupBy::Code => format!("{} Categories", analysis.query.level),
        GroupBy::Partner => "Partners".to_string(),
    };
    section.push_str(&format!(
        "## Top {} {} in {}\n\n",
        ranking.entries.len(),
        categories,
        ranking.period
    ));

    if ranking.entries.is_empty() {
        section.push_str("No categories recorded for this year.\n\n");
        return section;
    }

    section.push_str(&format!(
        "| Rank | {} | Description | Value |\n",
        category_column(analysis)
    ));
    section.push_str("|---:|:---|:---|---:|\n");

    for (i, entry) in ranking.entries.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            i + 1,
            entry.category,
            analysis.description(&entry.category),
            format_value(entry.total)
        ));
    }
    section.push('\n');

    section
}

/// Generate the per-category time series.
fn generate_series_section(trends: &[CategoryTrend], analysis: &TradeAnalysis) -> String {
    let mut section = String::new();

    section.push_str("## Time Series\n\n");

    if trends.is_empty() {
        section.push_str("No series to show.\n\n");
        return section;
    }

    for trend in trends {
        section.push_str(&generate_trend_block(trend, analysis));
    }

    section
}

/// Generate the table for one charted category.
fn generate_trend_block(trend: &CategoryTrend, analysis: &TradeAnalysis) -> String {
    let mut block = String::new();

    let marker = match analysis.query.compare {
        Some(ref compare) if *compare == trend.category => " (comparison)",
        _ => "",
    };
    block.push_str(&format!(
        "### {} – {}{}\n\n",
        trend.category,
        analysis.description(&trend.category),
        marker
    ));

    if let Some(ref projection) = trend.projection {
        block.push_str(&format!(
            "*Projected at {} per year from {}.*\n\n",
            format_rate(projection.rate),
            projection.anchor.period
        ));
    }

    block.push_str("| Year | Value | Segment |\n");
    block.push_str("|:---|---:|:---|\n");

    for point in &trend.history.points {
        block.push_str(&format!(
            "| {} | {} | {} |\n",
            point.period,
            format_value(point.value),
            Segment::Historical
        ));
    }

    // The anchor opens the projected segment so both segments join.
    if let Some(ref projection) = trend.projection {
        for point in std::iter::once(&projection.anchor).chain(&projection.points) {
            block.push_str(&format!(
                "| {} | {} | {} |\n",
                point.period,
                format_value(point.value),
                Segment::Projected
            ));
        }
    }
    block.push('\n');

    block
}

/// Generate the growth versus size table.
fn generate_growth_section(rows: &[GrowthRow], analysis: &TradeAnalysis) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Growth vs Size\n\n");
    section.push_str(&format!(
        "| {} | Description | Value {} | CAGR | Raw CAGR |\n",
        category_column(analysis),
        analysis.latest_year
    ));
    section.push_str("|:---|:---|---:|---:|---:|\n");

    for row in rows {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            row.category,
            analysis.description(&row.category),
            format_value(row.size),
            format_rate(row.rate),
            format_rate(row.raw_rate)
        ));
    }
    section.push('\n');

    section
}

/// Generate the share structure table.
fn generate_shares_section(shares: &ShareTable, analysis: &TradeAnalysis) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Share Structure in {}\n\n", shares.period));
    section.push_str(&format!(
        "*Total trade value: {}*\n\n",
        format_value(shares.total)
    ));
    section.push_str(&format!(
        "| {} | Description | Share (%) |\n",
        category_column(analysis)
    ));
    section.push_str("|:---|:---|---:|\n");

    for row in shares.display_rows() {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            row.category,
            analysis.description(&row.category),
            row.display
        ));
    }
    section.push('\n');
    section.push_str(&format!(
        "**Average share:** {:.2}%\n\n",
        shares.average_share()
    ));

    // Slices under the label threshold stay unlabelled in a pie chart
    let labels: Vec<String> = shares
        .chart_labels()
        .into_iter()
        .filter_map(|(_, label)| label)
        .collect();
    if !labels.is_empty() {
        section.push_str(&format!("**Labelled slices:** {}\n\n", labels.join(", ")));
    }

    section
}

/// Generate the yearly reporting discrepancy table.
fn generate_discrepancy_section(discrepancies: &Series) -> String {
    let mut section = String::new();

    section.push_str("## Reporting Discrepancies\n\n");
    section.push_str("*Exporter-reported minus importer-reported value.*\n\n");
    section.push_str("| Year | Gap |\n");
    section.push_str("|:---|---:|\n");

    for point in &discrepancies.points {
        section.push_str(&format!(
            "| {} | {} |\n",
            point.period,
            format_value(point.value)
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by TradeLens*\n");

    footer
}

/// Header of the category column.
fn category_column(analysis: &TradeAnalysis) -> &'static str {
    match analysis.query.group_by {
        GroupBy::Code => "Code",
        GroupBy::Partner => "Partner",
    }
}

/// Value with thousands separators and no decimals.
fn format_value(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Fractional rate as a signed percentage.
fn format_rate(rate: f64) -> String {
    format!("{:+.1}%", rate * 100.0)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &TradeReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{run_query, AnalysisSettings, Query};
    use crate::models::{Direction, GroupBy, Level, Measure};
    use crate::table::fixtures::obs;
    use crate::table::RecordTable;
    use chrono::Utc;

    fn create_test_table() -> RecordTable {
        RecordTable::new(vec![
            obs(2020, "870323", "Turkey_to_Poland", 1000.0),
            obs(2024, "870323", "Turkey_to_Poland", 2000.0),
            obs(2020, "392690", "Turkey_to_Poland", 500.0),
            obs(2024, "392690", "Turkey_to_Poland", 400.0),
            obs(2024, "010121", "Turkey_to_Poland", 0.01),
        ])
    }

    fn create_test_report(query: Query) -> TradeReport {
        let table = create_test_table();
        let analysis = run_query(&table, &query, &AnalysisSettings::default()).unwrap();

        TradeReport {
            metadata: ReportMetadata {
                sources: vec!["trade.csv".to_string()],
                generated_at: Utc::now(),
                observations: table.len(),
                growth_policy: "trailing-window from 2020, clamped to ±35%".to_string(),
                duration_seconds: 0.5,
            },
            analysis,
        }
    }

    fn home_query() -> Query {
        Query::new(Direction::new("Turkey", "Poland"), Level::Hs6)
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report(home_query());
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# TradeLens Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("- **Direction:** From Turkey to Poland"));
        assert!(markdown.contains("## Top 3 HS6 Categories in 2024"));
        assert!(markdown.contains("| 1 | 870323 | Goods 870323 | 2,000 |"));
        assert!(markdown.contains("## Time Series"));
        assert!(markdown.contains("## Growth vs Size"));
        assert!(markdown.contains("## Share Structure in 2024"));
        assert!(markdown.contains("<0.01"));
        assert!(markdown.contains("**Average share:**"));
        assert!(markdown.contains("**Labelled slices:** 392690 (16.7%), 870323 (83.3%)"));
        assert!(markdown.contains("Report generated by TradeLens"));
    }

    #[test]
    fn test_sections_can_be_disabled() {
        let report = create_test_report(home_query());
        let sections = ReportConfig {
            include_series: false,
            include_shares: false,
            include_growth: false,
            include_discrepancies: false,
        };
        let markdown = generate_markdown_report(&report, &sections);

        assert!(markdown.contains("## Top 3"));
        assert!(!markdown.contains("## Time Series"));
        assert!(!markdown.contains("## Share Structure"));
        assert!(!markdown.contains("## Growth vs Size"));
    }

    #[test]
    fn test_projected_segment() {
        let mut query = home_query();
        query.selection = Selection::Code("870323".to_string());
        query.show_projection = true;

        let report = create_test_report(query);
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("- **Selection:** 870323 – Goods 870323"));
        assert!(markdown.contains("- **Projection Horizon:** 2030"));
        assert!(markdown.contains("| 2024 | 2,000 | Historical |"));
        assert!(markdown.contains("| 2030 |"));
        assert!(!markdown.contains("## Share Structure"));

        // The anchor year opens the projected segment.
        let historical = markdown.find("| 2024 | 2,000 | Historical |").unwrap();
        let anchor = markdown.find("| 2024 | 2,000 | Projection |").unwrap();
        let first_projected = markdown.find("| 2025 |").unwrap();
        assert!(historical < anchor && anchor < first_projected);
        assert_eq!(markdown.matches("| Projection |").count(), 7);
    }

    #[test]
    fn test_partner_report() {
        let table = RecordTable::new(vec![
            obs(2024, "870323", "Germany_to_Turkey", 300.0),
            obs(2024, "870323", "Turkey_to_Germany", 200.0),
            obs(2024, "870323", "Poland_to_Turkey", 100.0),
        ]);
        let query = Query {
            group_by: GroupBy::Partner,
            measure: Measure::Combined,
            compare: Some("Poland".to_string()),
            ..Query::new("Turkey_to_*".parse().unwrap(), Level::Hs6)
        };
        let analysis = run_query(&table, &query, &AnalysisSettings::default()).unwrap();
        let report = TradeReport {
            metadata: create_test_report(home_query()).metadata,
            analysis,
        };
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("- **Direction:** Between Turkey and any partner"));
        assert!(markdown.contains("- **Measure:** Total trade volume (both directions)"));
        assert!(markdown.contains("- **Grouping:** Partner country"));
        assert!(markdown.contains("- **Compared With:** Poland"));
        assert!(markdown.contains("## Top 2 Partners in 2024"));
        assert!(markdown.contains("| Rank | Partner | Description | Value |"));
        assert!(markdown.contains("| 1 | Germany | Total trade between Turkey and Germany | 500 |"));
        assert!(!markdown.contains("## Reporting Discrepancies"));
    }

    #[test]
    fn test_discrepancy_section() {
        let mut rows = vec![
            obs(2023, "930190", "Turkey_to_Poland", 10.0),
            obs(2024, "930190", "Turkey_to_Poland", 12.0),
        ];
        rows[0].discrepancy = Some(1500.0);
        rows[1].discrepancy = Some(-250.0);
        let analysis =
            run_query(&RecordTable::new(rows), &home_query(), &AnalysisSettings::default())
                .unwrap();
        let report = TradeReport {
            metadata: create_test_report(home_query()).metadata,
            analysis,
        };

        let markdown = generate_markdown_report(&report, &ReportConfig::default());
        assert!(markdown.contains("## Reporting Discrepancies"));
        assert!(markdown.contains("| 2023 | 1,500 |"));
        assert!(markdown.contains("| 2024 | -250 |"));

        let sections = ReportConfig {
            include_discrepancies: false,
            ..ReportConfig::default()
        };
        assert!(!generate_markdown_report(&report, &sections).contains("## Reporting Discrepancies"));
    }

    #[test]
    fn test_notices_section() {
        let notices = vec![Notice::warning(None, "No data available for 2019.")];
        let section = generate_notices_section(&notices);

        assert!(section.contains("## Notices"));
        assert!(section.contains("⚠️ No data available for 2019."));
        assert!(generate_notices_section(&[]).is_empty());
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_value(1234567.4), "1,234,567");
        assert_eq!(format_value(999.0), "999");
        assert_eq!(format_value(-1500.0), "-1,500");
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_rate(0.189), "+18.9%");
        assert_eq!(format_rate(-0.35), "-35.0%");
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report(home_query());
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"ranking\""));
        assert!(json.contains("\"shares\""));
        assert!(json.contains("\"870323\""));
    }

    #[test]
    fn test_write_report_creates_parent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reports").join("trade.md");

        write_report("# TradeLens Report\n", &path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# TradeLens Report\n"
        );
    }
}

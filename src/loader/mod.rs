//! Dataset loading.
//!
//! This module reads trade observations from CSV exports and normalizes
//! them into a [`RecordTable`]: header aliases are unified, codes are
//! zero-padded to their fixed width and blank descriptions become
//! `"Unknown"`. The value column is configurable, so the same table can
//! be built from final, exporter-reported or importer-reported values.

use crate::config::DataConfig;
use crate::error::LoadError;
use crate::models::{
    year_in_bounds, Direction, Level, Observation, MAX_YEAR, MIN_YEAR, UNKNOWN_DESCRIPTION,
};
use crate::table::RecordTable;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const COL_YEAR: &str = "Year";
pub const COL_HS6: &str = "HS6";
pub const COL_HS4: &str = "HS4";
pub const COL_HS2: &str = "HS2";
pub const COL_DIRECTION: &str = "Direction";
pub const COL_EXPORTER: &str = "Exporter";
pub const COL_IMPORTER: &str = "Importer";
pub const COL_VALUE: &str = "Final_FOB_Value";
pub const COL_DISCREPANCY: &str = "Discrepancy";
pub const COL_EXPORTER_REPORTED: &str = "Exporter_Reported_Value";
pub const COL_IMPORTER_REPORTED: &str = "Importer_Reported_Value";
pub const COL_HS6_DESC: &str = "HS_Description";
pub const COL_HS4_DESC: &str = "HS4Desc";
pub const COL_HS2_DESC: &str = "HS2Desc";

/// Code given to every row of a dataset without product codes.
pub const ALL_GOODS_CODE: &str = "TOTAL";

/// Description of [`ALL_GOODS_CODE`].
pub const ALL_GOODS_DESCRIPTION: &str = "All goods";

/// Which columns carry the values to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Column read into each observation's value.
    pub value_column: String,
    /// Exporter-reported value, used for discrepancies.
    pub exporter_reported_column: String,
    /// Importer-reported value, used for discrepancies.
    pub importer_reported_column: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            value_column: COL_VALUE.to_string(),
            exporter_reported_column: COL_EXPORTER_REPORTED.to_string(),
            importer_reported_column: COL_IMPORTER_REPORTED.to_string(),
        }
    }
}

impl From<&DataConfig> for LoadOptions {
    fn from(config: &DataConfig) -> Self {
        Self {
            value_column: config.value_column.clone(),
            exporter_reported_column: config.exporter_reported_column.clone(),
            importer_reported_column: config.importer_reported_column.clone(),
        }
    }
}

/// Header spellings seen in exports, mapped to the canonical name.
const HEADER_ALIASES: &[(&str, &str)] = &[
    ("refYear", COL_YEAR),
    ("HS4 Desc", COL_HS4_DESC),
    ("HS4 description", COL_HS4_DESC),
    ("HS4Description", COL_HS4_DESC),
    ("HS4_desc", COL_HS4_DESC),
    ("HS4_Description", COL_HS4_DESC),
    ("HS2 Desc", COL_HS2_DESC),
    ("HS2 description", COL_HS2_DESC),
    ("HS2Description", COL_HS2_DESC),
    ("HS2_desc", COL_HS2_DESC),
    ("HS2_Description", COL_HS2_DESC),
];

/// Canonical name of a header cell.
pub fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim();
    HEADER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == trimmed)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Left-pad a code with zeros to `width` digits.
///
/// Spreadsheet exports sometimes write integer codes as floats; a trailing
/// `.0` is dropped first.
pub fn pad_code(raw: &str, width: usize) -> String {
    let trimmed = raw.trim();
    let code = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    format!("{:0>width$}", code, width = width)
}

fn clean_description(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(text) if !text.is_empty() && !text.eq_ignore_ascii_case("nan") => text.to_string(),
        _ => UNKNOWN_DESCRIPTION.to_string(),
    }
}

/// Where a row's direction comes from.
enum DirectionColumns {
    Combined(usize),
    Split { exporter: usize, importer: usize },
}

/// Column positions resolved from the header row.
struct Columns {
    year: usize,
    direction: DirectionColumns,
    value: usize,
    hs6: Option<usize>,
    hs4: Option<usize>,
    hs2: Option<usize>,
    hs6_desc: Option<usize>,
    hs4_desc: Option<usize>,
    hs2_desc: Option<usize>,
    discrepancy: Option<usize>,
    reported: Option<(usize, usize)>,
}

impl Columns {
    fn resolve(
        headers: &StringRecord,
        options: &LoadOptions,
        source_name: &str,
    ) -> Result<Self, LoadError> {
        let names: Vec<String> = headers.iter().map(normalize_header).collect();
        let find = |name: &str| names.iter().position(|n| n == name.trim());
        let missing = |name: &str| LoadError::MissingColumn {
            column: name.to_string(),
            source_name: source_name.to_string(),
        };
        let require = |name: &str| find(name).ok_or_else(|| missing(name));

        let direction = match (find(COL_DIRECTION), find(COL_EXPORTER), find(COL_IMPORTER)) {
            (Some(idx), _, _) => DirectionColumns::Combined(idx),
            (None, Some(exporter), Some(importer)) => DirectionColumns::Split { exporter, importer },
            _ => return Err(missing(COL_DIRECTION)),
        };

        let reported = find(&options.exporter_reported_column)
            .zip(find(&options.importer_reported_column));

        Ok(Self {
            year: require(COL_YEAR)?,
            direction,
            value: require(&options.value_column)?,
            hs6: find(COL_HS6),
            hs4: find(COL_HS4),
            hs2: find(COL_HS2),
            hs6_desc: find(COL_HS6_DESC),
            hs4_desc: find(COL_HS4_DESC),
            hs2_desc: find(COL_HS2_DESC),
            discrepancy: find(COL_DISCREPANCY),
            reported,
        })
    }
}

/// Read observations from any CSV source.
///
/// Negative trade values are clamped to zero; the count is logged once
/// per source.
pub fn load_reader<R: Read>(
    reader: R,
    source_name: &str,
    options: &LoadOptions,
) -> Result<RecordTable, LoadError> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let columns = Columns::resolve(&headers, options, source_name)?;
    if columns.hs6.is_none() {
        info!(
            "{} has no {} column; all rows are grouped as {}",
            source_name, COL_HS6, ALL_GOODS_CODE
        );
    }

    let mut rows = Vec::new();
    let mut negatives = 0usize;
    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let mut row = parse_row(&record, &columns, line, source_name)?;
        if row.value < 0.0 {
            debug!("Line {} of {}: negative value {}, using 0", line, source_name, row.value);
            negatives += 1;
            row.value = 0.0;
        }
        rows.push(row);
    }

    if negatives > 0 {
        warn!(
            "{}: {} negative trade value(s) clamped to 0",
            source_name, negatives
        );
    }
    debug!("Parsed {} rows from {}", rows.len(), source_name);
    Ok(RecordTable::new(rows))
}

fn parse_row(
    record: &StringRecord,
    columns: &Columns,
    line: u64,
    source_name: &str,
) -> Result<Observation, LoadError> {
    let invalid = |reason: String| LoadError::InvalidRow {
        line,
        source_name: source_name.to_string(),
        reason,
    };
    let cell = |idx: usize| record.get(idx).unwrap_or("").trim();
    let optional = |idx: Option<usize>| idx.map(cell).filter(|s| !s.is_empty());

    let year_raw = cell(columns.year);
    let period = parse_year(year_raw).ok_or_else(|| invalid(format!("invalid year '{}'", year_raw)))?;
    if !year_in_bounds(period) {
        return Err(invalid(format!(
            "year {} outside {}–{}",
            period, MIN_YEAR, MAX_YEAR
        )));
    }

    let (hs6, hs4, hs2) = match columns.hs6 {
        Some(idx) => {
            let hs6_raw = cell(idx);
            if hs6_raw.is_empty() {
                return Err(invalid("empty HS6 code".to_string()));
            }
            let hs6 = pad_code(hs6_raw, Level::Hs6.width());
            let hs4 = optional(columns.hs4)
                .map(|c| pad_code(c, Level::Hs4.width()))
                .unwrap_or_else(|| prefix(&hs6, Level::Hs4.width()));
            let hs2 = optional(columns.hs2)
                .map(|c| pad_code(c, Level::Hs2.width()))
                .unwrap_or_else(|| prefix(&hs6, Level::Hs2.width()));
            (hs6, hs4, hs2)
        }
        None => (
            ALL_GOODS_CODE.to_string(),
            ALL_GOODS_CODE.to_string(),
            ALL_GOODS_CODE.to_string(),
        ),
    };

    let direction: Direction = match columns.direction {
        DirectionColumns::Combined(idx) => cell(idx).parse().map_err(invalid)?,
        DirectionColumns::Split { exporter, importer } => {
            let (exporter, importer) = (cell(exporter), cell(importer));
            if exporter.is_empty() || importer.is_empty() {
                return Err(invalid("missing exporter or importer".to_string()));
            }
            Direction::new(exporter, importer)
        }
    };

    let value_raw = cell(columns.value);
    let value = parse_value(value_raw).unwrap_or_else(|| {
        debug!(
            "Line {} of {}: non-numeric value '{}', using 0",
            line, source_name, value_raw
        );
        0.0
    });

    let discrepancy = match (optional(columns.discrepancy), columns.reported) {
        (Some(raw), _) => parse_value(raw),
        (None, Some((exporter, importer))) => {
            parse_value(cell(exporter)).zip(parse_value(cell(importer))).map(|(e, i)| e - i)
        }
        (None, None) => None,
    };

    let description = |idx: Option<usize>| match columns.hs6 {
        Some(_) => clean_description(optional(idx)),
        None => ALL_GOODS_DESCRIPTION.to_string(),
    };

    Ok(Observation {
        period,
        hs6,
        hs4,
        hs2,
        hs6_description: description(columns.hs6_desc),
        hs4_description: description(columns.hs4_desc),
        hs2_description: description(columns.hs2_desc),
        direction,
        value,
        discrepancy,
    })
}

/// Numeric cell with thousands separators removed.
fn parse_value(raw: &str) -> Option<f64> {
    raw.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn parse_year(raw: &str) -> Option<i32> {
    raw.parse::<i32>().ok().or_else(|| {
        let float = raw.parse::<f64>().ok()?;
        (float.fract() == 0.0 && float.abs() < f64::from(i32::MAX)).then_some(float as i32)
    })
}

fn prefix(code: &str, width: usize) -> String {
    code.chars().take(width).collect()
}

/// Read one CSV file.
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<RecordTable, LoadError> {
    let file = File::open(path)?;
    load_reader(file, &path.display().to_string(), options)
}

/// Read and concatenate several CSV files.
pub fn load_files(
    paths: &[PathBuf],
    options: &LoadOptions,
    show_progress: bool,
) -> Result<RecordTable> {
    let progress_bar = if show_progress && paths.len() > 1 {
        let pb = ProgressBar::new(paths.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut table = RecordTable::default();
    for path in paths {
        if let Some(ref pb) = progress_bar {
            pb.set_message(path.display().to_string());
        }

        let loaded = load_file(path, options)
            .with_context(|| format!("Failed to load dataset: {}", path.display()))?;
        info!("Loaded {} rows from {}", loaded.len(), path.display());
        table.extend(loaded);

        if let Some(ref pb) = progress_bar {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Datasets loaded");
    }

    Ok(table)
}

//! TradeLens - bilateral trade explorer
//!
//! A CLI tool that loads HS-coded bilateral trade data, ranks and
//! charts categories, estimates their growth and writes Markdown or
//! JSON reports.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing data, bad config, malformed dataset, etc.)
//!   2 - The query matched no data

mod analysis;
mod cache;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod report;
mod scanner;
mod table;

use analysis::{code_options, run_query, Query, Selection};
use anyhow::{Context, Result};
use cache::DatasetCache;
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use error::AnalysisError;
use models::{Direction, GroupBy, ReportMetadata};
use report::TradeReport;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration first: it can turn on verbose logging
    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("TradeLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    origin.log();

    match run(args, config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .tradelens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the data path, period range, growth policy, and more.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one query end to end. Returns the exit code (0 or 2).
fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    let settings = config.analysis.settings()?;
    let direction: Direction = config
        .general
        .direction
        .parse()
        .map_err(anyhow::Error::msg)
        .context("Invalid trade direction")?;

    // Step 1: Find the dataset files
    let data_path = PathBuf::from(&config.data.path);
    let scan_config = scanner::ScanConfig::from(&config.data);

    if args.dry_run {
        return handle_dry_run(&data_path, &scan_config);
    }

    let paths = scanner::DatasetScanner::new(data_path.clone(), scan_config).paths()?;
    if paths.is_empty() {
        anyhow::bail!("No dataset files found under {}", data_path.display());
    }

    // Step 2: Load the record table
    println!("📥 Loading {} dataset file(s)...", paths.len());
    let load_options = loader::LoadOptions::from(&config.data);
    debug!("Reading values from column {}", load_options.value_column);
    let cache_key = format!(
        "{}#{}",
        cache::source_key(&paths),
        load_options.value_column
    );
    let mut cache = DatasetCache::new(config.data.cache_ttl_seconds);
    let table = cache.get_or_load(&cache_key, || {
        loader::load_files(&paths, &load_options, !args.quiet)
    })?;
    let periods = table.rows().periods();
    match (periods.first(), periods.last()) {
        (Some(first), Some(last)) => info!(
            "Loaded {} observations covering {}–{}",
            table.len(),
            first,
            last
        ),
        _ => warn!("Dataset contains no observations"),
    }
    debug!("Dataset cache holds {} table(s)", cache.len());

    // Step 3: Build and run the query
    let category = |raw: &str| match args.group_by {
        GroupBy::Code => loader::pad_code(raw, args.level.width()),
        GroupBy::Partner => raw.trim().to_string(),
    };
    let selection = match args.selection().map_err(anyhow::Error::msg)? {
        Selection::Code(code) => Selection::Code(category(&code)),
        Selection::All => Selection::All,
    };

    let query = Query {
        group_by: args.group_by,
        measure: args.measure,
        selection,
        compare: args.compare.as_deref().map(category),
        show_projection: args.projection,
        share_year: args.share_year,
        top_n: config.analysis.top_n,
        ..Query::new(direction, args.level)
    };

    if args.list_codes {
        return handle_list_codes(&table, &query);
    }

    println!(
        "🔬 Analysing {} by {} ({})...",
        query.direction.describe(),
        query.grouping_label(),
        query.selection
    );

    let analysis = match run_query(&table, &query, &settings) {
        Ok(analysis) => analysis,
        Err(e @ AnalysisError::EmptySelection { .. }) => {
            warn!("{}", e);
            eprintln!("\n⛔ {}", e);
            print_direction_hint(&table, &query.direction);
            return Ok(2);
        }
        Err(e) => return Err(e.into()),
    };

    for notice in &analysis.notices {
        match notice.level {
            models::NoticeLevel::Info => info!("{}", notice.message),
            models::NoticeLevel::Warning => warn!("{}", notice.message),
        }
    }

    // Step 4: Build and save the report
    println!("📝 Generating report...");

    let duration = start_time.elapsed().as_secs_f64();
    let metadata = ReportMetadata {
        sources: paths.iter().map(|p| p.display().to_string()).collect(),
        generated_at: Utc::now(),
        observations: table.len(),
        growth_policy: settings.growth.describe(),
        duration_seconds: duration,
    };

    let report = TradeReport { metadata, analysis };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    let output_path = output_path(&args, &config);
    report::write_report(&output, &output_path)?;

    // Print summary
    let analysis = &report.analysis;
    println!("\n📊 Summary:");
    println!("   Latest year: {}", analysis.latest_year);
    if let Some(ref ranking) = analysis.ranking {
        println!("   Ranked categories: {}", ranking.entries.len());
    }
    println!("   Charted series: {}", analysis.trends.len());
    println!("   Notices: {}", analysis.notices.len());
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Report saved to: {}", output_path.display());

    Ok(0)
}

/// Handle --dry-run: list the dataset files that would be loaded, exit.
fn handle_dry_run(data_path: &Path, scan_config: &scanner::ScanConfig) -> Result<i32> {
    println!("\n🔍 Dry run: scanning dataset files (nothing is loaded)...\n");

    let dataset_scanner = scanner::DatasetScanner::new(data_path.to_path_buf(), scan_config.clone());
    let files = dataset_scanner.scan()?;

    if files.is_empty() {
        println!("   No matching dataset files found.");
    } else {
        println!("   Found {} files that would be loaded:\n", files.len());
        for file in &files {
            println!("     📄 {} ({} bytes)", file.relative, file.size);
        }
        println!("\n   Total: {} files", files.len());
    }

    println!("\n✅ Dry run complete.");
    Ok(0)
}

/// Point at the directions the dataset does contain.
fn print_direction_hint(table: &table::RecordTable, requested: &Direction) {
    let available = table.directions();
    if available.iter().any(|flow| requested.matches(flow)) {
        return;
    }

    let reversed = requested.reversed();
    if available.iter().any(|flow| reversed.matches(flow)) {
        eprintln!(
            "   The dataset has flows {}; try --direction {}",
            reversed.describe(),
            reversed
        );
    } else if !available.is_empty() {
        let names: Vec<String> = available.iter().map(ToString::to_string).collect();
        eprintln!("   Directions in the dataset: {}", names.join(", "));
    }
}

/// Handle --list-codes: print the selectable categories, exit.
fn handle_list_codes(table: &table::RecordTable, query: &Query) -> Result<i32> {
    let options = code_options(table, query);

    if options.is_empty() {
        eprintln!(
            "⛔ No {} categories recorded {}.",
            query.grouping_label(),
            query.direction.describe()
        );
        print_direction_hint(table, &query.direction);
        return Ok(2);
    }

    for (code, description) in &options {
        println!("{} – {}", code, description);
    }
    info!("{} {} categories listed", options.len(), query.grouping_label());

    Ok(0)
}

/// Report path: explicit `--output`, else the configured one with the
/// format's extension.
fn output_path(args: &Args, config: &Config) -> PathBuf {
    match args.output {
        Some(ref path) => path.clone(),
        None => PathBuf::from(&config.general.output).with_extension(args.format.extension()),
    }
}

/// Where the configuration came from, logged once logging is up.
enum ConfigOrigin {
    Explicit(PathBuf),
    DefaultFile,
    Builtin,
    Fallback(String),
}

impl ConfigOrigin {
    fn log(&self) {
        match self {
            ConfigOrigin::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigOrigin::DefaultFile => info!("Loaded default config from {}", CONFIG_FILE_NAME),
            ConfigOrigin::Builtin => debug!("No config file found, using defaults"),
            ConfigOrigin::Fallback(reason) => warn!("Failed to load config: {}", reason),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Builtin)),
        Err(e) => Ok((Config::default(), ConfigOrigin::Fallback(format!("{:#}", e)))),
    }
}

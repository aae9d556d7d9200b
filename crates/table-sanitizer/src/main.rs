//! CLI entry point for the table sanitizer.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use dotenv::dotenv;
use std::env;
use std::path::Path;
use table_sanitizer::{
    CleaningConfig, CsvDirectorySink, CsvDirectorySource, EtlRunner, Pipeline, RunSummary,
};
use tracing::{error, info};

/// Environment variable consulted when `--config` is not given.
const CONFIG_ENV: &str = "TABLE_SANITIZER_CONFIG";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Config-driven cleaning of extracted relational tables",
    long_about = "Cleans every table of a CSV directory according to a JSON cleaning \
                  configuration and writes the results as <table>_cleaned.csv.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  TABLE_SANITIZER_CONFIG    Path to the configuration when --config is absent\n  \
                  RUST_LOG                  Overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # Clean every table in raw/\n  \
                  table-sanitizer -c cleaning.json -i raw/ -o clean/\n\n  \
                  # Clean two tables only\n  \
                  table-sanitizer -c cleaning.json -i raw/ -o clean/ -t customers -t orders\n\n  \
                  # Show the column plan without touching data\n  \
                  table-sanitizer -c cleaning.json --dry-run"
)]
struct Args {
    /// Path to the JSON cleaning configuration
    #[arg(short, long)]
    config: Option<String>,

    /// Directory holding one <table>.csv per source table
    #[arg(short, long, default_value = "./raw")]
    input: String,

    /// Directory the cleaned tables are written to
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// Only clean this table (repeatable)
    ///
    /// If not specified, every *.csv in the input directory is cleaned
    #[arg(short, long = "table")]
    tables: Vec<String>,

    /// Print the per-table column plan without processing any data
    #[arg(long)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output the run summary as JSON on stdout
    ///
    /// Disables all logging; only the final JSON is printed.
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled so stdout only
/// carries the JSON summary.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // .env may supply the config path
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    let config_path = resolve_config_path(&args)?;
    info!("Loading configuration from: {}", config_path);
    let config = CleaningConfig::from_path(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    if args.dry_run {
        print_plan(&config, &args);
        return Ok(());
    }

    if !Path::new(&args.input).is_dir() {
        return Err(anyhow!("Input directory not found: {}", args.input));
    }

    let pipeline = Pipeline::builder().config(config).build()?;
    let runner = EtlRunner::new(pipeline);

    let mut source = CsvDirectorySource::new(&args.input);
    if !args.tables.is_empty() {
        source = source.with_tables(args.tables.clone());
    }
    let sink = CsvDirectorySink::new(&args.output);

    match runner.run(&source, &sink) {
        Ok(summary) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else if !args.quiet {
                print_summary(&summary, &args);
            }
            Ok(())
        }
        Err(e) => {
            if args.json {
                let summary = RunSummary {
                    success: false,
                    error: Some(e),
                    ..Default::default()
                };
                println!("{}", serde_json::to_string_pretty(&summary)?);
                std::process::exit(1);
            }
            error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}

fn resolve_config_path(args: &Args) -> Result<String> {
    if let Some(path) = &args.config {
        return Ok(path.clone());
    }
    env::var(CONFIG_ENV)
        .map_err(|_| anyhow!("No configuration given: pass --config or set {}", CONFIG_ENV))
}

/// Print what the configuration will do to each table.
///
/// Uses `println!` on purpose: this is the output of `--dry-run` and must be
/// visible at any log level.
fn print_plan(config: &CleaningConfig, args: &Args) {
    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Cleaning plan");
    println!("{}\n", "=".repeat(80));

    println!("  Drop column threshold: {:.2}", config.drop_column_threshold);
    println!("  Drop row threshold:    {:.2}", config.drop_row_threshold);
    println!();

    for (name, table) in &config.tables {
        if !args.tables.is_empty() && !args.tables.contains(name) {
            continue;
        }

        println!("TABLE {} -> {}_cleaned", name, name);
        println!("{}", "-".repeat(40));
        println!("  {:<24} {:<10} {:<9} {}", "column", "dtype", "critical", "impute");
        for column in &table.columns {
            let impute = match &column.value {
                Some(value) => format!("{} ({})", column.impute, value),
                None => column.impute.to_string(),
            };
            println!(
                "  {:<24} {:<10} {:<9} {}",
                column.name,
                column.dtype.as_str(),
                if column.critical { "yes" } else { "no" },
                impute
            );
        }
        println!();
    }

    println!("{}", "=".repeat(80));
}

fn print_summary(summary: &RunSummary, args: &Args) {
    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();
    println!("Input:    {}", args.input);
    println!("Output:   {}", args.output);
    println!("Duration: {}ms", summary.duration_ms);
    println!();

    for report in &summary.tables {
        println!("{}:", report.table);
        println!(
            "  Rows: {} -> {} ({:.1}% removed: {} incomplete, {} duplicates)",
            report.rows_before,
            report.rows_after,
            report.rows_removed_percentage(),
            report.rows_dropped,
            report.duplicates_removed
        );
        println!(
            "  Columns: {} -> {} (dropped: {})",
            report.columns_before,
            report.columns_after,
            if report.dropped_columns.is_empty() {
                "none".to_string()
            } else {
                report.dropped_columns.join(", ")
            }
        );
        println!(
            "  Coercion failures: {}, imputed values: {}",
            report.total_coercion_failures(),
            report.total_imputed()
        );
    }

    println!();
    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}

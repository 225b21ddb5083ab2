//! CLI entry point for the accident insights tool.
//!
//! Provides subcommands for building the full report of named tables from a
//! traffic-accident CSV, and for computing single tables on demand.

use accident_insights::analyzers::aggregate::{
    cause_frequency, count_by_day_category, hourly_series_for_filter, severity_distribution,
};
use accident_insights::analyzers::predicate::{accident_type_is, cause_contains};
use accident_insights::analyzers::report::build_report;
use accident_insights::config::ReportConfig;
use accident_insights::loader::{LoadOptions, LoadSummary, load_csv};
use accident_insights::output::{print_json, print_pretty, write_report_json, write_tables_csv};
use accident_insights::record::AccidentRecord;
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "accident_insights")]
#[command(about = "Descriptive statistics over a traffic-accident dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    /// Path to the accident CSV file
    #[arg(value_name = "CSV")]
    path: String,

    /// Field delimiter of the CSV file
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,
}

impl Source {
    fn options(&self) -> Result<LoadOptions> {
        if !self.delimiter.is_ascii() {
            bail!("delimiter must be a single ASCII character");
        }
        Ok(LoadOptions {
            delimiter: self.delimiter as u8,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build every report table and write them as JSON and CSV
    Report {
        #[command(flatten)]
        source: Source,

        /// JSON file overriding the report parameters
        #[arg(short, long)]
        config: Option<String>,

        /// JSON file to write the full report to
        #[arg(short, long, default_value = "report.json")]
        output: String,

        /// Optional: directory to write one CSV per table to
        #[arg(short, long)]
        tables_dir: Option<String>,
    },
    /// Share of each accident cause, highest first
    Causes {
        #[command(flatten)]
        source: Source,

        /// Number of causes to keep
        #[arg(short = 'n', long, default_value_t = 15)]
        top: usize,
    },
    /// Accident counts per two-hour bucket for one accident type or cause
    Hourly {
        #[command(flatten)]
        source: Source,

        /// Exact accident type to select (e.g. "Colisão traseira")
        #[arg(long, conflicts_with = "cause_contains", required_unless_present = "cause_contains")]
        accident_type: Option<String>,

        /// Case-insensitive substring of the cause to select
        #[arg(long)]
        cause_contains: Option<String>,
    },
    /// Severity class distribution for causes matching a substring
    Severity {
        #[command(flatten)]
        source: Source,

        /// Case-insensitive substring of the cause to select
        #[arg(long)]
        cause_contains: String,
    },
    /// Accident counts on weekdays versus weekends
    Days {
        #[command(flatten)]
        source: Source,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/accident_insights.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("accident_insights.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            source,
            config,
            output,
            tables_dir,
        } => {
            let config = match config {
                Some(path) => ReportConfig::load(&path)
                    .with_context(|| format!("failed to read report config '{path}'"))?,
                None => ReportConfig::default(),
            };
            let (records, summary) = load(&source)?;

            let report = build_report(&records, &config, Some(summary))?;
            print_pretty(&report);

            write_report_json(&output, &report)
                .with_context(|| format!("failed to write report to '{output}'"))?;
            info!(path = %output, "Report written");

            if let Some(dir) = tables_dir {
                write_tables_csv(&dir, &report)
                    .with_context(|| format!("failed to write tables to '{dir}'"))?;
            }
        }
        Commands::Causes { source, top } => {
            let (records, _) = load(&source)?;
            let table = cause_frequency(&records, top)?;

            for (rank, share) in table.iter().enumerate() {
                info!(
                    rank = rank + 1,
                    cause = %share.cause,
                    percentage = share.percentage,
                    "Cause"
                );
            }
        }
        Commands::Hourly {
            source,
            accident_type,
            cause_contains: pattern,
        } => {
            let (records, _) = load(&source)?;
            let series = match (accident_type, pattern) {
                (Some(kind), _) => hourly_series_for_filter(&records, accident_type_is(&kind)),
                (None, Some(pattern)) => {
                    hourly_series_for_filter(&records, cause_contains(&pattern))
                }
                (None, None) => bail!("either --accident-type or --cause-contains is required"),
            };

            for (bucket, count) in &series {
                info!(hour_bucket = bucket, count, "Bucket");
            }
        }
        Commands::Severity {
            source,
            cause_contains: pattern,
        } => {
            let (records, _) = load(&source)?;
            let distribution = severity_distribution(&records, cause_contains(&pattern))?;
            print_json(&distribution)?;
        }
        Commands::Days { source } => {
            let (records, _) = load(&source)?;
            let counts = count_by_day_category(&records);
            info!(
                weekday = counts.weekday,
                weekend = counts.weekend,
                total = counts.total(),
                "Day category counts"
            );
        }
    }

    Ok(())
}

/// Loads the dataset named by `source`, adding the path to any error.
fn load(source: &Source) -> Result<(Vec<AccidentRecord>, LoadSummary)> {
    let options = source.options()?;
    load_csv(&source.path, options)
        .with_context(|| format!("failed to load dataset '{}'", source.path))
}

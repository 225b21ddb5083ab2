//! Output formatting and persistence for report tables.
//!
//! Supports pretty-printing, a single JSON document, and one CSV per table.

use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::types::{AccidentReport, CrossTab};
use crate::error::Result;
use csv::WriterBuilder;
use std::fs::{self, File};
use std::path::Path;

/// Logs the report using Rust's debug pretty-print format.
pub fn print_pretty(report: &AccidentReport) {
    debug!("{:#?}", report);
}

/// Logs any serializable table as pretty-printed JSON.
pub fn print_json(table: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(table)?);
    Ok(())
}

/// Writes the whole report as pretty-printed JSON, replacing any existing file.
pub fn write_report_json(path: &str, report: &AccidentReport) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    debug!(path, "Report JSON written");
    Ok(())
}

#[derive(Serialize)]
struct BucketRow<K> {
    key: K,
    count: usize,
}

const BUCKET_HEADER: &[&str] = &["key", "count"];
const CAUSE_SHARE_HEADER: &[&str] = &["cause", "percentage"];
const CAUSE_COUNT_HEADER: &[&str] = &["cause", "count"];
const FOCUS_SHARE_HEADER: &[&str] = &["cause", "percentage", "others"];
const VICTIM_SAMPLE_HEADER: &[&str] = &["cause", "total_victims"];
const VICTIM_SUMMARY_HEADER: &[&str] = &[
    "cause", "count", "min", "q1", "median", "q3", "max", "mean", "stddev",
];
const SEVERITY_HEADER: &[&str] = &["severity_class", "percentage"];

/// Writes one CSV file per report table into `dir`, creating it if needed.
///
/// Every file carries a header row, even when the table is empty. Sections
/// absent from the report produce no file, and a file left in `dir` for
/// such a section is removed. Returns the number of files written.
pub fn write_tables_csv(dir: &str, report: &AccidentReport) -> Result<usize> {
    fs::create_dir_all(dir)?;
    let dir = Path::new(dir);
    let mut written = 0;

    let top_causes = dir.join("top_causes.csv");
    match &report.top_causes {
        Some(table) => {
            write_rows(&top_causes, CAUSE_SHARE_HEADER, table)?;
            written += 1;
        }
        None => remove_stale(&top_causes)?,
    }

    let day_category = [
        BucketRow {
            key: "Weekday",
            count: report.day_category.weekday,
        },
        BucketRow {
            key: "Weekend",
            count: report.day_category.weekend,
        },
    ];
    write_rows(&dir.join("day_category.csv"), BUCKET_HEADER, &day_category)?;
    written += 1;

    for (name, series) in [
        ("hourly_rear_collisions.csv", &report.hourly_rear_collisions),
        ("hourly_inattention.csv", &report.hourly_inattention),
    ] {
        let rows: Vec<_> = series
            .iter()
            .map(|(&key, &count)| BucketRow { key, count })
            .collect();
        write_rows(&dir.join(name), BUCKET_HEADER, &rows)?;
        written += 1;
    }

    write_crosstab(&dir.join("straight_road_crosstab.csv"), &report.straight_road_crosstab)?;
    written += 1;

    write_rows(
        &dir.join("rear_collision_causes.csv"),
        CAUSE_COUNT_HEADER,
        &report.rear_collision_causes,
    )?;
    written += 1;

    let share = dir.join("rear_collision_inattention_share.csv");
    match &report.rear_collision_inattention_share {
        Some(table) => {
            write_rows(&share, FOCUS_SHARE_HEADER, std::slice::from_ref(table))?;
            written += 1;
        }
        None => remove_stale(&share)?,
    }

    let yearly: Vec<_> = report
        .yearly_inattention_in_rear_collisions
        .iter()
        .map(|(&key, &count)| BucketRow { key, count })
        .collect();
    write_rows(
        &dir.join("yearly_inattention_in_rear_collisions.csv"),
        BUCKET_HEADER,
        &yearly,
    )?;
    written += 1;

    write_rows(
        &dir.join("rear_collision_victims.csv"),
        VICTIM_SAMPLE_HEADER,
        &report.rear_collision_victims.samples,
    )?;
    write_rows(
        &dir.join("rear_collision_victim_summary.csv"),
        VICTIM_SUMMARY_HEADER,
        &report.rear_collision_victims.summary,
    )?;
    written += 2;

    let severity = dir.join("inattention_severity.csv");
    match &report.inattention_severity {
        Some(table) => {
            write_rows(&severity, SEVERITY_HEADER, table)?;
            written += 1;
        }
        None => remove_stale(&severity)?,
    }

    info!(dir = %dir.display(), files = written, "Report tables written");
    Ok(written)
}

/// Writes `header` followed by the serialized rows to a fresh CSV file.
fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Deletes a table file left over from an earlier run, if any.
fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed stale table");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Writes a cross tab in wide form: one line per row key, one column per
/// column key, zero where the pair was never observed.
fn write_crosstab(path: &Path, table: &CrossTab) -> Result<()> {
    let mut writer = WriterBuilder::new().from_path(path)?;

    let mut header = vec!["row".to_string()];
    header.extend(table.columns.iter().cloned());
    writer.write_record(&header)?;

    for row in &table.rows {
        let mut line = vec![row.clone()];
        line.extend(table.columns.iter().map(|col| table.get(row, col).to_string()));
        writer.write_record(&line)?;
    }

    writer.flush()?;
    Ok(())
}

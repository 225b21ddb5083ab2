//! CSV record source for the accident dataset.
//!
//! The header is validated before any row is read. Individual cells are
//! parsed leniently: an unparseable time or date becomes `None` and the row
//! is still loaded.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{Datelike, NaiveDate, NaiveTime};
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{AnalysisError, Result};
use crate::record::{AccidentRecord, RecordFields};

pub const COL_CAUSE: &str = "causa_acidente";
pub const COL_ACCIDENT_TYPE: &str = "tipo_acidente";
pub const COL_ROAD_TYPE: &str = "tipo_pista";
pub const COL_ROAD_LAYOUT: &str = "tracado_via";
pub const COL_TIME: &str = "horario";
pub const COL_DATE: &str = "data";
pub const COL_YEAR: &str = "ano";
pub const COL_SEVERITY: &str = "classificacao_acidente";
pub const COL_FATALITIES: &str = "mortos";
pub const COL_SERIOUS_INJURIES: &str = "feridos_graves";
pub const COL_MINOR_INJURIES: &str = "feridos_leves";

/// Columns that must be present in the header.
pub const REQUIRED_COLUMNS: &[&str] = &[
    COL_CAUSE,
    COL_ACCIDENT_TYPE,
    COL_ROAD_TYPE,
    COL_ROAD_LAYOUT,
    COL_TIME,
    COL_DATE,
    COL_SEVERITY,
    COL_FATALITIES,
    COL_SERIOUS_INJURIES,
    COL_MINOR_INJURIES,
];

static TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];
static DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Options controlling how the CSV file is read.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Row counts gathered while loading, used to flag data-quality issues.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub total_rows: usize,
    pub unparseable_time: usize,
    pub unparseable_date: usize,
    pub missing_year: usize,
}

/// Header positions of the columns the loader reads.
struct ColumnIndex {
    cause: usize,
    accident_type: usize,
    road_type: usize,
    road_layout: usize,
    time: usize,
    date: usize,
    year: Option<usize>,
    severity: usize,
    fatalities: usize,
    serious_injuries: usize,
    minor_injuries: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            position(name).ok_or_else(|| AnalysisError::MissingColumn {
                column: name.to_string(),
            })
        };

        Ok(Self {
            cause: require(COL_CAUSE)?,
            accident_type: require(COL_ACCIDENT_TYPE)?,
            road_type: require(COL_ROAD_TYPE)?,
            road_layout: require(COL_ROAD_LAYOUT)?,
            time: require(COL_TIME)?,
            date: require(COL_DATE)?,
            year: position(COL_YEAR),
            severity: require(COL_SEVERITY)?,
            fatalities: require(COL_FATALITIES)?,
            serious_injuries: require(COL_SERIOUS_INJURIES)?,
            minor_injuries: require(COL_MINOR_INJURIES)?,
        })
    }
}

/// Loads every row of the CSV file at `path`.
///
/// # Errors
///
/// Returns [`AnalysisError::MissingColumn`] if a required column is absent,
/// or an I/O / CSV error if the file cannot be read.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_csv(
    path: impl AsRef<Path>,
    options: LoadOptions,
) -> Result<(Vec<AccidentRecord>, LoadSummary)> {
    let file = File::open(path.as_ref())?;
    let (records, summary) = load_reader(file, options)?;

    info!(
        rows = summary.total_rows,
        unparseable_time = summary.unparseable_time,
        unparseable_date = summary.unparseable_date,
        "Dataset loaded"
    );
    if summary.unparseable_time > 0 || summary.unparseable_date > 0 {
        warn!(
            unparseable_time = summary.unparseable_time,
            unparseable_date = summary.unparseable_date,
            "Rows with unparseable time or date are kept but excluded from bucketed tables"
        );
    }

    Ok((records, summary))
}

/// Loads rows from any reader producing CSV text.
pub fn load_reader<R: Read>(
    reader: R,
    options: LoadOptions,
) -> Result<(Vec<AccidentRecord>, LoadSummary)> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(reader);

    let columns = ColumnIndex::from_headers(rdr.headers()?)?;

    let mut records = Vec::new();
    let mut summary = LoadSummary::default();

    for result in rdr.records() {
        let row = result?;
        let record = parse_row(&row, &columns, &mut summary);
        records.push(record);
    }

    debug!(rows = records.len(), "CSV rows parsed");
    Ok((records, summary))
}

fn parse_row(
    row: &StringRecord,
    columns: &ColumnIndex,
    summary: &mut LoadSummary,
) -> AccidentRecord {
    let text = |idx: usize| row.get(idx).map(str::trim).unwrap_or_default().to_string();
    let cell = |idx: usize| row.get(idx).map(str::trim).unwrap_or_default();

    summary.total_rows += 1;

    let time_of_day = parse_time(cell(columns.time));
    if time_of_day.is_none() {
        summary.unparseable_time += 1;
    }

    let date = parse_date(cell(columns.date));
    if date.is_none() {
        summary.unparseable_date += 1;
    }

    let year = columns
        .year
        .and_then(|idx| cell(idx).parse::<i32>().ok())
        .or_else(|| date.map(|d| d.year()));
    if year.is_none() {
        summary.missing_year += 1;
    }

    AccidentRecord::new(RecordFields {
        cause: text(columns.cause),
        accident_type: text(columns.accident_type),
        road_type: text(columns.road_type),
        road_layout: text(columns.road_layout),
        time_of_day,
        date,
        year,
        severity_class: text(columns.severity),
        fatalities: parse_count(cell(columns.fatalities)),
        serious_injuries: parse_count(cell(columns.serious_injuries)),
        minor_injuries: parse_count(cell(columns.minor_injuries)),
    })
}

/// Parses a time of day, trying each supported format in turn.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(s, format).ok())
}

/// Parses a calendar date, trying each supported format in turn.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}

/// Parses a victim count. Blank or invalid cells count as zero.
pub fn parse_count(s: &str) -> u32 {
    if let Ok(n) = s.parse::<u32>() {
        return n;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => v as u32,
        _ => 0,
    }
}

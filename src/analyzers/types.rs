//! Result table shapes produced by the aggregation pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::loader::LoadSummary;

/// A cause and its share of the counted records, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CauseShare {
    pub cause: String,
    pub percentage: f64,
}

/// A cause and the number of records attributed to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CauseCount {
    pub cause: String,
    pub count: usize,
}

/// Record counts split by working day and weekend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayCategoryCounts {
    pub weekday: usize,
    pub weekend: usize,
}

impl DayCategoryCounts {
    pub fn total(&self) -> usize {
        self.weekday + self.weekend
    }
}

/// Counts keyed by the starting hour of each two-hour bucket, ascending.
/// Buckets without a matching record are absent.
pub type HourlySeries = BTreeMap<u8, usize>;

/// Counts keyed by year, ascending.
pub type YearlySeries = BTreeMap<i32, usize>;

/// Two-key joint frequency table. Pairs never observed count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrossTab {
    pub rows: BTreeSet<String>,
    pub columns: BTreeSet<String>,
    pub cells: BTreeMap<String, BTreeMap<String, usize>>,
}

impl CrossTab {
    pub fn increment(&mut self, row: &str, column: &str) {
        self.rows.insert(row.to_string());
        self.columns.insert(column.to_string());
        *self
            .cells
            .entry(row.to_string())
            .or_default()
            .entry(column.to_string())
            .or_default() += 1;
    }

    pub fn get(&self, row: &str, column: &str) -> usize {
        self.cells
            .get(row)
            .and_then(|cols| cols.get(column))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.cells.values().flat_map(|cols| cols.values()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Share of one cause within a filtered subset, against all other causes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocusShare {
    pub cause: String,
    pub percentage: f64,
    pub others: f64,
}

/// One record's victim total, tagged with its cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VictimSample {
    pub cause: String,
    pub total_victims: u32,
}

/// Box-plot statistics of victim totals for one cause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VictimSummary {
    pub cause: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
}

/// A severity class and its share of the filtered subset, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityShare {
    pub severity_class: String,
    pub percentage: f64,
}

/// Victim samples for the top causes plus their per-cause summaries.
#[derive(Debug, Clone, Serialize)]
pub struct VictimTable {
    pub samples: Vec<VictimSample>,
    pub summary: Vec<VictimSummary>,
}

/// The full set of named tables for one dataset.
///
/// Sections whose aggregation had no qualifying records are `None`.
#[derive(Debug, Clone, Serialize)]
pub struct AccidentReport {
    pub generated_at: DateTime<Utc>,
    pub total_records: usize,
    pub load_summary: Option<LoadSummary>,
    pub top_causes: Option<Vec<CauseShare>>,
    pub day_category: DayCategoryCounts,
    pub hourly_rear_collisions: HourlySeries,
    pub hourly_inattention: HourlySeries,
    pub straight_road_crosstab: CrossTab,
    pub rear_collision_causes: Vec<CauseCount>,
    pub rear_collision_inattention_share: Option<FocusShare>,
    pub yearly_inattention_in_rear_collisions: YearlySeries,
    pub rear_collision_victims: VictimTable,
    pub inattention_severity: Option<Vec<SeverityShare>>,
}

//! Accident records and the fields derived from them.
//!
//! Derived fields are computed once in [`AccidentRecord::new`] and are pure
//! functions of the source fields. An unparseable time or date leaves the
//! corresponding derived fields as `None`.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::Serialize;
use std::fmt;

/// Width of an hour-of-day bucket.
pub const HOUR_BUCKET_WIDTH: u8 = 2;

/// Whether an accident happened on a working day or at the weekend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DayCategory {
    Weekday,
    Weekend,
}

impl DayCategory {
    /// Monday is day 0; Saturday (5) and Sunday (6) are the weekend.
    pub fn from_day_of_week(day: u8) -> Self {
        if day >= 5 {
            DayCategory::Weekend
        } else {
            DayCategory::Weekday
        }
    }
}

impl fmt::Display for DayCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayCategory::Weekday => write!(f, "Weekday"),
            DayCategory::Weekend => write!(f, "Weekend"),
        }
    }
}

/// Source fields of one dataset row, as handed over by the record source.
#[derive(Debug, Clone, Default)]
pub struct RecordFields {
    pub cause: String,
    pub accident_type: String,
    pub road_type: String,
    pub road_layout: String,
    pub time_of_day: Option<NaiveTime>,
    pub date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub severity_class: String,
    pub fatalities: u32,
    pub serious_injuries: u32,
    pub minor_injuries: u32,
}

/// One accident, with its derived fields.
#[derive(Debug, Clone)]
pub struct AccidentRecord {
    fields: RecordFields,
    hour_of_day: Option<u8>,
    hour_bucket: Option<u8>,
    day_of_week: Option<u8>,
    day_category: Option<DayCategory>,
    total_victims: u32,
}

impl AccidentRecord {
    pub fn new(fields: RecordFields) -> Self {
        let hour_of_day = fields.time_of_day.map(|t| t.hour() as u8);
        let hour_bucket = hour_of_day.map(hour_bucket);
        let day_of_week = fields
            .date
            .map(|d| d.weekday().num_days_from_monday() as u8);
        let day_category = day_of_week.map(DayCategory::from_day_of_week);
        let total_victims = fields
            .fatalities
            .saturating_add(fields.serious_injuries)
            .saturating_add(fields.minor_injuries);

        Self {
            fields,
            hour_of_day,
            hour_bucket,
            day_of_week,
            day_category,
            total_victims,
        }
    }

    pub fn cause(&self) -> &str {
        &self.fields.cause
    }

    pub fn accident_type(&self) -> &str {
        &self.fields.accident_type
    }

    pub fn road_type(&self) -> &str {
        &self.fields.road_type
    }

    pub fn road_layout(&self) -> &str {
        &self.fields.road_layout
    }

    pub fn time_of_day(&self) -> Option<NaiveTime> {
        self.fields.time_of_day
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.fields.date
    }

    pub fn year(&self) -> Option<i32> {
        self.fields.year
    }

    pub fn severity_class(&self) -> &str {
        &self.fields.severity_class
    }

    pub fn fatalities(&self) -> u32 {
        self.fields.fatalities
    }

    pub fn serious_injuries(&self) -> u32 {
        self.fields.serious_injuries
    }

    pub fn minor_injuries(&self) -> u32 {
        self.fields.minor_injuries
    }

    pub fn hour_of_day(&self) -> Option<u8> {
        self.hour_of_day
    }

    pub fn hour_bucket(&self) -> Option<u8> {
        self.hour_bucket
    }

    /// Day of week with Monday = 0 and Sunday = 6.
    pub fn day_of_week(&self) -> Option<u8> {
        self.day_of_week
    }

    pub fn day_category(&self) -> Option<DayCategory> {
        self.day_category
    }

    pub fn total_victims(&self) -> u32 {
        self.total_victims
    }
}

/// Floors an hour (0-23) to the start of its two-hour bucket.
pub fn hour_bucket(hour: u8) -> u8 {
    (hour / HOUR_BUCKET_WIDTH) * HOUR_BUCKET_WIDTH
}

/// Text fields that are blank after trimming never form a group of their own.
pub(crate) fn group_key(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

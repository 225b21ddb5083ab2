//! Accident record aggregation.
//!
//! This module turns the loaded record slice into named tables: cause
//! frequencies, hourly and yearly series, cross tabulations, victim and
//! severity distributions. The tables are the data contract consumed by
//! whatever renders the charts.

pub mod aggregate;
pub mod predicate;
pub mod report;
pub mod types;
pub mod utility;

//! Reusable record predicates.
//!
//! Every aggregation takes its filter as a parameter; these constructors
//! cover the filters the report needs.

use crate::record::AccidentRecord;

/// Matches every record.
pub fn any_record(_: &AccidentRecord) -> bool {
    true
}

/// Case-insensitive substring match on the cause.
pub fn cause_contains(needle: &str) -> impl Fn(&AccidentRecord) -> bool + Clone + use<> {
    let needle = needle.to_lowercase();
    move |r: &AccidentRecord| r.cause().to_lowercase().contains(&needle)
}

/// Exact match on the cause.
pub fn cause_is(cause: &str) -> impl Fn(&AccidentRecord) -> bool + Clone + use<> {
    let cause = cause.to_string();
    move |r: &AccidentRecord| r.cause() == cause
}

/// Exact match on the accident type.
pub fn accident_type_is(accident_type: &str) -> impl Fn(&AccidentRecord) -> bool + Clone + use<> {
    let accident_type = accident_type.to_string();
    move |r: &AccidentRecord| r.accident_type() == accident_type
}

/// Exact match on the road layout.
pub fn road_layout_is(layout: &str) -> impl Fn(&AccidentRecord) -> bool + Clone + use<> {
    let layout = layout.to_string();
    move |r: &AccidentRecord| r.road_layout() == layout
}

/// Conjunction of two predicates.
pub fn both<A, B>(a: A, b: B) -> impl Fn(&AccidentRecord) -> bool + Clone
where
    A: Fn(&AccidentRecord) -> bool + Clone,
    B: Fn(&AccidentRecord) -> bool + Clone,
{
    move |r: &AccidentRecord| a(r) && b(r)
}

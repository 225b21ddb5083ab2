use chrono::Utc;
use tracing::{info, warn};

use crate::analyzers::aggregate::{
    cause_counts, cause_frequency, cause_share, count_by_day_category, cross_tabulate,
    hourly_series_for_filter, road_type_and_layout, severity_distribution,
    top_causes_with_victims, victim_summary, yearly_count_of_predicate,
};
use crate::analyzers::predicate::{accident_type_is, both, cause_contains, cause_is, road_layout_is};
use crate::analyzers::types::{AccidentReport, VictimTable};
use crate::config::ReportConfig;
use crate::error::Result;
use crate::loader::LoadSummary;
use crate::record::AccidentRecord;

/// Builds every named table of the report from one immutable record slice.
///
/// A section that has no qualifying records is left empty and logged; the
/// remaining sections are still computed. Any other error aborts the report.
#[tracing::instrument(skip_all, fields(records = records.len()))]
pub fn build_report(
    records: &[AccidentRecord],
    config: &ReportConfig,
    load_summary: Option<LoadSummary>,
) -> Result<AccidentReport> {
    let rear = accident_type_is(&config.focus_accident_type);
    let focus = cause_is(&config.focus_cause);

    let top_causes = optional("top_causes", cause_frequency(records, config.top_causes))?;

    let day_category = count_by_day_category(records);
    info!(
        weekday = day_category.weekday,
        weekend = day_category.weekend,
        "Day category counts"
    );

    let hourly_rear_collisions = hourly_series_for_filter(records, rear.clone());
    let hourly_inattention =
        hourly_series_for_filter(records, cause_contains(&config.focus_cause));

    let straight_road_crosstab = cross_tabulate(
        records,
        both(focus.clone(), road_layout_is(&config.straight_layout)),
        road_type_and_layout,
        |r| r.accident_type().to_string(),
    );

    let rear_collision_causes =
        cause_counts(records, rear.clone(), config.top_rear_collision_causes);

    let rear_collision_inattention_share = optional(
        "rear_collision_inattention_share",
        cause_share(records, rear.clone(), &config.focus_cause),
    )?;

    let yearly_inattention_in_rear_collisions =
        yearly_count_of_predicate(records.iter().filter(|r| rear(r)), focus);

    let samples = top_causes_with_victims(records, rear, config.top_victim_causes);
    let rear_collision_victims = VictimTable {
        summary: victim_summary(&samples),
        samples,
    };

    let inattention_severity = optional(
        "inattention_severity",
        severity_distribution(records, cause_contains(&config.severity_cause_pattern)),
    )?;

    info!(
        crosstab_rows = straight_road_crosstab.rows.len(),
        years = yearly_inattention_in_rear_collisions.len(),
        victim_samples = rear_collision_victims.samples.len(),
        "Report built"
    );

    Ok(AccidentReport {
        generated_at: Utc::now(),
        total_records: records.len(),
        load_summary,
        top_causes,
        day_category,
        hourly_rear_collisions,
        hourly_inattention,
        straight_road_crosstab,
        rear_collision_causes,
        rear_collision_inattention_share,
        yearly_inattention_in_rear_collisions,
        rear_collision_victims,
        inattention_severity,
    })
}

/// Turns an empty-input failure into an absent section.
fn optional<T>(section: &str, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(table) => Ok(Some(table)),
        Err(e) if e.is_empty_input() => {
            warn!(section, error = %e, "Section skipped");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

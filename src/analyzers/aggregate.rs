//! Aggregations over an immutable slice of [`AccidentRecord`]s.
//!
//! Every function is a pure projection of its inputs and returns a freshly
//! built table. Filters are passed in as predicates.
//!
//! Ranked tables (`cause_frequency`, `cause_counts`, the top-N selection in
//! `top_causes_with_victims`, `severity_distribution`) sort by count
//! descending. Ties keep the order in which each group was first
//! encountered in the input.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::analyzers::types::{
    CauseCount, CauseShare, CrossTab, DayCategoryCounts, FocusShare, HourlySeries, SeverityShare,
    VictimSample, VictimSummary, YearlySeries,
};
use crate::analyzers::utility::{mean, pct, quantile, round2, stddev};
use crate::error::{AnalysisError, Result};
use crate::record::{AccidentRecord, DayCategory, group_key};

/// Counts occurrences of each key, ordered by count descending with
/// first-encountered tie-break. Blank keys are skipped.
fn ranked_counts<'a, I>(keys: I) -> Vec<(&'a str, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut positions: HashMap<&'a str, usize> = HashMap::new();
    let mut counts: Vec<(&'a str, usize)> = Vec::new();

    for key in keys.into_iter().filter_map(group_key) {
        match positions.get(key) {
            Some(&idx) => counts[idx].1 += 1,
            None => {
                positions.insert(key, counts.len());
                counts.push((key, 1));
            }
        }
    }

    // sort_by is stable, so ties stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Share of each cause among all records, in percent rounded to two
/// decimals, highest first, truncated to `top_n`.
///
/// Records with a blank cause are not counted.
///
/// # Errors
///
/// Returns [`AnalysisError::EmptyInput`] if no record has a cause.
pub fn cause_frequency(records: &[AccidentRecord], top_n: usize) -> Result<Vec<CauseShare>> {
    let counts = ranked_counts(records.iter().map(AccidentRecord::cause));
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    if total == 0 {
        return Err(AnalysisError::empty("cause_frequency"));
    }

    Ok(counts
        .into_iter()
        .take(top_n)
        .map(|(cause, n)| CauseShare {
            cause: cause.to_string(),
            percentage: round2(pct(n, total)),
        })
        .collect())
}

/// Raw cause counts among records matching `predicate`, highest first,
/// truncated to `top_n`.
pub fn cause_counts<P>(records: &[AccidentRecord], predicate: P, top_n: usize) -> Vec<CauseCount>
where
    P: Fn(&AccidentRecord) -> bool,
{
    ranked_counts(records.iter().filter(|r| predicate(r)).map(AccidentRecord::cause))
        .into_iter()
        .take(top_n)
        .map(|(cause, count)| CauseCount {
            cause: cause.to_string(),
            count,
        })
        .collect()
}

/// Counts records per [`DayCategory`]. Records without a parsed date are
/// excluded.
pub fn count_by_day_category(records: &[AccidentRecord]) -> DayCategoryCounts {
    records
        .iter()
        .filter_map(AccidentRecord::day_category)
        .fold(DayCategoryCounts::default(), |mut acc, category| {
            match category {
                DayCategory::Weekday => acc.weekday += 1,
                DayCategory::Weekend => acc.weekend += 1,
            }
            acc
        })
}

/// Counts records matching `predicate` per two-hour bucket.
///
/// Records without a parsed time are excluded. Only buckets that received
/// at least one record appear in the result.
pub fn hourly_series_for_filter<P>(records: &[AccidentRecord], predicate: P) -> HourlySeries
where
    P: Fn(&AccidentRecord) -> bool,
{
    let mut series = HourlySeries::new();
    for bucket in records
        .iter()
        .filter(|r| predicate(r))
        .filter_map(AccidentRecord::hour_bucket)
    {
        *series.entry(bucket).or_default() += 1;
    }
    series
}

/// Joint frequency of `(row_key, col_key)` over records matching `filter`.
///
/// A record whose row or column key is blank is skipped.
pub fn cross_tabulate<F, R, C>(
    records: &[AccidentRecord],
    filter: F,
    row_key: R,
    col_key: C,
) -> CrossTab
where
    F: Fn(&AccidentRecord) -> bool,
    R: Fn(&AccidentRecord) -> String,
    C: Fn(&AccidentRecord) -> String,
{
    let mut table = CrossTab::default();
    for record in records.iter().filter(|r| filter(r)) {
        let row = row_key(record);
        let col = col_key(record);
        if let (Some(row), Some(col)) = (group_key(&row), group_key(&col)) {
            table.increment(row, col);
        }
    }
    table
}

/// `road_type | road_layout`, the row key used for road-geometry cross tabs.
pub fn road_type_and_layout(record: &AccidentRecord) -> String {
    format!("{} | {}", record.road_type(), record.road_layout())
}

/// Victim totals for records matching `filter` whose cause is among the
/// `top_n` most frequent causes within the filtered set.
///
/// One sample per record, in input order.
pub fn top_causes_with_victims<F>(
    records: &[AccidentRecord],
    filter: F,
    top_n: usize,
) -> Vec<VictimSample>
where
    F: Fn(&AccidentRecord) -> bool,
{
    let filtered: Vec<&AccidentRecord> = records.iter().filter(|r| filter(r)).collect();
    let top: HashSet<&str> = ranked_counts(filtered.iter().copied().map(AccidentRecord::cause))
        .into_iter()
        .take(top_n)
        .map(|(cause, _)| cause)
        .collect();

    filtered
        .into_iter()
        .filter(|r| group_key(r.cause()).is_some_and(|c| top.contains(c)))
        .map(|r| VictimSample {
            cause: r.cause().trim().to_string(),
            total_victims: r.total_victims(),
        })
        .collect()
}

/// Box-plot statistics per cause, with causes ordered by sample count
/// descending (first-seen tie-break), matching the top-N ranking.
pub fn victim_summary(samples: &[VictimSample]) -> Vec<VictimSummary> {
    let mut by_cause: HashMap<&str, Vec<f64>> = HashMap::new();
    for sample in samples {
        by_cause
            .entry(sample.cause.as_str())
            .or_default()
            .push(sample.total_victims as f64);
    }

    ranked_counts(samples.iter().map(|s| s.cause.as_str()))
        .into_iter()
        .filter_map(|(cause, _)| {
            let mut values = by_cause.remove(cause)?;
            values.sort_by(f64::total_cmp);
            let avg = mean(&values);
            Some(VictimSummary {
                cause: cause.to_string(),
                count: values.len(),
                min: quantile(&values, 0.0),
                q1: quantile(&values, 0.25),
                median: quantile(&values, 0.5),
                q3: quantile(&values, 0.75),
                max: quantile(&values, 1.0),
                mean: avg,
                stddev: stddev(&values, avg),
            })
        })
        .collect()
}

/// For every year present in `records`, the number of records matching
/// `predicate`. Years with no match appear with a zero count; records
/// without a year are excluded.
///
/// Accepts any iterator of borrowed records, so a pre-filtered subset can be
/// passed without collecting it first.
pub fn yearly_count_of_predicate<'a, I, P>(records: I, predicate: P) -> YearlySeries
where
    I: IntoIterator<Item = &'a AccidentRecord>,
    P: Fn(&AccidentRecord) -> bool,
{
    let mut series: BTreeMap<i32, usize> = BTreeMap::new();
    for record in records {
        if let Some(year) = record.year() {
            let count = series.entry(year).or_default();
            if predicate(record) {
                *count += 1;
            }
        }
    }
    series
}

/// Share of `cause` among records matching `filter`, against all other causes.
///
/// # Errors
///
/// Returns [`AnalysisError::EmptyInput`] if no record matches `filter`.
pub fn cause_share<F>(records: &[AccidentRecord], filter: F, cause: &str) -> Result<FocusShare>
where
    F: Fn(&AccidentRecord) -> bool,
{
    let counts = ranked_counts(records.iter().filter(|r| filter(r)).map(AccidentRecord::cause));
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    if total == 0 {
        return Err(AnalysisError::empty("cause_share"));
    }

    let matching = counts
        .iter()
        .find(|(c, _)| *c == cause)
        .map(|(_, n)| *n)
        .unwrap_or(0);
    let percentage = pct(matching, total);

    Ok(FocusShare {
        cause: cause.to_string(),
        percentage,
        others: 100.0 - percentage,
    })
}

/// Share of each severity class among records whose cause matches
/// `cause_filter`, highest first.
///
/// Percentages are relative to the filtered subset. Records with a blank
/// severity class are not counted.
///
/// # Errors
///
/// Returns [`AnalysisError::EmptyInput`] if the filtered subset is empty.
pub fn severity_distribution<P>(
    records: &[AccidentRecord],
    cause_filter: P,
) -> Result<Vec<SeverityShare>>
where
    P: Fn(&AccidentRecord) -> bool,
{
    let counts = ranked_counts(
        records
            .iter()
            .filter(|r| cause_filter(r))
            .map(AccidentRecord::severity_class),
    );
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    if total == 0 {
        return Err(AnalysisError::empty("severity_distribution"));
    }

    Ok(counts
        .into_iter()
        .map(|(severity_class, n)| SeverityShare {
            severity_class: severity_class.to_string(),
            percentage: pct(n, total),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::predicate::{
        accident_type_is, any_record, both, cause_contains, cause_is, road_layout_is,
    };
    use crate::record::RecordFields;
    use chrono::{NaiveDate, NaiveTime};

    const INATTENTION: &str = "Falta de Atenção à Condução";
    const REAR: &str = "Colisão traseira";

    fn record(cause: &str, accident_type: &str, hour: Option<u32>) -> AccidentRecord {
        AccidentRecord::new(RecordFields {
            cause: cause.to_string(),
            accident_type: accident_type.to_string(),
            time_of_day: hour.and_then(|h| NaiveTime::from_hms_opt(h, 0, 0)),
            ..Default::default()
        })
    }

    fn scenario() -> Vec<AccidentRecord> {
        vec![
            record(INATTENTION, REAR, Some(8)),
            record("Chuva", REAR, Some(8)),
            record(INATTENTION, "Colisão frontal", Some(20)),
        ]
    }

    fn with_fields(fields: RecordFields) -> AccidentRecord {
        AccidentRecord::new(fields)
    }

    #[test]
    fn test_cause_frequency_scenario() {
        let table = cause_frequency(&scenario(), 2).unwrap();

        assert_eq!(
            table,
            vec![
                CauseShare {
                    cause: INATTENTION.to_string(),
                    percentage: 66.67
                },
                CauseShare {
                    cause: "Chuva".to_string(),
                    percentage: 33.33
                },
            ]
        );
    }

    #[test]
    fn test_cause_frequency_full_table_sums_to_100() {
        let causes = ["A", "B", "C", "A", "D", "E", "B", "F", "G", "A", "H"];
        let records: Vec<_> = causes.iter().map(|c| record(c, REAR, None)).collect();

        let table = cause_frequency(&records, usize::MAX).unwrap();
        let sum: f64 = table.iter().map(|c| c.percentage).sum();

        assert_eq!(table.len(), 8);
        assert!((sum - 100.0).abs() < 0.01 * table.len() as f64);
    }

    #[test]
    fn test_cause_frequency_tie_break_is_first_seen() {
        let records: Vec<_> = ["Chuva", "Sono", "Chuva", "Sono", "Animal"]
            .iter()
            .map(|c| record(c, REAR, None))
            .collect();

        let table = cause_frequency(&records, 2).unwrap();
        let causes: Vec<_> = table.iter().map(|c| c.cause.as_str()).collect();

        assert_eq!(causes, vec!["Chuva", "Sono"]);
    }

    #[test]
    fn test_cause_frequency_empty_input() {
        let err = cause_frequency(&[], 5).unwrap_err();
        assert!(err.is_empty_input());

        let blank = vec![record("  ", REAR, None)];
        assert!(cause_frequency(&blank, 5).unwrap_err().is_empty_input());
    }

    #[test]
    fn test_cause_counts_filtered_and_truncated() {
        let mut records = scenario();
        records.push(record("Chuva", REAR, Some(9)));
        records.push(record("Sono", REAR, Some(9)));

        let table = cause_counts(&records, accident_type_is(REAR), 2);

        assert_eq!(
            table,
            vec![
                CauseCount {
                    cause: "Chuva".to_string(),
                    count: 2
                },
                CauseCount {
                    cause: INATTENTION.to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_count_by_day_category_excludes_null_dates() {
        let records = vec![
            // Monday
            with_fields(RecordFields {
                date: NaiveDate::from_ymd_opt(2023, 1, 2),
                ..Default::default()
            }),
            // Sunday
            with_fields(RecordFields {
                date: NaiveDate::from_ymd_opt(2023, 1, 8),
                ..Default::default()
            }),
            // Saturday
            with_fields(RecordFields {
                date: NaiveDate::from_ymd_opt(2023, 1, 7),
                ..Default::default()
            }),
            with_fields(RecordFields::default()),
        ];

        let counts = count_by_day_category(&records);

        assert_eq!(counts.weekday, 1);
        assert_eq!(counts.weekend, 2);
        let dated = records.iter().filter(|r| r.day_of_week().is_some()).count();
        assert_eq!(counts.total(), dated);
    }

    #[test]
    fn test_hourly_series_scenario_has_no_zero_fill() {
        let series = hourly_series_for_filter(&scenario(), accident_type_is(REAR));

        assert_eq!(series, HourlySeries::from([(8, 2)]));
        assert!(!series.contains_key(&20));
    }

    #[test]
    fn test_hourly_series_for_cause_substring() {
        let mut records = scenario();
        records.push(record(INATTENTION, REAR, None));

        let series = hourly_series_for_filter(&records, cause_contains("falta de atenção"));

        assert_eq!(series, HourlySeries::from([(8, 1), (20, 1)]));
        let matching = records
            .iter()
            .filter(|r| cause_contains("falta de atenção")(r) && r.hour_bucket().is_some())
            .count();
        assert_eq!(series.values().sum::<usize>(), matching);
    }

    #[test]
    fn test_hourly_series_buckets_ascending() {
        let records: Vec<_> = [23, 1, 13, 0, 12]
            .iter()
            .map(|h| record("Chuva", REAR, Some(*h)))
            .collect();

        let series = hourly_series_for_filter(&records, any_record);
        let keys: Vec<_> = series.keys().copied().collect();

        assert_eq!(keys, vec![0, 12, 22]);
        assert_eq!(series[&0], 2);
        assert_eq!(series[&12], 2);
    }

    #[test]
    fn test_cross_tabulate_straight_roads() {
        let mk = |road_type: &str, layout: &str, accident_type: &str| {
            with_fields(RecordFields {
                cause: INATTENTION.to_string(),
                accident_type: accident_type.to_string(),
                road_type: road_type.to_string(),
                road_layout: layout.to_string(),
                ..Default::default()
            })
        };
        let records = vec![
            mk("Dupla", "Reta", REAR),
            mk("Dupla", "Reta", REAR),
            mk("Simples", "Reta", "Colisão frontal"),
            mk("Simples", "Curva", REAR),
        ];

        let table = cross_tabulate(
            &records,
            both(cause_is(INATTENTION), road_layout_is("Reta")),
            road_type_and_layout,
            |r| r.accident_type().to_string(),
        );

        assert_eq!(table.get("Dupla | Reta", REAR), 2);
        assert_eq!(table.get("Simples | Reta", "Colisão frontal"), 1);
        assert_eq!(table.get("Simples | Reta", REAR), 0);
        assert_eq!(table.get("Simples | Curva", REAR), 0);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.total(), 3);
    }

    #[test]
    fn test_top_causes_with_victims_keeps_one_row_per_record() {
        let mk = |cause: &str, accident_type: &str, victims: u32| {
            with_fields(RecordFields {
                cause: cause.to_string(),
                accident_type: accident_type.to_string(),
                minor_injuries: victims,
                ..Default::default()
            })
        };
        let records = vec![
            mk(INATTENTION, REAR, 1),
            mk("Chuva", REAR, 3),
            mk(INATTENTION, REAR, 2),
            mk("Sono", REAR, 5),
            mk("Sono", "Colisão frontal", 4),
            mk("Sono", "Colisão frontal", 4),
        ];

        let samples = top_causes_with_victims(&records, accident_type_is(REAR), 2);
        let causes: Vec<_> = samples.iter().map(|s| s.cause.as_str()).collect();

        // Chuva and Sono tie within the filter; Chuva was seen first
        assert_eq!(causes, vec![INATTENTION, "Chuva", INATTENTION]);
        assert_eq!(
            samples.iter().map(|s| s.total_victims).collect::<Vec<_>>(),
            vec![1, 3, 2]
        );
    }

    #[test]
    fn test_victim_summary_statistics() {
        let samples: Vec<_> = [("A", 1), ("B", 10), ("A", 3), ("A", 2), ("A", 4)]
            .iter()
            .map(|(cause, v)| VictimSample {
                cause: cause.to_string(),
                total_victims: *v,
            })
            .collect();

        let summary = victim_summary(&samples);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].cause, "A");
        assert_eq!(summary[0].count, 4);
        assert_eq!(summary[0].min, 1.0);
        assert_eq!(summary[0].median, 2.5);
        assert_eq!(summary[0].max, 4.0);
        assert_eq!(summary[0].mean, 2.5);
        assert_eq!(summary[1].cause, "B");
        assert_eq!(summary[1].q1, 10.0);
        assert_eq!(summary[1].stddev, 0.0);
    }

    #[test]
    fn test_yearly_count_scenario() {
        let records: Vec<_> = [2017, 2017, 2018]
            .iter()
            .map(|y| {
                with_fields(RecordFields {
                    cause: INATTENTION.to_string(),
                    year: Some(*y),
                    ..Default::default()
                })
            })
            .collect();

        let series = yearly_count_of_predicate(&records, cause_contains("Falta de Atenção"));

        assert_eq!(series, YearlySeries::from([(2017, 2), (2018, 1)]));
    }

    #[test]
    fn test_yearly_count_keeps_years_without_matches() {
        let mk = |cause: &str, year: Option<i32>| {
            with_fields(RecordFields {
                cause: cause.to_string(),
                year,
                ..Default::default()
            })
        };
        let records = vec![
            mk("Chuva", Some(2019)),
            mk(INATTENTION, Some(2020)),
            mk(INATTENTION, None),
        ];

        let series = yearly_count_of_predicate(&records, cause_is(INATTENTION));

        assert_eq!(series, YearlySeries::from([(2019, 0), (2020, 1)]));
    }

    #[test]
    fn test_cause_share_against_others() {
        let share = cause_share(&scenario(), accident_type_is(REAR), INATTENTION).unwrap();

        assert_eq!(share.percentage, 50.0);
        assert_eq!(share.others, 50.0);

        let absent = cause_share(&scenario(), accident_type_is(REAR), "Sono").unwrap();
        assert_eq!(absent.percentage, 0.0);
        assert_eq!(absent.others, 100.0);

        let err = cause_share(&scenario(), accident_type_is("Capotamento"), INATTENTION);
        assert!(err.unwrap_err().is_empty_input());
    }

    #[test]
    fn test_severity_distribution_relative_to_filtered_subset() {
        let mk = |cause: &str, severity: &str| {
            with_fields(RecordFields {
                cause: cause.to_string(),
                severity_class: severity.to_string(),
                ..Default::default()
            })
        };
        let records = vec![
            mk(INATTENTION, "Com Vítimas Feridas"),
            mk(INATTENTION, "Com Vítimas Feridas"),
            mk(INATTENTION, "Sem Vítimas"),
            mk("Falta de atenção do Pedestre", "Com Vítimas Fatais"),
            mk("Chuva", "Sem Vítimas"),
        ];

        let dist = severity_distribution(&records, cause_contains("FALTA DE ATENÇÃO")).unwrap();
        let sum: f64 = dist.iter().map(|s| s.percentage).sum();

        assert_eq!(dist[0].severity_class, "Com Vítimas Feridas");
        assert_eq!(dist[0].percentage, 50.0);
        assert_eq!(dist.len(), 3);
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_severity_distribution_empty_subset() {
        let err = severity_distribution(&scenario(), cause_contains("neblina")).unwrap_err();
        assert!(err.is_empty_input());
    }

    #[test]
    fn test_yearly_count_over_filtered_records() {
        let mk = |cause: &str, accident_type: &str, year: i32| {
            with_fields(RecordFields {
                cause: cause.to_string(),
                accident_type: accident_type.to_string(),
                year: Some(year),
                ..Default::default()
            })
        };
        let records = vec![
            mk(INATTENTION, REAR, 2017),
            mk("Chuva", REAR, 2018),
            mk(INATTENTION, "Colisão frontal", 2019),
        ];
        let rear = accident_type_is(REAR);

        let series =
            yearly_count_of_predicate(records.iter().filter(|r| rear(r)), cause_is(INATTENTION));

        assert_eq!(series, YearlySeries::from([(2017, 1), (2018, 0)]));
    }

    #[test]
    fn test_aggregations_are_idempotent() {
        let records = scenario();

        assert_eq!(
            cause_frequency(&records, 10).unwrap(),
            cause_frequency(&records, 10).unwrap()
        );
        assert_eq!(
            hourly_series_for_filter(&records, any_record),
            hourly_series_for_filter(&records, any_record)
        );
        assert_eq!(count_by_day_category(&records), count_by_day_category(&records));

        let mk = |cause: &str, layout: &str, year: i32, severity: &str, minor: u32| {
            with_fields(RecordFields {
                cause: cause.to_string(),
                accident_type: REAR.to_string(),
                road_type: "Dupla".to_string(),
                road_layout: layout.to_string(),
                year: Some(year),
                severity_class: severity.to_string(),
                minor_injuries: minor,
                ..Default::default()
            })
        };
        let records = vec![
            mk(INATTENTION, "Reta", 2017, "Com Vítimas Feridas", 2),
            mk("Chuva", "Curva", 2018, "Sem Vítimas", 0),
            mk(INATTENTION, "Reta", 2018, "Sem Vítimas", 1),
        ];
        let crosstab = || {
            cross_tabulate(
                &records,
                road_layout_is("Reta"),
                road_type_and_layout,
                |r| r.accident_type().to_string(),
            )
        };

        assert_eq!(crosstab(), crosstab());
        assert_eq!(
            yearly_count_of_predicate(&records, cause_is(INATTENTION)),
            yearly_count_of_predicate(&records, cause_is(INATTENTION))
        );
        assert_eq!(
            severity_distribution(&records, cause_contains("atenção")).unwrap(),
            severity_distribution(&records, cause_contains("atenção")).unwrap()
        );
        assert_eq!(
            top_causes_with_victims(&records, accident_type_is(REAR), 5),
            top_causes_with_victims(&records, accident_type_is(REAR), 5)
        );
    }
}

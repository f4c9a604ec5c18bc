use crate::analyzers::types::{LineAggregate, StopExposure};
use crate::analyzers::utility::mean;
use crate::error::{HeatError, Result};
use crate::spatial::StopHotZoneMembership;
use crate::transit::{Line, Stop};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

#[derive(Default)]
struct LineAccumulator {
    temperatures: Vec<f64>,
    total_passengers: u64,
    without_shelter: usize,
    without_bench: usize,
}

/// Aggregates hot-zone memberships into one [`LineAggregate`] per line.
///
/// A stop serving several lines counts once towards each of them. Lines
/// referenced by a stop but missing from `lines_by_id` are skipped with a
/// warning. The result is ordered by line id.
///
/// # Errors
///
/// Returns [`HeatError::Data`] when a membership names an unknown stop or the
/// same stop appears twice.
#[tracing::instrument(skip_all, fields(memberships = memberships.len()))]
pub fn aggregate_lines(
    memberships: &[StopHotZoneMembership],
    stops_by_id: &HashMap<&str, &Stop>,
    lines_by_id: &HashMap<&str, &Line>,
) -> Result<Vec<LineAggregate>> {
    let mut per_line: BTreeMap<&str, LineAccumulator> = BTreeMap::new();
    let mut unknown_lines: BTreeSet<&str> = BTreeSet::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for m in memberships {
        let stop = lookup_stop(stops_by_id, &m.stop_id)?;
        if !seen.insert(stop.stop_id.as_str()) {
            return Err(HeatError::Data(format!(
                "stop '{}' appears in more than one hot-zone membership",
                m.stop_id
            )));
        }

        for line_id in &stop.lines {
            if !lines_by_id.contains_key(line_id.as_str()) {
                unknown_lines.insert(line_id.as_str());
                continue;
            }
            let acc = per_line.entry(line_id.as_str()).or_default();
            acc.temperatures.push(m.temperature);
            acc.total_passengers = acc.total_passengers.saturating_add(stop.daily_passengers);
            if !stop.has_shelter {
                acc.without_shelter += 1;
            }
            if !stop.has_bench {
                acc.without_bench += 1;
            }
        }
    }

    if !unknown_lines.is_empty() {
        warn!(
            count = unknown_lines.len(),
            lines = ?unknown_lines,
            "Stops reference lines missing from the line table, skipping them"
        );
    }

    let aggregates: Vec<LineAggregate> = per_line
        .into_iter()
        .filter_map(|(line_id, acc)| {
            let line = lines_by_id.get(line_id)?;
            let count = acc.temperatures.len();
            Some(LineAggregate {
                line_id: line.line_id.clone(),
                name: line.name.clone(),
                mode: line.mode.clone(),
                total_stops: line.total_stops,
                daily_frequency: line.daily_frequency,
                air_conditioning: line.air_conditioning,
                hot_stop_count: count,
                mean_temperature: mean(&acc.temperatures),
                min_temperature: acc.temperatures.iter().copied().fold(f64::INFINITY, f64::min),
                max_temperature: acc
                    .temperatures
                    .iter()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max),
                total_passengers: acc.total_passengers,
                avg_passengers: acc.total_passengers as f64 / count as f64,
                stops_without_shelter: acc.without_shelter,
                stops_without_bench: acc.without_bench,
            })
        })
        .collect();

    debug!(lines = aggregates.len(), "Line aggregates computed");
    Ok(aggregates)
}

/// Joins each membership with its stop record, in membership order.
///
/// # Errors
///
/// Returns [`HeatError::Data`] when a membership names an unknown stop.
pub fn stop_exposures(
    memberships: &[StopHotZoneMembership],
    stops_by_id: &HashMap<&str, &Stop>,
) -> Result<Vec<StopExposure>> {
    memberships
        .iter()
        .map(|m| {
            let stop = lookup_stop(stops_by_id, &m.stop_id)?;
            Ok(StopExposure {
                stop_id: stop.stop_id.clone(),
                name: stop.name.clone(),
                tile_id: m.tile_id,
                temperature: m.temperature,
                daily_passengers: stop.daily_passengers,
                has_shelter: stop.has_shelter,
                has_bench: stop.has_bench,
            })
        })
        .collect()
}

fn lookup_stop<'a>(stops_by_id: &HashMap<&str, &'a Stop>, stop_id: &str) -> Result<&'a Stop> {
    stops_by_id
        .get(stop_id)
        .copied()
        .ok_or_else(|| HeatError::Data(format!("membership references unknown stop '{stop_id}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::TileId;
    use crate::transit::{AcStatus, lines_by_id, stops_by_id};

    fn stop(id: &str, lines: &[&str], passengers: u64, shelter: bool, bench: bool) -> Stop {
        Stop {
            stop_id: id.into(),
            name: format!("Stop {id}"),
            lon: 2.35,
            lat: 48.85,
            lines: lines.iter().map(|l| l.to_string()).collect(),
            daily_passengers: passengers,
            has_shelter: shelter,
            has_bench: bench,
        }
    }

    fn line(id: &str, ac: AcStatus) -> Line {
        Line {
            line_id: id.into(),
            name: format!("Ligne {id}"),
            mode: "bus".into(),
            total_stops: 30,
            daily_frequency: 120,
            air_conditioning: ac,
        }
    }

    fn member(stop_id: &str, temperature: f64) -> StopHotZoneMembership {
        StopHotZoneMembership {
            stop_id: stop_id.into(),
            tile_id: TileId { row: 0, col: 0 },
            temperature,
        }
    }

    #[test]
    fn test_stop_on_two_lines_counts_for_each() {
        let stops = vec![stop("S1", &["L1", "L2"], 500, true, true)];
        let lines = vec![line("L1", AcStatus::None), line("L2", AcStatus::Full)];
        let aggs = aggregate_lines(
            &[member("S1", 28.0)],
            &stops_by_id(&stops).unwrap(),
            &lines_by_id(&lines).unwrap(),
        )
        .unwrap();

        assert_eq!(aggs.len(), 2);
        for agg in &aggs {
            assert_eq!(agg.hot_stop_count, 1);
            assert_eq!(agg.mean_temperature, 28.0);
            assert_eq!(agg.total_passengers, 500);
        }
        assert_eq!(aggs[0].air_conditioning, AcStatus::None);
        assert_eq!(aggs[1].air_conditioning, AcStatus::Full);
    }

    #[test]
    fn test_line_statistics() {
        let stops = vec![
            stop("S1", &["L1"], 300, false, true),
            stop("S2", &["L1"], 100, false, false),
            stop("S3", &["L1"], 200, true, false),
        ];
        let lines = vec![line("L1", AcStatus::Partial)];
        let memberships = vec![member("S1", 26.0), member("S2", 30.0), member("S3", 31.0)];
        let aggs = aggregate_lines(
            &memberships,
            &stops_by_id(&stops).unwrap(),
            &lines_by_id(&lines).unwrap(),
        )
        .unwrap();

        let agg = &aggs[0];
        assert_eq!(agg.hot_stop_count, 3);
        assert_eq!(agg.mean_temperature, 29.0);
        assert_eq!(agg.min_temperature, 26.0);
        assert_eq!(agg.max_temperature, 31.0);
        assert_eq!(agg.total_passengers, 600);
        assert_eq!(agg.avg_passengers, 200.0);
        assert_eq!(agg.stops_without_shelter, 2);
        assert_eq!(agg.stops_without_bench, 2);
        assert_eq!(agg.total_stops, 30);
    }

    #[test]
    fn test_lines_without_hot_stops_are_absent() {
        let stops = vec![
            stop("S1", &["L1"], 10, true, true),
            stop("S2", &["L2"], 10, true, true),
        ];
        let lines = vec![line("L1", AcStatus::None), line("L2", AcStatus::None)];
        let aggs = aggregate_lines(
            &[member("S1", 27.0)],
            &stops_by_id(&stops).unwrap(),
            &lines_by_id(&lines).unwrap(),
        )
        .unwrap();

        assert_eq!(aggs.len(), 1);
        assert_eq!(aggs[0].line_id, "L1");
    }

    #[test]
    fn test_unknown_line_is_skipped() {
        let stops = vec![stop("S1", &["L1", "GHOST"], 10, true, true)];
        let lines = vec![line("L1", AcStatus::None)];
        let aggs = aggregate_lines(
            &[member("S1", 27.0)],
            &stops_by_id(&stops).unwrap(),
            &lines_by_id(&lines).unwrap(),
        )
        .unwrap();

        assert_eq!(aggs.len(), 1);
    }

    #[test]
    fn test_passenger_total_saturates() {
        let stops = vec![
            stop("S1", &["L1"], u64::MAX, true, true),
            stop("S2", &["L1"], 5, true, true),
        ];
        let lines = vec![line("L1", AcStatus::Full)];
        let aggs = aggregate_lines(
            &[member("S1", 27.0), member("S2", 28.0)],
            &stops_by_id(&stops).unwrap(),
            &lines_by_id(&lines).unwrap(),
        )
        .unwrap();

        assert_eq!(aggs[0].total_passengers, u64::MAX);
        assert_eq!(aggs[0].hot_stop_count, 2);
    }

    #[test]
    fn test_unknown_or_repeated_stop_is_data_error() {
        let stops = vec![stop("S1", &["L1"], 10, true, true)];
        let lines = vec![line("L1", AcStatus::None)];
        let stops_idx = stops_by_id(&stops).unwrap();
        let lines_idx = lines_by_id(&lines).unwrap();

        assert!(matches!(
            aggregate_lines(&[member("S9", 27.0)], &stops_idx, &lines_idx),
            Err(HeatError::Data(_))
        ));
        assert!(matches!(
            aggregate_lines(&[member("S1", 27.0), member("S1", 29.0)], &stops_idx, &lines_idx),
            Err(HeatError::Data(_))
        ));
    }

    #[test]
    fn test_stop_exposures_carry_stop_attributes() {
        let stops = vec![stop("S1", &["L1"], 420, false, true)];
        let exposures =
            stop_exposures(&[member("S1", 29.5)], &stops_by_id(&stops).unwrap()).unwrap();

        assert_eq!(exposures.len(), 1);
        assert_eq!(exposures[0].daily_passengers, 420);
        assert_eq!(exposures[0].temperature, 29.5);
        assert!(!exposures[0].has_shelter);
    }
}

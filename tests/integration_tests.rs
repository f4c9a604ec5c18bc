use heat_priority::HeatError;
use heat_priority::analyzers::aggregate::aggregate_lines;
use heat_priority::analyzers::score::score;
use heat_priority::analyzers::types::{PriorityCategory, ScoringMode};
use heat_priority::analyzers::weights::Weights;
use heat_priority::climate::{ClimateSample, ClimateVariable, TileGrid, select};
use heat_priority::config::{AnalysisConfig, load_weights};
use heat_priority::output::write_outputs;
use heat_priority::parser::{load_climate, load_lines, load_stops};
use heat_priority::pipeline::{AnalysisInputs, run};
use heat_priority::spatial::join;
use heat_priority::transit::{AcStatus, Line, Stop, lines_by_id, stops_by_id};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn fixture_inputs() -> AnalysisInputs {
    AnalysisInputs {
        samples: load_climate(fixture("climate.csv")).expect("Failed to load climate"),
        stops: load_stops(fixture("stops.csv")).expect("Failed to load stops"),
        lines: load_lines(fixture("lines.csv")).expect("Failed to load lines"),
    }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_full_pipeline_line_mode() {
    let inputs = fixture_inputs();
    let config = AnalysisConfig::new(2075, ClimateVariable::Tas, 0.5, ScoringMode::Line);
    let out = run(&config, &inputs).expect("Pipeline failed");

    assert!(approx(out.hot_zones.threshold, 22.5));
    assert_eq!(out.hot_zones.len(), 2);

    let stops: Vec<&str> = out.memberships.iter().map(|m| m.stop_id.as_str()).collect();
    assert_eq!(stops, vec!["S1", "S2"]);

    let lines: Vec<&str> = out.line_aggregates.iter().map(|a| a.line_id.as_str()).collect();
    assert_eq!(lines, vec!["L1", "L2"]);

    let l2 = &out.line_aggregates[1];
    assert_eq!(l2.hot_stop_count, 2);
    assert!(approx(l2.mean_temperature, 27.5));
    assert_eq!(l2.total_passengers, 1500);
    assert_eq!(l2.air_conditioning, AcStatus::None);

    // L2: hot_stops .20 + air_conditioning .25 + passengers .25
    assert_eq!(out.priorities[0].entity_id, "L2");
    assert!(approx(out.priorities[0].score, 70.0));
    assert_eq!(out.priorities[0].category, PriorityCategory::High);
    // L1: temperature .30
    assert_eq!(out.priorities[1].entity_id, "L1");
    assert!(approx(out.priorities[1].score, 30.0));
    assert_eq!(out.priorities[1].category, PriorityCategory::Medium);
}

#[test]
fn test_full_pipeline_stop_mode() {
    let inputs = fixture_inputs();
    let config = AnalysisConfig::new(2075, ClimateVariable::Tas, 0.5, ScoringMode::Stop);
    let out = run(&config, &inputs).expect("Pipeline failed");

    let ranked: Vec<(&str, usize)> = out
        .priorities
        .iter()
        .map(|p| (p.entity_id.as_str(), p.rank))
        .collect();
    assert_eq!(ranked, vec![("S1", 1), ("S2", 2)]);
    assert!(approx(out.priorities[0].score, 85.0));
    assert_eq!(out.priorities[0].category, PriorityCategory::Critical);
    assert!(approx(out.priorities[1].score, 15.0));
    assert_eq!(out.priorities[1].category, PriorityCategory::Low);
}

#[test]
fn test_percentile_selects_hottest_tile_only() {
    let inputs = fixture_inputs();
    let config = AnalysisConfig::new(2075, ClimateVariable::Tas, 0.75, ScoringMode::Line);
    let out = run(&config, &inputs).expect("Pipeline failed");

    assert!(approx(out.hot_zones.threshold, 26.25));
    assert_eq!(out.hot_zones.len(), 1);
    assert_eq!(out.hot_zones.tiles[0].temperature, 30.0);
    assert_eq!(out.memberships.len(), 1);
    assert_eq!(out.memberships[0].stop_id, "S1");
}

#[test]
fn test_variable_and_year_filter_tiles() {
    let inputs = fixture_inputs();

    let tasmax = AnalysisConfig::new(2075, ClimateVariable::Tasmax, 0.5, ScoringMode::Line);
    let out = run(&tasmax, &inputs).expect("Pipeline failed");
    assert!(approx(out.hot_zones.threshold, 28.5));
    assert_eq!(out.summary.tiles, 4);

    let earlier = AnalysisConfig::new(2050, ClimateVariable::Tas, 0.5, ScoringMode::Line);
    let out = run(&earlier, &inputs).expect("Pipeline failed");
    assert_eq!(out.summary.tiles, 2);

    let missing = AnalysisConfig::new(2100, ClimateVariable::Tas, 0.5, ScoringMode::Line);
    assert!(matches!(run(&missing, &inputs), Err(HeatError::Data(_))));
}

#[test]
fn test_unknown_lines_are_skipped() {
    let inputs = fixture_inputs();
    // Threshold 19.2 puts S4 (lines L3 and L9) in a hot zone.
    let config = AnalysisConfig::new(2075, ClimateVariable::Tas, 0.2, ScoringMode::Line);
    let out = run(&config, &inputs).expect("Pipeline failed");

    let lines: Vec<&str> = out.line_aggregates.iter().map(|a| a.line_id.as_str()).collect();
    assert_eq!(lines, vec!["L1", "L2", "L3"]);
    assert_eq!(out.line_aggregates[2].hot_stop_count, 1);
    assert!(approx(out.line_aggregates[2].mean_temperature, 20.0));
}

#[test]
fn test_two_line_stop_counts_for_both_lines() {
    let samples: Vec<ClimateSample> = [18.0, 20.0, 25.0, 28.0]
        .iter()
        .enumerate()
        .map(|(i, t)| ClimateSample {
            lon: 10.0 + i as f64,
            lat: 50.0,
            temperature: *t,
            variable: ClimateVariable::Tas,
            year: 2050,
        })
        .collect();
    let grid = TileGrid::build(samples, 1.0).unwrap();
    let tiles = grid.tiles_for(2050, ClimateVariable::Tas).unwrap();
    let zones = select(&tiles, 0.75).unwrap();
    assert_eq!(zones.len(), 1);

    let stops = vec![Stop {
        stop_id: "X".into(),
        name: "Interchange".into(),
        lon: 13.2,
        lat: 50.1,
        lines: ["A".to_string(), "B".to_string()].into_iter().collect(),
        daily_passengers: 500,
        has_shelter: true,
        has_bench: true,
    }];
    let line = |id: &str, ac: AcStatus| Line {
        line_id: id.into(),
        name: id.into(),
        mode: "bus".into(),
        total_stops: 12,
        daily_frequency: 40,
        air_conditioning: ac,
    };
    let lines = vec![line("A", AcStatus::Full), line("B", AcStatus::None)];

    let memberships = join(&stops, &zones).unwrap();
    let aggregates = aggregate_lines(
        &memberships,
        &stops_by_id(&stops).unwrap(),
        &lines_by_id(&lines).unwrap(),
    )
    .unwrap();

    assert_eq!(aggregates.len(), 2);
    for agg in &aggregates {
        assert_eq!(agg.hot_stop_count, 1);
        assert_eq!(agg.mean_temperature, 28.0);
        assert_eq!(agg.total_passengers, 500);
    }
    assert_eq!(aggregates[0].air_conditioning, AcStatus::Full);
    assert_eq!(aggregates[1].air_conditioning, AcStatus::None);

    let ranked = score(&aggregates, &Weights::default_for(ScoringMode::Line)).unwrap();
    assert_eq!(ranked[0].entity_id, "B");
    assert!(ranked[0].score > ranked[1].score);
}

#[test]
fn test_weights_file_scales_like_defaults() {
    let inputs = fixture_inputs();
    let weights = load_weights(fixture("weights.json")).expect("Failed to load weights");

    let base = AnalysisConfig::new(2075, ClimateVariable::Tas, 0.5, ScoringMode::Line);
    let scaled = base.clone().with_weights(weights);

    let a = run(&base, &inputs).unwrap();
    let b = run(&scaled, &inputs).unwrap();
    assert_eq!(a.priorities.len(), b.priorities.len());
    for (x, y) in a.priorities.iter().zip(&b.priorities) {
        assert_eq!(x.entity_id, y.entity_id);
        assert!(approx(x.score, y.score));
    }
}

#[test]
fn test_rerun_is_identical() {
    let inputs = fixture_inputs();
    let config = AnalysisConfig::new(2075, ClimateVariable::Tas, 0.2, ScoringMode::Line);

    let first = run(&config, &inputs).unwrap();
    let second = run(&config, &inputs).unwrap();
    assert_eq!(first.priorities, second.priorities);
    assert_eq!(first.summary, second.summary);
}

#[test]
fn test_write_outputs_creates_tables() {
    let inputs = fixture_inputs();
    let config = AnalysisConfig::new(2075, ClimateVariable::Tas, 0.5, ScoringMode::Line);
    let out = run(&config, &inputs).unwrap();

    let dir = std::env::temp_dir().join("heat_priority_integration_outputs");
    let _ = std::fs::remove_dir_all(&dir);
    write_outputs(&dir, &out, ScoringMode::Line, false).expect("Failed to write outputs");

    let priorities = std::fs::read_to_string(dir.join("priorities.csv")).unwrap();
    let rows: Vec<&str> = priorities.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].starts_with("entity_id,rank,score,category"));
    assert!(rows[1].starts_with("L2,1,"));

    let memberships = std::fs::read_to_string(dir.join("stop_memberships.csv")).unwrap();
    assert_eq!(memberships.lines().count(), 3);

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["hot_tiles"], 2);
    assert!(summary["generated_at"].is_string());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_busier_stop_never_lowers_its_lines_scores() {
    let config = AnalysisConfig::new(2075, ClimateVariable::Tas, 0.2, ScoringMode::Line);
    let line_score = |out: &heat_priority::pipeline::AnalysisOutput, id: &str| {
        out.priorities
            .iter()
            .find(|p| p.entity_id == id)
            .map(|p| p.score)
            .expect("line not ranked")
    };

    let mut inputs = fixture_inputs();
    let mut previous = run(&config, &inputs).unwrap();
    // S1 serves both L1 and L2.
    for passengers in [2_000, 10_000, 1_000_000] {
        let s1 = inputs.stops.iter_mut().find(|s| s.stop_id == "S1").unwrap();
        s1.daily_passengers = passengers;
        let current = run(&config, &inputs).unwrap();

        for line in ["L1", "L2"] {
            assert!(
                line_score(&current, line) >= line_score(&previous, line) - 1e-9,
                "{line} dropped at {passengers} passengers"
            );
        }
        previous = current;
    }
}

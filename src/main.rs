//! CLI entry point for the heat priority tool.
//!
//! Loads climate projections and transit CSVs, runs the hot-zone analysis,
//! and writes ranked priorities plus mapping tables.

use anyhow::Result;
use clap::{Parser, Subcommand};
use heat_priority::{
    analyzers::types::ScoringMode,
    climate::{ClimateVariable, DEFAULT_TILE_SIDE, TileGrid, select, temperature_stats},
    config::{AnalysisConfig, load_weights},
    output::{print_json, write_outputs},
    parser::{load_climate, load_lines, load_stops},
    pipeline::{AnalysisInputs, run},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "heat_priority")]
#[command(about = "Rank transit stops and lines for heat-mitigation investment", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis and write result tables
    Analyze {
        /// Climate samples CSV (lon,lat,temperature,variable,year)
        #[arg(long)]
        climate: PathBuf,

        /// Stops CSV
        #[arg(long)]
        stops: PathBuf,

        /// Lines CSV
        #[arg(long)]
        lines: PathBuf,

        /// Projection year to analyze
        #[arg(short, long, default_value_t = 2075)]
        year: i32,

        /// Climate variable: tas, tasmin or tasmax
        #[arg(long, default_value = "tas")]
        variable: ClimateVariable,

        /// Temperature quantile defining hot tiles, in (0, 1)
        #[arg(short, long, default_value_t = 0.99)]
        percentile: f64,

        /// Rank lines or stops
        #[arg(short, long, default_value = "line")]
        mode: ScoringMode,

        /// JSON file mapping factor names to weights
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Tile side in degrees
        #[arg(long, default_value_t = DEFAULT_TILE_SIDE)]
        tile_side: f64,

        /// Keep only the N highest-ranked entities
        #[arg(short = 'n', long)]
        top_n: Option<usize>,

        /// Directory to write result tables to
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Gzip compress CSV tables
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Show the hot-zone threshold and hottest tiles of a climate file
    HotZones {
        /// Climate samples CSV
        #[arg(long)]
        climate: PathBuf,

        #[arg(short, long, default_value_t = 2075)]
        year: i32,

        #[arg(long, default_value = "tas")]
        variable: ClimateVariable,

        #[arg(short, long, default_value_t = 0.99)]
        percentile: f64,

        #[arg(long, default_value_t = DEFAULT_TILE_SIDE)]
        tile_side: f64,

        /// Number of hot tiles to list
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/heat_priority.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("heat_priority.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            climate,
            stops,
            lines,
            year,
            variable,
            percentile,
            mode,
            weights,
            tile_side,
            top_n,
            output_dir,
            gzip,
        } => {
            let mut config = AnalysisConfig::new(year, variable, percentile, mode)
                .with_tile_side(tile_side)
                .with_top_n(top_n);
            if let Some(path) = weights {
                config = config.with_weights(load_weights(&path)?);
            }
            analyze(&config, &climate, &stops, &lines, &output_dir, gzip)?;
        }
        Commands::HotZones {
            climate,
            year,
            variable,
            percentile,
            tile_side,
            limit,
        } => {
            hot_zones(&climate, year, variable, percentile, tile_side, limit)?;
        }
    }

    Ok(())
}

/// Loads every input, runs the pipeline and writes the result tables.
#[tracing::instrument(skip(config), fields(year = config.year, mode = %config.mode))]
fn analyze(
    config: &AnalysisConfig,
    climate: &Path,
    stops: &Path,
    lines: &Path,
    output_dir: &Path,
    gzip: bool,
) -> Result<()> {
    let inputs = AnalysisInputs {
        samples: load_climate(climate)?,
        stops: load_stops(stops)?,
        lines: load_lines(lines)?,
    };

    let output = run(config, &inputs)?;

    if output.priorities.is_empty() {
        warn!("No stops fall inside the selected hot zones; nothing to rank");
    }
    for result in output.priorities.iter().take(20) {
        info!(
            rank = result.rank,
            entity_id = %result.entity_id,
            score = format!("{:.2}", result.score),
            category = %result.category,
            "Priority"
        );
    }

    print_json(&output.summary)?;
    write_outputs(output_dir, &output, config.mode, gzip)?;
    Ok(())
}

/// Logs tile statistics, the percentile threshold and the hottest tiles.
#[tracing::instrument]
fn hot_zones(
    climate: &Path,
    year: i32,
    variable: ClimateVariable,
    percentile: f64,
    tile_side: f64,
    limit: usize,
) -> Result<()> {
    let grid = TileGrid::build(load_climate(climate)?, tile_side)?;

    let available = grid.available();
    if !available.contains(&(year, variable)) {
        let pairs: Vec<String> = available.iter().map(|(y, v)| format!("{v}/{y}")).collect();
        warn!(available = %pairs.join(", "), "Requested year/variable not in climate file");
    }

    let tiles = grid.tiles_for(year, variable)?;
    let stats = temperature_stats(&tiles)?;
    info!(
        tiles = stats.count,
        min = stats.min,
        max = stats.max,
        mean = stats.mean,
        stddev = stats.stddev,
        "Tile temperatures"
    );

    let zones = select(&tiles, percentile)?;
    let mut hottest = zones.tiles.clone();
    hottest.sort_by(|a, b| b.temperature.total_cmp(&a.temperature).then(a.id.cmp(&b.id)));

    for tile in hottest.iter().take(limit) {
        info!(
            tile_id = %tile.id,
            center_lon = tile.center_lon,
            center_lat = tile.center_lat,
            temperature = tile.temperature,
            "Hot tile"
        );
    }
    Ok(())
}

//! Output formatting and persistence for analysis results.
//!
//! Tables are written as CSV (optionally gzip-compressed) and the run summary
//! as pretty-printed JSON.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::types::{PriorityResult, ScoringMode};
use crate::climate::hot_zones::HotTileRow;
use crate::pipeline::{AnalysisOutput, RunSummary};
use crate::spatial::MembershipRow;

/// Logs the run summary as pretty-printed JSON.
pub fn print_json(summary: &RunSummary) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

/// CSV destination, plain or gzip-compressed.
enum Sink {
    Plain(File),
    Gzip(GzEncoder<File>),
}

impl Sink {
    /// Flushes the file; for gzip this also writes the stream trailer.
    fn finish(self) -> std::io::Result<()> {
        match self {
            Sink::Plain(mut file) => file.flush(),
            Sink::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Sink::Plain(file) => file.write(buf),
            Sink::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Sink::Plain(file) => file.flush(),
            Sink::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// Opens `path` for writing, appending `.gz` and compressing when `gzip` is set.
fn create_sink(path: &Path, gzip: bool) -> Result<(Sink, PathBuf)> {
    if gzip {
        let mut name = path.as_os_str().to_owned();
        name.push(".gz");
        let path = PathBuf::from(name);
        let file = File::create(&path)
            .with_context(|| format!("failed to create '{}'", path.display()))?;
        Ok((Sink::Gzip(GzEncoder::new(file, Compression::default())), path))
    } else {
        let file = File::create(path)
            .with_context(|| format!("failed to create '{}'", path.display()))?;
        Ok((Sink::Plain(file), path.to_path_buf()))
    }
}

/// Flushes the CSV writer and finishes the underlying sink.
fn close(writer: csv::Writer<Sink>, path: &Path) -> Result<()> {
    writer
        .into_inner()
        .map_err(|e| e.into_error())
        .and_then(Sink::finish)
        .with_context(|| format!("failed to finish '{}'", path.display()))
}

/// Writes serializable rows as a CSV table with a header row.
///
/// An empty table still gets `header`; otherwise the header comes from the
/// row type's field names.
pub fn write_table<T: Serialize>(
    path: &Path,
    rows: &[T],
    header: &[&str],
    gzip: bool,
) -> Result<PathBuf> {
    let (sink, written) = create_sink(path, gzip)?;
    let mut writer = WriterBuilder::new()
        .has_headers(!rows.is_empty())
        .from_writer(sink);

    if rows.is_empty() {
        writer.write_record(header)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    close(writer, &written)?;

    debug!(path = %written.display(), rows = rows.len(), "Table written");
    Ok(written)
}

/// Column names of the priority table for a scoring mode.
pub fn priority_header(mode: ScoringMode) -> Vec<String> {
    let mut header: Vec<String> = ["entity_id", "rank", "score", "category"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for factor in mode.factors() {
        header.push(format!("raw_{factor}"));
    }
    for factor in mode.factors() {
        header.push(format!("norm_{factor}"));
    }
    header
}

fn priority_record(result: &PriorityResult, mode: ScoringMode) -> Vec<String> {
    let mut record = vec![
        result.entity_id.clone(),
        result.rank.to_string(),
        result.score.to_string(),
        result.category.to_string(),
    ];
    let metric = |f| result.metric(f);
    for factor in mode.factors() {
        record.push(metric(*factor).map(|m| m.raw.to_string()).unwrap_or_default());
    }
    for factor in mode.factors() {
        record.push(
            metric(*factor)
                .map(|m| m.normalized.to_string())
                .unwrap_or_default(),
        );
    }
    record
}

/// Writes ranked priorities with one raw and one normalized column per factor.
pub fn write_priorities(
    path: &Path,
    results: &[PriorityResult],
    mode: ScoringMode,
    gzip: bool,
) -> Result<PathBuf> {
    let (sink, written) = create_sink(path, gzip)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(sink);

    writer.write_record(priority_header(mode))?;
    for result in results {
        writer.write_record(priority_record(result, mode))?;
    }
    close(writer, &written)?;

    debug!(path = %written.display(), rows = results.len(), "Priority table written");
    Ok(written)
}

/// Summary document written next to the tables.
#[derive(Serialize)]
struct SummaryDocument<'a> {
    generated_at: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    summary: &'a RunSummary,
}

/// Writes `hot_tiles.csv`, `stop_memberships.csv`, `priorities.csv` and
/// `summary.json` into `dir`, creating it if needed.
pub fn write_outputs(
    dir: &Path,
    output: &AnalysisOutput,
    mode: ScoringMode,
    gzip: bool,
) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory '{}'", dir.display()))?;

    let hot_tiles: Vec<HotTileRow> = output.hot_zones.rows();
    write_table(
        &dir.join("hot_tiles.csv"),
        &hot_tiles,
        &[
            "tile_id",
            "row",
            "col",
            "center_lon",
            "center_lat",
            "side",
            "temperature",
            "year",
            "variable",
        ],
        gzip,
    )?;

    let memberships: Vec<MembershipRow> = output.membership_rows();
    write_table(
        &dir.join("stop_memberships.csv"),
        &memberships,
        &["stop_id", "tile_id", "temperature"],
        gzip,
    )?;

    write_priorities(&dir.join("priorities.csv"), &output.priorities, mode, gzip)?;

    let document = SummaryDocument {
        generated_at: chrono::Utc::now(),
        summary: &output.summary,
    };
    let summary_path = dir.join("summary.json");
    std::fs::write(&summary_path, serde_json::to_string_pretty(&document)?)
        .with_context(|| format!("failed to write '{}'", summary_path.display()))?;

    info!(
        dir = %dir.display(),
        hot_tiles = hot_tiles.len(),
        memberships = memberships.len(),
        priorities = output.priorities.len(),
        gzip,
        "Outputs written"
    );
    Ok(())
}

//! CSV ingestion of climate samples, stops and lines.
//!
//! Rows are deserialized into loose string-typed records first, then
//! validated into the typed core records. Any malformed row rejects the
//! whole file with [`HeatError::Data`] naming the file kind and line.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::climate::{ClimateSample, ClimateVariable};
use crate::error::HeatError;
use crate::transit::{AcStatus, Line, Stop};

#[derive(Debug, Deserialize)]
struct ClimateRow {
    lon: f64,
    lat: f64,
    temperature: f64,
    variable: String,
    year: i32,
}

#[derive(Debug, Deserialize)]
struct StopRow {
    stop_id: String,
    name: String,
    lon: f64,
    lat: f64,
    #[serde(default)]
    lines: String,
    daily_passengers: u64,
    has_shelter: String,
    has_bench: String,
}

#[derive(Debug, Deserialize)]
struct LineRow {
    line_id: String,
    name: String,
    mode: String,
    total_stops: u32,
    daily_frequency: u32,
    #[serde(default)]
    air_conditioning: String,
}

fn malformed(kind: &str, line: usize, reason: impl std::fmt::Display) -> HeatError {
    HeatError::Data(format!("{kind} CSV line {line}: {reason}"))
}

fn csv_reader<R: Read>(rdr: R, delimiter: u8) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .from_reader(rdr)
}

/// Deserializes every row, mapping each through `convert`. Line numbers
/// count the header as line 1.
fn parse_rows<R, Row, T>(
    rdr: R,
    delimiter: u8,
    kind: &str,
    mut convert: impl FnMut(Row) -> std::result::Result<T, String>,
) -> std::result::Result<Vec<T>, HeatError>
where
    R: Read,
    Row: for<'de> Deserialize<'de>,
{
    let mut reader = csv_reader(rdr, delimiter);
    let mut out = Vec::new();
    for (i, row) in reader.deserialize::<Row>().enumerate() {
        let line = i + 2;
        let row = row.map_err(|e| malformed(kind, line, e))?;
        out.push(convert(row).map_err(|e| malformed(kind, line, e))?);
    }
    Ok(out)
}

fn parse_flag(value: &str) -> std::result::Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "t" => Ok(true),
        "false" | "0" | "no" | "n" | "f" => Ok(false),
        other => Err(format!("'{other}' is not a boolean")),
    }
}

fn require(field: &str, value: String) -> std::result::Result<String, String> {
    if value.is_empty() {
        Err(format!("{field} is empty"))
    } else {
        Ok(value)
    }
}

/// Parses climate samples: `lon,lat,temperature,variable,year`.
pub fn parse_climate<R: Read>(
    rdr: R,
    delimiter: u8,
) -> std::result::Result<Vec<ClimateSample>, HeatError> {
    parse_rows(rdr, delimiter, "climate", |row: ClimateRow| {
        let variable = row
            .variable
            .parse::<ClimateVariable>()
            .map_err(|e| e.to_string())?;
        Ok(ClimateSample {
            lon: row.lon,
            lat: row.lat,
            temperature: row.temperature,
            variable,
            year: row.year,
        })
    })
}

/// Parses stops: `stop_id,name,lon,lat,lines,daily_passengers,has_shelter,has_bench`.
///
/// `lines` lists line ids separated by `,` or `|`.
pub fn parse_stops<R: Read>(rdr: R, delimiter: u8) -> std::result::Result<Vec<Stop>, HeatError> {
    parse_rows(rdr, delimiter, "stops", |row: StopRow| {
        let lines: BTreeSet<String> = row
            .lines
            .split([',', '|'])
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Stop {
            stop_id: require("stop_id", row.stop_id)?,
            name: row.name,
            lon: row.lon,
            lat: row.lat,
            lines,
            daily_passengers: row.daily_passengers,
            has_shelter: parse_flag(&row.has_shelter)?,
            has_bench: parse_flag(&row.has_bench)?,
        })
    })
}

/// Parses lines: `line_id,name,mode,total_stops,daily_frequency,air_conditioning`.
pub fn parse_lines<R: Read>(rdr: R, delimiter: u8) -> std::result::Result<Vec<Line>, HeatError> {
    parse_rows(rdr, delimiter, "lines", |row: LineRow| {
        Ok(Line {
            line_id: require("line_id", row.line_id)?,
            name: row.name,
            mode: row.mode,
            total_stops: row.total_stops,
            daily_frequency: row.daily_frequency,
            air_conditioning: row
                .air_conditioning
                .parse::<AcStatus>()
                .map_err(|e| e.to_string())?,
        })
    })
}

/// Picks `;` when the header has more semicolons than commas, else `,`.
pub fn sniff_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

fn read_file(path: &Path) -> Result<(String, u8)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let delimiter = sniff_delimiter(&content);
    debug!(path = %path.display(), delimiter = %(delimiter as char), "Reading CSV");
    Ok((content, delimiter))
}

/// Loads climate samples from a CSV file.
pub fn load_climate(path: impl AsRef<Path>) -> Result<Vec<ClimateSample>> {
    let path = path.as_ref();
    let (content, delimiter) = read_file(path)?;
    let samples = parse_climate(content.as_bytes(), delimiter)
        .with_context(|| format!("invalid climate file '{}'", path.display()))?;
    info!(path = %path.display(), samples = samples.len(), "Climate samples loaded");
    Ok(samples)
}

/// Loads stops from a CSV file.
pub fn load_stops(path: impl AsRef<Path>) -> Result<Vec<Stop>> {
    let path = path.as_ref();
    let (content, delimiter) = read_file(path)?;
    let stops = parse_stops(content.as_bytes(), delimiter)
        .with_context(|| format!("invalid stops file '{}'", path.display()))?;
    info!(path = %path.display(), stops = stops.len(), "Stops loaded");
    Ok(stops)
}

/// Loads lines from a CSV file.
pub fn load_lines(path: impl AsRef<Path>) -> Result<Vec<Line>> {
    let path = path.as_ref();
    let (content, delimiter) = read_file(path)?;
    let lines = parse_lines(content.as_bytes(), delimiter)
        .with_context(|| format!("invalid lines file '{}'", path.display()))?;
    info!(path = %path.display(), lines = lines.len(), "Lines loaded");
    Ok(lines)
}

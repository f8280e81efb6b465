//! CSV ingest and validation.
//!
//! This module turns the encounter CSV into a typed `Dataset`.
//!
//! Design goals:
//! - **Strict schema**: every required column must be present (any order,
//!   case-insensitive, BOM-tolerant headers).
//! - **Closed categories**: a value outside a field's declared level set is a
//!   `DataIncompatible` error, never coerced to the baseline.
//! - **Complete reporting**: all bad rows are collected and reported together,
//!   with line numbers.
//! - **Separation of concerns**: no fitting logic here; missing ages are kept
//!   (complete-case filtering happens in the pipeline).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{AGE_MAX, AGE_MIN, Area, Dataset, Gender, Level, Observation, Race, Violent};
use crate::error::AppError;

/// Required columns, in canonical order.
pub const COLUMNS: [&str; 6] = [
    "outcome",
    Race::FIELD,
    "age",
    Gender::FIELD,
    Area::FIELD,
    Violent::FIELD,
];

/// Cell values treated as a missing age.
const MISSING_MARKERS: [&str; 5] = ["", "na", "nan", "null", "none"];

/// Report at most this many row errors in the message.
const MAX_REPORTED_ERRORS: usize = 5;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Load the dataset file at `path`.
pub fn load_dataset(path: &Path) -> Result<Dataset, AppError> {
    if !path.exists() {
        return Err(AppError::missing_input(format!(
            "Dataset file '{}' does not exist.",
            path.display()
        )));
    }
    let file = File::open(path)
        .map_err(|e| AppError::missing_input(format!("Failed to open dataset '{}': {e}", path.display())))?;
    let data = read_dataset(file)?;
    log::info!("loaded {} rows from {}", data.len(), path.display());
    Ok(data)
}

/// Parse a dataset from any CSV reader.
pub fn read_dataset<R: Read>(reader: R) -> Result<Dataset, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::data(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header and lines are 1-based.
        let line = idx + 2;
        match result {
            Ok(record) => match parse_row(&record, &header_map) {
                Ok(obs) => rows.push(obs),
                Err(message) => row_errors.push(RowError { line, message }),
            },
            Err(e) => row_errors.push(RowError {
                line,
                message: format!("CSV parse error: {e}"),
            }),
        }
    }

    if !row_errors.is_empty() {
        return Err(AppError::data(format_row_errors(&row_errors)));
    }
    if rows.is_empty() {
        return Err(AppError::data("Dataset has no rows."));
    }
    Ok(Dataset::new(rows))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    let missing: Vec<&str> = COLUMNS
        .iter()
        .copied()
        .filter(|c| !header_map.contains_key(*c))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::data(format!(
            "Missing required column(s): {}",
            missing
                .iter()
                .map(|c| format!("`{c}`"))
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<Observation, String> {
    let outcome = match get(record, header_map, "outcome")? {
        "1" => true,
        "0" => false,
        other => return Err(format!("`outcome` must be 0 or 1, got '{other}'.")),
    };

    Ok(Observation {
        outcome,
        race: parse_level::<Race>(record, header_map)?,
        age: parse_age(get(record, header_map, "age")?)?,
        gender: parse_level::<Gender>(record, header_map)?,
        high_crime_area: parse_level::<Area>(record, header_map)?,
        violent_crime_reason: parse_level::<Violent>(record, header_map)?,
    })
}

fn get<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, column: &str) -> Result<&'a str, String> {
    header_map
        .get(column)
        .and_then(|&i| record.get(i))
        .ok_or_else(|| format!("Missing `{column}` cell."))
}

fn parse_level<L: Level>(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<L, String> {
    let raw = get(record, header_map, L::FIELD)?;
    L::parse(raw).ok_or_else(|| {
        let allowed: Vec<&str> = L::ALL.iter().map(|l| l.label()).collect();
        format!(
            "`{}` value '{raw}' is not a declared level (expected one of: {}).",
            L::FIELD,
            allowed.join(", ")
        )
    })
}

fn parse_age(raw: &str) -> Result<Option<u32>, String> {
    if MISSING_MARKERS.contains(&raw.to_ascii_lowercase().as_str()) {
        return Ok(None);
    }
    // Accept "34" and "34.0" but not fractional ages.
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("`age` value '{raw}' is not a number."))?;
    if value.fract() != 0.0 {
        return Err(format!("`age` value '{raw}' is not an integer."));
    }
    if value < f64::from(AGE_MIN) || value > f64::from(AGE_MAX) {
        return Err(format!("`age` value {raw} is outside [{AGE_MIN}, {AGE_MAX}]."));
    }
    Ok(Some(value as u32))
}

fn format_row_errors(errors: &[RowError]) -> String {
    let mut out = format!("{} invalid row(s):", errors.len());
    for e in errors.iter().take(MAX_REPORTED_ERRORS) {
        out.push_str(&format!("\n  line {}: {}", e.line, e.message));
    }
    if errors.len() > MAX_REPORTED_ERRORS {
        out.push_str(&format!("\n  ... and {} more", errors.len() - MAX_REPORTED_ERRORS));
    }
    out
}

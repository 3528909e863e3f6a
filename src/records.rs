/// Typed reading of the CSV files exchanged with the numerical toolkit.
///
/// Headered files are checked against the exact column list a record type
/// expects. Header-less files (fixed column order) are checked for width
/// record by record. Either way an unexpected layout is an error, never a
/// silently ignored column.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unexpected columns: expected [{expected}], found [{found}]")]
    UnexpectedColumns { expected: String, found: String },

    #[error("Line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },
}

pub fn open(path: &Path) -> Result<File, RecordError> {
    File::open(path).map_err(|source| RecordError::Open {
        path: path.display().to_string(),
        source,
    })
}

/// Reads a headered CSV whose header must be exactly `expected`.
pub fn read_records<T, R>(reader: R, expected: &[&str]) -> Result<Vec<T>, RecordError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    check_headers(&headers, expected)?;

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        records.push(result?);
    }
    Ok(records)
}

/// Reads a header-less CSV where every row must have exactly `width` fields.
pub fn read_positional<T, R>(reader: R, width: usize) -> Result<Vec<T>, RecordError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.len() != width {
            return Err(RecordError::FieldCount {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                expected: width,
                found: record.len(),
            });
        }
        records.push(record.deserialize(None)?);
    }
    Ok(records)
}

pub fn read_records_from_path<T>(path: &Path, expected: &[&str]) -> Result<Vec<T>, RecordError>
where
    T: DeserializeOwned,
{
    read_records(open(path)?, expected)
}

pub fn read_positional_from_path<T>(path: &Path, width: usize) -> Result<Vec<T>, RecordError>
where
    T: DeserializeOwned,
{
    read_positional(open(path)?, width)
}

fn check_headers(headers: &StringRecord, expected: &[&str]) -> Result<(), RecordError> {
    let found: Vec<&str> = headers.iter().collect();
    if found != expected {
        return Err(RecordError::UnexpectedColumns {
            expected: expected.join(","),
            found: found.join(","),
        });
    }
    Ok(())
}

/// Toolkit CSVs write booleans as 0/1.
pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    let raw = String::deserialize(deserializer)?;
    match raw.trim() {
        "1" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "false" | "FALSE" | "False" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid flag value: {}", other))),
    }
}

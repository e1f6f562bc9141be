//! CSV batch input.

use serde_json::{Number, Value};
use std::io::Read;
use storecast_models::STORE_ID_COLUMN;

use crate::error::{Result, StorecastError};
use crate::features::Record;

/// Parses one CSV cell.
///
/// Empty cells are null, `true`/`false` (any case) are booleans, integers
/// and finite floats are numbers, and anything else stays a string.
#[must_use]
pub fn parse_cell(raw: &str) -> Value {
    let cell = raw.trim();
    if cell.is_empty() {
        return Value::Null;
    }
    if cell.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if cell.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(cell.to_string())
}

/// Reads a headed CSV document into records.
///
/// The `store_id` column is kept verbatim as a string so identifiers such
/// as `001` survive.
///
/// # Errors
/// - `StorecastError::Schema` if there is no header row or no `store_id` column
/// - `StorecastError::Csv` if the document is malformed
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(reader);

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(StorecastError::schema("CSV input has no header row"));
    }
    if !headers.iter().any(|h| h == STORE_ID_COLUMN) {
        return Err(StorecastError::schema("CSV must include store_id column"));
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(name, cell)| {
                let value = if name == STORE_ID_COLUMN {
                    if cell.is_empty() { Value::Null } else { Value::String(cell.to_string()) }
                } else {
                    parse_cell(cell)
                };
                (name.to_string(), value)
            })
            .collect();
        records.push(record);
    }
    Ok(records)
}

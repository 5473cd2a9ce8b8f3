//! CSV loading with per-column type inference

use super::cell::{Cell, DType};
use super::frame::DataFrame;
use super::series::Series;
use crate::error::{self, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Load a frame from disk. Only `.csv` files are readable; a missing file
/// fails with the full path in the message.
pub fn read_frame(path: &Path) -> Result<DataFrame> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(error::file_not_found(display).with_operation("tabular::read_frame"));
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => read_csv(path),
        _ => Err(error::unsupported_format(display).with_operation("tabular::read_frame")),
    }
}

/// Parse a CSV file with a header row
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let headers = dedupe_headers(
        reader
            .headers()
            .map_err(|e| csv_error(path, e))?
            .iter()
            .map(str::to_string)
            .collect(),
    );

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        for (col, values) in raw.iter_mut().enumerate() {
            values.push(record.get(col).unwrap_or("").to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, fields)| {
            let dtype = DType::infer_raw(fields.iter().map(String::as_str));
            let cells: Vec<Cell> = fields.iter().map(|f| Cell::parse_as(f, dtype)).collect();
            Series::with_dtype(name, dtype, cells)
        })
        .collect();

    let frame = DataFrame::new(columns)?;
    debug!(path = %path.display(), shape = ?frame.shape(), "read csv");
    Ok(frame)
}

/// Repeated header names get a `.1`, `.2`, ... suffix
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .into_iter()
        .map(|name| {
            if seen.insert(name.clone()) {
                return name;
            }
            let mut n = 1;
            loop {
                let candidate = format!("{}.{}", name, n);
                if seen.insert(candidate.clone()) {
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}

fn csv_error(path: &Path, err: csv::Error) -> crate::error::Error {
    error::parse_error(format!("Failed to read CSV {}: {}", path.display(), err))
        .with_operation("tabular::read_csv")
        .set_source(err)
}

//! CSV adapter.
//!
//! Produces one point feature per data row. The delimiter is detected from
//! the header line, coordinates accept a comma as decimal separator, and
//! rows with unusable coordinates are dropped.

use geo::{Geometry, Point};
use serde_json::{Map, Value};

use super::{FeatureCollection, SourceFeature};
use crate::ImportError;
use crate::config::CsvColumns;

/// Delimiters tried against the header line, in priority order.
const DELIMITERS: &[u8] = b";\t,";

/// Parses delimited text with latitude/longitude columns.
///
/// Every feature carries its resolved name: the value of the detected name
/// column, or `"<base_name> - Ponto <n>"` with `n` the 1-based data row.
///
/// # Errors
///
/// Returns [`ImportError::EmptyInput`] if there is no header or no data
/// row, [`ImportError::MissingCoordinateColumns`] if no latitude or
/// longitude column is recognized, and [`ImportError::NoValidLayers`] if
/// no row has usable coordinates.
pub fn read_csv(
    text: &str,
    base_name: &str,
    columns: &CsvColumns,
) -> Result<FeatureCollection, ImportError> {
    let header_line = text.lines().find(|line| !line.trim().is_empty()).ok_or_else(|| {
        ImportError::EmptyInput {
            file_name: base_name.to_string(),
        }
    })?;
    let delimiter = detect_delimiter(header_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let raw_headers: Vec<String> = reader
        .headers()
        .map_err(|e| ImportError::MalformedInput {
            format: "CSV",
            message: e.to_string(),
        })?
        .iter()
        .map(|h| strip_quotes(h.trim()).to_string())
        .collect();
    let headers: Vec<String> = raw_headers.iter().map(|h| normalize_header(h)).collect();

    let (Some(lat_index), Some(lng_index)) = (
        find_column(&headers, &columns.latitude_keys),
        find_column(&headers, &columns.longitude_keys),
    ) else {
        return Err(ImportError::MissingCoordinateColumns {
            headers: raw_headers.join(", "),
        });
    };
    let name_index = find_column(&headers, &columns.name_keys);

    log::debug!(
        "CSV: delimiter {:?}, lat column '{}', lng column '{}'",
        char::from(delimiter),
        raw_headers[lat_index],
        raw_headers[lng_index]
    );

    let mut rows = 0usize;
    let mut features = Vec::new();

    for (row, record) in reader.records().enumerate() {
        rows += 1;
        let row_number = row + 1;

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                log::debug!("CSV: skipping unreadable row {row_number}: {e}");
                continue;
            }
        };

        let (Some(lat), Some(lng)) = (
            record.get(lat_index).and_then(parse_coordinate),
            record.get(lng_index).and_then(parse_coordinate),
        ) else {
            log::debug!("CSV: skipping row {row_number} without valid coordinates");
            continue;
        };

        if lat.abs() > 90.0 || lng.abs() > 180.0 {
            log::debug!("CSV: skipping row {row_number} with out-of-range coordinates ({lat}, {lng})");
            continue;
        }

        let name = name_index
            .and_then(|i| record.get(i))
            .map(|value| strip_quotes(value.trim()))
            .filter(|value| !value.is_empty())
            .map_or_else(|| format!("{base_name} - Ponto {row_number}"), str::to_string);

        let properties: Map<String, Value> = raw_headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != lat_index && *i != lng_index && Some(*i) != name_index)
            .map(|(i, header)| {
                let value = record.get(i).unwrap_or_default();
                (header.clone(), Value::String(value.to_string()))
            })
            .collect();

        features.push(SourceFeature {
            geometry: Some(Geometry::Point(Point::new(lng, lat))),
            properties,
            name: Some(name),
        });
    }

    if rows == 0 {
        return Err(ImportError::EmptyInput {
            file_name: base_name.to_string(),
        });
    }

    log::info!("CSV: {} of {rows} rows have valid coordinates", features.len());

    if features.is_empty() {
        return Err(ImportError::NoValidLayers {
            file_name: base_name.to_string(),
        });
    }

    Ok(FeatureCollection::new(features))
}

fn detect_delimiter(header_line: &str) -> u8 {
    DELIMITERS
        .iter()
        .copied()
        .find(|d| header_line.as_bytes().contains(d))
        .unwrap_or(b',')
}

fn normalize_header(header: &str) -> String {
    header
        .trim()
        .chars()
        .filter(|c| *c != '"' && *c != '\'')
        .collect::<String>()
        .to_lowercase()
}

fn strip_quotes(value: &str) -> &str {
    value.trim_matches(|c| c == '"' || c == '\'')
}

/// Index of the first column whose header matches a key, trying keys in
/// priority order.
fn find_column(headers: &[String], keys: &[String]) -> Option<usize> {
    keys.iter()
        .find_map(|key| headers.iter().position(|header| header == key))
}

/// Parses a coordinate, accepting `,` as decimal separator. Non-finite
/// values are rejected.
fn parse_coordinate(raw: &str) -> Option<f64> {
    let cleaned = strip_quotes(raw.trim()).replace(',', ".");
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

//! Zipped shapefile adapter.
//!
//! Every `.shp` inside the archive is one sub-layer. Its attributes come
//! from the `.dbf` with the same stem. Shapes are decoded by the
//! `shapefile` crate and converted through `geo` types.

use std::io::{Cursor, Read as _};

use serde_json::{Map, Value};
use shapefile::dbase::{self, FieldValue};

use super::{FeatureCollection, SourceFeature};
use crate::ImportError;

type Archive<'a> = zip::ZipArchive<Cursor<&'a [u8]>>;

/// Decodes every shapefile in a ZIP archive.
///
/// Returns one collection per `.shp` entry, in archive order, each named
/// after the entry's file stem.
///
/// # Errors
///
/// Returns [`ImportError::ShapefileDecode`] if the archive cannot be
/// opened, holds no `.shp`, lacks a companion `.dbf`, or any record fails
/// to decode.
pub fn read_shapefile_zip(bytes: &[u8]) -> Result<Vec<FeatureCollection>, ImportError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| decode_error("the file is not a readable ZIP archive", e))?;

    let entry_names: Vec<String> = archive.file_names().map(str::to_owned).collect();

    let shp_stems: Vec<String> = entry_names
        .iter()
        .filter(|name| !name.starts_with("__MACOSX/"))
        .filter_map(|name| strip_extension(name, "shp"))
        .map(str::to_owned)
        .collect();

    if shp_stems.is_empty() {
        return Err(ImportError::ShapefileDecode {
            message: "no .shp file found in the archive".to_string(),
            source: None,
        });
    }

    let mut collections = Vec::with_capacity(shp_stems.len());

    for stem in &shp_stems {
        let collection = read_layer(&mut archive, &entry_names, stem)?;
        log::info!(
            "Shapefile: layer '{}' has {} features",
            display_stem(stem),
            collection.len()
        );
        collections.push(collection);
    }

    Ok(collections)
}

fn read_layer(
    archive: &mut Archive<'_>,
    entry_names: &[String],
    stem: &str,
) -> Result<FeatureCollection, ImportError> {
    let layer = display_stem(stem);

    let shp_name = companion(entry_names, stem, "shp").ok_or_else(|| ImportError::ShapefileDecode {
        message: format!("layer '{layer}' has no .shp entry"),
        source: None,
    })?;
    let dbf_name = companion(entry_names, stem, "dbf").ok_or_else(|| ImportError::ShapefileDecode {
        message: format!("layer '{layer}' is missing its .dbf attribute table"),
        source: None,
    })?;

    if let Some(prj_name) = companion(entry_names, stem, "prj") {
        let prj = read_entry(archive, prj_name)?;
        let prj = String::from_utf8_lossy(&prj);
        if !(prj.contains("WGS") && prj.contains("84")) && !prj.contains("4326") {
            log::warn!(
                "Shapefile: layer '{layer}' is not in WGS 84; coordinates are imported without reprojection"
            );
        }
    }

    let shapes = shapefile::ShapeReader::new(Cursor::new(read_entry(archive, shp_name)?))
        .and_then(|reader| reader.read())
        .map_err(|e| decode_error(&format!("could not read the shapes of '{layer}'"), e))?;

    let mut dbf = dbase::Reader::new(Cursor::new(read_entry(archive, dbf_name)?))
        .map_err(|e| decode_error(&format!("could not open the .dbf of '{layer}'"), e))?;
    let field_names: Vec<String> = dbf.fields().iter().map(|f| f.name().to_string()).collect();
    let records = dbf
        .read()
        .map_err(|e| decode_error(&format!("could not read the .dbf of '{layer}'"), e))?;

    if shapes.len() != records.len() {
        log::warn!(
            "Shapefile: layer '{layer}' has {} shapes but {} attribute records",
            shapes.len(),
            records.len()
        );
    }

    let features = shapes
        .into_iter()
        .zip(records)
        .enumerate()
        .map(|(index, (shape, record))| {
            let geometry = match geo::Geometry::<f64>::try_from(shape) {
                Ok(geometry) => Some(single_part(geometry)),
                Err(e) => {
                    log::warn!("Shapefile: '{layer}' record {index} has no usable shape: {e}");
                    None
                }
            };
            SourceFeature::new(geometry, record_properties(&field_names, &record))
        })
        .collect();

    Ok(FeatureCollection {
        name: Some(layer.to_string()),
        features,
    })
}

/// Shapefile polygons and polylines always decode as multi-geometries.
/// A one-part multi is unwrapped so it is not reported as multipart.
fn single_part(geometry: geo::Geometry<f64>) -> geo::Geometry<f64> {
    match geometry {
        geo::Geometry::MultiPolygon(mut polygons) if polygons.0.len() == 1 => {
            geo::Geometry::Polygon(polygons.0.remove(0))
        }
        geo::Geometry::MultiLineString(mut lines) if lines.0.len() == 1 => {
            geo::Geometry::LineString(lines.0.remove(0))
        }
        other => other,
    }
}

fn record_properties(field_names: &[String], record: &dbase::Record) -> Map<String, Value> {
    field_names
        .iter()
        .filter_map(|name| Some((name.clone(), field_value(record.get(name)?))))
        .collect()
}

fn field_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Character(Some(text)) => Value::String(text.trim().to_string()),
        FieldValue::Memo(text) => Value::String(text.trim().to_string()),
        FieldValue::Numeric(Some(number)) => Value::from(*number),
        FieldValue::Float(Some(number)) => Value::from(f64::from(*number)),
        FieldValue::Double(number) | FieldValue::Currency(number) => Value::from(*number),
        FieldValue::Integer(number) => Value::from(*number),
        FieldValue::Logical(Some(flag)) => Value::Bool(*flag),
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None)
        | FieldValue::Date(None) => Value::Null,
        other => Value::String(format!("{other:?}")),
    }
}

fn read_entry(archive: &mut Archive<'_>, name: &str) -> Result<Vec<u8>, ImportError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| decode_error(&format!("could not open '{name}' in the archive"), e))?;
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| decode_error(&format!("could not extract '{name}'"), e))?;
    Ok(bytes)
}

/// Returns `name` without `.<ext>` if it ends with that extension
/// (case-insensitive).
fn strip_extension<'a>(name: &'a str, ext: &str) -> Option<&'a str> {
    let dot = name.len().checked_sub(ext.len() + 1)?;
    let (stem, suffix) = name.split_at_checked(dot)?;
    (suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(ext)).then_some(stem)
}

/// Finds the entry for `stem` with extension `ext`, ignoring case.
fn companion<'a>(entry_names: &'a [String], stem: &str, ext: &str) -> Option<&'a str> {
    entry_names
        .iter()
        .map(String::as_str)
        .find(|name| strip_extension(name, ext).is_some_and(|s| s.eq_ignore_ascii_case(stem)))
}

/// The stem without its directory prefix.
fn display_stem(stem: &str) -> &str {
    stem.rsplit('/').next().unwrap_or(stem)
}

fn decode_error(
    message: &str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> ImportError {
    ImportError::ShapefileDecode {
        message: message.to_string(),
        source: Some(Box::new(source)),
    }
}

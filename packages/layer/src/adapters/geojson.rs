//! `GeoJSON` adapter.
//!
//! Validates the document shape, then decodes each feature on its own so
//! that one broken feature keeps its slot (with no geometry) instead of
//! failing the whole file.

use serde_json::{Map, Value};

use super::{FeatureCollection, SourceFeature};
use crate::ImportError;

/// Parses a `GeoJSON` `FeatureCollection`.
///
/// # Errors
///
/// Returns [`ImportError::MalformedInput`] if the text is not JSON, or
/// [`ImportError::InvalidShape`] if it is not a `FeatureCollection` with a
/// `features` array.
pub fn read_geojson(text: &str) -> Result<FeatureCollection, ImportError> {
    let document: Value = serde_json::from_str(text).map_err(|e| ImportError::MalformedInput {
        format: "GeoJSON",
        message: e.to_string(),
    })?;

    if let Some(kind) = document.get("type").and_then(Value::as_str)
        && kind != "FeatureCollection"
    {
        return Err(ImportError::InvalidShape {
            message: format!("expected a FeatureCollection but found a {kind}"),
        });
    }

    let features = document
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| ImportError::InvalidShape {
            message: "document has no \"features\" array".to_string(),
        })?;

    Ok(FeatureCollection::new(
        features
            .iter()
            .enumerate()
            .map(|(index, feature)| decode_feature(index, feature))
            .collect(),
    ))
}

fn decode_feature(index: usize, feature: &Value) -> SourceFeature {
    let properties = feature
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_else(Map::new);

    let geometry = match feature.get("geometry") {
        None | Some(Value::Null) => None,
        Some(raw) => match decode_geometry(raw) {
            Ok(geometry) => Some(geometry),
            Err(e) => {
                log::warn!("GeoJSON: feature {index} has an invalid geometry: {e}");
                None
            }
        },
    };

    SourceFeature::new(geometry, properties)
}

fn decode_geometry(raw: &Value) -> Result<geo::Geometry<f64>, String> {
    let geometry: geojson::Geometry =
        serde_json::from_value(raw.clone()).map_err(|e| e.to_string())?;
    geometry.try_into().map_err(|e: geojson::Error| e.to_string())
}

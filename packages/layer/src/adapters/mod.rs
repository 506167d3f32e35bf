//! Format adapters.
//!
//! Each adapter turns one source format into a [`FeatureCollection`]: a
//! list of geometry + properties pairs that the import session then walks
//! and normalizes. Geometries keep the source axis order (`x` = longitude)
//! until the normalizer flips them.

pub mod csv;
pub mod geojson;
pub mod kml;
pub mod shapefile;

use serde_json::{Map, Value};

/// A single source record before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFeature {
    /// Parsed geometry, or `None` when absent or undecodable.
    pub geometry: Option<geo::Geometry<f64>>,
    /// Source attributes, copied into the layer details.
    pub properties: Map<String, Value>,
    /// Name already resolved by the adapter. When set, the property-key
    /// lookup is skipped.
    pub name: Option<String>,
}

impl SourceFeature {
    /// Creates a feature with a geometry and properties.
    #[must_use]
    pub const fn new(geometry: Option<geo::Geometry<f64>>, properties: Map<String, Value>) -> Self {
        Self {
            geometry,
            properties,
            name: None,
        }
    }
}

/// An ordered list of source features.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    /// Name of the sub-layer inside a multi-layer source (a `.shp` inside
    /// a ZIP). `None` for single-layer formats.
    pub name: Option<String>,
    /// Features in source order.
    pub features: Vec<SourceFeature>,
}

impl FeatureCollection {
    /// Creates an unnamed collection.
    #[must_use]
    pub const fn new(features: Vec<SourceFeature>) -> Self {
        Self {
            name: None,
            features,
        }
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

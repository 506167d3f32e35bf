#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map layer types shared by the import pipeline and its consumers.
//!
//! Every supported source format (KML, `GeoJSON`, zipped shapefiles, CSV)
//! is normalized into [`Layer`] records. A layer is one of three shapes
//! (marker, polygon, polyline) and its payload is always expressed as
//! `{lat, lng}` pairs, whatever order the source file used.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// ESG classification attached to every imported layer.
///
/// Always supplied by the caller at import time; the pipeline never infers
/// or rewrites it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Pillar {
    /// Environmental indicators (water quality, emissions, protected areas).
    Environmental,
    /// Social indicators (communities, labor, safety).
    Social,
    /// Governance indicators (compliance, concessions, licensing).
    Governance,
    /// Port operations (berths, yards, access routes).
    Operational,
}

impl Pillar {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Environmental,
            Self::Social,
            Self::Governance,
            Self::Operational,
        ]
    }
}

/// The renderer-facing shape of a layer.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LayerType {
    /// A single point.
    Marker,
    /// A closed ring.
    Polygon,
    /// An open path.
    Polyline,
}

/// A WGS 84 coordinate in latitude/longitude order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
}

impl LatLng {
    /// Creates a coordinate from a latitude and a longitude.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Geometry payload of a layer.
///
/// The variant doubles as the layer's [`LayerType`], so the payload shape
/// can never disagree with the declared type. Serialized as the adjacent
/// pair `"type"` / `"data"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum LayerData {
    /// A single coordinate.
    Marker(LatLng),
    /// The exterior ring of a polygon.
    Polygon(Vec<LatLng>),
    /// An ordered path.
    Polyline(Vec<LatLng>),
}

impl LayerData {
    /// Returns the [`LayerType`] this payload belongs to.
    #[must_use]
    pub const fn layer_type(&self) -> LayerType {
        match self {
            Self::Marker(_) => LayerType::Marker,
            Self::Polygon(_) => LayerType::Polygon,
            Self::Polyline(_) => LayerType::Polyline,
        }
    }

    /// Returns every coordinate of the payload in order.
    #[must_use]
    pub fn coordinates(&self) -> &[LatLng] {
        match self {
            Self::Marker(point) => std::slice::from_ref(point),
            Self::Polygon(points) | Self::Polyline(points) => points,
        }
    }
}

/// Caller-supplied metadata for a single import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportMetadata {
    /// Display name override, applied to the first feature of the file.
    pub name: Option<String>,
    /// ESG pillar every produced layer is tagged with.
    pub pillar: Pillar,
    /// Grouping key for UI bucketing. Falls back to the configured default.
    pub group: Option<String>,
}

impl ImportMetadata {
    /// Creates metadata with only the mandatory pillar set.
    #[must_use]
    pub const fn new(pillar: Pillar) -> Self {
        Self {
            name: None,
            pillar,
            group: None,
        }
    }

    /// Sets the display name override.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the grouping key.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Everything needed to create a [`Layer`].
///
/// Only the import pipeline builds these; consumers receive finished
/// layers.
#[derive(Debug, Clone)]
pub struct LayerParts {
    /// Batch-unique identifier.
    pub id: String,
    /// Display label.
    pub name: String,
    /// Hex color from the session palette.
    pub color: String,
    /// Geometry payload.
    pub data: LayerData,
    /// Source properties plus pipeline counters.
    pub details: serde_json::Map<String, serde_json::Value>,
    /// ESG pillar.
    pub pillar: Pillar,
    /// Grouping key.
    pub group: String,
}

/// A normalized map layer.
///
/// All fields are fixed at creation except visibility, which belongs to
/// the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    id: String,
    name: String,
    #[serde(flatten)]
    data: LayerData,
    visible: bool,
    color: String,
    details: serde_json::Map<String, serde_json::Value>,
    pillar: Pillar,
    group: String,
}

impl Layer {
    /// Builds a visible layer from its parts.
    #[must_use]
    pub fn from_parts(parts: LayerParts) -> Self {
        Self {
            id: parts.id,
            name: parts.name,
            data: parts.data,
            visible: true,
            color: parts.color,
            details: parts.details,
            pillar: parts.pillar,
            group: parts.group,
        }
    }

    /// Batch-unique identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renderer-facing shape.
    #[must_use]
    pub const fn layer_type(&self) -> LayerType {
        self.data.layer_type()
    }

    /// Geometry payload.
    #[must_use]
    pub const fn data(&self) -> &LayerData {
        &self.data
    }

    /// Whether the consumer currently shows this layer.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shows or hides the layer.
    pub const fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Hex color assigned at creation.
    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }

    /// Source properties plus pipeline counters.
    #[must_use]
    pub const fn details(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.details
    }

    /// ESG pillar.
    #[must_use]
    pub const fn pillar(&self) -> Pillar {
        self.pillar
    }

    /// Grouping key.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }
}

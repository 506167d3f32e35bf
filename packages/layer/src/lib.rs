#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic file ingestion for the port ESG map.
//!
//! Accepts KML, `GeoJSON`, zipped shapefiles, and CSV files with coordinate
//! columns, and converts every renderable feature into a [`Layer`] with a
//! single marker, polygon, or polyline payload in `{lat, lng}` order.
//!
//! Use [`process_file`] for a one-off import, or an [`ImportSession`] to
//! keep colors rotating and ids unique across several files.

pub mod adapters;
pub mod color;
pub mod config;
pub mod format;
pub mod normalize;
pub mod progress;
pub mod session;

use std::borrow::Cow;
use std::path::Path;

pub use color::ColorAllocator;
pub use config::ImportConfig;
pub use esg_map_layer_models::{ImportMetadata, Layer, LayerData, LayerType, Pillar};
pub use format::{SourceFormat, is_format_supported, supported_formats};
pub use session::ImportSession;

/// Errors that can occur while importing a file.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The file extension does not match any adapter.
    #[error(
        "Unsupported file format for '{file_name}'. Supported formats: .kml, .geojson, .json, .zip (shapefile), .csv"
    )]
    UnsupportedFormat {
        /// Name of the rejected file.
        file_name: String,
    },

    /// The document could not be parsed at all.
    #[error("Could not parse the {format} document: {message}")]
    MalformedInput {
        /// Format that was being parsed.
        format: &'static str,
        /// Parser error text.
        message: String,
    },

    /// The document parsed but is not a feature collection.
    #[error("Invalid GeoJSON: {message}")]
    InvalidShape {
        /// What was wrong with the structure.
        message: String,
    },

    /// The file contains no features or data rows.
    #[error("'{file_name}' contains no features")]
    EmptyInput {
        /// Base name of the empty file.
        file_name: String,
    },

    /// Every feature was skipped, so no layer was produced.
    #[error("No valid layers could be created from '{file_name}'")]
    NoValidLayers {
        /// Base name of the file.
        file_name: String,
    },

    /// The CSV header has no recognizable latitude or longitude column.
    #[error(
        "CSV must have latitude and longitude columns (e.g. lat/lng or latitude/longitude). Found: {headers}"
    )]
    MissingCoordinateColumns {
        /// The header cells that were found, comma-separated.
        headers: String,
    },

    /// The shapefile archive could not be decoded.
    #[error(
        "Could not read the shapefile: {message}. The ZIP must contain .shp, .shx and .dbf files"
    )]
    ShapefileDecode {
        /// What failed.
        message: String,
        /// Underlying decoder error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The import configuration is invalid.
    #[error("Invalid import configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },
}

/// A named file blob, as handed over by an upload or read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File name including its extension. Drives format detection.
    pub name: String,
    /// Raw contents.
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// Creates a source file from a name and its contents.
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk, naming it after the path's final component.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Io`] if the file cannot be read.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self, ImportError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path.file_name().map_or_else(
            || path.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        );

        Ok(Self { name, bytes })
    }

    /// Contents decoded as UTF-8, without a byte-order mark. Invalid
    /// sequences are replaced.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        let bytes = self
            .bytes
            .strip_prefix(b"\xEF\xBB\xBF")
            .unwrap_or(&self.bytes);
        String::from_utf8_lossy(bytes)
    }
}

/// Converts one file into layers with a fresh default session.
///
/// # Errors
///
/// Returns [`ImportError`] if the format is unsupported, the file cannot be
/// decoded, or it yields no layer.
pub fn process_file(
    file: &SourceFile,
    metadata: &ImportMetadata,
) -> Result<Vec<Layer>, ImportError> {
    ImportSession::default().process_file(file, metadata)
}

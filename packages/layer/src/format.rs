//! Supported source formats and extension matching.
//!
//! Matching is a case-insensitive suffix test on the file name. `.json` is
//! always treated as `GeoJSON`.

/// Every accepted extension, with its leading dot.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".kml", ".geojson", ".json", ".zip", ".csv"];

/// A source format with its own adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// Keyhole Markup Language document.
    Kml,
    /// `GeoJSON` `FeatureCollection`.
    GeoJson,
    /// ZIP archive holding one or more shapefiles.
    ShapefileZip,
    /// Delimited text with latitude/longitude columns.
    Csv,
}

impl SourceFormat {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Kml, Self::GeoJson, Self::ShapefileZip, Self::Csv]
    }

    /// Extensions handled by this format.
    #[must_use]
    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Kml => &[".kml"],
            Self::GeoJson => &[".geojson", ".json"],
            Self::ShapefileZip => &[".zip"],
            Self::Csv => &[".csv"],
        }
    }

    /// Human-readable label used in logs and error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Kml => "KML",
            Self::GeoJson => "GeoJSON",
            Self::ShapefileZip => "Shapefile (ZIP)",
            Self::Csv => "CSV",
        }
    }

    /// Whether the adapter reads the file as text rather than raw bytes.
    #[must_use]
    pub const fn is_text(self) -> bool {
        !matches!(self, Self::ShapefileZip)
    }

    /// Detects the format from a file name's extension.
    #[must_use]
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|format| format.extensions().iter().any(|ext| lower.ends_with(ext)))
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Returns the set of accepted extensions.
#[must_use]
pub const fn supported_formats() -> &'static [&'static str] {
    SUPPORTED_EXTENSIONS
}

/// Whether `file_name` ends in a supported extension (case-insensitive).
#[must_use]
pub fn is_format_supported(file_name: &str) -> bool {
    SourceFormat::from_file_name(file_name).is_some()
}

/// Strips directories and the final extension from a file name.
///
/// `"uploads/Zoneamento.KML"` becomes `"Zoneamento"`. Names without an
/// extension, or hidden files like `".csv"`, are returned whole.
#[must_use]
pub fn base_name(file_name: &str) -> &str {
    let file = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match file.rfind('.') {
        Some(dot) if dot > 0 => &file[..dot],
        _ => file,
    }
}

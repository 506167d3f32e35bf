//! Import sessions.
//!
//! A session owns every piece of mutable pipeline state: the color
//! rotation, the id salt, and the batch-wide layer ordinal. Files processed
//! through the same session keep rotating colors and never reuse an id.

use std::sync::Arc;

use esg_map_layer_models::{ImportMetadata, Layer, LayerParts};
use serde_json::Value;

use crate::adapters::{FeatureCollection, SourceFeature, csv, geojson, kml, shapefile};
use crate::color::ColorAllocator;
use crate::config::ImportConfig;
use crate::format::{SourceFormat, base_name};
use crate::normalize::{NormalizeOptions, convert_geometry, geometry_kind};
use crate::progress::{ProgressCallback, null_progress};
use crate::{ImportError, SourceFile};

/// Stateful driver that turns source files into layers.
pub struct ImportSession {
    config: ImportConfig,
    colors: ColorAllocator,
    salt: i64,
    salt_pinned: bool,
    next_ordinal: usize,
    progress: Arc<dyn ProgressCallback>,
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new(ImportConfig::default())
    }
}

impl ImportSession {
    /// Creates a session salted with the current wall-clock time.
    #[must_use]
    pub fn new(config: ImportConfig) -> Self {
        Self {
            colors: ColorAllocator::new(config.palette.clone()),
            config,
            salt: now_millis(),
            salt_pinned: false,
            next_ordinal: 0,
            progress: null_progress(),
        }
    }

    /// Reports per-feature progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Swaps the progress receiver, e.g. to give each file its own bar.
    pub fn set_progress(&mut self, progress: Arc<dyn ProgressCallback>) {
        self.progress = progress;
    }

    /// Pins the id salt for reproducible output. A pinned salt survives
    /// [`Self::reset`].
    #[must_use]
    pub const fn with_salt(mut self, salt: i64) -> Self {
        self.salt = salt;
        self.salt_pinned = true;
        self
    }

    /// The settings this session runs with.
    #[must_use]
    pub const fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Starts a new batch. Colors restart at the first palette entry and
    /// ordinals restart at zero. The salt is refreshed unless it was pinned
    /// with [`Self::with_salt`].
    pub fn reset(&mut self) {
        self.colors.reset();
        self.next_ordinal = 0;
        if !self.salt_pinned {
            self.salt = now_millis();
        }
    }

    /// Detects the format of `file` and converts it into layers.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::UnsupportedFormat`] for an unknown extension,
    /// or any error of the matching adapter.
    pub fn process_file(
        &mut self,
        file: &SourceFile,
        metadata: &ImportMetadata,
    ) -> Result<Vec<Layer>, ImportError> {
        let format =
            SourceFormat::from_file_name(&file.name).ok_or_else(|| ImportError::UnsupportedFormat {
                file_name: file.name.clone(),
            })?;
        let base = base_name(&file.name);

        log::info!("Importing '{}' as {format} ({} bytes)", file.name, file.bytes.len());

        let layers = if format.is_text() {
            let text = file.text();
            match format {
                SourceFormat::Kml => self.parse_kml(&text, base, metadata),
                SourceFormat::GeoJson => self.parse_geojson(&text, base, metadata),
                SourceFormat::Csv => self.parse_csv(&text, base, metadata),
                SourceFormat::ShapefileZip => unreachable!("shapefile archives are binary"),
            }
        } else {
            self.parse_shapefile(&file.bytes, base, metadata)
        }?;

        log::info!("Imported {} layers from '{}'", layers.len(), file.name);

        Ok(layers)
    }

    /// Converts a KML document into layers.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::MalformedInput`] for unparseable XML, plus the
    /// errors of [`Self::parse_feature_collection`].
    pub fn parse_kml(
        &mut self,
        text: &str,
        base_name: &str,
        metadata: &ImportMetadata,
    ) -> Result<Vec<Layer>, ImportError> {
        let collection = kml::read_kml(text)?;
        self.parse_feature_collection(&collection, base_name, metadata)
    }

    /// Converts a `GeoJSON` document into layers.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::MalformedInput`] or
    /// [`ImportError::InvalidShape`] for a document that is not a
    /// `FeatureCollection`, plus the errors of
    /// [`Self::parse_feature_collection`].
    pub fn parse_geojson(
        &mut self,
        text: &str,
        base_name: &str,
        metadata: &ImportMetadata,
    ) -> Result<Vec<Layer>, ImportError> {
        let collection = geojson::read_geojson(text)?;
        self.parse_feature_collection(&collection, base_name, metadata)
    }

    /// Converts every shapefile in a ZIP archive into layers.
    ///
    /// Sub-collections share this session, so colors and ordinals keep
    /// advancing across the whole archive. Layers are named and identified
    /// after the `.shp` they came from.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::ShapefileDecode`] if the archive cannot be
    /// decoded, [`ImportError::EmptyInput`] if it holds no records at all,
    /// or [`ImportError::NoValidLayers`] if no record produced a layer.
    pub fn parse_shapefile(
        &mut self,
        bytes: &[u8],
        base_name: &str,
        metadata: &ImportMetadata,
    ) -> Result<Vec<Layer>, ImportError> {
        let collections = shapefile::read_shapefile_zip(bytes)?;

        if collections.iter().all(FeatureCollection::is_empty) {
            return Err(ImportError::EmptyInput {
                file_name: base_name.to_string(),
            });
        }

        let mut layers = Vec::new();
        let mut name_override = metadata.name.as_deref();

        for collection in &collections {
            let layer_base = collection.name.as_deref().unwrap_or(base_name);
            if collection.is_empty() {
                log::warn!("Shapefile: layer '{layer_base}' has no records, skipping");
                continue;
            }
            layers.extend(self.walk_features(collection, layer_base, name_override, metadata));
            name_override = None;
        }

        non_empty(layers, base_name)
    }

    /// Converts delimited text with coordinate columns into marker layers.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`csv::read_csv`].
    pub fn parse_csv(
        &mut self,
        text: &str,
        base_name: &str,
        metadata: &ImportMetadata,
    ) -> Result<Vec<Layer>, ImportError> {
        let collection = csv::read_csv(text, base_name, &self.config.csv)?;
        self.parse_feature_collection(&collection, base_name, metadata)
    }

    /// Walks a feature collection and builds one layer per renderable
    /// geometry (or per part, with multi-part expansion on).
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::EmptyInput`] if the collection has no
    /// features, or [`ImportError::NoValidLayers`] if none of them produced
    /// a layer.
    pub fn parse_feature_collection(
        &mut self,
        collection: &FeatureCollection,
        base_name: &str,
        metadata: &ImportMetadata,
    ) -> Result<Vec<Layer>, ImportError> {
        if collection.is_empty() {
            return Err(ImportError::EmptyInput {
                file_name: base_name.to_string(),
            });
        }

        let layers = self.walk_features(collection, base_name, metadata.name.as_deref(), metadata);

        non_empty(layers, base_name)
    }

    fn walk_features(
        &mut self,
        collection: &FeatureCollection,
        base_name: &str,
        name_override: Option<&str>,
        metadata: &ImportMetadata,
    ) -> Vec<Layer> {
        let options = NormalizeOptions {
            expand_multipart: self.config.expand_multipart,
        };
        let group = metadata
            .group
            .as_deref()
            .map(str::trim)
            .filter(|group| !group.is_empty())
            .unwrap_or(self.config.default_group.as_str())
            .to_string();

        self.progress.set_total(collection.len() as u64);
        self.progress.set_message(base_name.to_string());

        let mut layers = Vec::new();

        for (index, feature) in collection.features.iter().enumerate() {
            self.progress.inc(1);

            let Some(geometry) = &feature.geometry else {
                log::warn!("'{base_name}': feature {index} has no geometry, skipping");
                continue;
            };

            let Some(shapes) = convert_geometry(geometry, options) else {
                log::warn!(
                    "'{base_name}': feature {index} has unsupported geometry {}, skipping",
                    geometry_kind(geometry)
                );
                continue;
            };

            if shapes.is_empty() {
                log::warn!("'{base_name}': feature {index} has an empty geometry, skipping");
                continue;
            }

            let name = self.resolve_name(
                feature,
                index,
                base_name,
                name_override.filter(|_| index == 0),
            );

            for shape in shapes {
                let mut details = feature.properties.clone();
                details.extend(shape.details);

                layers.push(Layer::from_parts(LayerParts {
                    id: self.next_id(base_name),
                    name: name.clone(),
                    color: self.colors.next_color(),
                    data: shape.data,
                    details,
                    pillar: metadata.pillar,
                    group: group.clone(),
                }));
            }
        }

        self.progress
            .finish(format!("{base_name}: {} layers", layers.len()));

        layers
    }

    /// Picks a display name: the caller's override, then a name the adapter
    /// resolved, then the first non-empty configured property, then
    /// `"<base_name> - <index + 1>"`.
    fn resolve_name(
        &self,
        feature: &SourceFeature,
        index: usize,
        base_name: &str,
        name_override: Option<&str>,
    ) -> String {
        name_override
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| {
                feature
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
            })
            .or_else(|| {
                self.config
                    .name_keys
                    .iter()
                    .find_map(|key| property_text(feature.properties.get(key)?))
            })
            .unwrap_or_else(|| format!("{base_name} - {}", index + 1))
    }

    fn next_id(&mut self, base_name: &str) -> String {
        let id = format!("{}-{}-{}", sanitize(base_name), self.next_ordinal, self.salt);
        self.next_ordinal += 1;
        id
    }
}

fn non_empty(layers: Vec<Layer>, base_name: &str) -> Result<Vec<Layer>, ImportError> {
    if layers.is_empty() {
        return Err(ImportError::NoValidLayers {
            file_name: base_name.to_string(),
        });
    }
    Ok(layers)
}

/// Text of a name-like property. Strings are trimmed, numbers stringified,
/// anything else (or an empty string) is ignored.
fn property_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim())
            .filter(|text| !text.is_empty())
            .map(str::to_string),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Lowercases and replaces every non-alphanumeric character with `-`.
fn sanitize(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect()
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

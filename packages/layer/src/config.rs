//! Import settings.
//!
//! The defaults ship as `defaults.toml`, embedded at compile time. A user
//! config file only needs the keys it wants to change; everything else is
//! taken from the embedded defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ImportError;

/// Embedded default settings.
const DEFAULTS_TOML: &str = include_str!("../defaults.toml");

/// Settings that drive naming, coloring, and geometry expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Rotating layer colors, as `#rrggbb`.
    pub palette: Vec<String>,
    /// Group assigned when the caller does not supply one.
    pub default_group: String,
    /// Emit one layer per part of a multi-geometry instead of keeping only
    /// the first part.
    pub expand_multipart: bool,
    /// Property keys tried, in order, to name a feature.
    pub name_keys: Vec<String>,
    /// CSV header spellings.
    pub csv: CsvColumns,
}

/// Recognized CSV header spellings, matched against lowercased header
/// cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvColumns {
    /// Latitude column candidates, in priority order.
    pub latitude_keys: Vec<String>,
    /// Longitude column candidates, in priority order.
    pub longitude_keys: Vec<String>,
    /// Name column candidates, in priority order.
    pub name_keys: Vec<String>,
}

/// A partial config as written by users. Missing keys keep their default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOverrides {
    palette: Option<Vec<String>>,
    default_group: Option<String>,
    expand_multipart: Option<bool>,
    name_keys: Option<Vec<String>>,
    csv: Option<CsvOverrides>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CsvOverrides {
    latitude_keys: Option<Vec<String>>,
    longitude_keys: Option<Vec<String>>,
    name_keys: Option<Vec<String>>,
}

impl Default for ImportConfig {
    /// Returns the embedded defaults.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `defaults.toml` fails to parse. It is a
    /// compile-time constant, so a failure is a development error caught by
    /// the tests below.
    fn default() -> Self {
        toml::de::from_str(DEFAULTS_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded import defaults: {e}"))
    }
}

impl ImportConfig {
    /// Parses a (possibly partial) TOML config on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Config`] if the TOML is invalid, contains
    /// unknown keys, or yields an unusable palette or empty key list.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ImportError> {
        let overrides: ConfigOverrides =
            toml::de::from_str(toml_str).map_err(|e| ImportError::Config {
                message: e.to_string(),
            })?;

        let mut config = Self::default();
        config.apply(overrides);
        config.validate()?;

        Ok(config)
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Io`] if the file cannot be read, or
    /// [`ImportError::Config`] if its contents are invalid.
    pub async fn load(path: &Path) -> Result<Self, ImportError> {
        let contents = tokio::fs::read_to_string(path).await?;
        log::info!("Loaded import config from {}", path.display());
        Self::from_toml_str(&contents)
    }

    fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(palette) = overrides.palette {
            self.palette = palette;
        }
        if let Some(group) = overrides.default_group {
            self.default_group = group;
        }
        if let Some(expand) = overrides.expand_multipart {
            self.expand_multipart = expand;
        }
        if let Some(keys) = overrides.name_keys {
            self.name_keys = keys;
        }
        if let Some(csv) = overrides.csv {
            if let Some(keys) = csv.latitude_keys {
                self.csv.latitude_keys = keys;
            }
            if let Some(keys) = csv.longitude_keys {
                self.csv.longitude_keys = keys;
            }
            if let Some(keys) = csv.name_keys {
                self.csv.name_keys = keys;
            }
        }
    }

    fn validate(&self) -> Result<(), ImportError> {
        if self.palette.is_empty() {
            return Err(ImportError::Config {
                message: "palette must contain at least one color".to_string(),
            });
        }

        if let Some(bad) = self.palette.iter().find(|c| !is_hex_color(c)) {
            return Err(ImportError::Config {
                message: format!("palette entry '{bad}' is not a #rrggbb color"),
            });
        }

        if self.csv.latitude_keys.is_empty() || self.csv.longitude_keys.is_empty() {
            return Err(ImportError::Config {
                message: "csv.latitude_keys and csv.longitude_keys must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

//! Subcommand implementations shared by the flag-driven and interactive
//! front ends.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use esg_map_cli_utils::{IndicatifProgress, MultiProgress};
use esg_map_layer::{
    ImportConfig, ImportError, ImportMetadata, ImportSession, Layer, Pillar, SourceFile,
    SourceFormat, format::SUPPORTED_EXTENSIONS,
};

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV: &str = "ESG_MAP_CONFIG";

/// Resolves the import config from an explicit path, `ESG_MAP_CONFIG`, or
/// the built-in defaults, in that order.
///
/// # Errors
///
/// Returns [`ImportError`] if the chosen file cannot be read or parsed.
pub async fn load_config(path: Option<&Path>) -> Result<ImportConfig, ImportError> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

    match path {
        Some(path) => ImportConfig::load(&path).await,
        None => Ok(ImportConfig::default()),
    }
}

/// Imports every file through one shared session, so colors keep rotating
/// and ids stay unique across the batch.
///
/// A file that fails is logged and skipped. The batch only fails when no
/// file produced a layer.
///
/// # Errors
///
/// Returns the first file's error if nothing was imported.
pub async fn import_files(
    multi: &MultiProgress,
    files: &[PathBuf],
    metadata: &ImportMetadata,
    config: ImportConfig,
) -> Result<Vec<Layer>, ImportError> {
    let start = Instant::now();
    let files_bar = IndicatifProgress::files_bar(multi, files.len() as u64);
    let mut session = ImportSession::new(config);
    let mut layers = Vec::new();
    let mut first_error = None;

    for path in files {
        let result = match SourceFile::read(path).await {
            Ok(file) => {
                session.set_progress(IndicatifProgress::features_bar(multi, &file.name));
                session.process_file(&file, metadata)
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(imported) => layers.extend(imported),
            Err(e) => {
                log::error!("Failed to import {}: {e}", path.display());
                first_error.get_or_insert(e);
            }
        }

        files_bar.inc(1);
    }

    files_bar.finish(format!("{} layers from {} files", layers.len(), files.len()));

    if layers.is_empty()
        && let Some(e) = first_error
    {
        return Err(e);
    }

    log::info!(
        "Imported {} layers in {:.1}s",
        layers.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(layers)
}

/// Writes layers as pretty JSON to `output`, or to stdout.
///
/// # Errors
///
/// Returns an error if serialization or the file write fails.
pub async fn write_layers(
    layers: &[Layer],
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(layers)?;

    match output {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            log::info!("Wrote {} layers to {}", layers.len(), path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Prints every supported format and its extensions.
pub fn print_formats() {
    println!("{:<18} EXTENSIONS", "FORMAT");
    println!("{}", "-".repeat(40));
    for format in SourceFormat::all() {
        println!("{:<18} {}", format.label(), format.extensions().join(", "));
    }
}

/// Runs a file through the pipeline and summarizes the result without
/// writing any layer.
///
/// # Errors
///
/// Returns [`ImportError`] if the file cannot be read or imported.
pub async fn check_file(path: &Path, config: ImportConfig) -> Result<(), ImportError> {
    let file = SourceFile::read(path).await?;

    let Some(format) = SourceFormat::from_file_name(&file.name) else {
        println!(
            "{}: unsupported (expected one of {})",
            file.name,
            SUPPORTED_EXTENSIONS.join(", ")
        );
        return Ok(());
    };

    let metadata = ImportMetadata::new(Pillar::Operational);
    let mut session = ImportSession::new(config);
    let layers = session.process_file(&file, &metadata)?;

    let mut by_type = BTreeMap::new();
    for layer in &layers {
        *by_type.entry(layer.layer_type().to_string()).or_insert(0_usize) += 1;
    }

    let multipart = if session.config().expand_multipart {
        "expanded"
    } else {
        "collapsed"
    };
    println!(
        "{}: {format}, {} layers (multi-part {multipart})",
        file.name,
        layers.len()
    );
    for (layer_type, count) in by_type {
        println!("  {layer_type:<10} {count}");
    }

    Ok(())
}

/// Prints the palette colors in allocation order.
pub fn print_palette(config: &ImportConfig) {
    for (index, color) in config.palette.iter().enumerate() {
        println!("{:>2}  {color}", index + 1);
    }
}

//! Interactive menu for the importer.
//!
//! Walks the user through an import with `dialoguer` prompts so nobody has
//! to remember the flags.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use esg_map_cli_utils::MultiProgress;
use esg_map_layer::{ImportConfig, ImportMetadata, Pillar, is_format_supported};

use crate::commands;

/// Top-level actions in the interactive menu.
enum Action {
    Import,
    Check,
    Formats,
    Palette,
}

impl Action {
    const ALL: &[Self] = &[Self::Import, Self::Check, Self::Formats, Self::Palette];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Import => "Import files",
            Self::Check => "Check a file",
            Self::Formats => "List supported formats",
            Self::Palette => "Show color palette",
        }
    }
}

/// Prompts for an action and runs it.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected action fails.
pub async fn run(
    multi: &MultiProgress,
    config: ImportConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("ESG Map Layer Import");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::Import => import(multi, config).await?,
        Action::Check => {
            let path: String = Input::new().with_prompt("File").interact_text()?;
            commands::check_file(&PathBuf::from(path.trim()), config).await?;
        }
        Action::Formats => commands::print_formats(),
        Action::Palette => commands::print_palette(&config),
    }

    Ok(())
}

async fn import(
    multi: &MultiProgress,
    mut config: ImportConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw: String = Input::new()
        .with_prompt("Files (comma-separated)")
        .interact_text()?;

    let files: Vec<PathBuf> = raw
        .split(',')
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .collect();

    for file in &files {
        if !is_format_supported(&file.to_string_lossy()) {
            log::warn!("{} has an unsupported extension", file.display());
        }
    }

    if files.is_empty() {
        println!("No files given.");
        return Ok(());
    }

    let pillar_labels: Vec<&str> = Pillar::all().iter().map(AsRef::as_ref).collect();
    let pillar_idx = Select::new()
        .with_prompt("ESG pillar")
        .items(&pillar_labels)
        .default(0)
        .interact()?;

    let name: String = Input::new()
        .with_prompt("Layer name (blank to use the file's own names)")
        .allow_empty(true)
        .interact_text()?;

    let group: String = Input::new()
        .with_prompt("Group")
        .default(config.default_group.clone())
        .interact_text()?;

    config.expand_multipart = Confirm::new()
        .with_prompt("Split multi-part geometries into separate layers?")
        .default(config.expand_multipart)
        .interact()?;

    let output: String = Input::new()
        .with_prompt("Output file (blank for stdout)")
        .allow_empty(true)
        .interact_text()?;

    let mut metadata = ImportMetadata::new(Pillar::all()[pillar_idx]).with_group(group);
    if !name.trim().is_empty() {
        metadata = metadata.with_name(name.trim());
    }

    let layers = commands::import_files(multi, &files, &metadata, config).await?;

    let output = Some(output.trim())
        .filter(|path| !path.is_empty())
        .map(PathBuf::from);
    commands::write_layers(&layers, output.as_deref()).await?;

    Ok(())
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the ESG map layer importer.
//!
//! Converts KML, `GeoJSON`, zipped shapefiles, and coordinate CSVs into
//! map layers and writes them as JSON. Running without a subcommand opens
//! an interactive menu.

mod commands;
mod interactive;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use esg_map_layer::{ImportMetadata, Pillar};

#[derive(Parser)]
#[command(name = "esg_map", about = "Import geographic files as ESG map layers")]
struct Cli {
    /// Import config (TOML). Falls back to `ESG_MAP_CONFIG`, then the
    /// built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one or more files into layers
    Import {
        /// Files to import (.kml, .geojson, .json, .zip, .csv)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// ESG pillar for every layer (environmental, social, governance, operational)
        #[arg(long, value_parser = parse_pillar)]
        pillar: Pillar,
        /// Display name for the first layer of each file
        #[arg(long)]
        name: Option<String>,
        /// Group for every layer (defaults to the configured group)
        #[arg(long)]
        group: Option<String>,
        /// Emit one layer per part of multi-part geometries
        #[arg(long)]
        expand_multipart: bool,
        /// Write the layers here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List the supported file formats
    Formats,
    /// Report what a file would produce without writing anything
    Check {
        /// File to inspect
        file: PathBuf,
    },
    /// Print the layer color palette
    Palette,
}

fn parse_pillar(value: &str) -> Result<Pillar, String> {
    value.parse().map_err(|_| {
        let options: Vec<&str> = Pillar::all().iter().map(AsRef::as_ref).collect();
        format!("unknown pillar '{value}', expected one of: {}", options.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = esg_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = commands::load_config(cli.config.as_deref()).await?;

    let Some(command) = cli.command else {
        return interactive::run(&multi, config).await;
    };

    match command {
        Commands::Import {
            files,
            pillar,
            name,
            group,
            expand_multipart,
            output,
        } => {
            config.expand_multipart |= expand_multipart;

            let mut metadata = ImportMetadata::new(pillar);
            metadata.name = name;
            metadata.group = group;

            let layers = commands::import_files(&multi, &files, &metadata, config).await?;
            commands::write_layers(&layers, output.as_deref()).await?;
        }
        Commands::Formats => commands::print_formats(),
        Commands::Check { file } => commands::check_file(&file, config).await?,
        Commands::Palette => commands::print_palette(&config),
    }

    Ok(())
}

use crate::error::{ErrorKind, Result};
use clap::{Parser, Subcommand};
use exn::{OptionExt, ResultExt};
use std::io::Write;
use std::path::{Path, PathBuf};
use wallhub_catalog::{AssetId, AssetRecord, Catalog, classify};
use wallhub_config::Config;
use wallhub_package::container::Container;

#[derive(Parser, Debug)]
#[command(name = "wallhub", about = "Catalog of desktop wallpapers and engine packages", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Library directory, overriding the configured one
    #[arg(long, global = true)]
    pub library: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `wallhub_catalog=trace`
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every cataloged asset
    List {
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy files or engine packages into the library
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Remove an asset (and the library's copy of it)
    Remove { id: AssetId },
    /// Show one asset in detail
    Show { id: AssetId },
    /// Print the file that would be set as the background
    Target { id: AssetId },
    /// Re-read the catalog, dropping assets whose files are gone
    Reload,
    /// Register bundled engine packages in place (defaults to the configured directories)
    Bundled { directories: Vec<PathBuf> },
    /// Print what kind of asset a path would be cataloged as
    Classify { path: PathBuf },
    /// Inspect engine package containers
    #[command(subcommand)]
    Package(PackageCommand),
}

#[derive(Subcommand, Debug)]
pub enum PackageCommand {
    /// List the entries of a container
    List { container: PathBuf },
    /// Extract one entry
    Extract {
        container: PathBuf,
        name: String,
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

/// Apply the CLI overrides on top of the loaded configuration.
pub fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Some(library) = &cli.library {
        config.library = wallhub_config::absolute(library).or_raise(|| ErrorKind::Config)?;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = Some(level.clone());
    }
    Ok(config)
}

pub fn run(command: Command, config: &Config, out: &mut impl Write) -> Result<()> {
    match command {
        Command::List { json } => list(&open(config)?, json, out),
        Command::Add { paths } => {
            let mut catalog = open(config)?;
            for path in paths {
                let record = catalog.ingest(&path).or_raise(|| ErrorKind::Catalog)?;
                writeln!(out, "{}", row(&record)).or_raise(|| ErrorKind::Output)?;
            }
            Ok(())
        },
        Command::Remove { id } => {
            if !open(config)?.remove(id).or_raise(|| ErrorKind::Catalog)? {
                tracing::warn!(%id, "no such asset");
            }
            Ok(())
        },
        Command::Show { id } => {
            let catalog = open(config)?;
            let record = catalog.get(id).ok_or_raise(|| ErrorKind::UnknownAsset(id.to_string()))?;
            show(record, out).or_raise(|| ErrorKind::Output)
        },
        Command::Target { id } => {
            let catalog = open(config)?;
            let record = catalog.get(id).ok_or_raise(|| ErrorKind::UnknownAsset(id.to_string()))?;
            let target = record.apply_target().ok_or_raise(|| ErrorKind::NoTarget(id.to_string()))?;
            writeln!(out, "{}", target.display()).or_raise(|| ErrorKind::Output)
        },
        Command::Reload => {
            let mut catalog = open(config)?;
            let pruned = catalog.reload().or_raise(|| ErrorKind::Catalog)?;
            writeln!(out, "{} assets, {pruned} dropped", catalog.len()).or_raise(|| ErrorKind::Output)
        },
        Command::Bundled { directories } => {
            let mut catalog = open(config)?;
            let directories = if directories.is_empty() { config.bundled.clone() } else { directories };
            for directory in directories {
                for record in catalog.register_bundled(&directory).or_raise(|| ErrorKind::Catalog)? {
                    writeln!(out, "{}", row(&record)).or_raise(|| ErrorKind::Output)?;
                }
            }
            Ok(())
        },
        Command::Classify { path } => writeln!(out, "{}", classify(&path)).or_raise(|| ErrorKind::Output),
        Command::Package(command) => package(command, out),
    }
}

fn open(config: &Config) -> Result<Catalog> {
    Catalog::open(&config.library).or_raise(|| ErrorKind::Catalog)
}

fn list(catalog: &Catalog, json: bool, out: &mut impl Write) -> Result<()> {
    let records = catalog.list();
    if json {
        serde_json::to_writer_pretty(&mut *out, &*records).or_raise(|| ErrorKind::Output)?;
        return writeln!(out).or_raise(|| ErrorKind::Output);
    }
    for record in records.iter() {
        writeln!(out, "{}", row(record)).or_raise(|| ErrorKind::Output)?;
    }
    Ok(())
}

fn package(command: PackageCommand, out: &mut impl Write) -> Result<()> {
    match command {
        PackageCommand::List { container } => {
            let container = Container::open(&container).or_raise(|| ErrorKind::Package)?;
            for entry in container.entries() {
                let flag = if entry.is_compressed { "z" } else { "-" };
                writeln!(out, "{flag} {:>10} {:>10} {}", entry.stored_size, entry.uncompressed_size, entry.name)
                    .or_raise(|| ErrorKind::Output)?;
            }
        },
        PackageCommand::Extract { container, name, output } => {
            let mut opened = Container::open(&container).or_raise(|| ErrorKind::Package)?;
            let data = opened.extract_named(&name).or_raise(|| ErrorKind::Package)?;
            let data = data.ok_or_raise(|| ErrorKind::Package)?;
            match output {
                Some(path) => write_file(&path, &data)?,
                None => out.write_all(&data).or_raise(|| ErrorKind::Output)?,
            }
        },
    }
    Ok(())
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    std::fs::write(path, data).or_raise(|| ErrorKind::Output)
}

fn row(record: &AssetRecord) -> String {
    let resolution = record.resolution.map_or_else(|| "unknown".to_string(), |r| r.to_string());
    format!("{}  {:<14}  {:>13}  {:>12}  {}", record.id, record.asset_type.to_string(), resolution, record.byte_size, record.display_name)
}

fn show(record: &AssetRecord, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "ID: {}", record.id)?;
    writeln!(out, "Name: {}", record.display_name)?;
    writeln!(out, "Type: {}", record.asset_type)?;
    writeln!(out, "Path: {}", record.source_path.display())?;
    match record.resolution {
        Some(resolution) => writeln!(out, "Resolution: {resolution}")?,
        None => writeln!(out, "Resolution: unknown")?,
    }
    writeln!(out, "Size: {} bytes", record.byte_size)?;
    writeln!(out, "Added: {}", record.created_at)?;
    if !record.owned {
        writeln!(out, "Bundled: yes")?;
    }
    if let Some(package) = &record.package {
        write!(out, "{}", package.summary())?;
        for (key, property) in package.configurable_properties() {
            let value = property.value.as_ref().map(ToString::to_string).unwrap_or_default();
            writeln!(out, "  {key} ({}): {value}", property.kind.as_deref().unwrap_or("?"))?;
        }
    }
    Ok(())
}

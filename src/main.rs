use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use geo_flatten::{
    convert_with,
    settings::{default_settings_filepath, load_settings, Settings},
    sink::{persist, SqliteSink},
    source::fetch_source,
    ConvertOptions,
};

/// Convert a GeoJSON or KML document into feature and polygon tables.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL or local path of the document. Taken from the settings file when omitted.
    source: Option<String>,
    /// Path to the settings file, ~/allSettings.json by default.
    #[arg(short, long)]
    settings_filepath: Option<PathBuf>,
    /// SQLite database to write the tables to.
    #[arg(short, long)]
    database: Option<PathBuf>,
}

fn read_settings(args: &Args) -> anyhow::Result<Settings> {
    let filepath = match &args.settings_filepath {
        Some(filepath) => filepath.clone(),
        None => default_settings_filepath()?,
    };
    // The settings file is only required when it has to supply the source.
    if args.source.is_some() && args.settings_filepath.is_none() && !filepath.exists() {
        return Ok(Settings::default());
    }
    load_settings(&filepath)
}

fn try_main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = read_settings(&args)?;

    let source = match args.source.clone().or(settings.source_url.clone()) {
        Some(source) => source,
        None => return Err(anyhow!("No source given and no source-url in the settings")),
    };
    let database = args.database.clone().unwrap_or(settings.database.clone());

    let raw = fetch_source(&source)?;
    let options = ConvertOptions {
        polygon_indexing: settings.polygon_indexing,
    };
    let conversion = convert_with(&raw, &options)?;
    log::info!(
        "Read {} document with {} features and {} polygon vertices",
        conversion.format,
        conversion.features.len(),
        conversion.polygons.len()
    );
    let diagnostics = conversion.diagnostics;
    if diagnostics.malformed_geometries > 0 || diagnostics.unsupported_geometries > 0 {
        log::warn!(
            "Skipped {} malformed and {} unsupported geometries",
            diagnostics.malformed_geometries,
            diagnostics.unsupported_geometries
        );
    }

    log::info!("Writing tables to {:?}", database);
    let mut sink = SqliteSink::open(&database)?;
    persist(&conversion, &mut sink)?;
    Ok(())
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    env_logger::init();
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}

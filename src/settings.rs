use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::geometry::PolygonIndexing;

pub const SETTINGS_FILENAME: &str = "allSettings.json";
pub const DEFAULT_DATABASE: &str = "scraperwiki.sqlite";

fn default_database() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE)
}

/// Settings shared with the hosting platform. JSON is read as YAML.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    pub source_url: Option<String>,
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default)]
    pub polygon_indexing: PolygonIndexing,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_url: None,
            database: default_database(),
            polygon_indexing: PolygonIndexing::default(),
        }
    }
}

/// `~/allSettings.json`.
pub fn default_settings_filepath() -> anyhow::Result<PathBuf> {
    let home = std::env::var_os("HOME").ok_or_else(|| anyhow!("HOME is not set"))?;
    Ok(PathBuf::from(home).join(SETTINGS_FILENAME))
}

pub fn load_settings(filepath: &Path) -> anyhow::Result<Settings> {
    if !filepath.exists() {
        return Err(anyhow!("Settings file {:?} not found", filepath));
    }
    let contents = read_to_string(filepath)
        .with_context(|| format!("Reading settings file {:?}", filepath))?;
    let settings: Settings = serde_yaml::from_str(&contents)
        .with_context(|| format!("Parsing settings file {:?}", filepath))?;
    Ok(settings)
}

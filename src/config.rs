use crate::data;
use crate::types::GeographySource;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub panel: PanelConfig,
    #[serde(default)]
    pub input: InputConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

/// Map settings as stored on disk; geography sources are referenced by path.
#[derive(Debug, Deserialize, Clone)]
pub struct PanelConfig {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom_level: f64,
    #[serde(default)]
    pub tile_url1: String,
    #[serde(default)]
    pub tile_url2: String,
    pub geojson1: Option<PathBuf>,
    pub geojson2: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct InputConfig {
    pub series: Option<PathBuf>, // JSON array of host data frames
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub layer_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_static_dir() -> PathBuf {
    PathBuf::from(".")
}

/// The options object the settings editor hands to the panel.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct PanelOptions {
    pub center_lat: f64,
    pub center_lon: f64,
    #[serde(default)]
    pub tile_url1: String,
    #[serde(default)]
    pub tile_url2: String,
    pub zoom_level: f64,
    #[serde(default)]
    pub geojson1: Option<GeographySource>,
    #[serde(default)]
    pub geojson2: Option<GeographySource>,
}

impl PanelOptions {
    /// Both floors, or nothing: heat layers need the pair.
    pub fn geography(&self) -> Option<(&GeographySource, &GeographySource)> {
        self.geojson1.as_ref().zip(self.geojson2.as_ref())
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Reads the referenced GeoJSON files into the editor's options shape.
    pub fn panel_options(&self) -> Result<PanelOptions> {
        let panel = &self.panel;
        let load = |path: &Option<PathBuf>| -> Result<Option<GeographySource>> {
            path.as_deref().map(data::load_geography).transpose()
        };

        Ok(PanelOptions {
            center_lat: panel.center_lat,
            center_lon: panel.center_lon,
            tile_url1: panel.tile_url1.clone(),
            tile_url2: panel.tile_url2.clone(),
            zoom_level: panel.zoom_level,
            geojson1: load(&panel.geojson1)?,
            geojson2: load(&panel.geojson2)?,
        })
    }
}

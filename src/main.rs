pub mod color;
pub mod config;
pub mod data;
pub mod processing;
pub mod projection;
pub mod render;
pub mod server;
pub mod state;
pub mod types;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use geojson::{FeatureCollection, GeoJson};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the four heat layers and write them as GeoJSON
    Build {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the panel state over HTTP
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print the metrics of one location, as shown when it is clicked
    Inspect {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long)]
        name: String,
    },
}

/// Loads options and series and runs them through the reducer.
fn initial_state(app_config: &config::AppConfig) -> Result<state::RenderState> {
    let options = app_config.panel_options()?;
    let series = match &app_config.input.series {
        Some(path) => data::load_series(path)?,
        None => Vec::new(),
    };

    Ok(state::RenderState::new(options).reduce(state::Action::DataArrived(series)))
}

fn write_layers(render: &state::RenderState, layer_dir: &Path) -> Result<()> {
    let layers = render
        .layers
        .as_ref()
        .ok_or_else(|| anyhow!("No layers built: both geojson1 and geojson2 and a series file are required"))?;

    fs::create_dir_all(layer_dir).context("Failed to create layer directory")?;

    for layer in layers.iter() {
        if layer.is_empty() {
            warn!("Layer {} has no polygons", layer.id);
        }
        let path = layer_dir.join(format!("{}.geojson", layer.id));
        let collection = GeoJson::from(FeatureCollection::from(layer));
        fs::write(&path, collection.to_string())
            .with_context(|| format!("Failed to write layer {:?}", path))?;
        info!("Wrote {} polygons to {:?}", layer.polygons.len(), path);
    }

    let metrics_path = layer_dir.join("metrics.json");
    fs::write(&metrics_path, serde_json::to_string_pretty(&*render.metrics)?)
        .with_context(|| format!("Failed to write {:?}", metrics_path))?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Build { config } => {
            info!("Building layers with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            let render = initial_state(&app_config)?;
            write_layers(&render, &app_config.output.layer_dir)?;
            info!("Build complete!");
        }
        Commands::Serve { config } => {
            info!("Serving panel with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            let render = initial_state(&app_config)?;
            server::start_server(app_config, render).await?;
        }
        Commands::Inspect { config, name } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let render = initial_state(&app_config)?;
            let selection = state::Selection::lookup(&render.metrics, name);
            println!("{}", serde_json::to_string_pretty(&selection)?);
        }
    }

    Ok(())
}

use crate::types::{Footprint, GeographySource, LocationFeature, Series};
use anyhow::{anyhow, Context, Result};
use geojson::{Feature, FeatureCollection, GeoJson, Value};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

/// A data frame as the dashboard host delivers it.
#[derive(Debug, Clone, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Vec<FrameField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameField {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
}

impl From<Frame> for Series {
    // Only the first field carries the metric; anything non-numeric counts as 0.
    fn from(frame: Frame) -> Self {
        let values = frame
            .fields
            .into_iter()
            .next()
            .map(|field| {
                field
                    .values
                    .iter()
                    .map(|v| v.as_f64().unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();

        Series {
            name: frame.name,
            values,
        }
    }
}

pub fn frames_to_series(frames: Vec<Frame>) -> Vec<Series> {
    frames.into_iter().map(Series::from).collect()
}

pub fn load_series(path: &Path) -> Result<Vec<Series>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open series file: {:?}", path))?;
    let frames: Vec<Frame> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse data frames in {:?}", path))?;

    let series = frames_to_series(frames);
    info!("Loaded {} series from {:?}", series.len(), path);
    Ok(series)
}

pub fn load_geography(path: &Path) -> Result<GeographySource> {
    info!("Loading GeoJSON from {:?}...", path);
    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let geojson = GeoJson::from_reader(BufReader::new(file)).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let source = GeographySource::from(collection);
    info!("Loaded {} locations from {:?}", source.features.len(), path);
    Ok(source)
}

fn geometry_kind(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn location_from_feature(feature: Feature) -> Result<LocationFeature> {
    let name = match feature.property("name") {
        Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
        Some(serde_json::Value::String(_)) | None => return Err(anyhow!("feature has no name")),
        Some(other) => return Err(anyhow!("feature name is not a string: {}", other)),
    };

    let geometry = feature
        .geometry
        .ok_or_else(|| anyhow!("feature '{}' has no geometry", name))?;

    let footprint = match geometry.value {
        Value::Polygon(_) => {
            let polygon: geo::Polygon<f64> = geometry
                .value
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygon '{}': {:?}", name, e))?;
            Footprint::Polygon(polygon)
        }
        Value::LineString(_) => {
            let line: geo::LineString<f64> = geometry
                .value
                .try_into()
                .map_err(|e| anyhow!("Failed to convert line string '{}': {:?}", name, e))?;
            Footprint::LineString(line)
        }
        other => {
            return Err(anyhow!(
                "feature '{}' has unsupported geometry {}",
                name,
                geometry_kind(&other)
            ))
        }
    };

    Ok(LocationFeature {
        name,
        footprint,
        properties: feature.properties,
    })
}

impl From<FeatureCollection> for GeographySource {
    fn from(collection: FeatureCollection) -> Self {
        let mut features = Vec::with_capacity(collection.features.len());

        for feature in collection.features {
            match location_from_feature(feature) {
                Ok(location) => features.push(location),
                Err(e) => warn!("Skipping feature: {:#}", e),
            }
        }

        GeographySource { features }
    }
}

impl<'de> Deserialize<'de> for GeographySource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        FeatureCollection::deserialize(deserializer).map(GeographySource::from)
    }
}

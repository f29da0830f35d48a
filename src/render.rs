use crate::color::{percentage_to_hsla, Hsla, NEUTRAL};
use crate::projection::project_polygon;
use crate::types::{
    DisplayMetric, Floor, FloorLayers, GeographySource, LayerId, LocationFeature, MetricMap,
    RenderedLayer, StyledPolygon,
};
use geojson::{Feature, FeatureCollection, JsonObject};
use std::collections::HashMap;
use tracing::debug;

// Floor tiles sit at 1, the heat overlay above them
pub const HEAT_LAYER_Z_INDEX: i32 = 2;

/// Min/max of log2 values for one metric over one geography source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogScale {
    pub min: f64,
    pub max: f64,
}

impl LogScale {
    /// `None` when no value is finite.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |scale, v| match scale {
                None => Some(LogScale { min: v, max: v }),
                Some(LogScale { min, max }) => Some(LogScale {
                    min: min.min(v),
                    max: max.max(v),
                }),
            })
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn color(&self, log_value: f64) -> Hsla {
        let range = self.range();
        if range == 0.0 || !log_value.is_finite() {
            return NEUTRAL;
        }
        percentage_to_hsla((log_value - self.min) / range)
    }
}

/// Present and non-zero. NaN counts as present and is drawn neutral.
fn has_value(data: &MetricMap, name: &str) -> bool {
    data.get(name).is_some_and(|v| *v != 0.0)
}

fn log2_of(data: &MetricMap, name: &str) -> f64 {
    data.get(name).map_or(f64::NAN, |v| v.log2())
}

fn styled_polygon(feature: &LocationFeature, fill: Hsla) -> StyledPolygon {
    StyledPolygon {
        name: feature.name.clone(),
        geometry: project_polygon(&feature.footprint.to_polygon()),
        fill,
    }
}

/// Net and quantity polygons for one floor.
pub fn produce_features(
    net: &MetricMap,
    quantity: &MetricMap,
    geo: &GeographySource,
) -> (Vec<StyledPolygon>, Vec<StyledPolygon>) {
    let matching: Vec<&LocationFeature> = geo
        .features
        .iter()
        .filter(|f| has_value(net, &f.name))
        .collect();

    // Map<LocationName, (NetLog2, QuantityLog2)>, first occurrence wins
    let mut logs: HashMap<&str, (f64, f64)> = HashMap::new();
    for feature in &matching {
        logs.entry(feature.name.as_str())
            .or_insert_with(|| (log2_of(net, &feature.name), log2_of(quantity, &feature.name)));
    }

    if logs.is_empty() {
        return (Vec::new(), Vec::new());
    }

    // None when every value is non-finite, which renders neutral
    let net_scale = LogScale::from_values(logs.values().map(|(n, _)| *n));
    let quan_scale = LogScale::from_values(logs.values().map(|(_, q)| *q));

    let mut net_polygons = Vec::with_capacity(matching.len());
    let mut quan_polygons = Vec::with_capacity(matching.len());

    for feature in matching {
        let (net_log, quan_log) = logs[feature.name.as_str()];

        let net_fill = net_scale.map_or(NEUTRAL, |s| s.color(net_log));
        let quan_fill = quan_scale.map_or(NEUTRAL, |s| s.color(quan_log));

        net_polygons.push(styled_polygon(feature, net_fill));
        quan_polygons.push(styled_polygon(feature, quan_fill));
    }

    (net_polygons, quan_polygons)
}

fn heat_layer(floor: Floor, metric: DisplayMetric, polygons: Vec<StyledPolygon>) -> RenderedLayer {
    RenderedLayer {
        id: LayerId { floor, metric },
        z_index: HEAT_LAYER_Z_INDEX,
        polygons,
    }
}

pub fn build_layers(
    net: &MetricMap,
    quantity: &MetricMap,
    geo1: &GeographySource,
    geo2: &GeographySource,
) -> FloorLayers {
    let (net_polygon1, quan_polygon1) = produce_features(net, quantity, geo1);
    let (net_polygon2, quan_polygon2) = produce_features(net, quantity, geo2);

    debug!(
        "Built heat layers: floor 0 has {} polygons, floor 1 has {}",
        net_polygon1.len(),
        net_polygon2.len()
    );

    FloorLayers {
        net1: heat_layer(Floor::Ground, DisplayMetric::NetValue, net_polygon1),
        quan1: heat_layer(Floor::Ground, DisplayMetric::Quantity, quan_polygon1),
        net2: heat_layer(Floor::First, DisplayMetric::NetValue, net_polygon2),
        quan2: heat_layer(Floor::First, DisplayMetric::Quantity, quan_polygon2),
    }
}

impl From<&StyledPolygon> for Feature {
    fn from(polygon: &StyledPolygon) -> Self {
        let mut feature = Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&polygon.geometry))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        feature.set_property("name", polygon.name.clone());
        feature.set_property("type", "Polygon");
        feature.set_property("fill", polygon.fill.to_string());
        feature
    }
}

impl From<&RenderedLayer> for FeatureCollection {
    fn from(layer: &RenderedLayer) -> Self {
        let mut foreign_members = JsonObject::new();
        foreign_members.insert("layer".to_string(), layer.id.to_string().into());
        foreign_members.insert("zIndex".to_string(), layer.z_index.into());

        FeatureCollection {
            bbox: None,
            features: layer.polygons.iter().map(Feature::from).collect(),
            foreign_members: Some(foreign_members),
        }
    }
}

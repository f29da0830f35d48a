use crate::color::Hsla;
use geo::{LineString, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One numeric column delivered by the host, named by the prefix convention.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: Option<String>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: Some(name.into()),
            values,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    NetValue,
    Quantity,
    Visitors,
}

// Map<LocationName, Value>
pub type MetricMap = HashMap<String, f64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedMetrics {
    pub net_value: MetricMap,
    pub quantity: MetricMap,
    pub visitors: MetricMap,
}

impl AggregatedMetrics {
    pub fn bucket_mut(&mut self, kind: MetricKind) -> &mut MetricMap {
        match kind {
            MetricKind::NetValue => &mut self.net_value,
            MetricKind::Quantity => &mut self.quantity,
            MetricKind::Visitors => &mut self.visitors,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.net_value.is_empty() && self.quantity.is_empty() && self.visitors.is_empty()
    }
}

/// Boundary of a location in lon/lat. Line strings are promoted to a single
/// ring polygon when a layer is built.
#[derive(Debug, Clone, PartialEq)]
pub enum Footprint {
    Polygon(Polygon<f64>),
    LineString(LineString<f64>),
}

impl Footprint {
    pub fn to_polygon(&self) -> Polygon<f64> {
        match self {
            Footprint::Polygon(p) => p.clone(),
            Footprint::LineString(ls) => Polygon::new(ls.clone(), vec![]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationFeature {
    pub name: String,
    pub footprint: Footprint,
    pub properties: Option<geojson::JsonObject>,
}

/// Features of one floor, in file order. Duplicate names are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeographySource {
    pub features: Vec<LocationFeature>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Floor {
    #[default]
    Ground,
    First,
}

impl TryFrom<u8> for Floor {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Floor::from_index(index).ok_or_else(|| format!("no floor {}, expected 0 or 1", index))
    }
}

impl From<Floor> for u8 {
    fn from(floor: Floor) -> u8 {
        floor.index()
    }
}

impl Floor {
    pub fn index(self) -> u8 {
        match self {
            Floor::Ground => 0,
            Floor::First => 1,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Floor::Ground),
            1 => Some(Floor::First),
            _ => None,
        }
    }
}

/// Metrics that have a heat layer. Visitors are only shown on selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMetric {
    #[default]
    NetValue,
    Quantity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LayerId {
    pub floor: Floor,
    pub metric: DisplayMetric,
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metric = match self.metric {
            DisplayMetric::NetValue => "net",
            DisplayMetric::Quantity => "quantity",
        };
        write!(f, "{}_floor{}", metric, self.floor.index())
    }
}

/// A location polygon in EPSG:3857, tagged with its name for click lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledPolygon {
    pub name: String,
    pub geometry: Polygon<f64>,
    pub fill: Hsla,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedLayer {
    pub id: LayerId,
    pub z_index: i32,
    pub polygons: Vec<StyledPolygon>,
}

impl RenderedLayer {
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

/// The four layers built from one data refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct FloorLayers {
    pub net1: RenderedLayer,
    pub quan1: RenderedLayer,
    pub net2: RenderedLayer,
    pub quan2: RenderedLayer,
}

impl FloorLayers {
    pub fn get(&self, id: LayerId) -> &RenderedLayer {
        match (id.floor, id.metric) {
            (Floor::Ground, DisplayMetric::NetValue) => &self.net1,
            (Floor::Ground, DisplayMetric::Quantity) => &self.quan1,
            (Floor::First, DisplayMetric::NetValue) => &self.net2,
            (Floor::First, DisplayMetric::Quantity) => &self.quan2,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderedLayer> {
        [&self.net1, &self.quan1, &self.net2, &self.quan2].into_iter()
    }
}

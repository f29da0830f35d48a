//! Panel state as an immutable value.
//!
//! Every input (new data, new options, a toggle, a click) goes through
//! [`RenderState::reduce`], which returns a fresh state. The presentation side
//! compares two states with [`LayerSwap::between`] to learn which layer to
//! detach from the map and which to attach.

use crate::config::PanelOptions;
use crate::processing::aggregate;
use crate::projection::{extent_around, lon_lat_to_mercator};
use crate::render::build_layers;
use crate::types::{AggregatedMetrics, DisplayMetric, Floor, FloorLayers, LayerId, Series};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub const BASEMAP_URL: &str =
    "https://{1-4}.basemaps.cartocdn.com/rastertiles/voyager/{z}/{x}/{y}{r}.png";
pub const TILE_Z_INDEX: i32 = 1;
// Degrees around the center the view may pan
const VIEW_HALF_SPAN: f64 = 0.02;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggle {
    pub floor: Floor,
    pub metric: DisplayMetric,
}

impl Toggle {
    pub fn layer_id(&self) -> LayerId {
        LayerId {
            floor: self.floor,
            metric: self.metric,
        }
    }
}

/// What the map engine reports on click.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClickedFeature {
    pub name: String,
    #[serde(rename = "type")]
    pub geometry_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub name: String,
    pub net_value: Option<f64>,
    pub quantity: Option<f64>,
    pub visitors: Option<f64>,
}

impl Selection {
    pub fn lookup(metrics: &AggregatedMetrics, name: &str) -> Self {
        Selection {
            name: name.to_string(),
            net_value: metrics.net_value.get(name).copied(),
            quantity: metrics.quantity.get(name).copied(),
            visitors: metrics.visitors.get(name).copied(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    DataArrived(Vec<Series>),
    OptionsChanged(PanelOptions),
    FloorSelected(Floor),
    MetricSelected(DisplayMetric),
    FeatureClicked(Option<ClickedFeature>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub options: Arc<PanelOptions>,
    pub metrics: Arc<AggregatedMetrics>,
    /// `None` until both floors have geography and data has arrived.
    pub layers: Option<Arc<FloorLayers>>,
    pub toggle: Toggle,
    pub selection: Option<Selection>,
}

fn layers_for(options: &PanelOptions, metrics: &AggregatedMetrics) -> Option<Arc<FloorLayers>> {
    if metrics.is_empty() {
        return None;
    }
    let (geo1, geo2) = options.geography()?;
    Some(Arc::new(build_layers(
        &metrics.net_value,
        &metrics.quantity,
        geo1,
        geo2,
    )))
}

impl RenderState {
    pub fn new(options: PanelOptions) -> Self {
        RenderState {
            options: Arc::new(options),
            metrics: Arc::new(AggregatedMetrics::default()),
            layers: None,
            toggle: Toggle::default(),
            selection: None,
        }
    }

    pub fn reduce(&self, action: Action) -> RenderState {
        match action {
            Action::DataArrived(series) if series.is_empty() => {
                info!("Data cleared, resetting panel");
                RenderState::new((*self.options).clone())
            }
            Action::DataArrived(series) => {
                let metrics = aggregate(&series);
                let layers = layers_for(&self.options, &metrics);
                info!(
                    "Refreshed {} series into {} locations",
                    series.len(),
                    metrics.net_value.len()
                );
                let selection = self
                    .selection
                    .as_ref()
                    .map(|s| Selection::lookup(&metrics, &s.name));
                RenderState {
                    metrics: Arc::new(metrics),
                    layers,
                    selection,
                    ..self.clone()
                }
            }
            Action::OptionsChanged(options) => {
                let layers = layers_for(&options, &self.metrics);
                RenderState {
                    options: Arc::new(options),
                    layers,
                    ..self.clone()
                }
            }
            Action::FloorSelected(floor) if floor == self.toggle.floor => self.clone(),
            Action::FloorSelected(floor) => RenderState {
                toggle: Toggle { floor, ..self.toggle },
                selection: None,
                ..self.clone()
            },
            Action::MetricSelected(metric) => RenderState {
                toggle: Toggle { metric, ..self.toggle },
                ..self.clone()
            },
            Action::FeatureClicked(clicked) => {
                let selection = clicked
                    .filter(|c| c.geometry_type == "Polygon")
                    .map(|c| Selection::lookup(&self.metrics, &c.name));
                debug!("Selection is now {:?}", selection.as_ref().map(|s| &s.name));
                RenderState {
                    selection,
                    ..self.clone()
                }
            }
        }
    }

    pub fn active_layer_id(&self) -> Option<LayerId> {
        self.layers.as_ref().map(|_| self.toggle.layer_id())
    }

    /// Tile template for the selected floor; empty URLs mean no tile layer.
    pub fn floor_tile_url(&self) -> Option<&str> {
        let url = match self.toggle.floor {
            Floor::Ground => &self.options.tile_url1,
            Floor::First => &self.options.tile_url2,
        };
        Some(url.as_str()).filter(|u| !u.is_empty())
    }

    pub fn view(&self) -> MapView {
        let options = &self.options;
        let center = lon_lat_to_mercator(options.center_lon, options.center_lat);
        MapView {
            center: [center.x, center.y],
            zoom: options.zoom_level,
            extent: extent_around(options.center_lon, options.center_lat, VIEW_HALF_SPAN),
            basemap_url: BASEMAP_URL.to_string(),
            floor_tiles: self.floor_tile_url().map(|url| TileLayer {
                url: url.to_string(),
                z_index: TILE_Z_INDEX,
            }),
            toggle: self.toggle,
            active_layer: self.active_layer_id().map(|id| id.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayer {
    pub url: String,
    pub z_index: i32,
}

/// Everything the map widget needs besides the heat polygons, in EPSG:3857.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: [f64; 2],
    pub zoom: f64,
    pub extent: [f64; 4],
    pub basemap_url: String,
    pub floor_tiles: Option<TileLayer>,
    pub toggle: Toggle,
    pub active_layer: Option<String>,
}

/// Layer changes to apply to the live map when moving between two states.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSwap {
    pub detach: Option<LayerId>,
    pub attach: Option<LayerId>,
    /// Set when the floor tile layer must be replaced; the inner value is the new URL.
    pub tiles: Option<Option<String>>,
}

impl LayerSwap {
    pub fn between(prev: &RenderState, next: &RenderState) -> Self {
        let same_layers = match (&prev.layers, &next.layers) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        let prev_id = prev.active_layer_id();
        let next_id = next.active_layer_id();

        let (detach, attach) = if same_layers && prev_id == next_id {
            (None, None)
        } else {
            (prev_id, next_id)
        };

        let prev_tiles = prev.floor_tile_url();
        let next_tiles = next.floor_tile_url();
        let tiles = (prev.toggle.floor != next.toggle.floor || prev_tiles != next_tiles)
            .then(|| next_tiles.map(str::to_string));

        LayerSwap {
            detach,
            attach,
            tiles,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.detach.is_none() && self.attach.is_none() && self.tiles.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::NEUTRAL;
    use crate::types::{Footprint, GeographySource, LocationFeature};
    use geo::polygon;

    fn floor_of(names: &[&str]) -> GeographySource {
        GeographySource {
            features: names
                .iter()
                .map(|n| LocationFeature {
                    name: n.to_string(),
                    footprint: Footprint::Polygon(polygon![
                        (x: 0.0, y: 0.0),
                        (x: 0.001, y: 0.0),
                        (x: 0.001, y: 0.001),
                    ]),
                    properties: None,
                })
                .collect(),
        }
    }

    fn options() -> PanelOptions {
        PanelOptions {
            center_lat: 53.3498,
            center_lon: -6.2603,
            tile_url1: "floor0/{z}/{x}/{y}.png".to_string(),
            tile_url2: String::new(),
            zoom_level: 18.0,
            geojson1: Some(floor_of(&["A", "B"])),
            geojson2: Some(floor_of(&["B"])),
        }
    }

    fn series() -> Vec<Series> {
        vec![
            Series::new("_A", vec![10.0, 20.0]),
            Series::new("0_A", vec![1.0, 2.0, 3.0]),
            Series::new("B", vec![5.0]),
        ]
    }

    fn click(name: &str) -> Action {
        Action::FeatureClicked(Some(ClickedFeature {
            name: name.to_string(),
            geometry_type: "Polygon".to_string(),
        }))
    }

    #[test]
    fn data_builds_all_layers() {
        let state = RenderState::new(options()).reduce(Action::DataArrived(series()));
        let layers = state.layers.as_ref().unwrap();
        assert_eq!(layers.net1.polygons.len(), 1);
        assert_eq!(layers.net1.polygons[0].fill, NEUTRAL);
        assert_eq!(layers.quan1.polygons.len(), 1);
        assert!(layers.net2.is_empty());
        assert_eq!(state.active_layer_id().unwrap().to_string(), "net_floor0");
    }

    #[test]
    fn no_layers_without_both_floors() {
        let mut opts = options();
        opts.geojson2 = None;
        let state = RenderState::new(opts).reduce(Action::DataArrived(series()));
        assert!(state.layers.is_none());
        assert_eq!(state.metrics.net_value["A"], 30.0);
    }

    #[test]
    fn click_reports_all_metrics() {
        let state = RenderState::new(options())
            .reduce(Action::DataArrived(series()))
            .reduce(click("A"));
        assert_eq!(
            state.selection,
            Some(Selection {
                name: "A".to_string(),
                net_value: Some(30.0),
                quantity: Some(6.0),
                visitors: None,
            })
        );
    }

    #[test]
    fn clicking_nothing_or_a_line_clears_selection() {
        let selected = RenderState::new(options())
            .reduce(Action::DataArrived(series()))
            .reduce(click("A"));
        assert!(selected.reduce(Action::FeatureClicked(None)).selection.is_none());

        let line = Action::FeatureClicked(Some(ClickedFeature {
            name: "A".to_string(),
            geometry_type: "LineString".to_string(),
        }));
        assert!(selected.reduce(line).selection.is_none());
    }

    #[test]
    fn floor_change_swaps_layer_and_tiles() {
        let before = RenderState::new(options())
            .reduce(Action::DataArrived(series()))
            .reduce(click("A"));
        let after = before.reduce(Action::FloorSelected(Floor::First));

        assert!(after.selection.is_none());
        let swap = LayerSwap::between(&before, &after);
        assert_eq!(swap.detach.unwrap().to_string(), "net_floor0");
        assert_eq!(swap.attach.unwrap().to_string(), "net_floor1");
        // floor 1 has no tile url
        assert_eq!(swap.tiles, Some(None));
    }

    #[test]
    fn same_floor_is_a_noop() {
        let before = RenderState::new(options())
            .reduce(Action::DataArrived(series()))
            .reduce(click("A"));
        let after = before.reduce(Action::FloorSelected(Floor::Ground));
        assert_eq!(after, before);
        assert!(LayerSwap::between(&before, &after).is_noop());
    }

    #[test]
    fn metric_change_keeps_selection() {
        let before = RenderState::new(options())
            .reduce(Action::DataArrived(series()))
            .reduce(click("A"));
        let after = before.reduce(Action::MetricSelected(DisplayMetric::Quantity));
        assert!(after.selection.is_some());

        let swap = LayerSwap::between(&before, &after);
        assert_eq!(swap.attach.unwrap().to_string(), "quantity_floor0");
        assert_eq!(swap.tiles, None);
    }

    #[test]
    fn new_data_reattaches_fresh_layers() {
        let before = RenderState::new(options()).reduce(Action::DataArrived(series()));
        let after = before.reduce(Action::DataArrived(series()));
        let swap = LayerSwap::between(&before, &after);
        assert_eq!(swap.detach, swap.attach);
        assert!(swap.attach.is_some());
    }

    #[test]
    fn empty_data_resets_everything() {
        let state = RenderState::new(options())
            .reduce(Action::DataArrived(series()))
            .reduce(Action::FloorSelected(Floor::First))
            .reduce(Action::MetricSelected(DisplayMetric::Quantity))
            .reduce(Action::DataArrived(Vec::new()));
        assert_eq!(state.toggle, Toggle::default());
        assert!(state.layers.is_none());
        assert!(state.selection.is_none());
        assert!(state.metrics.is_empty());
    }

    #[test]
    fn options_change_rebuilds_from_cached_metrics() {
        let state = RenderState::new(PanelOptions {
            geojson1: None,
            ..options()
        })
        .reduce(Action::DataArrived(series()));
        assert!(state.layers.is_none());

        let state = state.reduce(Action::OptionsChanged(options()));
        assert_eq!(state.layers.unwrap().net1.polygons.len(), 1);
    }

    #[test]
    fn view_is_projected() {
        let view = RenderState::new(options()).view();
        assert!((view.center[0] - -696893.41).abs() < 1.0);
        assert_eq!(view.floor_tiles.unwrap().z_index, TILE_Z_INDEX);
        assert!(view.extent[0] < view.center[0] && view.center[0] < view.extent[2]);
        assert!(view.active_layer.is_none());
    }

    #[test]
    fn reduce_does_not_touch_previous_state() {
        let first = RenderState::new(options()).reduce(Action::DataArrived(series()));
        let snapshot = first.clone();
        let _ = first.reduce(Action::DataArrived(vec![Series::new("_B", vec![4.0])]));
        assert_eq!(first, snapshot);
    }

    #[test]
    fn refresh_updates_the_selected_values() {
        let state = RenderState::new(options())
            .reduce(Action::DataArrived(series()))
            .reduce(click("A"))
            .reduce(Action::DataArrived(vec![Series::new("_A", vec![99.0])]));
        let selection = state.selection.unwrap();
        assert_eq!(selection.name, "A");
        assert_eq!(selection.net_value, Some(99.0));
        assert_eq!(selection.quantity, None);
    }
}

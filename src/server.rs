use crate::config::{AppConfig, PanelOptions};
use crate::data::{frames_to_series, Frame};
use crate::state::{Action, ClickedFeature, LayerSwap, MapView, RenderState, Selection};
use crate::types::{DisplayMetric, Floor, LayerId};
use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, info};

/// Holds the current state; every request replaces it wholesale.
pub struct AppState {
    pub render: RwLock<RenderState>,
}

type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(render: RenderState) -> SharedState {
        Arc::new(AppState {
            render: RwLock::new(render),
        })
    }

    async fn apply(&self, action: Action) -> LayerSwap {
        self.apply_all([action]).await.0
    }

    /// Reduces every action under one write guard and returns the swap
    /// together with the state that was stored.
    async fn apply_all(&self, actions: impl IntoIterator<Item = Action>) -> (LayerSwap, RenderState) {
        let mut current = self.render.write().await;
        let next = actions
            .into_iter()
            .fold(current.clone(), |state, action| state.reduce(action));
        let swap = LayerSwap::between(&current, &next);
        if !swap.is_noop() {
            debug!("Swapping layers: {:?}", swap);
        }
        *current = next.clone();
        (swap, next)
    }
}

#[derive(Deserialize, Default)]
pub struct ToggleRequest {
    floor: Option<Floor>,
    metric: Option<DisplayMetric>,
}

#[derive(Deserialize)]
pub struct SelectRequest {
    feature: Option<ClickedFeature>,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    series: usize,
    swap: LayerSwap,
}

pub fn router(state: SharedState, static_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/api/view", get(view_handler))
        .route("/api/layer", get(active_layer_handler))
        .route("/api/layers/:floor/:metric", get(layer_handler))
        .route("/api/series", post(series_handler))
        .route("/api/options", post(options_handler))
        .route("/api/toggle", post(toggle_handler))
        .route("/api/select", post(select_handler))
        .route("/api/selection", get(selection_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, render: RenderState) -> Result<()> {
    let state = AppState::new(render);

    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    info!("Starting server on http://{}", addr);

    let app = router(state, &config.server.static_dir);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn view_handler(State(state): State<SharedState>) -> Json<MapView> {
    Json(state.render.read().await.view())
}

fn layer_collection(render: &RenderState, id: LayerId) -> FeatureCollection {
    match &render.layers {
        Some(layers) => FeatureCollection::from(layers.get(id)),
        None => FeatureCollection {
            bbox: None,
            features: Vec::new(),
            foreign_members: None,
        },
    }
}

async fn active_layer_handler(State(state): State<SharedState>) -> Json<FeatureCollection> {
    let render = state.render.read().await;
    Json(layer_collection(&render, render.toggle.layer_id()))
}

async fn layer_handler(
    State(state): State<SharedState>,
    Path((floor, metric)): Path<(u8, DisplayMetric)>,
) -> Result<Json<FeatureCollection>, StatusCode> {
    let floor = Floor::from_index(floor).ok_or(StatusCode::NOT_FOUND)?;
    let render = state.render.read().await;
    Ok(Json(layer_collection(&render, LayerId { floor, metric })))
}

async fn series_handler(
    State(state): State<SharedState>,
    Json(frames): Json<Vec<Frame>>,
) -> Json<RefreshResponse> {
    let series = frames_to_series(frames);
    let count = series.len();
    let swap = state.apply(Action::DataArrived(series)).await;
    Json(RefreshResponse { series: count, swap })
}

async fn options_handler(
    State(state): State<SharedState>,
    Json(options): Json<PanelOptions>,
) -> Json<LayerSwap> {
    Json(state.apply(Action::OptionsChanged(options)).await)
}

async fn toggle_handler(
    State(state): State<SharedState>,
    Json(request): Json<ToggleRequest>,
) -> Json<LayerSwap> {
    let actions = request
        .floor
        .map(Action::FloorSelected)
        .into_iter()
        .chain(request.metric.map(Action::MetricSelected));
    let (swap, _) = state.apply_all(actions).await;
    Json(swap)
}

async fn select_handler(
    State(state): State<SharedState>,
    Json(request): Json<SelectRequest>,
) -> Json<Option<Selection>> {
    let (_, next) = state.apply_all([Action::FeatureClicked(request.feature)]).await;
    Json(next.selection)
}

async fn selection_handler(State(state): State<SharedState>) -> Json<Option<Selection>> {
    Json(state.render.read().await.selection.clone())
}

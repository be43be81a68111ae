//! HTTP API handlers with Axum

use std::sync::Arc;
use std::time::Duration;

use axum::{
    BoxError, Json, Router,
    error_handling::HandleErrorLayer,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    routing::{get, post},
};
use chrono::Utc;
use geo::Point;
use geojson::FeatureCollection;
use roadwatch_core::{NewObstacle, ObstacleKind, Severity};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower::{ServiceBuilder, limit::GlobalConcurrencyLimitLayer, timeout::TimeoutLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{field::Empty, info, instrument};

use crate::dto::{
    DeleteObstacleRequest, DeleteObstacleResponse, MapBoundary, NearestQuery, NodeView,
    ObstacleView, SaveObstacleRequest, ShortestPathRequest, ShortestPathResponse,
};
use crate::error::ApiError;
use crate::events::obstacle_events;
use crate::state::AppState;

/// Request limits applied to every route
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub request_timeout: Duration,
    pub concurrency_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            concurrency_limit: 64,
        }
    }
}

/// Build the Axum router
pub fn build_router(state: Arc<AppState>, limits: Limits) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let middleware = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_middleware_error))
        .layer(TimeoutLayer::new(limits.request_timeout))
        .layer(GlobalConcurrencyLimitLayer::new(limits.concurrency_limit));

    Router::new()
        .route("/nodes", get(nodes))
        .route("/edges", get(edges))
        .route("/nearest", get(nearest))
        .route("/shortest_path", post(shortest_path))
        .route("/get_obstacles", get(get_obstacles))
        .route("/save_obstacles", post(save_obstacles))
        .route("/delete_obstacle", post(delete_obstacle))
        .route("/map_boundary", get(map_boundary))
        .route("/obstacle_events", get(obstacle_events))
        .route("/health", get(health))
        .layer(middleware)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::Timeout
    } else {
        ApiError::Internal(err.to_string())
    }
}

async fn nodes(State(state): State<Arc<AppState>>) -> Json<FeatureCollection> {
    Json(state.engine.graph().nodes_geojson())
}

async fn edges(State(state): State<Arc<AppState>>) -> Json<FeatureCollection> {
    Json(state.engine.graph().edges_geojson())
}

async fn nearest(
    State(state): State<Arc<AppState>>,
    query: Result<Query<NearestQuery>, QueryRejection>,
) -> Result<Json<NodeView>, ApiError> {
    let Query(NearestQuery { lat, lon }) = query?;
    let id = state.engine.nearest(lat, lon)?;
    let node = state
        .engine
        .graph()
        .node(&id)
        .ok_or_else(|| roadwatch_core::Error::NodeNotFound(id.clone()))?;

    Ok(Json(NodeView {
        latitude: node.latitude(),
        longitude: node.longitude(),
        id,
    }))
}

#[instrument(skip_all, fields(source = Empty, destination = Empty))]
async fn shortest_path(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ShortestPathRequest>, JsonRejection>,
) -> Result<Json<ShortestPathResponse>, ApiError> {
    let Json(request) = payload?;
    let source = request.source.into_node_id();
    let destination = request.destination.into_node_id();
    tracing::Span::current()
        .record("source", source.as_str())
        .record("destination", destination.as_str());

    // Dropping the guard (client gone, request timed out) cancels the search
    let token = CancellationToken::new();
    let probe = token.clone();
    let _guard = token.drop_guard();

    let engine = Arc::clone(&state.engine);
    let result = tokio::task::spawn_blocking(move || {
        engine.shortest_path(&source, &destination, Utc::now(), || probe.is_cancelled())
    })
    .await??;

    info!(
        nodes = result.nodes.len(),
        explored = result.explored_edges.len(),
        cost = result.cost,
        "path found"
    );
    Ok(Json(result.into()))
}

async fn get_obstacles(State(state): State<Arc<AppState>>) -> Json<Vec<ObstacleView>> {
    let views = state
        .engine
        .overlay()
        .active_obstacles(Utc::now())
        .iter()
        .map(|obstacle| ObstacleView::new(obstacle, state.identity.as_ref()))
        .collect();
    Json(views)
}

async fn save_obstacles(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SaveObstacleRequest>, JsonRejection>,
) -> Result<Json<ObstacleView>, ApiError> {
    let Json(request) = payload?;

    let location = match (request.latitude, request.longitude) {
        (Some(latitude), Some(longitude)) => Some(Point::new(longitude, latitude)),
        _ => None,
    };
    let node_id = match (request.node_id, location) {
        (Some(id), _) => id.into_node_id(),
        (None, Some(point)) => {
            state
                .engine
                .snap(point.y(), point.x(), state.max_snap_distance_m)?
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "either node_id or latitude and longitude are required".to_string(),
            ));
        }
    };

    let report = NewObstacle {
        node_id,
        owner: request.owner,
        name: request.name,
        kind: request.kind.parse::<ObstacleKind>()?,
        severity: request.severity.parse::<Severity>()?,
        expected_duration: request.expected_duration.to_time_delta()?,
        comments: request.comments.unwrap_or_default(),
        image_url: request.image_url.filter(|url| !url.trim().is_empty()),
        location,
    };

    let obstacle = state.engine.overlay().add(report, Utc::now())?;
    info!(
        obstacle_id = %obstacle.id,
        node_id = %obstacle.node_id,
        severity = %obstacle.severity,
        "obstacle saved"
    );
    Ok(Json(ObstacleView::new(&obstacle, state.identity.as_ref())))
}

async fn delete_obstacle(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteObstacleRequest>, JsonRejection>,
) -> Result<Json<DeleteObstacleResponse>, ApiError> {
    let Json(request) = payload?;
    let id = request.id.into_node_id();

    let removed = state.engine.overlay().remove(&id, &request.owner)?;
    info!(obstacle_id = %removed.id, "obstacle deleted");

    Ok(Json(DeleteObstacleResponse {
        success: true,
        id: removed.id,
    }))
}

async fn map_boundary(State(state): State<Arc<AppState>>) -> Result<Json<MapBoundary>, ApiError> {
    let hull = state
        .engine
        .graph()
        .boundary()
        .ok_or(roadwatch_core::Error::EmptyGraph)?;

    let boundary = hull.exterior().coords().map(|c| [c.y, c.x]).collect();
    Ok(Json(MapBoundary { boundary }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let graph = state.engine.graph();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "nodes": graph.node_count(),
        "edges": graph.edge_count(),
    }))
}

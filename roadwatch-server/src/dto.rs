//! Wire types of the JSON API

use chrono::{DateTime, TimeDelta, Utc};
use roadwatch_core::model::obstacle::{format_duration, parse_duration};
use roadwatch_core::{NodeId, Obstacle, ObstacleKind, PathResult, Severity};
use serde::{Deserialize, Serialize};

use crate::identity::IdentityProvider;

/// Node ids arrive as strings or as the integer OSM ids older clients send
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Text(String),
    Number(i64),
}

impl WireId {
    pub fn into_node_id(self) -> NodeId {
        match self {
            WireId::Text(id) => id,
            WireId::Number(id) => id.to_string(),
        }
    }
}

/// `"H:MM:SS"` from the mobile form, or plain seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireDuration {
    Text(String),
    Seconds(i64),
}

impl WireDuration {
    pub fn to_time_delta(&self) -> Result<TimeDelta, roadwatch_core::Error> {
        match self {
            WireDuration::Text(raw) => parse_duration(raw),
            WireDuration::Seconds(seconds) => TimeDelta::try_seconds(*seconds).ok_or_else(|| {
                roadwatch_core::Error::InvalidObstacle(format!(
                    "invalid expected duration {seconds}"
                ))
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ShortestPathRequest {
    pub source: WireId,
    pub destination: WireId,
}

#[derive(Debug, Serialize)]
pub struct ShortestPathResponse {
    /// `[lat, lon]` pairs
    pub path: Vec<[f64; 2]>,
    pub explored: Vec<Vec<[f64; 2]>>,
    pub nodes: Vec<NodeId>,
    pub cost: f64,
}

impl From<PathResult> for ShortestPathResponse {
    fn from(result: PathResult) -> Self {
        Self {
            path: result.path_lat_lon(),
            explored: result.explored_lat_lon(),
            nodes: result.nodes,
            cost: result.cost,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NearestQuery {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct SaveObstacleRequest {
    #[serde(default)]
    pub node_id: Option<WireId>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub name: String,
    /// Parsed after deserialisation so unknown values surface as `INVALID_OBSTACLE`
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: String,
    pub expected_duration: WireDuration,
    #[serde(default)]
    pub comments: Option<String>,
    pub owner: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteObstacleRequest {
    pub id: WireId,
    pub owner: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteObstacleResponse {
    pub success: bool,
    pub id: String,
}

/// Obstacle as listed by `/get_obstacles` and pushed on the change feed
#[derive(Debug, Clone, Serialize)]
pub struct ObstacleView {
    pub id: String,
    pub node_id: NodeId,
    pub latitude: f64,
    pub longitude: f64,
    pub owner: String,
    pub owner_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ObstacleKind,
    pub severity: Severity,
    pub expected_duration: String,
    pub comments: String,
    pub created_at: DateTime<Utc>,
    pub image_url: Option<String>,
}

impl ObstacleView {
    pub fn new(obstacle: &Obstacle, identity: &dyn IdentityProvider) -> Self {
        Self {
            id: obstacle.id.clone(),
            node_id: obstacle.node_id.clone(),
            latitude: obstacle.location.y(),
            longitude: obstacle.location.x(),
            owner: obstacle.owner.clone(),
            owner_name: identity.name_or_id(&obstacle.owner),
            name: obstacle.name.clone(),
            kind: obstacle.kind,
            severity: obstacle.severity,
            expected_duration: format_duration(obstacle.expected_duration),
            comments: obstacle.comments.clone(),
            created_at: obstacle.created_at,
            image_url: obstacle.image_url.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MapBoundary {
    /// Closed ring of `[lat, lon]` pairs
    pub boundary: Vec<[f64; 2]>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

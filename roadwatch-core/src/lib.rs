//! Obstacle-aware routing over a static road graph.
//!
//! The road network is loaded once into an immutable [`RoadGraph`].
//! Users report obstacles at road nodes through the [`ObstacleOverlay`];
//! each search reads a consistent snapshot of it, so reports never
//! interfere with a search in flight.

pub mod distance;
pub mod engine;
pub mod error;
pub mod loading;
pub mod model;
pub mod obstacles;
pub mod prelude;
pub mod routing;
pub mod spatial;

pub use engine::{EngineConfig, RoutingEngine};
pub use error::Error;
pub use loading::{GraphSource, RoadGraphBuilder, load_road_graph, road_graph_from_geojson};
pub use model::{
    NewObstacle, Obstacle, ObstacleId, ObstacleKind, RoadEdge, RoadGraph, RoadNode, Severity,
    UserId,
};
pub use obstacles::{
    ObstacleEvent, ObstacleListener, ObstacleOverlay, ObstacleSnapshot, SeverityPolicy,
};
pub use routing::{PathResult, SearchStrategy, shortest_path};
pub use spatial::SpatialIndex;

/// Identifier of a road node as it appears in the dataset
pub type NodeId = String;
/// Edge weights and distances, in meters
pub type Meters = f64;

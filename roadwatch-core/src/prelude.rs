// Re-export key components
pub use crate::engine::{EngineConfig, RoutingEngine};
pub use crate::loading::{GraphSource, RoadGraphBuilder, load_road_graph};
pub use crate::obstacles::{ObstacleEvent, ObstacleListener, ObstacleOverlay, SeverityPolicy};
pub use crate::routing::{PathResult, SearchStrategy};

// Core types for the road network
pub use crate::Meters;
pub use crate::NodeId;
pub use crate::model::{RoadGraph, RoadNode};

// Core types for obstacle reports
pub use crate::model::{NewObstacle, Obstacle, ObstacleId, ObstacleKind, Severity, UserId};
pub use crate::model::obstacle::{format_duration, parse_duration};

pub use crate::Error;

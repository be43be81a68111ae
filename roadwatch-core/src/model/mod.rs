//! Data model for obstacle-aware road routing
//!
//! Contains the immutable road network and the obstacle records layered on top of it.

pub mod obstacle;
pub mod streets;

pub use obstacle::{NewObstacle, Obstacle, ObstacleId, ObstacleKind, Severity, UserId};
pub use streets::{RoadEdge, RoadGraph, RoadNode};

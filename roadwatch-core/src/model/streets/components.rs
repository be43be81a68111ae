//! Road network components - nodes and edges

use geo::{LineString, Point};

use crate::{Meters, NodeId};

/// Road graph node
#[derive(Debug, Clone)]
pub struct RoadNode {
    /// Dataset ID of the node
    pub id: NodeId,
    /// Node coordinates (x = longitude, y = latitude)
    pub geometry: Point<f64>,
}

impl RoadNode {
    pub fn new(id: impl Into<NodeId>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            geometry: Point::new(longitude, latitude),
        }
    }

    pub fn latitude(&self) -> f64 {
        self.geometry.y()
    }

    pub fn longitude(&self) -> f64 {
        self.geometry.x()
    }

    /// `(lat, lon)` pair as the client renders it
    pub fn lat_lon(&self) -> (f64, f64) {
        (self.geometry.y(), self.geometry.x())
    }
}

/// Directed road graph edge (street segment)
#[derive(Debug, Clone)]
pub struct RoadEdge {
    /// Base traversal cost in meters
    pub weight: Meters,
    /// Optional shape of the segment, oriented from source to target
    pub geometry: Option<LineString<f64>>,
}

use geo::Coord;

use crate::NodeId;

/// Outcome of one shortest path search
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    /// Node ids from source to destination inclusive
    pub nodes: Vec<NodeId>,
    /// Drawn path, x = longitude and y = latitude
    pub path: Vec<Coord<f64>>,
    /// Every edge relaxation made during the search, in order
    pub explored_edges: Vec<Vec<Coord<f64>>>,
    /// Sum of obstacle-weighted edge costs
    pub cost: f64,
}

impl PathResult {
    /// Path as `[lat, lon]` pairs, the order the client draws them in
    pub fn path_lat_lon(&self) -> Vec<[f64; 2]> {
        self.path.iter().map(|c| [c.y, c.x]).collect()
    }

    /// Explored edges as lists of `[lat, lon]` pairs
    pub fn explored_lat_lon(&self) -> Vec<Vec<[f64; 2]>> {
        self.explored_edges
            .iter()
            .map(|edge| edge.iter().map(|c| [c.y, c.x]).collect())
            .collect()
    }
}

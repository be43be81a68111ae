//! Road network model

pub mod components;
pub mod network;
mod to_geojson;

pub use components::{RoadEdge, RoadNode};
pub use network::RoadGraph;

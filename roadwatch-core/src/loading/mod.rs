//! This module is responsible for loading the road dataset
//! and building the immutable road graph.

mod builder;
mod config;
pub mod dataset;

pub use builder::{RoadGraphBuilder, load_road_graph, road_graph_from_geojson};
pub use config::GraphSource;

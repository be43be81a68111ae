//! Parsing raw road datasets: a GeoJSON feature collection of point nodes
//! (and optionally line edges) plus an optional CSV edge list

mod de;
mod parser;
mod raw_types;

pub use parser::{add_edge_list, add_features, parse_feature_collection};
pub use raw_types::FeedEdge;

//! Obstacle-aware point to point search over the road graph

mod result;
mod search;
mod state;

pub use result::PathResult;
pub use search::{SearchStrategy, shortest_path};

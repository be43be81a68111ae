//! Routing algorithms

pub mod pathfinder;

pub use pathfinder::{PathResult, SearchStrategy, shortest_path};

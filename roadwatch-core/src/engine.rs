//! Facade tying the graph, spatial index and obstacle overlay together

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;

use crate::loading::{GraphSource, load_road_graph};
use crate::obstacles::{ObstacleOverlay, SeverityPolicy};
use crate::routing::{PathResult, SearchStrategy, shortest_path};
use crate::spatial::SpatialIndex;
use crate::{Error, NodeId, RoadGraph};

/// Everything needed to stand up a [`RoutingEngine`]
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub source: GraphSource,
    pub strategy: SearchStrategy,
    pub policy: SeverityPolicy,
}

impl EngineConfig {
    pub fn new(source: GraphSource) -> Self {
        Self {
            source,
            strategy: SearchStrategy::default(),
            policy: SeverityPolicy::default(),
        }
    }
}

/// Shared routing state for one road dataset.
///
/// The graph and spatial index never change after construction. The
/// overlay is internally synchronised, so the engine is typically
/// wrapped in an `Arc` and shared between request handlers.
pub struct RoutingEngine {
    graph: Arc<RoadGraph>,
    index: SpatialIndex,
    overlay: ObstacleOverlay,
    strategy: SearchStrategy,
}

impl RoutingEngine {
    /// Load the dataset described by `config` and build the engine
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset cannot be read or is malformed, or
    /// if the severity policy is invalid
    pub fn load(config: &EngineConfig) -> Result<Self, Error> {
        let graph = load_road_graph(&config.source)?;
        Ok(Self::new(graph, config.policy)?.with_strategy(config.strategy))
    }

    pub fn new(graph: RoadGraph, policy: SeverityPolicy) -> Result<Self, Error> {
        let graph = Arc::new(graph);
        let index = SpatialIndex::new(&graph);
        let overlay = ObstacleOverlay::new(Arc::clone(&graph), policy)?;

        info!(
            "Routing engine ready: {} nodes indexed, {} edges",
            index.len(),
            graph.edge_count()
        );

        Ok(Self {
            graph,
            index,
            overlay,
            strategy: SearchStrategy::default(),
        })
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn graph(&self) -> &Arc<RoadGraph> {
        &self.graph
    }

    pub fn overlay(&self) -> &ObstacleOverlay {
        &self.overlay
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    /// Search on a snapshot of the overlay taken at `as_of`
    pub fn shortest_path<C>(
        &self,
        source: &str,
        destination: &str,
        as_of: DateTime<Utc>,
        is_cancelled: C,
    ) -> Result<PathResult, Error>
    where
        C: Fn() -> bool,
    {
        let snapshot = self.overlay.snapshot(as_of);
        shortest_path(
            &self.graph,
            &snapshot,
            source,
            destination,
            self.strategy,
            is_cancelled,
        )
    }

    pub fn nearest(&self, latitude: f64, longitude: f64) -> Result<NodeId, Error> {
        self.index.nearest(&self.graph, latitude, longitude)
    }

    /// Snap a reported position to a node no further than `max_meters`
    ///
    /// # Errors
    ///
    /// [`Error::NodeNotFound`] when no node is close enough
    pub fn snap(&self, latitude: f64, longitude: f64, max_meters: f64) -> Result<NodeId, Error> {
        self.index
            .nearest_within(&self.graph, latitude, longitude, max_meters)?
            .ok_or_else(|| {
                Error::NodeNotFound(format!(
                    "no node within {max_meters} m of ({latitude}, {longitude})"
                ))
            })
    }
}

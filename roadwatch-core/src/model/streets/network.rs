//! Immutable road network graph

use geo::{ConvexHull, Coord, MultiPoint, Polygon};
use hashbrown::HashMap;
use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use rayon::prelude::*;

use super::components::{RoadEdge, RoadNode};
use crate::{Error, Meters, NodeId, distance::haversine_m};

/// Road graph loaded once at startup and read-only afterwards.
///
/// Nodes are addressed externally by their dataset [`NodeId`] and
/// internally by petgraph [`NodeIndex`]. Two-way streets are stored
/// as a pair of directed edges.
#[derive(Debug, Clone)]
pub struct RoadGraph {
    pub(crate) graph: DiGraph<RoadNode, RoadEdge>,
    node_ids: HashMap<NodeId, NodeIndex>,
    heuristic_scale: f64,
}

impl RoadGraph {
    pub(crate) fn from_parts(
        graph: DiGraph<RoadNode, RoadEdge>,
        node_ids: HashMap<NodeId, NodeIndex>,
    ) -> Self {
        let heuristic_scale = compute_heuristic_scale(&graph);
        Self {
            graph,
            node_ids,
            heuristic_scale,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of directed edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn exists(&self, id: &str) -> bool {
        self.node_ids.contains_key(id)
    }

    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.node_ids.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&RoadNode> {
        self.node_index(id).map(|idx| &self.graph[idx])
    }

    pub(crate) fn node_at(&self, idx: NodeIndex) -> &RoadNode {
        &self.graph[idx]
    }

    /// All nodes in load order
    pub fn nodes(&self) -> impl Iterator<Item = &RoadNode> {
        self.graph.node_weights()
    }

    /// All directed edges as `(source, target, edge)`
    pub fn edges(&self) -> impl Iterator<Item = (&RoadNode, &RoadNode, &RoadEdge)> {
        self.graph.edge_references().map(|edge| {
            (
                &self.graph[edge.source()],
                &self.graph[edge.target()],
                edge.weight(),
            )
        })
    }

    /// Outgoing neighbors of a node with their base weights, in dataset order
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNode`] if the node is not part of the graph
    pub fn neighbors(&self, id: &str) -> Result<Vec<(NodeId, Meters)>, Error> {
        let idx = self
            .node_index(id)
            .ok_or_else(|| Error::InvalidNode(id.to_string()))?;

        // petgraph walks adjacency lists newest-first
        let mut neighbors: Vec<(NodeId, Meters)> = self
            .graph
            .edges(idx)
            .map(|edge| (self.graph[edge.target()].id.clone(), edge.weight().weight))
            .collect();
        neighbors.reverse();

        Ok(neighbors)
    }

    /// Factor applied to the straight-line distance so that it never
    /// exceeds the cost of any real edge sequence. `1.0` when every edge
    /// weight is at least its great-circle length.
    pub fn heuristic_scale(&self) -> f64 {
        self.heuristic_scale
    }

    /// Convex hull of all nodes, `None` for an empty graph
    pub fn boundary(&self) -> Option<Polygon<f64>> {
        if self.is_empty() {
            return None;
        }

        let points: MultiPoint = self.graph.node_weights().map(|node| node.geometry).collect();
        Some(points.convex_hull())
    }

    /// Coordinates drawn for the directed edge `source -> target`
    pub(crate) fn edge_coords(&self, source: NodeIndex, target: NodeIndex) -> Vec<Coord<f64>> {
        let shape = self
            .graph
            .find_edge(source, target)
            .and_then(|edge| self.graph[edge].geometry.as_ref())
            .filter(|line| line.0.len() >= 2);

        match shape {
            Some(line) => line.0.clone(),
            None => vec![
                self.graph[source].geometry.into(),
                self.graph[target].geometry.into(),
            ],
        }
    }
}

fn compute_heuristic_scale(graph: &DiGraph<RoadNode, RoadEdge>) -> f64 {
    graph
        .raw_edges()
        .par_iter()
        .filter_map(|edge| {
            let straight = haversine_m(
                graph[edge.source()].geometry,
                graph[edge.target()].geometry,
            );
            (straight > 0.0).then(|| edge.weight.weight / straight)
        })
        .reduce(|| 1.0, f64::min)
        .clamp(0.0, 1.0)
}

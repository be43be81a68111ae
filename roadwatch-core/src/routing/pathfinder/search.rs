use std::collections::BinaryHeap;
use std::fmt;
use std::str::FromStr;

use fixedbitset::FixedBitSet;
use hashbrown::HashMap;
use itertools::Itertools;
use log::debug;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use super::result::PathResult;
use super::state::State;
use crate::distance::haversine_m;
use crate::obstacles::ObstacleSnapshot;
use crate::{Error, RoadGraph};

/// Settled nodes between two cancellation checks
const CANCEL_CHECK_INTERVAL: usize = 256;

/// Frontier ordering used by [`shortest_path`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    /// Best-first by cost plus a scaled great-circle estimate
    #[default]
    AStar,
    /// Plain uniform cost search
    Dijkstra,
}

impl FromStr for SearchStrategy {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace(['-', '_', '*'], "").as_str() {
            "astar" | "a" => Ok(SearchStrategy::AStar),
            "dijkstra" => Ok(SearchStrategy::Dijkstra),
            _ => Err(Error::InvalidPolicy(format!("unknown search strategy '{raw}'"))),
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStrategy::AStar => f.write_str("astar"),
            SearchStrategy::Dijkstra => f.write_str("dijkstra"),
        }
    }
}

/// Finds the cheapest path from `source` to `destination`.
///
/// Entering a node costs the edge weight times the node's obstacle
/// multiplier in `snapshot`. Nodes with a blocking obstacle are never
/// entered, and a blocked endpoint yields [`Error::NoPath`].
/// `is_cancelled` is polled before the search and periodically during it.
pub fn shortest_path<C>(
    graph: &RoadGraph,
    snapshot: &ObstacleSnapshot,
    source: &str,
    destination: &str,
    strategy: SearchStrategy,
    is_cancelled: C,
) -> Result<PathResult, Error>
where
    C: Fn() -> bool,
{
    let source_idx = graph
        .node_index(source)
        .ok_or_else(|| Error::InvalidNode(source.to_string()))?;
    let target_idx = graph
        .node_index(destination)
        .ok_or_else(|| Error::InvalidNode(destination.to_string()))?;

    if is_cancelled() {
        return Err(Error::Cancelled);
    }

    let no_path = || Error::NoPath {
        origin: source.to_string(),
        destination: destination.to_string(),
    };

    if snapshot.is_blocked(source_idx) || snapshot.is_blocked(target_idx) {
        return Err(no_path());
    }

    if source_idx == target_idx {
        let node = graph.node_at(source_idx);
        return Ok(PathResult {
            nodes: vec![node.id.clone()],
            path: vec![node.geometry.into()],
            explored_edges: Vec::new(),
            cost: 0.0,
        });
    }

    let goal = graph.node_at(target_idx).geometry;
    let scale = graph.heuristic_scale();
    let heuristic = |idx: NodeIndex| match strategy {
        SearchStrategy::AStar => haversine_m(graph.node_at(idx).geometry, goal) * scale,
        SearchStrategy::Dijkstra => 0.0,
    };

    let mut settled = FixedBitSet::with_capacity(graph.node_count());
    let mut best: HashMap<NodeIndex, f64> = HashMap::new();
    let mut predecessors: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut explored_edges = Vec::new();
    let mut queue = BinaryHeap::new();
    let mut seq = 0u64;
    let mut outgoing = Vec::new();

    best.insert(source_idx, 0.0);
    queue.push(State {
        priority: heuristic(source_idx),
        seq,
        node: source_idx,
    });

    let mut settled_count = 0usize;
    let mut found = false;

    while let Some(State { node, .. }) = queue.pop() {
        if settled.put(node.index()) {
            continue;
        }
        if node == target_idx {
            found = true;
            break;
        }

        settled_count += 1;
        if settled_count % CANCEL_CHECK_INTERVAL == 0 && is_cancelled() {
            return Err(Error::Cancelled);
        }

        let cost = best.get(&node).copied().unwrap_or(f64::INFINITY);

        // petgraph yields outgoing edges newest first
        outgoing.clear();
        outgoing.extend(
            graph
                .graph
                .edges(node)
                .map(|edge| (edge.target(), edge.weight().weight)),
        );

        for &(next, weight) in outgoing.iter().rev() {
            if settled.contains(next.index()) {
                continue;
            }
            let multiplier = snapshot.multiplier(next);
            if multiplier.is_infinite() {
                continue;
            }

            let candidate = cost + weight * multiplier;
            let improves = best.get(&next).is_none_or(|&known| candidate < known);
            if !improves {
                continue;
            }

            best.insert(next, candidate);
            predecessors.insert(next, node);
            explored_edges.push(graph.edge_coords(node, next));

            seq += 1;
            queue.push(State {
                priority: candidate + heuristic(next),
                seq,
                node: next,
            });
        }
    }

    debug!(
        "{strategy} search {source} -> {destination}: settled {settled_count} nodes, {} relaxations",
        explored_edges.len()
    );

    if !found {
        return Err(no_path());
    }

    let mut indices = vec![target_idx];
    let mut current = target_idx;
    while let Some(&previous) = predecessors.get(&current) {
        indices.push(previous);
        current = previous;
    }
    indices.reverse();

    let mut path = Vec::new();
    for (from, to) in indices.iter().copied().tuple_windows() {
        let coords = graph.edge_coords(from, to);
        let skip = usize::from(path.last() == coords.first());
        path.extend(coords.into_iter().skip(skip));
    }

    Ok(PathResult {
        nodes: indices
            .iter()
            .map(|&idx| graph.node_at(idx).id.clone())
            .collect(),
        path,
        explored_edges,
        cost: best.get(&target_idx).copied().unwrap_or(f64::INFINITY),
    })
}

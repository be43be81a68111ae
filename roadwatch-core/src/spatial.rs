//! Nearest-node lookup over the road graph

use geo::Point;
use petgraph::graph::NodeIndex;
use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::{Error, NodeId, RoadGraph, distance::haversine_m};

/// `[lon, lat]` position tagged with its graph index
type IndexedNode = GeomWithData<[f64; 2], NodeIndex>;

/// R-tree over node positions, built once from an immutable graph.
///
/// Distances are planar in degree space, which is what clients compare
/// against when they snap a tap on the map to a node.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    tree: RTree<IndexedNode>,
}

impl SpatialIndex {
    pub fn new(graph: &RoadGraph) -> Self {
        let points = graph
            .graph
            .node_indices()
            .map(|idx| {
                let node = graph.node_at(idx);
                IndexedNode::new([node.longitude(), node.latitude()], idx)
            })
            .collect();

        Self {
            tree: RTree::bulk_load(points),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Closest node to the given position; exact ties go to the lowest id
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCoordinates`] for non-finite input,
    /// [`Error::EmptyGraph`] when there is nothing to snap to
    pub fn nearest(&self, graph: &RoadGraph, latitude: f64, longitude: f64) -> Result<NodeId, Error> {
        self.nearest_index(graph, latitude, longitude)
            .map(|idx| graph.node_at(idx).id.clone())
    }

    /// Closest node if it lies within `max_meters` great-circle distance
    pub fn nearest_within(
        &self,
        graph: &RoadGraph,
        latitude: f64,
        longitude: f64,
        max_meters: f64,
    ) -> Result<Option<NodeId>, Error> {
        let idx = self.nearest_index(graph, latitude, longitude)?;
        let node = graph.node_at(idx);
        let distance = haversine_m(node.geometry, Point::new(longitude, latitude));

        Ok((distance <= max_meters).then(|| node.id.clone()))
    }

    fn nearest_index(
        &self,
        graph: &RoadGraph,
        latitude: f64,
        longitude: f64,
    ) -> Result<NodeIndex, Error> {
        // rstar orders candidates with partial_cmp and cannot take NaN
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(Error::InvalidCoordinates(format!(
                "({latitude}, {longitude}) is not a finite position"
            )));
        }

        let mut candidates = self
            .tree
            .nearest_neighbor_iter_with_distance_2(&[longitude, latitude]);
        let (first, best_distance) = candidates.next().ok_or(Error::EmptyGraph)?;

        // The iterator yields by increasing distance, so ties are contiguous
        let mut best = first.data;
        for (candidate, distance) in candidates {
            if distance > best_distance {
                break;
            }
            if graph.node_at(candidate.data).id < graph.node_at(best).id {
                best = candidate.data;
            }
        }

        Ok(best)
    }
}

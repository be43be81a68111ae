use geo::LineString;
use hashbrown::{HashMap, HashSet};
use log::{info, warn};
use petgraph::graph::{DiGraph, NodeIndex};

use super::config::GraphSource;
use super::dataset::{add_edge_list, add_features, parse_feature_collection};
use crate::{
    Error, Meters, NodeId,
    distance::haversine_m,
    model::{RoadEdge, RoadGraph, RoadNode},
};

/// Creates the road graph from the configured dataset
///
/// # Errors
///
/// Returns [`Error::DataFormat`] if the dataset cannot be read or is malformed:
/// missing coordinates, duplicate node ids or edges referencing unknown nodes
pub fn load_road_graph(source: &GraphSource) -> Result<RoadGraph, Error> {
    info!("Loading road nodes from {}", source.nodes_path.display());

    let text = std::fs::read_to_string(&source.nodes_path).map_err(|e| {
        Error::DataFormat(format!(
            "failed to read '{}': {e}",
            source.nodes_path.display()
        ))
    })?;

    let mut builder = RoadGraphBuilder::new();
    add_features(&mut builder, parse_feature_collection(&text)?)?;

    if let Some(edges_path) = &source.edges_path {
        info!("Loading road edges from {}", edges_path.display());
        add_edge_list(&mut builder, edges_path)?;
    }

    builder.build()
}

/// Builds a road graph from an in-memory GeoJSON document
pub fn road_graph_from_geojson(text: &str) -> Result<RoadGraph, Error> {
    let mut builder = RoadGraphBuilder::new();
    add_features(&mut builder, parse_feature_collection(text)?)?;
    builder.build()
}

#[derive(Debug, Clone)]
struct PendingEdge {
    from: NodeId,
    to: NodeId,
    weight: Option<Meters>,
    oneway: bool,
    geometry: Option<LineString<f64>>,
}

/// Collects nodes and edges, validating everything at [`RoadGraphBuilder::build`]
#[derive(Debug, Clone, Default)]
pub struct RoadGraphBuilder {
    nodes: Vec<RoadNode>,
    edges: Vec<PendingEdge>,
}

impl RoadGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: impl Into<NodeId>, latitude: f64, longitude: f64) -> &mut Self {
        self.nodes.push(RoadNode::new(id, latitude, longitude));
        self
    }

    /// Add a street segment. Without a weight the great-circle length is used.
    /// Two-way segments produce a directed edge in each direction.
    pub fn add_edge(
        &mut self,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
        weight: Option<Meters>,
        oneway: bool,
    ) -> &mut Self {
        self.add_edge_with_geometry(from, to, weight, oneway, None)
    }

    pub fn add_edge_with_geometry(
        &mut self,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
        weight: Option<Meters>,
        oneway: bool,
        geometry: Option<LineString<f64>>,
    ) -> &mut Self {
        self.edges.push(PendingEdge {
            from: from.into(),
            to: to.into(),
            weight,
            oneway,
            geometry,
        });
        self
    }

    /// Validate the collected data and freeze it into a [`RoadGraph`]
    pub fn build(self) -> Result<RoadGraph, Error> {
        let mut graph: DiGraph<RoadNode, RoadEdge> =
            DiGraph::with_capacity(self.nodes.len(), self.edges.len() * 2);
        let mut node_ids: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(self.nodes.len());

        for node in self.nodes {
            validate_node(&node)?;
            if node_ids.contains_key(&node.id) {
                return Err(Error::DataFormat(format!("duplicate node id '{}'", node.id)));
            }
            let id = node.id.clone();
            let idx = graph.add_node(node);
            node_ids.insert(id, idx);
        }

        let mut zero_length = 0usize;
        let mut seen_pairs: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();

        for edge in self.edges {
            let source = lookup_endpoint(&node_ids, &edge, &edge.from)?;
            let target = lookup_endpoint(&node_ids, &edge, &edge.to)?;

            let weight = match edge.weight {
                Some(weight) if !weight.is_finite() || weight < 0.0 => {
                    return Err(Error::DataFormat(format!(
                        "edge {}->{} has invalid weight {weight}",
                        edge.from, edge.to
                    )));
                }
                Some(weight) => weight,
                None => haversine_m(graph[source].geometry, graph[target].geometry),
            };
            if weight == 0.0 && source != target {
                zero_length += 1;
            }

            // Parallel edges collapse to the cheapest one
            insert_or_improve(
                &mut graph,
                &mut seen_pairs,
                source,
                target,
                weight,
                edge.geometry.clone(),
            );
            if !edge.oneway && source != target {
                let reversed = edge.geometry.map(|mut line| {
                    line.0.reverse();
                    line
                });
                insert_or_improve(&mut graph, &mut seen_pairs, target, source, weight, reversed);
            }
        }

        if zero_length > 0 {
            warn!("{zero_length} road segments have zero length");
        }

        info!(
            "Road graph built with {} nodes and {} directed edges",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(RoadGraph::from_parts(graph, node_ids))
    }
}

fn insert_or_improve(
    graph: &mut DiGraph<RoadNode, RoadEdge>,
    seen_pairs: &mut HashSet<(NodeIndex, NodeIndex)>,
    source: NodeIndex,
    target: NodeIndex,
    weight: Meters,
    geometry: Option<LineString<f64>>,
) {
    if seen_pairs.insert((source, target)) {
        graph.add_edge(source, target, RoadEdge { weight, geometry });
        return;
    }

    if let Some(existing) = graph.find_edge(source, target)
        && weight < graph[existing].weight
    {
        graph[existing] = RoadEdge { weight, geometry };
    }
}

fn validate_node(node: &RoadNode) -> Result<(), Error> {
    let (lat, lon) = node.lat_lon();
    if node.id.trim().is_empty() {
        return Err(Error::DataFormat("node with an empty id".to_string()));
    }
    if !lat.is_finite() || !lon.is_finite() {
        return Err(Error::DataFormat(format!(
            "node '{}' has non-finite coordinates",
            node.id
        )));
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(Error::DataFormat(format!(
            "node '{}' has out of range coordinates ({lat}, {lon})",
            node.id
        )));
    }
    Ok(())
}

fn lookup_endpoint(
    node_ids: &HashMap<NodeId, NodeIndex>,
    edge: &PendingEdge,
    id: &str,
) -> Result<NodeIndex, Error> {
    node_ids.get(id).copied().ok_or_else(|| {
        Error::DataFormat(format!(
            "edge {}->{} references unknown node '{id}'",
            edge.from, edge.to
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": 1, "geometry": {"type": "Point", "coordinates": [85.3200, 27.7000]}, "properties": {}},
            {"type": "Feature", "id": "2", "geometry": {"type": "Point", "coordinates": [85.3210, 27.7000]}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [85.3210, 27.7010]}, "properties": {"osmid": 3}},
            {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[85.3200, 27.7000], [85.3205, 27.7001], [85.3210, 27.7000]]},
             "properties": {"u": 1, "v": 2, "length": 120.0}},
            {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[85.3210, 27.7000], [85.3210, 27.7010]]},
             "properties": {"from": "2", "to": "3", "oneway": true}}
        ]
    }"#;

    #[test]
    fn loads_nodes_and_edges_from_features() {
        let graph = road_graph_from_geojson(SAMPLE).unwrap();

        assert_eq!(graph.node_count(), 3);
        // 1<->2 two-way, 2->3 one-way
        assert_eq!(graph.edge_count(), 3);
        assert!(graph.exists("1") && graph.exists("2") && graph.exists("3"));
        assert_eq!(graph.neighbors("1").unwrap(), vec![("2".to_string(), 120.0)]);
        assert!(graph.neighbors("3").unwrap().is_empty());

        let (_, weight) = &graph.neighbors("2").unwrap()[1];
        // about 111 meters between 27.7000 and 27.7010
        assert!((weight - 111.2).abs() < 1.0, "got {weight}");
    }

    #[test]
    fn reverse_edge_geometry_is_flipped() {
        let graph = road_graph_from_geojson(SAMPLE).unwrap();
        let one = graph.node_index("1").unwrap();
        let two = graph.node_index("2").unwrap();

        let forward = graph.edge_coords(one, two);
        let backward = graph.edge_coords(two, one);
        assert_eq!(forward.len(), 3);
        assert_eq!(forward.first(), backward.last());
        assert_eq!(forward.last(), backward.first());
    }

    #[test]
    fn dangling_edge_fails_fast() {
        let mut builder = RoadGraphBuilder::new();
        builder
            .add_node("a", 0.0, 0.0)
            .add_edge("a", "ghost", Some(1.0), false);

        let err = builder.build().unwrap_err();
        assert!(matches!(err, Error::DataFormat(ref msg) if msg.contains("ghost")));
    }

    #[test]
    fn duplicate_and_invalid_nodes_are_rejected() {
        let mut builder = RoadGraphBuilder::new();
        builder.add_node("a", 0.0, 0.0).add_node("a", 1.0, 1.0);
        assert!(matches!(builder.build(), Err(Error::DataFormat(_))));

        let mut builder = RoadGraphBuilder::new();
        builder.add_node("a", f64::NAN, 0.0);
        assert!(matches!(builder.build(), Err(Error::DataFormat(_))));

        let mut builder = RoadGraphBuilder::new();
        builder.add_node("a", 91.0, 0.0);
        assert!(matches!(builder.build(), Err(Error::DataFormat(_))));
    }

    #[test]
    fn negative_weight_is_rejected() {
        let mut builder = RoadGraphBuilder::new();
        builder
            .add_node("a", 0.0, 0.0)
            .add_node("b", 0.0, 0.1)
            .add_edge("a", "b", Some(-3.0), false);
        assert!(matches!(builder.build(), Err(Error::DataFormat(_))));
    }

    #[test]
    fn parallel_edges_keep_the_cheapest() {
        let mut builder = RoadGraphBuilder::new();
        builder
            .add_node("a", 0.0, 0.0)
            .add_node("b", 0.0, 0.1)
            .add_edge("a", "b", Some(9.0), true)
            .add_edge("a", "b", Some(4.0), true)
            .add_edge("a", "b", Some(6.0), true);
        let graph = builder.build().unwrap();

        assert_eq!(graph.neighbors("a").unwrap(), vec![("b".to_string(), 4.0)]);
    }

    #[test]
    fn missing_coordinates_fail() {
        let doc = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "id": "a", "geometry": {"type": "Point", "coordinates": []}}
        ]}"#;
        assert!(matches!(road_graph_from_geojson(doc), Err(Error::DataFormat(_))));

        let doc = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}}
        ]}"#;
        assert!(matches!(road_graph_from_geojson(doc), Err(Error::DataFormat(_))));

        assert!(matches!(
            road_graph_from_geojson(r#"{"type": "Feature"}"#),
            Err(Error::DataFormat(_))
        ));
    }

    #[test]
    fn loads_csv_edge_list_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let nodes_path = dir.path().join("nodes.geojson");
        let edges_path = dir.path().join("edges.csv");

        let nodes = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "id": "a", "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}},
            {"type": "Feature", "id": "b", "geometry": {"type": "Point", "coordinates": [0.001, 0.0]}},
            {"type": "Feature", "id": "c", "geometry": {"type": "Point", "coordinates": [0.002, 0.0]}}
        ]}"#;
        std::fs::write(&nodes_path, nodes).unwrap();

        let mut edges = std::fs::File::create(&edges_path).unwrap();
        writeln!(edges, "from,to,weight,oneway").unwrap();
        writeln!(edges, "a,b,10,no").unwrap();
        writeln!(edges, "b,c,,yes").unwrap();
        drop(edges);

        let graph = load_road_graph(&GraphSource::new(&nodes_path).with_edges(&edges_path)).unwrap();
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.neighbors("b").unwrap()[0], ("a".to_string(), 10.0));

        let mut bad = std::fs::File::create(&edges_path).unwrap();
        writeln!(bad, "from,to,weight,oneway").unwrap();
        writeln!(bad, "a,b,ten,no").unwrap();
        drop(bad);
        assert!(matches!(
            load_road_graph(&GraphSource::new(&nodes_path).with_edges(&edges_path)),
            Err(Error::DataFormat(_))
        ));
    }

    #[test]
    fn missing_file_is_a_data_format_error() {
        let err = load_road_graph(&GraphSource::new("/nonexistent/roads.geojson")).unwrap_err();
        assert!(matches!(err, Error::DataFormat(_)));
    }
}

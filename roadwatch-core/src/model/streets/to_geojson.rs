use geo::LineString;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, feature::Id};
use petgraph::visit::EdgeRef;
use serde_json::json;

use super::RoadGraph;

impl RoadGraph {
    /// Every node as a `Point` feature keyed by its dataset id
    pub fn nodes_geojson(&self) -> FeatureCollection {
        let features = self
            .nodes()
            .map(|node| Feature {
                bbox: None,
                geometry: Some(Geometry::new((&node.geometry).into())),
                id: Some(Id::String(node.id.clone())),
                properties: None,
                foreign_members: None,
            })
            .collect();

        FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        }
    }

    /// Every directed edge as a `LineString` feature
    pub fn edges_geojson(&self) -> FeatureCollection {
        let features = self
            .graph
            .edge_references()
            .map(|edge| {
                let line = LineString::new(self.edge_coords(edge.source(), edge.target()));

                let mut properties = JsonObject::new();
                properties.insert("from".to_string(), json!(self.graph[edge.source()].id));
                properties.insert("to".to_string(), json!(self.graph[edge.target()].id));
                properties.insert("weight".to_string(), json!(edge.weight().weight));

                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new((&line).into())),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::loading::RoadGraphBuilder;

    #[test]
    fn nodes_serialize_as_lon_lat_points() {
        let mut builder = RoadGraphBuilder::new();
        builder.add_node("n1", 27.7, 85.3);
        let graph = builder.build().unwrap();

        let value = serde_json::to_value(graph.nodes_geojson()).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        let feature = &value["features"][0];
        assert_eq!(feature["id"], "n1");
        assert_eq!(feature["geometry"]["type"], "Point");
        assert_eq!(feature["geometry"]["coordinates"][0], 85.3);
        assert_eq!(feature["geometry"]["coordinates"][1], 27.7);
    }

    #[test]
    fn edges_carry_endpoints_and_weight() {
        let mut builder = RoadGraphBuilder::new();
        builder
            .add_node("a", 0.0, 0.0)
            .add_node("b", 0.0, 0.001)
            .add_edge("a", "b", Some(12.5), true);
        let graph = builder.build().unwrap();

        let value = serde_json::to_value(graph.edges_geojson()).unwrap();
        let feature = &value["features"][0];
        assert_eq!(feature["geometry"]["type"], "LineString");
        assert_eq!(feature["properties"]["from"], "a");
        assert_eq!(feature["properties"]["to"], "b");
        assert_eq!(feature["properties"]["weight"], 12.5);
    }
}

use std::path::PathBuf;

use serde::Deserialize;

/// Location of the road dataset on disk
#[derive(Debug, Clone, Deserialize)]
pub struct GraphSource {
    /// GeoJSON feature collection with point nodes and optional line edges
    pub nodes_path: PathBuf,
    /// Optional CSV edge list (`from,to,weight,oneway`)
    #[serde(default)]
    pub edges_path: Option<PathBuf>,
}

impl GraphSource {
    pub fn new(nodes_path: impl Into<PathBuf>) -> Self {
        Self {
            nodes_path: nodes_path.into(),
            edges_path: None,
        }
    }

    #[must_use]
    pub fn with_edges(mut self, edges_path: impl Into<PathBuf>) -> Self {
        self.edges_path = Some(edges_path.into());
        self
    }
}

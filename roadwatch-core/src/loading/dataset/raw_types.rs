use serde::Deserialize;

/// Row of a CSV edge list
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FeedEdge {
    pub from: String,
    pub to: String,
    pub weight: String,
    pub oneway: String,
}

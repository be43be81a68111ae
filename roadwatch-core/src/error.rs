use thiserror::Error;

use crate::NodeId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed road dataset: {0}")]
    DataFormat(String),
    #[error("Invalid node: {0}")]
    InvalidNode(NodeId),
    #[error("No path found from {origin} to {destination}")]
    NoPath { origin: NodeId, destination: NodeId },
    #[error("Node not found in road graph: {0}")]
    NodeNotFound(NodeId),
    #[error("User {requester} does not own obstacle {obstacle}")]
    NotOwner { obstacle: String, requester: String },
    #[error("Obstacle not found: {0}")]
    ObstacleNotFound(String),
    #[error("Invalid obstacle: {0}")]
    InvalidObstacle(String),
    #[error("Invalid severity policy: {0}")]
    InvalidPolicy(String),
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
    #[error("Road graph has no nodes")]
    EmptyGraph,
    #[error("Path search cancelled")]
    Cancelled,
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl Error {
    /// Machine-readable error code used on the wire
    pub fn code(&self) -> &'static str {
        match self {
            Error::DataFormat(_) => "DATA_FORMAT",
            Error::InvalidNode(_) => "INVALID_NODE",
            Error::NoPath { .. } => "NO_PATH",
            Error::NodeNotFound(_) => "NODE_NOT_FOUND",
            Error::NotOwner { .. } => "NOT_OWNER",
            Error::ObstacleNotFound(_) => "NOT_FOUND",
            Error::InvalidObstacle(_) => "INVALID_OBSTACLE",
            Error::InvalidPolicy(_) => "INVALID_POLICY",
            Error::InvalidCoordinates(_) => "INVALID_COORDINATES",
            Error::EmptyGraph => "EMPTY_GRAPH",
            Error::Cancelled => "CANCELLED",
            Error::IoError(_) => "IO_ERROR",
            Error::JsonError(_) => "JSON_ERROR",
            Error::CsvError(_) => "CSV_ERROR",
        }
    }
}

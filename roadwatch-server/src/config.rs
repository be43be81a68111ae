//! Server configuration: a TOML file with command line overrides

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use roadwatch_core::{EngineConfig, GraphSource, SearchStrategy, SeverityPolicy};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Command line arguments
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "roadwatch-server", version, about = "Obstacle-aware road routing service")]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Address to listen on, e.g. 0.0.0.0:5000
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// GeoJSON road dataset
    #[arg(long)]
    pub nodes: Option<PathBuf>,
    /// Optional CSV edge list
    #[arg(long)]
    pub edges: Option<PathBuf>,
    /// Search strategy: astar or dijkstra
    #[arg(long)]
    pub strategy: Option<SearchStrategy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpSettings,
    pub graph: GraphSettings,
    pub obstacles: ObstacleSettings,
    pub identity: IdentitySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub bind: SocketAddr,
    pub request_timeout_secs: u64,
    pub concurrency_limit: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            request_timeout_secs: 30,
            concurrency_limit: 64,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    pub nodes_path: PathBuf,
    pub edges_path: Option<PathBuf>,
    pub strategy: SearchStrategy,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            nodes_path: PathBuf::from("data/roads.geojson"),
            edges_path: None,
            strategy: SearchStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObstacleSettings {
    /// Seconds between compaction passes, 0 disables compaction
    pub compaction_interval_secs: u64,
    /// Radius used to snap coordinate-only reports to a node
    pub max_snap_distance_m: f64,
    pub severity: SeverityPolicy,
}

impl Default for ObstacleSettings {
    fn default() -> Self {
        Self {
            compaction_interval_secs: 60,
            max_snap_distance_m: 50.0,
            severity: SeverityPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// User id to display name
    pub users: BTreeMap<String, String>,
}

impl ServerConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Read the file named on the command line, if any, then apply overrides
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, cli: &Cli) {
        if let Some(bind) = cli.bind {
            self.server.bind = bind;
        }
        if let Some(nodes) = &cli.nodes {
            self.graph.nodes_path.clone_from(nodes);
        }
        if let Some(edges) = &cli.edges {
            self.graph.edges_path = Some(edges.clone());
        }
        if let Some(strategy) = cli.strategy {
            self.graph.strategy = strategy;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.obstacles
            .severity
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let snap = self.obstacles.max_snap_distance_m;
        if !snap.is_finite() || snap < 0.0 {
            return Err(ConfigError::Invalid(
                "obstacles.max_snap_distance_m must be a non-negative number".to_string(),
            ));
        }
        if self.server.concurrency_limit == 0 {
            return Err(ConfigError::Invalid(
                "server.concurrency_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut source = GraphSource::new(&self.graph.nodes_path);
        source.edges_path.clone_from(&self.graph.edges_path);

        EngineConfig {
            source,
            strategy: self.graph.strategy,
            policy: self.obstacles.severity,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// `None` when compaction is disabled
    pub fn compaction_interval(&self) -> Option<Duration> {
        (self.obstacles.compaction_interval_secs > 0)
            .then(|| Duration::from_secs(self.obstacles.compaction_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config.server.bind.port(), 5000);
        assert_eq!(config.graph.strategy, SearchStrategy::AStar);
        assert_eq!(config.compaction_interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn parses_all_sections() {
        let config = ServerConfig::from_toml(
            r#"
            [server]
            bind = "127.0.0.1:8080"
            request_timeout_secs = 5

            [graph]
            nodes_path = "kathmandu.geojson"
            edges_path = "kathmandu.csv"
            strategy = "dijkstra"

            [obstacles]
            compaction_interval_secs = 0
            max_snap_distance_m = 25.0

            [obstacles.severity]
            low = 1.5
            moderate = 3.0
            high = 10.0

            [identity.users]
            u1 = "Asha"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.server.concurrency_limit, 64);
        assert_eq!(config.graph.strategy, SearchStrategy::Dijkstra);
        assert_eq!(config.compaction_interval(), None);
        assert_eq!(config.obstacles.severity.high, 10.0);
        assert_eq!(config.identity.users["u1"], "Asha");

        let engine = config.engine_config();
        assert_eq!(engine.source.nodes_path, PathBuf::from("kathmandu.geojson"));
        assert_eq!(engine.source.edges_path, Some(PathBuf::from("kathmandu.csv")));
    }

    #[test]
    fn rejects_non_monotonic_policy() {
        let err = ServerConfig::from_toml(
            r#"
            [obstacles.severity]
            low = 4.0
            moderate = 2.0
            high = 3.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn command_line_overrides_file() {
        let mut config = ServerConfig::default();
        let cli = Cli::parse_from([
            "roadwatch-server",
            "--bind",
            "127.0.0.1:9000",
            "--nodes",
            "other.geojson",
            "--strategy",
            "dijkstra",
        ]);
        config.apply(&cli);

        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.graph.nodes_path, PathBuf::from("other.geojson"));
        assert_eq!(config.graph.strategy, SearchStrategy::Dijkstra);
        assert_eq!(config.graph.edges_path, None);
    }
}

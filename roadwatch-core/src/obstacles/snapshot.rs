use chrono::{DateTime, Utc};
use im::HashMap;
use petgraph::graph::NodeIndex;

use super::policy::SeverityPolicy;
use crate::model::{Obstacle, ObstacleId, Severity};

/// Obstacle records plus a per-node index, held in persistent maps so a
/// clone shares structure with the original and costs O(1).
#[derive(Debug, Clone, Default)]
pub(super) struct OverlayState {
    pub(super) records: HashMap<ObstacleId, Obstacle>,
    pub(super) by_node: HashMap<NodeIndex, Vec<ObstacleId>>,
}

impl OverlayState {
    pub(super) fn insert(&mut self, node: NodeIndex, obstacle: Obstacle) {
        self.by_node
            .entry(node)
            .or_insert_with(Vec::new)
            .push(obstacle.id.clone());
        self.records.insert(obstacle.id.clone(), obstacle);
    }

    pub(super) fn remove(&mut self, node: NodeIndex, id: &str) -> Option<Obstacle> {
        let removed = self.records.remove(id)?;
        if let Some(ids) = self.by_node.get_mut(&node) {
            ids.retain(|other| other != id);
            if ids.is_empty() {
                self.by_node.remove(&node);
            }
        }
        Some(removed)
    }

    pub(super) fn at_node(&self, node: NodeIndex) -> impl Iterator<Item = &Obstacle> {
        self.by_node
            .get(&node)
            .into_iter()
            .flatten()
            .filter_map(|id| self.records.get(id))
    }
}

/// Consistent, immutable view of the obstacle overlay at one instant
#[derive(Debug, Clone)]
pub struct ObstacleSnapshot {
    pub(super) state: OverlayState,
    policy: SeverityPolicy,
    as_of: DateTime<Utc>,
}

impl ObstacleSnapshot {
    pub(super) fn new(state: OverlayState, policy: SeverityPolicy, as_of: DateTime<Utc>) -> Self {
        Self {
            state,
            policy,
            as_of,
        }
    }

    /// Snapshot without any obstacles
    pub fn empty(as_of: DateTime<Utc>) -> Self {
        Self::new(OverlayState::default(), SeverityPolicy::default(), as_of)
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    /// Highest severity among obstacles at the node still active at `as_of`
    pub fn highest_severity(&self, node: NodeIndex) -> Option<Severity> {
        self.state
            .at_node(node)
            .filter(|obstacle| obstacle.is_active_at(self.as_of))
            .map(|obstacle| obstacle.severity)
            .max()
    }

    /// Cost multiplier for entering the node, `f64::INFINITY` when blocked
    pub fn multiplier(&self, node: NodeIndex) -> f64 {
        self.policy.multiplier(self.highest_severity(node))
    }

    pub fn is_blocked(&self, node: NodeIndex) -> bool {
        self.multiplier(node).is_infinite()
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, trace};
use parking_lot::RwLock;
use petgraph::graph::NodeIndex;

use super::events::{ObstacleEvent, ObstacleListener};
use super::policy::SeverityPolicy;
use super::snapshot::{ObstacleSnapshot, OverlayState};
use crate::{
    Error,
    model::{NewObstacle, Obstacle, RoadGraph},
};

/// Owner-attributed obstacles attached to road nodes.
///
/// All reads and writes go through a single lock around persistent maps.
/// Taking an [`ObstacleSnapshot`] clones the maps in O(1) and writers only
/// path-copy the entries they touch, so a snapshot held by a search never
/// makes a write more expensive.
/// Expiry is evaluated lazily against the caller supplied `as_of` instant;
/// [`ObstacleOverlay::compact`] reclaims memory for expired records.
pub struct ObstacleOverlay {
    graph: Arc<RoadGraph>,
    policy: SeverityPolicy,
    state: RwLock<OverlayState>,
    next_id: AtomicU64,
    listeners: RwLock<Vec<Arc<dyn ObstacleListener>>>,
}

impl ObstacleOverlay {
    /// # Errors
    ///
    /// Returns [`Error::InvalidPolicy`] if the severity policy is not usable
    pub fn new(graph: Arc<RoadGraph>, policy: SeverityPolicy) -> Result<Self, Error> {
        policy.validate()?;
        Ok(Self {
            graph,
            policy,
            state: RwLock::new(OverlayState::default()),
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(Vec::new()),
        })
    }

    pub fn policy(&self) -> SeverityPolicy {
        self.policy
    }

    /// Number of stored records, including expired ones not yet compacted
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a listener for add, remove and expiry events
    pub fn subscribe(&self, listener: Arc<dyn ObstacleListener>) {
        self.listeners.write().push(listener);
    }

    /// Store a new obstacle
    ///
    /// # Errors
    ///
    /// [`Error::NodeNotFound`] if the node is not part of the road graph,
    /// [`Error::InvalidObstacle`] for an empty owner, a non-positive duration
    /// or a non-finite location
    pub fn add(&self, report: NewObstacle, created_at: DateTime<Utc>) -> Result<Obstacle, Error> {
        let node = self
            .graph
            .node_index(&report.node_id)
            .ok_or_else(|| Error::NodeNotFound(report.node_id.clone()))?;

        if report.owner.trim().is_empty() {
            return Err(Error::InvalidObstacle("owner must not be empty".to_string()));
        }
        if report.expected_duration <= TimeDelta::zero() {
            return Err(Error::InvalidObstacle(
                "expected duration must be positive".to_string(),
            ));
        }
        let location = match report.location {
            Some(point) if !point.x().is_finite() || !point.y().is_finite() => {
                return Err(Error::InvalidObstacle(
                    "location must have finite coordinates".to_string(),
                ));
            }
            Some(point) => point,
            None => self.graph.node_at(node).geometry,
        };

        let obstacle = Obstacle {
            id: format!("obs-{}", self.next_id.fetch_add(1, Ordering::Relaxed)),
            node_id: report.node_id,
            owner: report.owner,
            name: report.name,
            kind: report.kind,
            severity: report.severity,
            expected_duration: report.expected_duration,
            created_at,
            comments: report.comments,
            image_url: report.image_url,
            location,
        };

        self.state.write().insert(node, obstacle.clone());

        debug!(
            "Obstacle {} ({}, {}) added at node {} by {}",
            obstacle.id, obstacle.kind, obstacle.severity, obstacle.node_id, obstacle.owner
        );
        self.notify(&ObstacleEvent::Added(obstacle.clone()));
        Ok(obstacle)
    }

    /// Delete an obstacle on behalf of its owner
    ///
    /// # Errors
    ///
    /// [`Error::ObstacleNotFound`] if no such record exists,
    /// [`Error::NotOwner`] if `requester` did not create it
    pub fn remove(&self, id: &str, requester: &str) -> Result<Obstacle, Error> {
        let removed = {
            let mut guard = self.state.write();

            let obstacle = guard
                .records
                .get(id)
                .ok_or_else(|| Error::ObstacleNotFound(id.to_string()))?;
            if obstacle.owner != requester {
                return Err(Error::NotOwner {
                    obstacle: id.to_string(),
                    requester: requester.to_string(),
                });
            }
            let node = self
                .graph
                .node_index(&obstacle.node_id)
                .ok_or_else(|| Error::NodeNotFound(obstacle.node_id.clone()))?;

            guard
                .remove(node, id)
                .ok_or_else(|| Error::ObstacleNotFound(id.to_string()))?
        };

        debug!("Obstacle {id} removed by {requester}");
        self.notify(&ObstacleEvent::Removed(removed.clone()));
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Option<Obstacle> {
        self.state.read().records.get(id).cloned()
    }

    /// Obstacles at the node still active at `as_of`, oldest first
    ///
    /// # Errors
    ///
    /// [`Error::NodeNotFound`] if the node is not part of the road graph
    pub fn active_obstacles_at(
        &self,
        node_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Obstacle>, Error> {
        let node = self
            .graph
            .node_index(node_id)
            .ok_or_else(|| Error::NodeNotFound(node_id.to_string()))?;

        let state = self.state.read().clone();
        let mut active: Vec<Obstacle> = state
            .at_node(node)
            .filter(|obstacle| obstacle.is_active_at(as_of))
            .cloned()
            .collect();
        sort_obstacles(&mut active);
        Ok(active)
    }

    /// Every obstacle active at `as_of`, oldest first
    pub fn active_obstacles(&self, as_of: DateTime<Utc>) -> Vec<Obstacle> {
        let state = self.state.read().clone();
        let mut active: Vec<Obstacle> = state
            .records
            .values()
            .filter(|obstacle| obstacle.is_active_at(as_of))
            .cloned()
            .collect();
        sort_obstacles(&mut active);
        active
    }

    /// Penalty factor for entering the node, `f64::INFINITY` when a
    /// critical obstacle blocks it
    pub fn edge_cost_multiplier(&self, node_id: &str, as_of: DateTime<Utc>) -> f64 {
        match self.graph.node_index(node_id) {
            Some(node) => self.snapshot(as_of).multiplier(node),
            None => 1.0,
        }
    }

    /// Consistent view for a whole path search
    pub fn snapshot(&self, as_of: DateTime<Utc>) -> ObstacleSnapshot {
        let state = self.state.read().clone();
        ObstacleSnapshot::new(state, self.policy, as_of)
    }

    /// Drop records expired at `as_of`. Returns how many were evicted.
    ///
    /// The scan runs on a snapshot outside the lock; only the removals
    /// take the write lock.
    pub fn compact(&self, as_of: DateTime<Utc>) -> usize {
        let state = self.state.read().clone();
        let expired_ids: Vec<(NodeIndex, String)> = state
            .records
            .values()
            .filter(|obstacle| !obstacle.is_active_at(as_of))
            .filter_map(|obstacle| {
                let node = self.graph.node_index(&obstacle.node_id)?;
                Some((node, obstacle.id.clone()))
            })
            .collect();
        if expired_ids.is_empty() {
            return 0;
        }

        let expired: Vec<Obstacle> = {
            let mut guard = self.state.write();
            expired_ids
                .into_iter()
                .filter_map(|(node, id)| guard.remove(node, &id))
                .collect()
        };

        for obstacle in &expired {
            trace!("Obstacle {} expired at {}", obstacle.id, obstacle.expires_at());
        }
        debug!("Compaction evicted {} expired obstacles", expired.len());

        let count = expired.len();
        for obstacle in expired {
            self.notify(&ObstacleEvent::Expired(obstacle));
        }
        count
    }

    fn notify(&self, event: &ObstacleEvent) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.on_event(event);
        }
    }
}

fn sort_obstacles(obstacles: &mut [Obstacle]) {
    obstacles.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

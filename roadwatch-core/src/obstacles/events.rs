use crate::model::Obstacle;

/// Change notification emitted by the overlay, one per add, remove or eviction
#[derive(Debug, Clone, PartialEq)]
pub enum ObstacleEvent {
    Added(Obstacle),
    Removed(Obstacle),
    Expired(Obstacle),
}

impl ObstacleEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ObstacleEvent::Added(_) => "added",
            ObstacleEvent::Removed(_) => "removed",
            ObstacleEvent::Expired(_) => "expired",
        }
    }

    pub fn obstacle(&self) -> &Obstacle {
        match self {
            ObstacleEvent::Added(obstacle)
            | ObstacleEvent::Removed(obstacle)
            | ObstacleEvent::Expired(obstacle) => obstacle,
        }
    }
}

/// Receives overlay change events. Called after the overlay lock is released.
pub trait ObstacleListener: Send + Sync {
    fn on_event(&self, event: &ObstacleEvent);
}

impl<F> ObstacleListener for F
where
    F: Fn(&ObstacleEvent) + Send + Sync,
{
    fn on_event(&self, event: &ObstacleEvent) {
        self(event);
    }
}

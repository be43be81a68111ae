use std::sync::Arc;

use roadwatch_core::{ObstacleEvent, RoutingEngine};
use tokio::sync::broadcast;

use crate::events::BroadcastListener;
use crate::identity::IdentityProvider;

/// Buffered change events per subscriber before it starts lagging
const EVENT_CAPACITY: usize = 256;

/// Shared state handed to every handler
pub struct AppState {
    pub engine: Arc<RoutingEngine>,
    pub identity: Arc<dyn IdentityProvider>,
    pub events: broadcast::Sender<ObstacleEvent>,
    pub max_snap_distance_m: f64,
}

impl AppState {
    /// Wires the overlay change feed into a broadcast channel
    pub fn new(
        engine: Arc<RoutingEngine>,
        identity: Arc<dyn IdentityProvider>,
        max_snap_distance_m: f64,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        engine
            .overlay()
            .subscribe(Arc::new(BroadcastListener::new(events.clone())));

        Self {
            engine,
            identity,
            events,
            max_snap_distance_m,
        }
    }
}

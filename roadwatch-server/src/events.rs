//! Obstacle change feed over Server-Sent Events

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use roadwatch_core::{ObstacleEvent, ObstacleListener};
use tokio::sync::broadcast;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};

use crate::dto::ObstacleView;
use crate::state::AppState;

/// Forwards overlay events into a broadcast channel
pub struct BroadcastListener {
    sender: broadcast::Sender<ObstacleEvent>,
}

impl BroadcastListener {
    pub fn new(sender: broadcast::Sender<ObstacleEvent>) -> Self {
        Self { sender }
    }
}

impl ObstacleListener for BroadcastListener {
    fn on_event(&self, event: &ObstacleEvent) {
        // Err only means nobody is listening right now
        let _ = self.sender.send(event.clone());
    }
}

pub async fn obstacle_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let identity = Arc::clone(&state.identity);
    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(move |message| {
        let event = match message {
            Ok(event) => event,
            Err(lagged) => {
                tracing::warn!("obstacle feed subscriber fell behind: {lagged}");
                return None;
            }
        };

        let view = ObstacleView::new(event.obstacle(), identity.as_ref());
        match Event::default().event(event.kind()).json_data(&view) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                tracing::error!(obstacle_id = %view.id, "failed to encode obstacle event: {e}");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

//! Mutable obstacle overlay on top of the immutable road graph

mod events;
mod overlay;
mod policy;
mod snapshot;

pub use events::{ObstacleEvent, ObstacleListener};
pub use overlay::ObstacleOverlay;
pub use policy::SeverityPolicy;
pub use snapshot::ObstacleSnapshot;

//! Obstacle-aware road routing.
//!
//! Re-exports the routing core and the HTTP server so that both can be
//! embedded from a single dependency.

pub use roadwatch_core;
pub use roadwatch_core::prelude::*;
pub use roadwatch_server as server;
pub use roadwatch_server::{AppState, Limits, ServerConfig, build_router, run};

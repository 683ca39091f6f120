//! Routing collaborators that turn an origin and budget into reachable points.
//!
//! The [`RoutingEngine`] trait is synchronous so the cache can drive it from
//! any context. Network-backed engines live in `reachscore-data`.

mod engine;
mod error;

pub use engine::RoutingEngine;
pub use error::RoutingError;

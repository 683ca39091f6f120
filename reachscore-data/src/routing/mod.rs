//! HTTP-based routing engines for reachability queries.
//!
//! This module provides [`HttpRoutingEngine`], an implementation of
//! [`reachscore_core::RoutingEngine`] that samples candidate destinations
//! around an origin and measures them with an OSRM routing service.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use geo::Coord;
//! use reachscore_core::{RoutingEngine, TravelMode};
//! use reachscore_data::routing::{HttpRoutingEngine, HttpRoutingEngineConfig};
//!
//! let config = HttpRoutingEngineConfig::new("http://localhost:5000")
//!     .with_timeout(Duration::from_secs(60))
//!     .with_user_agent("my-app/1.0");
//! let engine = HttpRoutingEngine::with_config(config)?;
//!
//! let points = engine.reachable_points(Coord { x: 7.6261, y: 51.9607 }, TravelMode::Walk, 15)?;
//! println!("{} reachable samples", points.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod grid;
mod osrm;
mod provider;

pub use provider::{
    DEFAULT_USER_AGENT, HttpRoutingEngine, HttpRoutingEngineConfig, ProviderBuildError,
    osrm_profile,
};

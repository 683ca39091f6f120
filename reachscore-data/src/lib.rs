//! Network and storage adapters for the reachscore engine.
//!
//! Responsibilities:
//! - Implement the routing collaborator against an OSRM service.
//! - Download amenities from Overpass, absorbing transient failures.
//! - Import downloaded amenities into the SQLite store used by
//!   `reachscore-core`.
//!
//! Boundaries:
//! - Do not encode caching or ranking rules (live in `reachscore-core`).
//! - Keep blocking I/O off async executors; prefer async-capable clients.
//!
//! Invariants:
//! - No global mutable state.

pub mod ingest;
pub mod overpass;
pub mod routing;

pub use ingest::{ImportError, ImportOutcome, import_amenities};
pub use overpass::{FetchError, OverpassQuery, ResilientFetcher};
pub use routing::{HttpRoutingEngine, HttpRoutingEngineConfig};

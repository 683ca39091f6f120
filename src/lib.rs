//! Facade crate for the reachscore engine.
//!
//! This crate re-exports the core domain types and exposes the network
//! adapters, the SQLite store and the scorer behind feature flags.

#![forbid(unsafe_code)]

pub use reachscore_core::{
    AmenityCategoryState, AmenityRecord, AmenityStore, AmenityToggle, CacheKey, Category, Clock,
    DEFAULT_ISOCHRONE_TTL, DEFAULT_PER_TYPE_LIMIT, IsochroneCache, IsochroneError,
    IsochroneStore, RankedAmenityQuery, ReachabilityQuery, ReachabilityQueryError, RoutingEngine,
    RoutingError, StoreError, SystemClock, TravelMode,
};

#[cfg(feature = "store-sqlite")]
pub use reachscore_core::{SqliteStore, SqliteStoreError, initialise_schema};

#[cfg(feature = "data")]
pub use reachscore_data::{
    FetchError, HttpRoutingEngine, HttpRoutingEngineConfig, ImportError, ImportOutcome,
    OverpassQuery, ResilientFetcher, import_amenities,
};

#[cfg(feature = "scorer")]
pub use reachscore_scorer::{
    AmenityScorer, MAX_SCORE, ScoreConfigError, ScoreParams, build_importance_map, score,
};

#[cfg(feature = "test-support")]
pub use reachscore_core::test_support;

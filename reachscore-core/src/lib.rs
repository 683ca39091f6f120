//! Core domain types for the reachscore engine.
//!
//! The crate models reachability requests and amenities, defines the routing
//! and persistence collaborators, and hosts the two gates that sit between
//! them: [`IsochroneCache`] turns a request into a cached reachable-area
//! polygon and [`RankedAmenityQuery`] finds the nearest amenities of each
//! type inside that polygon.
//!
//! Constructors validate their input and return `Result` so that invalid
//! requests never reach a collaborator.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod amenity;
pub mod isochrone;
mod mode;
mod query;
mod ranked;
pub mod routing;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use amenity::{AmenityCategoryState, AmenityRecord, AmenityToggle, Category};
pub use isochrone::{
    Clock, DEFAULT_ISOCHRONE_TTL, IsochroneCache, IsochroneError, SystemClock, convex_hull,
    empty_polygon, is_empty_polygon,
};
pub use mode::TravelMode;
pub use query::{CacheKey, ReachabilityQuery, ReachabilityQueryError};
pub use ranked::{DEFAULT_PER_TYPE_LIMIT, RankedAmenityQuery};
pub use routing::{RoutingEngine, RoutingError};
pub use store::{AmenityStore, IsochroneStore, StoreError};
#[cfg(feature = "store-sqlite")]
pub use store::{SqliteStore, SqliteStoreError, initialise_schema};

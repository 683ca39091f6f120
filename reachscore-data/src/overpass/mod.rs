//! Amenity downloads from the Overpass API.
//!
//! [`OverpassQuery`] renders a boundary and an [`AmenitySelection`] into
//! Overpass QL, an [`AmenityService`] carries it to the interpreter, and
//! [`ResilientFetcher`] retries transient failures before converting the
//! validated payload into [`reachscore_core::AmenityRecord`]s.

mod error;
mod fetcher;
mod model;
mod query;
mod retry;
mod service;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::FetchError;
pub use fetcher::{FetchReport, ResilientFetcher};
pub use model::{Center, ElementKind, OverpassElement, OverpassResponse, OverpassTags};
pub use query::{AmenitySelection, DEFAULT_SERVER_TIMEOUT_SECS, OverpassQuery, OverpassQueryError};
pub use retry::{BackoffPolicy, RetryPolicy};
pub use service::{
    AmenityService, DEFAULT_OVERPASS_ENDPOINT, HttpAmenityService, OverpassConfig,
    ServiceResponse, TransportError,
};

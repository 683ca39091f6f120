//! Persistence traits for cached isochrones and amenities.
//!
//! [`IsochroneStore`] offers exact-match lookup and upsert of reachable-area
//! polygons; [`AmenityStore`] answers ranked nearest-per-type queries over
//! the amenity table. Coordinates are WGS84 (`x = longitude`,
//! `y = latitude`).

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::SystemTime;

use geo::{Coord, Polygon};
use thiserror::Error;

use crate::{AmenityRecord, ReachabilityQuery};

#[cfg(feature = "store-sqlite")]
mod functions;
#[cfg(feature = "store-sqlite")]
mod schema;
#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use schema::{UPSERT_AMENITY_SQL, initialise_schema};
#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteStore, SqliteStoreError};

/// Boxed error produced by a storage backend.
pub type BackendError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors surfaced by [`IsochroneStore`] and [`AmenityStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed while executing an operation.
    #[error("store backend failed during {operation}")]
    Backend {
        /// Operation that was being performed.
        operation: &'static str,
        /// Underlying backend error.
        #[source]
        source: BackendError,
    },
    /// A persisted value could not be decoded.
    #[error("failed to decode stored value during {operation}")]
    Decode {
        /// Operation that was being performed.
        operation: &'static str,
        /// Underlying decoding error.
        #[source]
        source: BackendError,
    },
}

impl StoreError {
    /// Wrap a backend error raised during `operation`.
    pub fn backend(operation: &'static str, source: impl Into<BackendError>) -> Self {
        Self::Backend {
            operation,
            source: source.into(),
        }
    }

    /// Wrap a decoding error raised during `operation`.
    pub fn decode(operation: &'static str, source: impl Into<BackendError>) -> Self {
        Self::Decode {
            operation,
            source: source.into(),
        }
    }
}

/// Lookup and upsert of cached reachable-area polygons.
///
/// Records are keyed on mode, time budget and exact origin. Records are
/// never deleted; stale ones are overwritten by the next upsert.
pub trait IsochroneStore {
    /// Return the polygon stored for `query` if it was written strictly after
    /// `fresh_after`.
    fn find_isochrone(
        &self,
        query: &ReachabilityQuery,
        fresh_after: SystemTime,
    ) -> Result<Option<Polygon<f64>>, StoreError>;

    /// Insert or overwrite the polygon for `query`, stamping it `created_at`.
    fn upsert_isochrone(
        &self,
        query: &ReachabilityQuery,
        polygon: &Polygon<f64>,
        created_at: SystemTime,
    ) -> Result<(), StoreError>;
}

/// Ranked nearest-per-type amenity lookup.
pub trait AmenityStore {
    /// Return at most `per_type` amenities of each type in `types` that lie
    /// strictly inside `polygon`.
    ///
    /// Results carry their geodesic distance to `origin` in metres and are
    /// ordered by amenity type, then ascending distance.
    fn nearest_amenities(
        &self,
        polygon: &Polygon<f64>,
        origin: Coord<f64>,
        types: &[String],
        per_type: usize,
    ) -> Result<Vec<AmenityRecord>, StoreError>;
}

impl<T: IsochroneStore + ?Sized> IsochroneStore for &T {
    fn find_isochrone(
        &self,
        query: &ReachabilityQuery,
        fresh_after: SystemTime,
    ) -> Result<Option<Polygon<f64>>, StoreError> {
        (**self).find_isochrone(query, fresh_after)
    }

    fn upsert_isochrone(
        &self,
        query: &ReachabilityQuery,
        polygon: &Polygon<f64>,
        created_at: SystemTime,
    ) -> Result<(), StoreError> {
        (**self).upsert_isochrone(query, polygon, created_at)
    }
}

impl<T: IsochroneStore + ?Sized> IsochroneStore for Arc<T> {
    fn find_isochrone(
        &self,
        query: &ReachabilityQuery,
        fresh_after: SystemTime,
    ) -> Result<Option<Polygon<f64>>, StoreError> {
        (**self).find_isochrone(query, fresh_after)
    }

    fn upsert_isochrone(
        &self,
        query: &ReachabilityQuery,
        polygon: &Polygon<f64>,
        created_at: SystemTime,
    ) -> Result<(), StoreError> {
        (**self).upsert_isochrone(query, polygon, created_at)
    }
}

impl<T: AmenityStore + ?Sized> AmenityStore for &T {
    fn nearest_amenities(
        &self,
        polygon: &Polygon<f64>,
        origin: Coord<f64>,
        types: &[String],
        per_type: usize,
    ) -> Result<Vec<AmenityRecord>, StoreError> {
        (**self).nearest_amenities(polygon, origin, types, per_type)
    }
}

impl<T: AmenityStore + ?Sized> AmenityStore for Arc<T> {
    fn nearest_amenities(
        &self,
        polygon: &Polygon<f64>,
        origin: Coord<f64>,
        types: &[String],
        per_type: usize,
    ) -> Result<Vec<AmenityRecord>, StoreError> {
        (**self).nearest_amenities(polygon, origin, types, per_type)
    }
}

/// Milliseconds since the Unix epoch, saturating at the `i64` range.
///
/// Times before the epoch map to negative values.
pub fn unix_millis(time: SystemTime) -> i64 {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_millis())
            .map_or(i64::MIN, |millis| -millis),
    }
}

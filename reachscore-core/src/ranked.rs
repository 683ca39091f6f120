//! Nearest-K-per-type amenity lookup inside a reachable area.

use geo::{Coord, Polygon};
use log::debug;

use crate::{AmenityRecord, AmenityStore, StoreError};

/// Number of amenities kept per type unless configured otherwise.
pub const DEFAULT_PER_TYPE_LIMIT: usize = 2;

/// Ranked amenity query over an [`AmenityStore`].
///
/// For every requested amenity type the query keeps the nearest few records
/// that lie strictly inside the polygon. Results are ordered by amenity type,
/// then ascending geodesic distance from the origin.
#[derive(Debug, Clone)]
pub struct RankedAmenityQuery<S> {
    store: S,
    per_type: usize,
}

impl<S: AmenityStore> RankedAmenityQuery<S> {
    /// Create a query keeping [`DEFAULT_PER_TYPE_LIMIT`] records per type.
    pub const fn new(store: S) -> Self {
        Self {
            store,
            per_type: DEFAULT_PER_TYPE_LIMIT,
        }
    }

    /// Keep at most `per_type` records for each amenity type.
    #[must_use]
    pub fn with_per_type_limit(mut self, per_type: usize) -> Self {
        self.per_type = per_type;
        self
    }

    /// Records kept per amenity type.
    pub const fn per_type_limit(&self) -> usize {
        self.per_type
    }

    /// Run the query.
    ///
    /// An empty `enabled_types` slice returns no records without consulting
    /// the store.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`] from the backing store.
    pub fn query(
        &self,
        polygon: &Polygon<f64>,
        origin: Coord<f64>,
        enabled_types: &[String],
    ) -> Result<Vec<AmenityRecord>, StoreError> {
        if enabled_types.is_empty() {
            debug!("no amenity types enabled; skipping ranked query");
            return Ok(Vec::new());
        }
        self.store
            .nearest_amenities(polygon, origin, enabled_types, self.per_type)
    }
}

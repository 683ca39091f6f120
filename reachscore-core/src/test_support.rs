//! In-memory collaborators for unit and behaviour tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, SystemTime};

use geo::{Contains, Coord, Distance, Geodesic, LineString, Point, Polygon};

use crate::store::unix_millis;
use crate::{
    AmenityRecord, AmenityStore, CacheKey, Clock, IsochroneStore, ReachabilityQuery,
    RoutingEngine, RoutingError, StoreError, TravelMode,
};

pub use crate::isochrone::empty_polygon;

/// Axis-aligned square centred on the origin with the given half side.
pub fn square(half_side: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            (-half_side, -half_side),
            (half_side, -half_side),
            (half_side, half_side),
            (-half_side, half_side),
            (-half_side, -half_side),
        ]),
        Vec::new(),
    )
}

/// Scripted [`RoutingEngine`] that counts its calls.
#[derive(Debug)]
pub struct StubRoutingEngine {
    response: Result<Vec<Coord<f64>>, RoutingError>,
    delay: Duration,
    calls: AtomicUsize,
    last_request: Mutex<Option<(Coord<f64>, TravelMode, u32)>>,
}

impl StubRoutingEngine {
    /// Engine returning `points` for every request.
    pub fn with_points(points: Vec<Coord<f64>>) -> Self {
        Self::respond(Ok(points))
    }

    /// Engine failing every request with `error`.
    pub fn with_error(error: RoutingError) -> Self {
        Self::respond(Err(error))
    }

    fn respond(response: Result<Vec<Coord<f64>>, RoutingError>) -> Self {
        Self {
            response,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Sleep for `delay` inside every request.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of requests served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Minutes passed with the most recent request.
    pub fn last_minutes(&self) -> Option<u32> {
        self.last_request
            .lock()
            .ok()
            .and_then(|last| last.as_ref().map(|(_, _, minutes)| *minutes))
    }
}

impl RoutingEngine for StubRoutingEngine {
    fn reachable_points(
        &self,
        origin: Coord<f64>,
        mode: TravelMode,
        minutes: u32,
    ) -> Result<Vec<Coord<f64>>, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some((origin, mode, minutes));
        }
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.response.clone()
    }
}

/// [`IsochroneStore`] keeping records in a map.
#[derive(Debug, Default)]
pub struct MemoryIsochroneStore {
    records: Mutex<HashMap<CacheKey, (Polygon<f64>, i64)>>,
}

impl MemoryIsochroneStore {
    /// Number of stored records, stale ones included.
    pub fn len(&self) -> usize {
        self.records.lock().map_or(0, |records| records.len())
    }

    /// Report whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IsochroneStore for MemoryIsochroneStore {
    fn find_isochrone(
        &self,
        query: &ReachabilityQuery,
        fresh_after: SystemTime,
    ) -> Result<Option<Polygon<f64>>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::backend("find isochrone", "memory store poisoned"))?;
        let cutoff = unix_millis(fresh_after);
        Ok(records
            .get(&query.cache_key())
            .filter(|(_, created_at)| *created_at > cutoff)
            .map(|(polygon, _)| polygon.clone()))
    }

    fn upsert_isochrone(
        &self,
        query: &ReachabilityQuery,
        polygon: &Polygon<f64>,
        created_at: SystemTime,
    ) -> Result<(), StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::backend("upsert isochrone", "memory store poisoned"))?;
        records.insert(query.cache_key(), (polygon.clone(), unix_millis(created_at)));
        Ok(())
    }
}

/// [`AmenityStore`] ranking a fixed set of amenities with a linear scan.
#[derive(Debug, Default)]
pub struct MemoryAmenityStore {
    amenities: Vec<AmenityRecord>,
    queries: AtomicUsize,
}

impl MemoryAmenityStore {
    /// Create a store holding `amenities`.
    pub fn with_amenities<I>(amenities: I) -> Self
    where
        I: IntoIterator<Item = AmenityRecord>,
    {
        Self {
            amenities: amenities.into_iter().collect(),
            queries: AtomicUsize::new(0),
        }
    }

    /// Number of queries answered so far.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl AmenityStore for MemoryAmenityStore {
    fn nearest_amenities(
        &self,
        polygon: &Polygon<f64>,
        origin: Coord<f64>,
        types: &[String],
        per_type: usize,
    ) -> Result<Vec<AmenityRecord>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let mut grouped: BTreeMap<&str, Vec<AmenityRecord>> = BTreeMap::new();
        for amenity in &self.amenities {
            if !types.contains(&amenity.amenity) || !polygon.contains(&Point::from(amenity.location))
            {
                continue;
            }
            let distance = Geodesic.distance(Point::from(origin), Point::from(amenity.location));
            grouped
                .entry(amenity.amenity.as_str())
                .or_default()
                .push(amenity.clone().with_distance(distance));
        }

        Ok(grouped
            .into_values()
            .flat_map(|mut group| {
                group.sort_by(|a, b| {
                    a.distance_m
                        .partial_cmp(&b.distance_m)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.id.cmp(&b.id))
                });
                group.truncate(per_type);
                group
            })
            .collect())
    }
}

/// [`Clock`] that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))
    }
}

impl ManualClock {
    /// Clock reading `start` until advanced.
    pub fn starting_at(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `step`.
    pub fn advance(&self, step: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += step;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        self.now
            .lock()
            .map_or(SystemTime::UNIX_EPOCH, |now| *now)
    }
}

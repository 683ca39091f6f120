//! Cache-or-compute gate for reachable-area polygons.
//!
//! [`IsochroneCache`] answers a [`ReachabilityQuery`] from its store when a
//! fresh record exists. Otherwise it asks the routing engine for reachable
//! points, takes their convex hull and persists the result before returning
//! it. Records older than the TTL read as misses and are overwritten.

mod hull;
mod locks;

use std::time::{Duration, SystemTime};

use geo::Polygon;
use log::{debug, info, warn};
use thiserror::Error;

use crate::{IsochroneStore, ReachabilityQuery, RoutingEngine, RoutingError, StoreError};

pub use hull::{convex_hull, empty_polygon, is_empty_polygon};
use locks::KeyedLocks;

/// Default lifetime of a cached isochrone: one day.
pub const DEFAULT_ISOCHRONE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Source of the current time.
pub trait Clock {
    /// Return the current time.
    fn now(&self) -> SystemTime;
}

/// [`Clock`] reading the operating-system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> SystemTime {
        (**self).now()
    }
}

/// Errors returned by [`IsochroneCache::get_or_compute`].
#[derive(Debug, Error)]
pub enum IsochroneError {
    /// Reading or writing the cache failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The routing engine failed for a reason other than missing data.
    #[error("routing failed: {0}")]
    Routing(#[from] RoutingError),
}

/// Read-through cache of reachable-area polygons.
///
/// Concurrent misses for the same query within one cache instance are
/// serialised, so the routing engine is called once and later callers read
/// the stored result.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use reachscore_core::{
///     IsochroneCache, ReachabilityQuery, RoutingEngine, RoutingError, SqliteStore, TravelMode,
/// };
///
/// struct Triangle;
///
/// impl RoutingEngine for Triangle {
///     fn reachable_points(
///         &self,
///         origin: Coord<f64>,
///         _mode: TravelMode,
///         _minutes: u32,
///     ) -> Result<Vec<Coord<f64>>, RoutingError> {
///         Ok(vec![
///             origin,
///             Coord { x: origin.x + 0.01, y: origin.y },
///             Coord { x: origin.x, y: origin.y + 0.01 },
///         ])
///     }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = IsochroneCache::new(SqliteStore::open_in_memory()?, Triangle);
/// let query = ReachabilityQuery::new(Coord { x: 7.62, y: 51.96 }, TravelMode::Walk, 600)?;
///
/// let first = cache.get_or_compute(&query)?;
/// let second = cache.get_or_compute(&query)?;
/// assert_eq!(first, second);
/// assert_eq!(cache.store().cached_isochrone_count()?, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct IsochroneCache<S, R, C = SystemClock> {
    store: S,
    routing: R,
    clock: C,
    ttl: Duration,
    locks: KeyedLocks,
}

impl<S, R> IsochroneCache<S, R> {
    /// Create a cache using the system clock and the default TTL.
    pub fn new(store: S, routing: R) -> Self {
        Self {
            store,
            routing,
            clock: SystemClock,
            ttl: DEFAULT_ISOCHRONE_TTL,
            locks: KeyedLocks::default(),
        }
    }
}

impl<S, R, C> IsochroneCache<S, R, C> {
    /// Replace the clock used for freshness checks and timestamps.
    #[must_use]
    pub fn with_clock<D>(self, clock: D) -> IsochroneCache<S, R, D> {
        IsochroneCache {
            store: self.store,
            routing: self.routing,
            clock,
            ttl: self.ttl,
            locks: self.locks,
        }
    }

    /// Replace the time-to-live of cached records.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Lifetime of cached records.
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The backing store.
    pub const fn store(&self) -> &S {
        &self.store
    }
}

impl<S, R, C> IsochroneCache<S, R, C>
where
    S: IsochroneStore,
    R: RoutingEngine,
    C: Clock,
{
    /// Return the reachable-area polygon for `query`.
    ///
    /// A fresh stored polygon is returned verbatim. Otherwise the polygon is
    /// computed, persisted and returned. Budgets under one minute and
    /// origins outside the routing data produce an empty polygon, which is
    /// cached like any other result.
    ///
    /// # Errors
    ///
    /// Returns [`IsochroneError::Store`] when the store fails and
    /// [`IsochroneError::Routing`] for routing failures other than
    /// [`RoutingError::DataUnavailable`].
    pub fn get_or_compute(&self, query: &ReachabilityQuery) -> Result<Polygon<f64>, IsochroneError> {
        self.locks
            .with_lock(query.cache_key(), || self.lookup_or_compute(query))
    }

    fn lookup_or_compute(&self, query: &ReachabilityQuery) -> Result<Polygon<f64>, IsochroneError> {
        let key = query.cache_key();
        let fresh_after = self
            .clock
            .now()
            .checked_sub(self.ttl)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        if let Some(polygon) = self.store.find_isochrone(query, fresh_after)? {
            debug!("isochrone cache hit for {key}");
            return Ok(polygon);
        }

        let polygon = self.compute(query)?;
        self.store
            .upsert_isochrone(query, &polygon, self.clock.now())?;
        info!("computed and cached isochrone for {key}");
        Ok(polygon)
    }

    fn compute(&self, query: &ReachabilityQuery) -> Result<Polygon<f64>, RoutingError> {
        let minutes = query.whole_minutes();
        if minutes < 1 {
            debug!(
                "budget of {}s is under a minute; nothing is reachable",
                query.time_seconds()
            );
            return Ok(empty_polygon());
        }
        match self
            .routing
            .reachable_points(query.origin(), query.mode(), minutes)
        {
            Ok(points) => Ok(convex_hull(points)),
            Err(err) if err.is_data_unavailable() => {
                warn!(
                    "routing data unavailable for {}: {err}; using an empty isochrone",
                    query.cache_key()
                );
                Ok(empty_polygon())
            }
            Err(err) => Err(err),
        }
    }
}

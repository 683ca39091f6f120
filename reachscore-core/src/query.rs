//! Reachability requests and the cache key derived from them.

use geo::Coord;
use thiserror::Error;

use crate::TravelMode;

/// A request for the area reachable from `origin` within a time budget.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude`. The triple
/// of mode, budget and exact origin identifies a cached isochrone; two
/// origins that differ by any amount are different keys.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use reachscore_core::{ReachabilityQuery, TravelMode};
///
/// # fn main() -> Result<(), reachscore_core::ReachabilityQueryError> {
/// let query = ReachabilityQuery::new(Coord { x: 7.6261, y: 51.9607 }, TravelMode::Walk, 900)?;
/// assert_eq!(query.whole_minutes(), 15);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReachabilityQuery {
    origin: Coord<f64>,
    mode: TravelMode,
    time_seconds: u32,
}

/// Errors returned by [`ReachabilityQuery::new`].
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ReachabilityQueryError {
    /// The time budget was zero.
    #[error("time budget must be a positive number of seconds")]
    NonPositiveBudget,
    /// A coordinate was NaN or infinite.
    #[error("origin coordinates must be finite (got {lon}, {lat})")]
    NonFiniteOrigin {
        /// Supplied longitude.
        lon: f64,
        /// Supplied latitude.
        lat: f64,
    },
    /// A coordinate was outside the WGS84 range.
    #[error("origin ({lon}, {lat}) is outside the valid longitude/latitude range")]
    OriginOutOfRange {
        /// Supplied longitude.
        lon: f64,
        /// Supplied latitude.
        lat: f64,
    },
}

impl ReachabilityQuery {
    /// Validate and construct a [`ReachabilityQuery`].
    ///
    /// Negative zero coordinates are normalised to positive zero so that the
    /// in-memory key and SQL equality agree.
    pub fn new(
        origin: Coord<f64>,
        mode: TravelMode,
        time_seconds: u32,
    ) -> Result<Self, ReachabilityQueryError> {
        if time_seconds == 0 {
            return Err(ReachabilityQueryError::NonPositiveBudget);
        }
        let (lon, lat) = (origin.x, origin.y);
        if !lon.is_finite() || !lat.is_finite() {
            return Err(ReachabilityQueryError::NonFiniteOrigin { lon, lat });
        }
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(ReachabilityQueryError::OriginOutOfRange { lon, lat });
        }
        Ok(Self {
            origin: Coord {
                x: lon + 0.0,
                y: lat + 0.0,
            },
            mode,
            time_seconds,
        })
    }

    /// Origin of the query (`x = longitude`, `y = latitude`).
    pub const fn origin(&self) -> Coord<f64> {
        self.origin
    }

    /// Travel mode.
    pub const fn mode(&self) -> TravelMode {
        self.mode
    }

    /// Time budget in seconds.
    pub const fn time_seconds(&self) -> u32 {
        self.time_seconds
    }

    /// Time budget truncated to whole minutes, as routing engines expect.
    pub const fn whole_minutes(&self) -> u32 {
        self.time_seconds / 60
    }

    /// Hashable identity of this query for in-process bookkeeping.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            mode: self.mode,
            time_seconds: self.time_seconds,
            lon_bits: self.origin.x.to_bits(),
            lat_bits: self.origin.y.to_bits(),
        }
    }
}

/// Exact-match identity of a cached isochrone.
///
/// Coordinates are compared by bit pattern, which matches floating-point
/// equality for the finite, zero-normalised values a [`ReachabilityQuery`]
/// admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    mode: TravelMode,
    time_seconds: u32,
    lon_bits: u64,
    lat_bits: u64,
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}s@({}, {})",
            self.mode,
            self.time_seconds,
            f64::from_bits(self.lon_bits),
            f64::from_bits(self.lat_bits)
        )
    }
}

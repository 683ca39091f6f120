//! Routing collaborator trait producing reachable destination points.

use std::sync::Arc;

use geo::Coord;

use crate::TravelMode;

use super::error::RoutingError;

/// Compute the destinations reachable from an origin within a time budget.
///
/// The returned points are raw samples; callers derive the reachable area
/// from them (see [`crate::IsochroneCache`]). An empty vector means nothing
/// is reachable.
///
/// # Examples
///
/// ```rust
/// use geo::Coord;
/// use reachscore_core::{RoutingEngine, RoutingError, TravelMode};
///
/// struct OriginOnly;
///
/// impl RoutingEngine for OriginOnly {
///     fn reachable_points(
///         &self,
///         origin: Coord<f64>,
///         _mode: TravelMode,
///         _minutes: u32,
///     ) -> Result<Vec<Coord<f64>>, RoutingError> {
///         Ok(vec![origin])
///     }
/// }
///
/// let points = OriginOnly.reachable_points(Coord { x: 1.0, y: 2.0 }, TravelMode::Walk, 5)?;
/// assert_eq!(points, vec![Coord { x: 1.0, y: 2.0 }]);
/// # Ok::<(), RoutingError>(())
/// ```
pub trait RoutingEngine {
    /// Return sample points reachable from `origin` within `minutes`.
    ///
    /// Implementations should return [`RoutingError::DataUnavailable`] when
    /// the origin lies outside their network data.
    fn reachable_points(
        &self,
        origin: Coord<f64>,
        mode: TravelMode,
        minutes: u32,
    ) -> Result<Vec<Coord<f64>>, RoutingError>;
}

impl<T: RoutingEngine + ?Sized> RoutingEngine for &T {
    fn reachable_points(
        &self,
        origin: Coord<f64>,
        mode: TravelMode,
        minutes: u32,
    ) -> Result<Vec<Coord<f64>>, RoutingError> {
        (**self).reachable_points(origin, mode, minutes)
    }
}

impl<T: RoutingEngine + ?Sized> RoutingEngine for Arc<T> {
    fn reachable_points(
        &self,
        origin: Coord<f64>,
        mode: TravelMode,
        minutes: u32,
    ) -> Result<Vec<Coord<f64>>, RoutingError> {
        (**self).reachable_points(origin, mode, minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubRoutingEngine;
    use rstest::rstest;

    #[rstest]
    fn references_and_arcs_delegate() {
        let stub = Arc::new(StubRoutingEngine::with_points(vec![Coord { x: 0.0, y: 0.0 }]));
        let by_ref = &*stub;
        by_ref
            .reachable_points(Coord { x: 0.0, y: 0.0 }, TravelMode::Walk, 1)
            .expect("stub succeeds");
        Arc::clone(&stub)
            .reachable_points(Coord { x: 0.0, y: 0.0 }, TravelMode::Walk, 1)
            .expect("stub succeeds");
        assert_eq!(stub.calls(), 2);
    }

    #[rstest]
    fn only_data_unavailable_is_flagged() {
        let missing = RoutingError::DataUnavailable {
            message: "no segment".to_owned(),
        };
        let parse = RoutingError::ParseError {
            message: "bad json".to_owned(),
        };
        assert!(missing.is_data_unavailable());
        assert!(!parse.is_data_unavailable());
    }
}

//! Distance-decayed, saturating amenity score on a `0..=10` scale.
#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use log::debug;
use reachscore_core::{AmenityCategoryState, AmenityRecord};

use crate::{ScoreConfigError, build_importance_map};

/// Highest score a location can reach.
pub const MAX_SCORE: f64 = 10.0;

/// Tunable constants of the scoring function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreParams {
    /// Floor applied to every category importance.
    pub min_importance: f64,
    /// Decay-weighted count at which an amenity type is about 63% saturated.
    pub density_strength: f64,
}

impl Default for ScoreParams {
    fn default() -> Self {
        Self {
            min_importance: 0.2,
            density_strength: 1.5,
        }
    }
}

impl ScoreParams {
    /// Replace the importance floor.
    #[must_use]
    pub const fn with_min_importance(mut self, min_importance: f64) -> Self {
        self.min_importance = min_importance;
        self
    }

    /// Replace the saturation constant.
    #[must_use]
    pub const fn with_density_strength(mut self, density_strength: f64) -> Self {
        self.density_strength = density_strength;
        self
    }
}

/// Scores a set of amenities against the user's category preferences.
///
/// Each record contributes `exp(-distance / max_distance)`; contributions
/// are summed per amenity type and passed through
/// `1 - exp(-sum / density_strength)` so that many instances of one type
/// cannot dominate. Saturated values are weighted by type importance and
/// normalised against the sum of all importances, including types with no
/// nearby amenity.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use reachscore_core::{AmenityCategoryState, AmenityRecord, Category};
/// use reachscore_scorer::{AmenityScorer, ScoreParams};
///
/// let state = AmenityCategoryState::new()
///     .with_category("mobility", Category::new(10, true).with_amenity("parking", true));
/// let parking = AmenityRecord::new("node/1", "parking", Coord { x: 0.0, y: 0.0 })
///     .with_distance(0.0);
///
/// let scorer = AmenityScorer::new(500.0, ScoreParams::default())?;
/// let score = scorer.score(&[parking], &state);
/// assert!(score > 0.0 && score <= 10.0);
/// # Ok::<(), reachscore_scorer::ScoreConfigError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmenityScorer {
    max_distance: f64,
    params: ScoreParams,
}

impl AmenityScorer {
    /// Validate the parameters and build a scorer.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreConfigError`] when `max_distance` or
    /// `params.density_strength` is not positive and finite, or when
    /// `params.min_importance` lies outside `0.0..=1.0`.
    pub fn new(max_distance: f64, params: ScoreParams) -> Result<Self, ScoreConfigError> {
        if !(max_distance.is_finite() && max_distance > 0.0) {
            return Err(ScoreConfigError::MaxDistance {
                value: max_distance,
            });
        }
        if !(0.0..=1.0).contains(&params.min_importance) {
            return Err(ScoreConfigError::MinImportance {
                value: params.min_importance,
            });
        }
        if !(params.density_strength.is_finite() && params.density_strength > 0.0) {
            return Err(ScoreConfigError::DensityStrength {
                value: params.density_strength,
            });
        }
        Ok(Self {
            max_distance,
            params,
        })
    }

    /// Distance in metres over which contributions decay by a factor of `e`.
    #[must_use]
    pub const fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// Active parameters.
    #[must_use]
    pub const fn params(&self) -> ScoreParams {
        self.params
    }

    /// Weight of a single amenity `distance_m` metres away, in `(0, 1]`.
    ///
    /// Negative distances count as zero.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "exponential distance decay")]
    pub fn distance_decay(&self, distance_m: f64) -> f64 {
        (-distance_m.max(0.0) / self.max_distance).exp()
    }

    /// Diminishing-returns transform of a per-type decay sum, in `[0, 1)`.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "exponential saturation curve")]
    pub fn saturation(&self, weighted_sum: f64) -> f64 {
        1.0 - (-weighted_sum.max(0.0) / self.params.density_strength).exp()
    }

    /// Score `amenities` against `state`, rounded to two decimals.
    ///
    /// Returns `0.0` when there are no amenities or no enabled amenity
    /// types. Records without a finite distance and records whose type has
    /// no importance are ignored.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "scores are weighted sums normalised to a fixed scale"
    )]
    pub fn score(&self, amenities: &[AmenityRecord], state: &AmenityCategoryState) -> f64 {
        if amenities.is_empty() {
            return 0.0;
        }
        let importance = build_importance_map(state, self.params.min_importance);
        if importance.is_empty() {
            return 0.0;
        }

        let mut weighted: BTreeMap<&str, f64> = BTreeMap::new();
        for record in amenities {
            let Some(distance) = record.distance_m.filter(|value| value.is_finite()) else {
                continue;
            };
            if importance.contains_key(record.amenity.as_str()) {
                *weighted.entry(record.amenity.as_str()).or_insert(0.0) +=
                    self.distance_decay(distance);
            }
        }

        let raw = weighted
            .iter()
            .filter_map(|(amenity, sum)| {
                importance
                    .get(*amenity)
                    .map(|weight| weight * self.saturation(*sum))
            })
            .fold(0.0, |total, contribution| total + contribution);
        let max_possible = importance.values().fold(0.0, |total, weight| total + weight);
        if max_possible <= 0.0 {
            return 0.0;
        }

        let score = round_to_hundredths((raw / max_possible * MAX_SCORE).min(MAX_SCORE));
        debug!(
            "scored {} amenities across {} matched types: {score}",
            amenities.len(),
            weighted.len()
        );
        score
    }
}

/// Score `amenities` with validated parameters in one call.
///
/// # Errors
///
/// See [`AmenityScorer::new`].
pub fn score(
    amenities: &[AmenityRecord],
    state: &AmenityCategoryState,
    max_distance: f64,
    params: ScoreParams,
) -> Result<f64, ScoreConfigError> {
    AmenityScorer::new(max_distance, params).map(|scorer| scorer.score(amenities, state))
}

#[expect(clippy::float_arithmetic, reason = "rounding to two decimals")]
fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

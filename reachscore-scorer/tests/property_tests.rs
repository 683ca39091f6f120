#![expect(
    clippy::expect_used,
    reason = "tests should fail fast when setup breaks"
)]
#![expect(
    clippy::float_arithmetic,
    reason = "properties compare float sums and differences"
)]

//! Property-based tests for importance and scoring.
//!
//! # Invariants tested
//!
//! - **Importance bounds:** every importance lies in `[min_importance, 1]`.
//! - **Distance decay:** moving an amenity further away never raises its
//!   weight.
//! - **Saturation:** each extra unit of weight adds less than the one before.
//! - **Score range:** scores stay within `0..=10`.

use geo::Coord;
use proptest::prelude::*;
use reachscore_core::{AmenityCategoryState, AmenityRecord, Category};
use reachscore_scorer::{AmenityScorer, MAX_SCORE, ScoreParams, build_importance_map};

const AMENITY_TYPES: [&str; 4] = ["cafe", "library", "parking", "pharmacy"];

/// Strategy producing up to six categories with random ranks and flags.
fn category_state() -> impl Strategy<Value = AmenityCategoryState> {
    prop::collection::vec(
        (-1_000_i64..1_000, any::<bool>(), prop::sample::subsequence(AMENITY_TYPES.to_vec(), 0..=4)),
        0..6,
    )
    .prop_map(|categories| {
        categories.into_iter().enumerate().fold(
            AmenityCategoryState::new(),
            |state, (index, (rank, enabled, amenities))| {
                let category = amenities
                    .into_iter()
                    .fold(Category::new(rank, enabled), |category, amenity| {
                        category.with_amenity(amenity, true)
                    });
                state.with_category(format!("category-{index}"), category)
            },
        )
    })
}

fn amenities() -> impl Strategy<Value = Vec<AmenityRecord>> {
    prop::collection::vec(
        (prop::sample::select(AMENITY_TYPES.to_vec()), 0.0_f64..5_000.0),
        0..20,
    )
    .prop_map(|records| {
        records
            .into_iter()
            .enumerate()
            .map(|(index, (amenity, distance))| {
                AmenityRecord::new(format!("node/{index}"), amenity, Coord { x: 0.0, y: 0.0 })
                    .with_distance(distance)
            })
            .collect()
    })
}

fn scorer(max_distance: f64) -> AmenityScorer {
    AmenityScorer::new(max_distance, ScoreParams::default()).expect("valid parameters")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: importance never falls below the floor or rises above one.
    #[test]
    fn importance_is_bounded(state in category_state(), min_importance in 0.0_f64..=1.0) {
        let importance = build_importance_map(&state, min_importance);
        for (amenity, weight) in &importance {
            prop_assert!(
                (min_importance..=1.0).contains(weight),
                "{amenity} has importance {weight} outside [{min_importance}, 1]"
            );
        }
    }

    /// Property: a nearer amenity weighs at least as much as a farther one.
    #[test]
    fn distance_decay_is_monotonic(
        near in 0.0_f64..10_000.0,
        extra in 0.0_f64..10_000.0,
        max_distance in 1.0_f64..5_000.0,
    ) {
        let scorer = scorer(max_distance);
        let near_weight = scorer.distance_decay(near);
        let far_weight = scorer.distance_decay(near + extra);
        prop_assert!(far_weight <= near_weight);
        prop_assert!(far_weight >= 0.0 && near_weight <= 1.0);
    }

    /// Property: saturation gains shrink as the weighted sum grows.
    #[test]
    fn saturation_has_diminishing_returns(sum in 0.0_f64..20.0, step in 0.01_f64..2.0) {
        let scorer = scorer(500.0);
        let first_gain = scorer.saturation(sum + step) - scorer.saturation(sum);
        let second_gain = scorer.saturation(sum + 2.0 * step) - scorer.saturation(sum + step);
        prop_assert!(second_gain <= first_gain + 1e-12);
        prop_assert!(scorer.saturation(sum) < 1.0);
    }

    /// Property: scores stay on the documented scale and are repeatable.
    #[test]
    fn scores_stay_in_range(state in category_state(), records in amenities()) {
        let scorer = scorer(500.0);
        let first = scorer.score(&records, &state);
        prop_assert!((0.0..=MAX_SCORE).contains(&first), "score {first} out of range");
        prop_assert_eq!(first.to_bits(), scorer.score(&records, &state).to_bits());
    }
}

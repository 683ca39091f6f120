//! Unit coverage for importance and score computation.
#![expect(
    clippy::expect_used,
    reason = "tests should fail fast when setup breaks"
)]
#![expect(
    clippy::float_arithmetic,
    reason = "tests compare floats within a tolerance"
)]

use geo::Coord;
use reachscore_core::{AmenityCategoryState, AmenityRecord, Category};
use rstest::{fixture, rstest};

use crate::{AmenityScorer, ScoreConfigError, ScoreParams, build_importance_map, score};

fn assert_close(actual: f64, expected: f64) {
    let delta = (actual - expected).abs();
    assert!(delta <= 1e-9, "expected {expected}, got {actual}");
}

fn amenity(amenity: &str, distance_m: f64) -> AmenityRecord {
    AmenityRecord::new(
        format!("node/{amenity}/{distance_m}"),
        amenity,
        Coord { x: 0.0, y: 0.0 },
    )
    .with_distance(distance_m)
}

/// Preferences used throughout: mobility first, education second, food
/// last, health disabled.
#[fixture]
fn state() -> AmenityCategoryState {
    AmenityCategoryState::new()
        .with_category(
            "mobility",
            Category::new(10, true).with_amenity("parking", true),
        )
        .with_category(
            "food_and_drinks",
            Category::new(50, true)
                .with_amenity("restaurant", true)
                .with_amenity("cafe", true)
                .with_amenity("bar", false),
        )
        .with_category(
            "education",
            Category::new(30, true).with_amenity("library", true),
        )
        .with_category(
            "health",
            Category::new(20, false).with_amenity("pharmacy", true),
        )
}

#[fixture]
fn scorer() -> AmenityScorer {
    AmenityScorer::new(500.0, ScoreParams::default()).expect("valid parameters")
}

#[rstest]
fn importance_interpolates_between_ranks(state: AmenityCategoryState) {
    let importance = build_importance_map(&state, 0.2);

    let keys: Vec<_> = importance.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["cafe", "library", "parking", "restaurant"]);
    assert_close(importance.get("parking").copied().unwrap_or_default(), 1.0);
    assert_close(importance.get("library").copied().unwrap_or_default(), 0.5);
    assert_close(importance.get("restaurant").copied().unwrap_or_default(), 0.2);
    assert_close(importance.get("cafe").copied().unwrap_or_default(), 0.2);
}

#[rstest]
fn importance_ignores_disabled_categories_when_normalising() {
    // The disabled rank 1 category must not stretch the span.
    let state = AmenityCategoryState::new()
        .with_category("a", Category::new(1, false).with_amenity("bank", true))
        .with_category("b", Category::new(10, true).with_amenity("cafe", true))
        .with_category("c", Category::new(20, true).with_amenity("bar", true));

    let importance = build_importance_map(&state, 0.0);

    assert_eq!(importance.get("bank"), None);
    assert_close(importance.get("cafe").copied().unwrap_or_default(), 1.0);
    assert_close(importance.get("bar").copied().unwrap_or_default(), 0.0);
}

#[rstest]
fn equal_ranks_share_full_importance() {
    let state = AmenityCategoryState::new()
        .with_category("a", Category::new(5, true).with_amenity("cafe", true))
        .with_category("b", Category::new(5, true).with_amenity("bar", true));

    let importance = build_importance_map(&state, 0.2);

    assert_eq!(importance.values().copied().collect::<Vec<_>>(), vec![1.0, 1.0]);
}

#[rstest]
fn overlapping_amenity_takes_last_category_in_name_order() {
    let state = AmenityCategoryState::new()
        .with_category("a", Category::new(0, true).with_amenity("cafe", true))
        .with_category("b", Category::new(10, true).with_amenity("cafe", true));

    let importance = build_importance_map(&state, 0.3);

    assert_close(importance.get("cafe").copied().unwrap_or_default(), 0.3);
}

#[rstest]
fn no_enabled_categories_yield_no_importance() {
    let state = AmenityCategoryState::new()
        .with_category("a", Category::new(0, false).with_amenity("cafe", true));

    assert!(build_importance_map(&state, 0.2).is_empty());
}

#[rstest]
fn reference_location_scores_deterministically(
    scorer: AmenityScorer,
    state: AmenityCategoryState,
) {
    let amenities = vec![
        amenity("restaurant", 140.0),
        amenity("cafe", 120.0),
        amenity("bar", 170.0),
        amenity("pharmacy", 150.0),
        amenity("library", 125.0),
        amenity("parking", 100.0),
        amenity("parking", 100.0),
    ];

    let first = scorer.score(&amenities, &state);
    let second = scorer.score(&amenities, &state);

    assert_close(first, 5.41);
    assert_close(first, second);
}

#[rstest]
fn empty_inputs_score_zero(scorer: AmenityScorer, state: AmenityCategoryState) {
    assert_close(scorer.score(&[], &state), 0.0);
    assert_close(
        scorer.score(&[amenity("cafe", 10.0)], &AmenityCategoryState::new()),
        0.0,
    );
}

#[rstest]
fn unmatched_and_undistanced_records_are_ignored(
    scorer: AmenityScorer,
    state: AmenityCategoryState,
) {
    let without_distance =
        AmenityRecord::new("node/1", "parking", Coord { x: 0.0, y: 0.0 });
    let amenities = vec![without_distance, amenity("bar", 0.0), amenity("pharmacy", 0.0)];

    assert_close(scorer.score(&amenities, &state), 0.0);
}

#[rstest]
fn score_never_exceeds_ten(scorer: AmenityScorer) {
    let state = AmenityCategoryState::new()
        .with_category("a", Category::new(0, true).with_amenity("cafe", true));
    let amenities: Vec<_> = (0..200).map(|_| amenity("cafe", 0.0)).collect();

    let value = scorer.score(&amenities, &state);

    assert!(value <= 10.0);
    assert_close(value, 10.0);
}

#[rstest]
fn missing_types_are_penalised(scorer: AmenityScorer, state: AmenityCategoryState) {
    let parking_only = scorer.score(&[amenity("parking", 0.0)], &state);
    let with_library = scorer.score(&[amenity("parking", 0.0), amenity("library", 0.0)], &state);

    assert!(with_library > parking_only);
}

#[rstest]
#[case(0.0)]
#[case(-5.0)]
#[case(f64::NAN)]
#[case(f64::INFINITY)]
fn invalid_max_distance_is_rejected(#[case] max_distance: f64) {
    let err = AmenityScorer::new(max_distance, ScoreParams::default()).expect_err("invalid");
    assert!(matches!(err, ScoreConfigError::MaxDistance { .. }));
}

#[rstest]
#[case(ScoreParams::default().with_min_importance(1.5))]
#[case(ScoreParams::default().with_min_importance(-0.1))]
fn invalid_min_importance_is_rejected(#[case] params: ScoreParams) {
    let err = AmenityScorer::new(500.0, params).expect_err("invalid");
    assert!(matches!(err, ScoreConfigError::MinImportance { .. }));
}

#[rstest]
fn invalid_density_strength_is_rejected() {
    let err = score(
        &[],
        &AmenityCategoryState::new(),
        500.0,
        ScoreParams::default().with_density_strength(0.0),
    )
    .expect_err("invalid");
    assert!(matches!(err, ScoreConfigError::DensityStrength { .. }));
}

#[rstest]
fn preferences_load_from_json() {
    let json = r#"{
        "mobility": {"rank": 10, "enabled": true, "amenities": {"parking": {"enabled": true}}},
        "health": {"rank": 20, "enabled": false}
    }"#;
    let state: AmenityCategoryState = serde_json::from_str(json).expect("valid preferences");

    let importance = build_importance_map(&state, 0.2);

    assert_eq!(importance.len(), 1);
    assert_close(importance.get("parking").copied().unwrap_or_default(), 1.0);
}

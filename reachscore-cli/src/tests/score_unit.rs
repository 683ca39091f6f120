//! Focused unit tests covering score configuration and execution.

use super::helpers::{CATEGORIES_JSON, utf8_tempdir, write_utf8};
use super::*;
use camino::Utf8PathBuf;
use crate::score::{
    DEFAULT_TIME_SECONDS, FALLBACK_MAX_DISTANCE_M, ScoreArgs, ScoreConfig, ScoreServices,
    ScoreServicesBuilder, config_from_layers_for_test, execute_score, farthest_distance,
};
use geo::Coord;
use reachscore_core::test_support::{MemoryAmenityStore, MemoryIsochroneStore, StubRoutingEngine};
use reachscore_core::{AmenityRecord, TravelMode};
use rstest::rstest;
use std::sync::Arc;

fn complete_args() -> ScoreArgs {
    ScoreArgs {
        lon: Some(7.62),
        lat: Some(51.96),
        categories: Some(Utf8PathBuf::from("categories.json")),
        ..ScoreArgs::default()
    }
}

struct FixedServices {
    amenities: Vec<AmenityRecord>,
    points: Vec<Coord<f64>>,
}

impl ScoreServicesBuilder for FixedServices {
    fn build(&self, _config: &ScoreConfig) -> Result<ScoreServices, CliError> {
        Ok(ScoreServices {
            isochrones: Arc::new(MemoryIsochroneStore::default()),
            amenities: Arc::new(MemoryAmenityStore::with_amenities(self.amenities.clone())),
            routing: Arc::new(StubRoutingEngine::with_points(self.points.clone())),
        })
    }
}

#[rstest]
#[case::missing_lon(ScoreArgs { lon: None, ..complete_args() }, ARG_SCORE_LON, ENV_SCORE_LON)]
#[case::missing_lat(ScoreArgs { lat: None, ..complete_args() }, ARG_SCORE_LAT, ENV_SCORE_LAT)]
#[case::missing_categories(
    ScoreArgs { categories: None, ..complete_args() },
    ARG_SCORE_CATEGORIES,
    ENV_SCORE_CATEGORIES
)]
fn converting_without_required_fields_errors(
    #[case] args: ScoreArgs,
    #[case] expected_field: &'static str,
    #[case] expected_env: &'static str,
) {
    let err = ScoreConfig::try_from(args).expect_err("missing field should error");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, expected_field);
            assert_eq!(env, expected_env);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn score_config_applies_defaults() {
    let config = ScoreConfig::try_from(complete_args()).expect("config should build");

    assert_eq!(config.origin, Coord { x: 7.62, y: 51.96 });
    assert_eq!(config.mode, TravelMode::Walk);
    assert_eq!(config.time_seconds, DEFAULT_TIME_SECONDS);
    assert_eq!(config.database, Utf8PathBuf::from(DEFAULT_DATABASE));
    assert_eq!(config.osrm_base_url, "http://localhost:5000");
    assert_eq!(config.max_distance, None);
    assert_eq!(config.per_type, 2);
}

#[rstest]
fn validate_sources_reports_missing_categories() {
    let (_tmp, root) = utf8_tempdir();
    let database = root.join("reachscore.db");
    write_utf8(&database, b"");
    let config = ScoreConfig {
        categories: root.join("missing.json"),
        database,
        ..ScoreConfig::try_from(complete_args()).expect("config should build")
    };

    let err = config.validate_sources().expect_err("expected failure");
    match err {
        CliError::MissingSourceFile { field, .. } => assert_eq!(field, ARG_SCORE_CATEGORIES),
        other => panic!("expected MissingSourceFile, found {other:?}"),
    }
}

#[rstest]
fn validate_sources_rejects_directories() {
    let (_tmp, root) = utf8_tempdir();
    let categories = root.join("categories.json");
    write_utf8(&categories, CATEGORIES_JSON.as_bytes());
    let config = ScoreConfig {
        categories,
        database: root.clone(),
        ..ScoreConfig::try_from(complete_args()).expect("config should build")
    };

    let err = config.validate_sources().expect_err("expected failure");
    match err {
        CliError::SourcePathNotFile { field, .. } => assert_eq!(field, ARG_SCORE_DATABASE),
        other => panic!("expected SourcePathNotFile, found {other:?}"),
    }
}

#[rstest]
fn invalid_category_json_is_reported() {
    let (_tmp, root) = utf8_tempdir();
    let categories = root.join("categories.json");
    write_utf8(&categories, b"{ not json");
    let config = ScoreConfig {
        categories: categories.clone(),
        ..ScoreConfig::try_from(complete_args()).expect("config should build")
    };
    let builder = FixedServices {
        amenities: Vec::new(),
        points: Vec::new(),
    };

    let err = execute_score(&config, &builder).expect_err("invalid JSON should fail");
    match err {
        CliError::ParseInput { field, path, .. } => {
            assert_eq!(field, ARG_SCORE_CATEGORIES);
            assert_eq!(path, categories);
        }
        other => panic!("expected ParseInput, found {other:?}"),
    }
}

#[rstest]
fn out_of_range_origin_is_rejected_before_routing() {
    let config = ScoreConfig {
        origin: Coord { x: 200.0, y: 0.0 },
        ..ScoreConfig::try_from(complete_args()).expect("config should build")
    };

    let err = config.query().expect_err("origin out of range");
    assert!(matches!(err, CliError::InvalidQuery(_)));
}

#[rstest]
fn unreachable_origin_scores_zero() {
    let (_tmp, root) = utf8_tempdir();
    let categories = root.join("categories.json");
    write_utf8(&categories, CATEGORIES_JSON.as_bytes());
    let config = ScoreConfig {
        categories,
        ..ScoreConfig::try_from(complete_args()).expect("config should build")
    };
    let builder = FixedServices {
        amenities: vec![AmenityRecord::new(
            "node/1",
            "cafe",
            Coord { x: 7.62, y: 51.9601 },
        )],
        points: Vec::new(),
    };

    let report = execute_score(&config, &builder).expect("score should succeed");

    assert_eq!(report.score, 0.0);
    assert!(report.amenities.is_empty());
    assert!(report.isochrone.exterior().0.is_empty());
    assert_eq!(report.max_distance, FALLBACK_MAX_DISTANCE_M);
}

#[rstest]
#[case::empty(vec![], FALLBACK_MAX_DISTANCE_M)]
#[case::zero(vec![Some(0.0)], FALLBACK_MAX_DISTANCE_M)]
#[case::farthest(vec![Some(120.0), None, Some(f64::INFINITY), Some(340.0)], 340.0)]
fn farthest_distance_picks_the_decay_distance(
    #[case] distances: Vec<Option<f64>>,
    #[case] expected: f64,
) {
    let records: Vec<_> = distances
        .into_iter()
        .enumerate()
        .map(|(index, distance)| {
            let record =
                AmenityRecord::new(format!("node/{index}"), "cafe", Coord { x: 0.0, y: 0.0 });
            match distance {
                Some(metres) => record.with_distance(metres),
                None => record,
            }
        })
        .collect();

    assert_eq!(farthest_distance(&records), expected);
}

#[rstest]
fn clap_accepts_negative_coordinates_and_modes() {
    let cli = Cli::try_parse_from([
        "reachscore",
        "score",
        "--lon",
        "-0.1276",
        "--lat",
        "51.5072",
        "--mode",
        "bike",
        "--time-seconds",
        "600",
    ])
    .expect("arguments should parse");

    match cli.command {
        Command::Score(args) => {
            assert_eq!(args.lon, Some(-0.1276));
            assert_eq!(args.lat, Some(51.5072));
            assert_eq!(args.mode, Some(TravelMode::Bike));
            assert_eq!(args.time_seconds, Some(600));
        }
        Command::Import(_) => panic!("expected score command"),
    }
}

#[rstest]
fn clap_rejects_unknown_modes() {
    let err = Cli::try_parse_from(["reachscore", "score", "--mode", "teleport"])
        .expect_err("unknown mode should fail");
    assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "lon": "east" }));

    let err = config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "lon": 1.0,
            "lat": 2.0,
            "osrm_base_url": "http://from-file:5000",
            "mode": "car",
        }),
        None,
    );
    composer.push_environment(json!({
        "lat": 51.96,
        "categories": "from-env.json",
    }));
    composer.push_cli(json!({ "lon": 7.62 }));

    let config =
        config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.origin, Coord { x: 7.62, y: 51.96 });
    assert_eq!(config.categories, Utf8PathBuf::from("from-env.json"));
    assert_eq!(config.osrm_base_url, "http://from-file:5000");
    assert_eq!(config.mode, TravelMode::Car);
}

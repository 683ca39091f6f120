//! Score command implementation for the reachscore CLI.

use std::io::Write;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use geo::{Coord, Polygon};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use reachscore_core::{
    AmenityCategoryState, AmenityRecord, AmenityStore, DEFAULT_PER_TYPE_LIMIT, IsochroneCache,
    IsochroneStore, RankedAmenityQuery, ReachabilityQuery, RoutingEngine, SqliteStore, TravelMode,
};
use reachscore_data::routing::{HttpRoutingEngine, HttpRoutingEngineConfig};
use reachscore_scorer::{AmenityScorer, ScoreParams};
use serde::{Deserialize, Serialize};

use crate::fs::{read_json, require_existing};
use crate::{
    ARG_SCORE_CATEGORIES, ARG_SCORE_DATABASE, ARG_SCORE_LAT, ARG_SCORE_LON,
    ARG_SCORE_MAX_DISTANCE, ARG_SCORE_MODE, ARG_SCORE_OSRM_BASE_URL, ARG_SCORE_PER_TYPE,
    ARG_SCORE_TIME_SECONDS, CliError, DEFAULT_DATABASE, ENV_SCORE_CATEGORIES, ENV_SCORE_LAT,
    ENV_SCORE_LON,
};

/// Time budget used when `--time-seconds` is not given.
pub(crate) const DEFAULT_TIME_SECONDS: u32 = 900;

/// Decay distance used when no amenity lies a positive distance away.
pub(crate) const FALLBACK_MAX_DISTANCE_M: f64 = 500.0;

/// CLI arguments for the `score` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Compute the area reachable from an origin within a time \
                 budget, rank the nearest amenities of every enabled type \
                 inside it and score the location from 0 to 10. Reachable \
                 areas are cached in the SQLite database.",
    about = "Score a location by its reachable amenities"
)]
#[ortho_config(prefix = "REACHSCORE")]
pub(crate) struct ScoreArgs {
    /// Origin longitude in degrees.
    #[arg(long = ARG_SCORE_LON, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lon: Option<f64>,
    /// Origin latitude in degrees.
    #[arg(long = ARG_SCORE_LAT, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lat: Option<f64>,
    /// Travel mode: walk, bike or car.
    #[arg(long = ARG_SCORE_MODE, value_name = "mode")]
    #[serde(default)]
    pub(crate) mode: Option<TravelMode>,
    /// Time budget in seconds.
    #[arg(long = ARG_SCORE_TIME_SECONDS, value_name = "seconds")]
    #[serde(default)]
    pub(crate) time_seconds: Option<u32>,
    /// Path to the JSON category preferences.
    #[arg(long = ARG_SCORE_CATEGORIES, value_name = "path")]
    #[serde(default)]
    pub(crate) categories: Option<Utf8PathBuf>,
    /// Path to the SQLite database holding amenities and cached areas.
    #[arg(long = ARG_SCORE_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Base URL for the OSRM server (e.g. "http://localhost:5000").
    #[arg(long = ARG_SCORE_OSRM_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) osrm_base_url: Option<String>,
    /// Distance in metres over which amenity weight decays by a factor of e.
    /// Defaults to the distance of the farthest ranked amenity.
    #[arg(long = ARG_SCORE_MAX_DISTANCE, value_name = "metres")]
    #[serde(default)]
    pub(crate) max_distance: Option<f64>,
    /// Amenities kept per type.
    #[arg(long = ARG_SCORE_PER_TYPE, value_name = "count")]
    #[serde(default)]
    pub(crate) per_type: Option<usize>,
}

impl ScoreArgs {
    pub(crate) fn into_config(self) -> Result<ScoreConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ScoreConfig::try_from(merged)
    }
}

/// Resolved `score` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoreConfig {
    pub(crate) origin: Coord<f64>,
    pub(crate) mode: TravelMode,
    pub(crate) time_seconds: u32,
    pub(crate) categories: Utf8PathBuf,
    pub(crate) database: Utf8PathBuf,
    pub(crate) osrm_base_url: String,
    pub(crate) max_distance: Option<f64>,
    pub(crate) per_type: usize,
}

impl ScoreConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.categories, ARG_SCORE_CATEGORIES)?;
        require_existing(&self.database, ARG_SCORE_DATABASE)?;
        Ok(())
    }

    pub(crate) fn query(&self) -> Result<ReachabilityQuery, CliError> {
        Ok(ReachabilityQuery::new(
            self.origin,
            self.mode,
            self.time_seconds,
        )?)
    }
}

impl TryFrom<ScoreArgs> for ScoreConfig {
    type Error = CliError;

    fn try_from(args: ScoreArgs) -> Result<Self, Self::Error> {
        let lon = args.lon.ok_or(CliError::MissingArgument {
            field: ARG_SCORE_LON,
            env: ENV_SCORE_LON,
        })?;
        let lat = args.lat.ok_or(CliError::MissingArgument {
            field: ARG_SCORE_LAT,
            env: ENV_SCORE_LAT,
        })?;
        let categories = args.categories.ok_or(CliError::MissingArgument {
            field: ARG_SCORE_CATEGORIES,
            env: ENV_SCORE_CATEGORIES,
        })?;

        let osrm_base_url = args
            .osrm_base_url
            .unwrap_or_else(|| HttpRoutingEngineConfig::default().base_url);

        Ok(Self {
            origin: Coord { x: lon, y: lat },
            mode: args.mode.unwrap_or(TravelMode::Walk),
            time_seconds: args.time_seconds.unwrap_or(DEFAULT_TIME_SECONDS),
            categories,
            database: args
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
            osrm_base_url,
            max_distance: args.max_distance,
            per_type: args.per_type.unwrap_or(DEFAULT_PER_TYPE_LIMIT),
        })
    }
}

/// Collaborators used by a single score invocation.
pub(crate) struct ScoreServices {
    pub(crate) isochrones: Arc<dyn IsochroneStore>,
    pub(crate) amenities: Arc<dyn AmenityStore>,
    pub(crate) routing: Arc<dyn RoutingEngine>,
}

/// Builds the store and routing collaborators for a score invocation.
pub(crate) trait ScoreServicesBuilder {
    fn build(&self, config: &ScoreConfig) -> Result<ScoreServices, CliError>;
}

pub(crate) struct DefaultScoreServicesBuilder;

impl ScoreServicesBuilder for DefaultScoreServicesBuilder {
    fn build(&self, config: &ScoreConfig) -> Result<ScoreServices, CliError> {
        let store = Arc::new(SqliteStore::open(config.database.as_std_path())?);
        let routing = HttpRoutingEngine::new(config.osrm_base_url.clone()).map_err(|source| {
            CliError::BuildRoutingEngine {
                base_url: config.osrm_base_url.clone(),
                source,
            }
        })?;
        Ok(ScoreServices {
            isochrones: store.clone(),
            amenities: store,
            routing: Arc::new(routing),
        })
    }
}

/// JSON document printed by the score command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ScoreReport {
    pub(crate) score: f64,
    pub(crate) mode: TravelMode,
    pub(crate) time_seconds: u32,
    pub(crate) origin: Coord<f64>,
    pub(crate) max_distance: f64,
    pub(crate) isochrone: Polygon<f64>,
    pub(crate) amenities: Vec<AmenityRecord>,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_score_with(args, &DefaultScoreServicesBuilder, &mut stdout)
}

pub(crate) fn run_score_with(
    args: ScoreArgs,
    builder: &dyn ScoreServicesBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let report = execute_score(&config, builder)?;
    write_report(writer, &report)
}

pub(crate) fn execute_score(
    config: &ScoreConfig,
    builder: &dyn ScoreServicesBuilder,
) -> Result<ScoreReport, CliError> {
    let query = config.query()?;
    let state = load_categories(&config.categories)?;
    let services = builder.build(config)?;

    let cache = IsochroneCache::new(services.isochrones, services.routing);
    let isochrone = cache.get_or_compute(&query)?;
    let ranked = RankedAmenityQuery::new(services.amenities).with_per_type_limit(config.per_type);
    let amenities = ranked.query(&isochrone, query.origin(), &state.enabled_amenity_types())?;

    let max_distance = config
        .max_distance
        .unwrap_or_else(|| farthest_distance(&amenities));
    let score = AmenityScorer::new(max_distance, ScoreParams::default())?.score(&amenities, &state);
    info!(
        "scored {} with {} ranked amenities: {score}",
        query.cache_key(),
        amenities.len()
    );

    Ok(ScoreReport {
        score,
        mode: query.mode(),
        time_seconds: query.time_seconds(),
        origin: query.origin(),
        max_distance,
        isochrone,
        amenities,
    })
}

pub(crate) fn load_categories(path: &Utf8Path) -> Result<AmenityCategoryState, CliError> {
    read_json(path, ARG_SCORE_CATEGORIES)
}

/// Distance of the farthest ranked amenity, or the fallback when none lies
/// a positive finite distance away.
pub(crate) fn farthest_distance(amenities: &[AmenityRecord]) -> f64 {
    let farthest = amenities
        .iter()
        .filter_map(|record| record.distance_m)
        .filter(|distance| distance.is_finite())
        .fold(0.0_f64, f64::max);
    if farthest > 0.0 {
        farthest
    } else {
        FALLBACK_MAX_DISTANCE_M
    }
}

fn write_report(writer: &mut dyn Write, report: &ScoreReport) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(report).map_err(CliError::SerialiseReport)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ScoreConfig, CliError> {
    let merged = ScoreArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ScoreConfig::try_from(merged)
}

//! Error types emitted by the reachscore CLI.

use std::sync::Arc;

use camino::Utf8PathBuf;
use reachscore_core::{
    IsochroneError, ReachabilityQueryError, SqliteStoreError, StoreError,
};
use reachscore_data::ImportError;
use reachscore_data::overpass::OverpassQueryError;
use reachscore_data::routing::ProviderBuildError;
use reachscore_scorer::ScoreConfigError;
use thiserror::Error;

/// Errors emitted by the reachscore CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Long flag name.
        field: &'static str,
        /// Environment variable that can supply the value.
        env: &'static str,
    },
    /// A referenced input path does not exist.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        /// Long flag name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        /// Long flag name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Long flag name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Opening a JSON input failed.
    #[error("failed to open {field} file at {path:?}: {source}")]
    OpenInput {
        /// Long flag name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// A JSON input could not be decoded.
    #[error("failed to parse {field} JSON at {path:?}: {source}")]
    ParseInput {
        /// Long flag name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// The category file does not name any amenity type.
    #[error("category file {path:?} does not name any amenity type")]
    NoAmenityTypes {
        /// Category file path.
        path: Utf8PathBuf,
    },
    /// Origin, mode or budget failed validation.
    #[error("invalid reachability query: {0}")]
    InvalidQuery(#[from] ReachabilityQueryError),
    /// Opening the SQLite store failed.
    #[error(transparent)]
    OpenStore(#[from] SqliteStoreError),
    /// Constructing the routing engine failed.
    #[error("failed to build routing engine for {base_url:?}: {source}")]
    BuildRoutingEngine {
        /// OSRM base URL.
        base_url: String,
        /// Builder error.
        #[source]
        source: ProviderBuildError,
    },
    /// Computing or caching the reachable area failed.
    #[error("failed to compute reachable area: {0}")]
    Isochrone(#[from] IsochroneError),
    /// Ranking amenities inside the reachable area failed.
    #[error("failed to rank amenities: {0}")]
    RankAmenities(#[from] StoreError),
    /// Scoring parameters were rejected.
    #[error(transparent)]
    BuildScorer(#[from] ScoreConfigError),
    /// The Overpass query could not be built from the inputs.
    #[error("failed to build Overpass query: {0}")]
    BuildOverpassQuery(#[from] OverpassQueryError),
    /// Constructing the Overpass HTTP client failed.
    #[error("failed to build Overpass client for {endpoint:?}: {source}")]
    BuildOverpassClient {
        /// Interpreter endpoint.
        endpoint: String,
        /// Client builder error.
        #[source]
        source: reqwest::Error,
    },
    /// Starting the async runtime failed.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Importing amenities failed.
    #[error("failed to import amenities into {path:?}: {source}")]
    Import {
        /// Target database.
        path: Utf8PathBuf,
        /// Import error.
        #[source]
        source: ImportError,
    },
    /// Serialising a command report failed.
    #[error("failed to serialise report: {0}")]
    SerialiseReport(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}

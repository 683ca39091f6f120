//! Command-line interface for the reachscore engine.
//!
//! `reachscore score` turns an origin, travel mode and time budget into a
//! reachable area and a 0-10 amenity score. `reachscore import` downloads
//! amenities for a boundary from Overpass into the SQLite store the score
//! command reads.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod fs;
mod import;
mod score;

pub use error::CliError;
use import::{ImportArgs, run_import};
use score::{ScoreArgs, run_score};

pub(crate) const ARG_SCORE_LON: &str = "lon";
pub(crate) const ARG_SCORE_LAT: &str = "lat";
pub(crate) const ARG_SCORE_MODE: &str = "mode";
pub(crate) const ARG_SCORE_TIME_SECONDS: &str = "time-seconds";
pub(crate) const ARG_SCORE_CATEGORIES: &str = "categories";
pub(crate) const ARG_SCORE_DATABASE: &str = "database";
pub(crate) const ARG_SCORE_OSRM_BASE_URL: &str = "osrm-base-url";
pub(crate) const ARG_SCORE_MAX_DISTANCE: &str = "max-distance";
pub(crate) const ARG_SCORE_PER_TYPE: &str = "per-type";
pub(crate) const ENV_SCORE_LON: &str = "REACHSCORE_CMDS_SCORE_LON";
pub(crate) const ENV_SCORE_LAT: &str = "REACHSCORE_CMDS_SCORE_LAT";
pub(crate) const ENV_SCORE_CATEGORIES: &str = "REACHSCORE_CMDS_SCORE_CATEGORIES";

pub(crate) const ARG_IMPORT_BOUNDARY: &str = "boundary";
pub(crate) const ARG_IMPORT_CATEGORIES: &str = "categories";
pub(crate) const ARG_IMPORT_DATABASE: &str = "database";
pub(crate) const ARG_IMPORT_OVERPASS_ENDPOINT: &str = "overpass-endpoint";
pub(crate) const ARG_IMPORT_UPDATE: &str = "update";
pub(crate) const ENV_IMPORT_BOUNDARY: &str = "REACHSCORE_CMDS_IMPORT_BOUNDARY";
pub(crate) const ENV_IMPORT_CATEGORIES: &str = "REACHSCORE_CMDS_IMPORT_CATEGORIES";

/// Database used when `--database` is not given.
pub(crate) const DEFAULT_DATABASE: &str = "reachscore.db";

/// Run the reachscore CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when argument parsing, configuration layering or
/// the selected command fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Score(args) => run_score(args),
        Command::Import(args) => run_import(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "reachscore",
    about = "Score locations by the amenities reachable within a time budget",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score a location against ranked amenity preferences.
    Score(ScoreArgs),
    /// Download amenities for a boundary into the SQLite store.
    Import(ImportArgs),
}

#[cfg(test)]
mod tests;

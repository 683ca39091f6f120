//! Import command: download amenities for a boundary into SQLite.

use std::io::Write;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use geo::{Coord, LineString, Polygon};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use reachscore_core::AmenityCategoryState;
use reachscore_data::overpass::{
    AmenitySelection, AmenityService, DEFAULT_OVERPASS_ENDPOINT, HttpAmenityService,
    OverpassConfig, OverpassQuery, ResilientFetcher,
};
use reachscore_data::{ImportOutcome, import_amenities};
use serde::{Deserialize, Serialize};

use crate::fs::{read_json, require_existing};
use crate::{
    ARG_IMPORT_BOUNDARY, ARG_IMPORT_CATEGORIES, ARG_IMPORT_DATABASE, ARG_IMPORT_OVERPASS_ENDPOINT,
    ARG_IMPORT_UPDATE, CliError, DEFAULT_DATABASE, ENV_IMPORT_BOUNDARY, ENV_IMPORT_CATEGORIES,
};

/// CLI arguments for the `import` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Download every amenity type named in the category file \
                 from an Overpass interpreter, restricted to a boundary \
                 polygon given as a JSON array of [lon, lat] pairs. \
                 Existing databases are left alone unless --update is set.",
    about = "Import amenities from Overpass"
)]
#[ortho_config(prefix = "REACHSCORE")]
pub(crate) struct ImportArgs {
    /// Path to the JSON boundary ring.
    #[arg(long = ARG_IMPORT_BOUNDARY, value_name = "path")]
    #[serde(default)]
    pub(crate) boundary: Option<Utf8PathBuf>,
    /// Path to the JSON category preferences.
    #[arg(long = ARG_IMPORT_CATEGORIES, value_name = "path")]
    #[serde(default)]
    pub(crate) categories: Option<Utf8PathBuf>,
    /// Path to the SQLite database to populate.
    #[arg(long = ARG_IMPORT_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Overpass interpreter endpoint.
    #[arg(long = ARG_IMPORT_OVERPASS_ENDPOINT, value_name = "url")]
    #[serde(default)]
    pub(crate) overpass_endpoint: Option<String>,
    /// Refresh amenities even when the database already holds some.
    #[arg(long = ARG_IMPORT_UPDATE)]
    #[serde(default)]
    pub(crate) update: bool,
}

impl ImportArgs {
    pub(crate) fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

/// Resolved `import` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportConfig {
    pub(crate) boundary: Utf8PathBuf,
    pub(crate) categories: Utf8PathBuf,
    pub(crate) database: Utf8PathBuf,
    pub(crate) overpass_endpoint: String,
    pub(crate) update: bool,
}

impl ImportConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.boundary, ARG_IMPORT_BOUNDARY)?;
        require_existing(&self.categories, ARG_IMPORT_CATEGORIES)?;
        Ok(())
    }
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let boundary = args.boundary.ok_or(CliError::MissingArgument {
            field: ARG_IMPORT_BOUNDARY,
            env: ENV_IMPORT_BOUNDARY,
        })?;
        let categories = args.categories.ok_or(CliError::MissingArgument {
            field: ARG_IMPORT_CATEGORIES,
            env: ENV_IMPORT_CATEGORIES,
        })?;
        Ok(Self {
            boundary,
            categories,
            database: args
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
            overpass_endpoint: args
                .overpass_endpoint
                .unwrap_or_else(|| DEFAULT_OVERPASS_ENDPOINT.to_owned()),
            update: args.update,
        })
    }
}

/// Builds the Overpass service used by an import invocation.
pub(crate) trait AmenityServiceBuilder {
    fn build(&self, config: &ImportConfig) -> Result<Arc<dyn AmenityService>, CliError>;
}

pub(crate) struct DefaultAmenityServiceBuilder;

impl AmenityServiceBuilder for DefaultAmenityServiceBuilder {
    fn build(&self, config: &ImportConfig) -> Result<Arc<dyn AmenityService>, CliError> {
        let service = HttpAmenityService::new(OverpassConfig::new(
            config.overpass_endpoint.clone(),
        ))
        .map_err(|source| CliError::BuildOverpassClient {
            endpoint: config.overpass_endpoint.clone(),
            source,
        })?;
        Ok(Arc::new(service))
    }
}

/// JSON document printed by the import command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub(crate) enum ImportReport {
    Skipped,
    Imported { fetched: usize, written: usize },
}

impl From<ImportOutcome> for ImportReport {
    fn from(outcome: ImportOutcome) -> Self {
        match outcome {
            ImportOutcome::Skipped => Self::Skipped,
            ImportOutcome::Imported { fetched, written } => Self::Imported { fetched, written },
        }
    }
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_import_with(args, &DefaultAmenityServiceBuilder, &mut stdout)
}

pub(crate) fn run_import_with(
    args: ImportArgs,
    builder: &dyn AmenityServiceBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let query = build_query(&config)?;
    let fetcher = ResilientFetcher::new(builder.build(&config)?);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let outcome = runtime
        .block_on(import_amenities(
            &fetcher,
            &query,
            &config.database,
            config.update,
        ))
        .map_err(|source| CliError::Import {
            path: config.database.clone(),
            source,
        })?;

    let payload = serde_json::to_string_pretty(&ImportReport::from(outcome))
        .map_err(CliError::SerialiseReport)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

pub(crate) fn build_query(config: &ImportConfig) -> Result<OverpassQuery, CliError> {
    let boundary = load_boundary(&config.boundary)?;
    let state: AmenityCategoryState = read_json(&config.categories, ARG_IMPORT_CATEGORIES)?;
    // Types are matched under both keys; the amenity tag wins on import.
    let types = state.all_amenity_types();
    let selection = AmenitySelection::amenities(types.clone()).with_shops(types);
    if selection.is_empty() {
        return Err(CliError::NoAmenityTypes {
            path: config.categories.clone(),
        });
    }
    Ok(OverpassQuery::new(&boundary, &selection)?)
}

/// Read a boundary ring stored as `[[lon, lat], ...]`.
pub(crate) fn load_boundary(path: &Utf8Path) -> Result<Polygon<f64>, CliError> {
    let ring: Vec<[f64; 2]> = read_json(path, ARG_IMPORT_BOUNDARY)?;
    let exterior: LineString<f64> = ring
        .into_iter()
        .map(|[lon, lat]| Coord { x: lon, y: lat })
        .collect();
    Ok(Polygon::new(exterior, Vec::new()))
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ImportConfig, CliError> {
    let merged = ImportArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ImportConfig::try_from(merged)
}

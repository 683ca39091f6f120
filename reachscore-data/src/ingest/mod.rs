//! Amenity import: download through Overpass, upsert into SQLite.

mod sqlite;

use camino::Utf8Path;
use log::info;
use thiserror::Error;

use crate::overpass::{AmenityService, FetchError, OverpassQuery, ResilientFetcher};

pub use sqlite::{PersistAmenitiesError, amenities_present, persist_amenities_to_sqlite};

/// Result of [`import_amenities`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The database already held amenities and no update was requested.
    Skipped,
    /// Amenities were downloaded and written.
    Imported {
        /// Records returned by the fetcher.
        fetched: usize,
        /// Rows upserted into the database.
        written: usize,
    },
}

/// Errors raised by [`import_amenities`].
#[derive(Debug, Error)]
pub enum ImportError {
    /// Downloading failed.
    #[error("failed to download amenities")]
    Fetch(#[source] FetchError),
    /// Writing to the database failed.
    #[error("failed to store amenities")]
    Persist(#[source] PersistAmenitiesError),
}

/// Download the amenities selected by `query` into the database at `path`.
///
/// When the database already holds amenities the download is skipped unless
/// `update` is set, in which case rows are upserted by id.
///
/// # Errors
///
/// Returns [`ImportError::Fetch`] when the download fails and
/// [`ImportError::Persist`] when the database cannot be read or written.
pub async fn import_amenities<S: AmenityService>(
    fetcher: &ResilientFetcher<S>,
    query: &OverpassQuery,
    path: &Utf8Path,
    update: bool,
) -> Result<ImportOutcome, ImportError> {
    if !update && amenities_present(path).map_err(ImportError::Persist)? {
        info!("{path} already holds amenities; pass update to refresh them");
        return Ok(ImportOutcome::Skipped);
    }

    let records = fetcher.fetch(query).await.map_err(ImportError::Fetch)?;
    let written = persist_amenities_to_sqlite(path, &records).map_err(ImportError::Persist)?;
    info!("imported {written} amenities into {path}");
    Ok(ImportOutcome::Imported {
        fetched: records.len(),
        written,
    })
}

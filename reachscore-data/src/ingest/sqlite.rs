//! SQLite persistence for downloaded amenities.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use reachscore_core::AmenityRecord;
use reachscore_core::store::{UPSERT_AMENITY_SQL, initialise_schema};
use rusqlite::{Connection, Error as SqliteError, OpenFlags, Transaction};
use thiserror::Error;

/// Errors raised when persisting amenities to SQLite.
#[derive(Debug, Error)]
pub enum PersistAmenitiesError {
    /// Failed to create the parent directory for the SQLite database.
    #[error("failed to create parent directory {path:?}")]
    CreateDirectory {
        /// Path of the directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        /// Destination database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Beginning the transaction failed.
    #[error("failed to begin amenity persistence transaction")]
    BeginTransaction {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Creating the schema failed.
    #[error("failed to create amenity schema")]
    CreateSchema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Preparing the upsert statement failed.
    #[error("failed to prepare amenity upsert statement")]
    PrepareUpsert {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Writing an amenity row failed.
    #[error("failed to persist amenity {id}")]
    PersistRow {
        /// Identifier of the amenity being persisted.
        id: String,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Reading the amenity count failed.
    #[error("failed to count stored amenities")]
    Count {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Committing the transaction failed.
    #[error("failed to commit amenity persistence transaction")]
    Commit {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

/// Upsert amenities into the SQLite database at `path`.
///
/// Rows are keyed by id; existing rows have their location, name, type and
/// cuisine overwritten. Parent directories and the schema are created when
/// missing. Returns the number of rows written.
pub fn persist_amenities_to_sqlite(
    path: &Utf8Path,
    amenities: &[AmenityRecord],
) -> Result<usize, PersistAmenitiesError> {
    ensure_parent_dir(path)?;
    let mut connection =
        Connection::open(path.as_std_path()).map_err(|source| PersistAmenitiesError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let transaction = connection
        .transaction()
        .map_err(|source| PersistAmenitiesError::BeginTransaction { source })?;

    initialise_schema(&transaction)
        .map_err(|source| PersistAmenitiesError::CreateSchema { source })?;
    let written = persist_rows(&transaction, amenities)?;

    transaction
        .commit()
        .map_err(|source| PersistAmenitiesError::Commit { source })?;
    Ok(written)
}

/// Whether the database at `path` already holds any amenity rows.
///
/// A missing database or table counts as empty.
pub fn amenities_present(path: &Utf8Path) -> Result<bool, PersistAmenitiesError> {
    if !path.as_std_path().exists() {
        return Ok(false);
    }
    let connection = Connection::open_with_flags(path.as_std_path(), OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|source| PersistAmenitiesError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let table_exists: bool = connection
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'amenities')",
            [],
            |row| row.get(0),
        )
        .map_err(|source| PersistAmenitiesError::Count { source })?;
    if !table_exists {
        return Ok(false);
    }
    connection
        .query_row("SELECT EXISTS (SELECT 1 FROM amenities)", [], |row| row.get(0))
        .map_err(|source| PersistAmenitiesError::Count { source })
}

fn ensure_parent_dir(path: &Utf8Path) -> Result<(), PersistAmenitiesError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let (base_dir, relative) = base_dir_and_relative(parent)?;
    base_dir
        .create_dir_all(&relative)
        .map_err(|source| PersistAmenitiesError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })
}

fn base_dir_and_relative(
    parent: &Utf8Path,
) -> Result<(fs_utf8::Dir, Utf8PathBuf), PersistAmenitiesError> {
    let (base, relative) = if parent.is_absolute() {
        ("/", parent.strip_prefix("/").unwrap_or(parent))
    } else {
        (".", parent)
    };

    let dir = fs_utf8::Dir::open_ambient_dir(base, ambient_authority()).map_err(|source| {
        PersistAmenitiesError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        }
    })?;

    Ok((dir, relative.to_path_buf()))
}

fn persist_rows(
    transaction: &Transaction<'_>,
    amenities: &[AmenityRecord],
) -> Result<usize, PersistAmenitiesError> {
    if amenities.is_empty() {
        return Ok(0);
    }

    let mut statement = transaction
        .prepare_cached(UPSERT_AMENITY_SQL)
        .map_err(|source| PersistAmenitiesError::PrepareUpsert { source })?;

    for amenity in amenities {
        statement
            .execute((
                &amenity.id,
                amenity.location.x,
                amenity.location.y,
                &amenity.name,
                &amenity.amenity,
                &amenity.cuisine,
            ))
            .map_err(|source| PersistAmenitiesError::PersistRow {
                id: amenity.id.clone(),
                source,
            })?;
    }

    Ok(amenities.len())
}

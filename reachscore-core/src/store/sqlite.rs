//! SQLite-backed store for cached isochrones and amenities.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
    time::SystemTime,
};

use geo::{BoundingRect, Coord, Polygon};
use log::debug;
use rusqlite::{Connection, OptionalExtension, ToSql, params};
use thiserror::Error;

use crate::{AmenityRecord, ReachabilityQuery};

use super::functions::{self, GEODESIC_DISTANCE, WITHIN_POLYGON};
use super::schema::initialise_schema;
use super::{AmenityStore, IsochroneStore, StoreError, unix_millis};

/// Error raised when opening a [`SqliteStore`].
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Registering the spatial SQL functions failed.
    #[error("failed to register spatial SQL functions: {source}")]
    RegisterFunctions {
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Creating the tables failed.
    #[error("failed to initialise schema: {source}")]
    Schema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
}

/// Store backed by a single SQLite connection.
///
/// Access to the connection is serialised with a mutex, so the store can be
/// shared between threads. Opening a store registers the spatial SQL
/// functions and creates any missing tables.
pub struct SqliteStore {
    connection: Mutex<Connection>,
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open or create a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqliteStoreError> {
        let path = path.as_ref();
        let connection =
            Connection::open(path).map_err(|source| SqliteStoreError::OpenDatabase {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_connection(connection)
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let connection =
            Connection::open_in_memory().map_err(|source| SqliteStoreError::OpenDatabase {
                path: PathBuf::from(":memory:"),
                source,
            })?;
        Self::from_connection(connection)
    }

    /// Wrap an existing connection, registering functions and the schema.
    pub fn from_connection(connection: Connection) -> Result<Self, SqliteStoreError> {
        functions::register(&connection)
            .map_err(|source| SqliteStoreError::RegisterFunctions { source })?;
        initialise_schema(&connection).map_err(|source| SqliteStoreError::Schema { source })?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Number of rows in the `isochrones` table, stale ones included.
    pub fn cached_isochrone_count(&self) -> Result<u64, StoreError> {
        const OPERATION: &str = "count isochrones";
        let connection = self.lock(OPERATION)?;
        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM isochrones", [], |row| row.get(0))
            .map_err(|source| StoreError::backend(OPERATION, source))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Upsert amenity rows in one transaction, returning how many were written.
    ///
    /// Seeds stores in tests; imports write through the ingest pipeline.
    #[cfg(any(test, feature = "test-support"))]
    pub fn upsert_amenities(&self, records: &[AmenityRecord]) -> Result<usize, StoreError> {
        use super::schema::UPSERT_AMENITY_SQL;

        const OPERATION: &str = "upsert amenities";
        let mut connection = self.lock(OPERATION)?;
        let transaction = connection
            .transaction()
            .map_err(|source| StoreError::backend(OPERATION, source))?;
        {
            let mut statement = transaction
                .prepare_cached(UPSERT_AMENITY_SQL)
                .map_err(|source| StoreError::backend(OPERATION, source))?;
            for record in records {
                statement
                    .execute(params![
                        record.id,
                        record.location.x,
                        record.location.y,
                        record.name,
                        record.amenity,
                        record.cuisine,
                    ])
                    .map_err(|source| StoreError::backend(OPERATION, source))?;
            }
        }
        transaction
            .commit()
            .map_err(|source| StoreError::backend(OPERATION, source))?;
        Ok(records.len())
    }

    fn lock(&self, operation: &'static str) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection
            .lock()
            .map_err(|_| StoreError::backend(operation, "SQLite connection mutex poisoned"))
    }
}

impl IsochroneStore for SqliteStore {
    fn find_isochrone(
        &self,
        query: &ReachabilityQuery,
        fresh_after: SystemTime,
    ) -> Result<Option<Polygon<f64>>, StoreError> {
        const OPERATION: &str = "find isochrone";
        let connection = self.lock(OPERATION)?;
        let origin = query.origin();
        let geom: Option<String> = connection
            .prepare_cached(
                "SELECT geom FROM isochrones
                 WHERE mode = ?1 AND time_seconds = ?2
                   AND origin_lon = ?3 AND origin_lat = ?4
                   AND created_at > ?5",
            )
            .and_then(|mut statement| {
                statement
                    .query_row(
                        params![
                            query.mode().as_str(),
                            query.time_seconds(),
                            origin.x,
                            origin.y,
                            unix_millis(fresh_after),
                        ],
                        |row| row.get(0),
                    )
                    .optional()
            })
            .map_err(|source| StoreError::backend(OPERATION, source))?;

        geom.map(|json| {
            serde_json::from_str(&json).map_err(|source| StoreError::decode(OPERATION, source))
        })
        .transpose()
    }

    fn upsert_isochrone(
        &self,
        query: &ReachabilityQuery,
        polygon: &Polygon<f64>,
        created_at: SystemTime,
    ) -> Result<(), StoreError> {
        const OPERATION: &str = "upsert isochrone";
        let geom =
            serde_json::to_string(polygon).map_err(|source| StoreError::decode(OPERATION, source))?;
        let connection = self.lock(OPERATION)?;
        let origin = query.origin();
        connection
            .prepare_cached(
                "INSERT INTO isochrones (mode, time_seconds, origin_lon, origin_lat, geom, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (mode, time_seconds, origin_lon, origin_lat) DO UPDATE SET
                     geom = excluded.geom,
                     created_at = excluded.created_at",
            )
            .and_then(|mut statement| {
                statement.execute(params![
                    query.mode().as_str(),
                    query.time_seconds(),
                    origin.x,
                    origin.y,
                    geom,
                    unix_millis(created_at),
                ])
            })
            .map_err(|source| StoreError::backend(OPERATION, source))?;
        debug!("stored isochrone for {}", query.cache_key());
        Ok(())
    }
}

impl AmenityStore for SqliteStore {
    fn nearest_amenities(
        &self,
        polygon: &Polygon<f64>,
        origin: Coord<f64>,
        types: &[String],
        per_type: usize,
    ) -> Result<Vec<AmenityRecord>, StoreError> {
        const OPERATION: &str = "rank amenities";
        if types.is_empty() || per_type == 0 {
            return Ok(Vec::new());
        }
        let Some(bounds) = polygon.bounding_rect() else {
            return Ok(Vec::new());
        };
        let geom =
            serde_json::to_string(polygon).map_err(|source| StoreError::decode(OPERATION, source))?;
        let per_type = i64::try_from(per_type).unwrap_or(i64::MAX);

        // Type parameters follow the eight fixed ones.
        let placeholders = (9..9 + types.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id, name, amenity, cuisine, lon, lat, distance FROM (
                 SELECT id, name, amenity, cuisine, lon, lat,
                        {GEODESIC_DISTANCE}(?1, ?2, lon, lat) AS distance,
                        ROW_NUMBER() OVER (
                            PARTITION BY amenity
                            ORDER BY {GEODESIC_DISTANCE}(?1, ?2, lon, lat), id
                        ) AS type_rank
                 FROM amenities
                 WHERE lon BETWEEN ?3 AND ?4
                   AND lat BETWEEN ?5 AND ?6
                   AND {WITHIN_POLYGON}(?7, lon, lat)
                   AND amenity IN ({placeholders})
             )
             WHERE type_rank <= ?8
             ORDER BY amenity, distance, id"
        );

        let (min, max) = (bounds.min(), bounds.max());
        let mut parameters: Vec<&dyn ToSql> =
            vec![&origin.x, &origin.y, &min.x, &max.x, &min.y, &max.y, &geom, &per_type];
        parameters.extend(types.iter().map(|amenity| amenity as &dyn ToSql));

        let connection = self.lock(OPERATION)?;
        let mut statement = connection
            .prepare(&sql)
            .map_err(|source| StoreError::backend(OPERATION, source))?;
        let rows = statement
            .query_map(parameters.as_slice(), |row| {
                Ok(AmenityRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    amenity: row.get(2)?,
                    cuisine: row.get(3)?,
                    location: Coord {
                        x: row.get(4)?,
                        y: row.get(5)?,
                    },
                    distance_m: Some(row.get(6)?),
                })
            })
            .map_err(|source| StoreError::backend(OPERATION, source))?;

        let amenities = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| StoreError::backend(OPERATION, source))?;
        debug!(
            "ranked {} amenities across {} types",
            amenities.len(),
            types.len()
        );
        Ok(amenities)
    }
}

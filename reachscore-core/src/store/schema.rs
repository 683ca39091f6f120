//! Table definitions shared by the store and the amenity importer.

use rusqlite::Connection;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS isochrones (
    mode TEXT NOT NULL,
    time_seconds INTEGER NOT NULL,
    origin_lon REAL NOT NULL,
    origin_lat REAL NOT NULL,
    geom TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (mode, time_seconds, origin_lon, origin_lat)
);
CREATE TABLE IF NOT EXISTS amenities (
    id TEXT PRIMARY KEY,
    lon REAL NOT NULL,
    lat REAL NOT NULL,
    name TEXT,
    amenity TEXT NOT NULL,
    cuisine TEXT
);
CREATE INDEX IF NOT EXISTS amenities_amenity_idx ON amenities (amenity);
CREATE INDEX IF NOT EXISTS amenities_lon_lat_idx ON amenities (lon, lat);
";

/// Insert an amenity row or overwrite every column of an existing one.
///
/// Parameters: `?1` id, `?2` lon, `?3` lat, `?4` name, `?5` amenity,
/// `?6` cuisine.
pub const UPSERT_AMENITY_SQL: &str = "
INSERT INTO amenities (id, lon, lat, name, amenity, cuisine)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT (id) DO UPDATE SET
    lon = excluded.lon,
    lat = excluded.lat,
    name = excluded.name,
    amenity = excluded.amenity,
    cuisine = excluded.cuisine
";

/// Create the `isochrones` and `amenities` tables and their indexes.
///
/// Safe to call repeatedly; existing tables are left untouched.
pub fn initialise_schema(connection: &Connection) -> rusqlite::Result<()> {
    connection.execute_batch(SCHEMA_SQL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn schema_creation_is_idempotent() {
        let connection = Connection::open_in_memory().expect("open in-memory db");
        initialise_schema(&connection).expect("first run");
        initialise_schema(&connection).expect("second run");

        let tables: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN ('isochrones', 'amenities')",
                [],
                |row| row.get(0),
            )
            .expect("count tables");
        assert_eq!(tables, 2);
    }

    #[rstest]
    fn upsert_overwrites_existing_amenity() {
        let connection = Connection::open_in_memory().expect("open in-memory db");
        initialise_schema(&connection).expect("schema");
        connection
            .execute(
                UPSERT_AMENITY_SQL,
                ("node/1", 1.0, 2.0, Some("Old"), "cafe", None::<String>),
            )
            .expect("insert");
        connection
            .execute(
                UPSERT_AMENITY_SQL,
                ("node/1", 3.0, 4.0, Some("New"), "bar", Some("tapas")),
            )
            .expect("update");

        let row: (f64, String, String, Option<String>) = connection
            .query_row(
                "SELECT lon, name, amenity, cuisine FROM amenities WHERE id = 'node/1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .expect("read row");
        assert_eq!(row, (3.0, "New".to_owned(), "bar".to_owned(), Some("tapas".to_owned())));
    }
}

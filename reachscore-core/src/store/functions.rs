//! Spatial SQL scalar functions backed by `geo`.
//!
//! - `geodesic_distance(lon1, lat1, lon2, lat2)` returns metres on the WGS84
//!   ellipsoid.
//! - `within_polygon(geom_json, lon, lat)` returns 1 when the point lies
//!   strictly inside the polygon; boundary points are outside.

use geo::{Contains, Distance, Geodesic, Point, Polygon};
use rusqlite::Connection;
use rusqlite::functions::{Context, FunctionFlags};

use super::BackendError;

pub(super) const GEODESIC_DISTANCE: &str = "geodesic_distance";
pub(super) const WITHIN_POLYGON: &str = "within_polygon";

pub(super) fn register(connection: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
    connection.create_scalar_function(GEODESIC_DISTANCE, 4, flags, geodesic_distance)?;
    connection.create_scalar_function(WITHIN_POLYGON, 3, flags, within_polygon)?;
    Ok(())
}

fn geodesic_distance(ctx: &Context<'_>) -> rusqlite::Result<f64> {
    let from = Point::new(ctx.get::<f64>(0)?, ctx.get::<f64>(1)?);
    let to = Point::new(ctx.get::<f64>(2)?, ctx.get::<f64>(3)?);
    Ok(Geodesic.distance(from, to))
}

fn within_polygon(ctx: &Context<'_>) -> rusqlite::Result<bool> {
    // The polygon argument is constant for a whole query, so parse it once.
    let polygon = ctx.get_or_create_aux(0, |value| -> Result<Polygon<f64>, BackendError> {
        Ok(serde_json::from_str(value.as_str()?)?)
    })?;
    let point = Point::new(ctx.get::<f64>(1)?, ctx.get::<f64>(2)?);
    Ok(polygon.contains(&point))
}

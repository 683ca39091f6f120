//! Candidate destinations sampled on a regular grid around an origin.

use geo::Coord;
use reachscore_core::TravelMode;

/// Approximate metres per degree of latitude.
const METRES_PER_DEGREE: f64 = 111_320.0;

/// Smallest cosine used when converting metres to degrees of longitude, so
/// that grids near the poles stay finite.
const MIN_LATITUDE_COSINE: f64 = 0.01;

/// Sample points within the distance `mode` can cover in `minutes`.
///
/// Points lie on a square grid clipped to a circle of radius
/// `nominal speed × budget`. The spacing is `resolution_m` unless that would
/// need more than `max_side` samples across, in which case the spacing grows
/// so the grid still spans the whole radius. The origin itself is not
/// included, and points outside the WGS84 range are dropped.
pub(crate) fn sample_destinations(
    origin: Coord<f64>,
    mode: TravelMode,
    minutes: u32,
    resolution_m: f64,
    max_side: u32,
) -> Vec<Coord<f64>> {
    if minutes == 0 || !resolution_m.is_finite() || resolution_m <= 0.0 {
        return Vec::new();
    }

    let radius_m = mode.nominal_max_speed_mps() * f64::from(minutes) * 60.0;
    let max_steps = i64::from(max_side.saturating_sub(1) / 2);
    let wanted = steps_for(radius_m / resolution_m);
    if wanted == 0 || max_steps == 0 {
        return Vec::new();
    }
    let (steps, spacing_m) = if wanted > max_steps {
        (max_steps, radius_m / max_steps as f64)
    } else {
        (wanted, resolution_m)
    };

    let lat_step = spacing_m / METRES_PER_DEGREE;
    let lon_step =
        spacing_m / (METRES_PER_DEGREE * origin.y.to_radians().cos().max(MIN_LATITUDE_COSINE));

    let mut points = Vec::new();
    for row in -steps..=steps {
        for column in -steps..=steps {
            if (row == 0 && column == 0) || row * row + column * column > steps * steps {
                continue;
            }
            let point = Coord {
                x: origin.x + column as f64 * lon_step,
                y: origin.y + row as f64 * lat_step,
            };
            if (-180.0..=180.0).contains(&point.x) && (-90.0..=90.0).contains(&point.y) {
                points.push(point);
            }
        }
    }
    points
}

fn steps_for(ratio: f64) -> i64 {
    if !ratio.is_finite() || ratio < 1.0 {
        return 0;
    }
    // Clamped before the cast; the side cap bounds the grid afterwards.
    ratio.floor().min(1_000_000.0) as i64
}

//! Overpass QL query construction.

use std::fmt::Write as _;

use geo::{Coord, Polygon};
use thiserror::Error;

/// Default server-side timeout embedded in generated queries, in seconds.
pub const DEFAULT_SERVER_TIMEOUT_SECS: u32 = 180;

/// Errors raised while building an [`OverpassQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverpassQueryError {
    /// The boundary ring has fewer than three distinct vertices.
    #[error("boundary polygon needs at least three vertices, found {vertices}")]
    DegeneratePolygon {
        /// Number of distinct vertices found.
        vertices: usize,
    },
    /// A tag value would break out of the generated regular expression.
    #[error("tag value {value:?} contains characters outside [A-Za-z0-9_:-]")]
    InvalidTagValue {
        /// Offending value.
        value: String,
    },
}

/// Amenity and shop subtypes to download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmenitySelection {
    /// Values matched against the `amenity` tag.
    pub amenity: Vec<String>,
    /// Values matched against the `shop` tag.
    pub shop: Vec<String>,
}

impl AmenitySelection {
    /// Select the given `amenity` values.
    #[must_use]
    pub fn amenities<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            amenity: values.into_iter().map(Into::into).collect(),
            shop: Vec::new(),
        }
    }

    /// Additionally select the given `shop` values.
    #[must_use]
    pub fn with_shops<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.shop.extend(values.into_iter().map(Into::into));
        self
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.amenity.is_empty() && self.shop.is_empty()
    }
}

/// A validated Overpass QL query selecting amenities inside a boundary.
///
/// # Examples
///
/// ```
/// use geo::polygon;
/// use reachscore_data::overpass::{AmenitySelection, OverpassQuery};
///
/// let boundary = polygon![
///     (x: 7.60, y: 51.95),
///     (x: 7.65, y: 51.95),
///     (x: 7.65, y: 51.98),
/// ];
/// let query = OverpassQuery::new(&boundary, &AmenitySelection::amenities(["cafe"]))?;
/// assert!(query.as_str().contains(r#"nwr["amenity"~"^(cafe)$"]"#));
/// # Ok::<(), reachscore_data::overpass::OverpassQueryError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverpassQuery {
    text: String,
}

impl OverpassQuery {
    /// Build a query with the default server timeout.
    ///
    /// # Errors
    ///
    /// Returns [`OverpassQueryError`] when the boundary is degenerate or a
    /// tag value contains characters unsafe for the generated regex.
    pub fn new(
        boundary: &Polygon<f64>,
        selection: &AmenitySelection,
    ) -> Result<Self, OverpassQueryError> {
        Self::with_server_timeout(boundary, selection, DEFAULT_SERVER_TIMEOUT_SECS)
    }

    /// Build a query with an explicit `[timeout:N]` setting.
    ///
    /// # Errors
    ///
    /// See [`OverpassQuery::new`].
    pub fn with_server_timeout(
        boundary: &Polygon<f64>,
        selection: &AmenitySelection,
        timeout_secs: u32,
    ) -> Result<Self, OverpassQueryError> {
        let ring = poly_filter(boundary)?;
        let mut text = format!("[out:json][timeout:{timeout_secs}];\n(\n");
        for (key, values) in [("amenity", &selection.amenity), ("shop", &selection.shop)] {
            if values.is_empty() {
                continue;
            }
            for value in values {
                validate_tag_value(value)?;
            }
            let alternatives = values.join("|");
            // Writing to a String cannot fail.
            let _ = writeln!(
                text,
                "  nwr[\"{key}\"~\"^({alternatives})$\"](poly:\"{ring}\");"
            );
        }
        text.push_str(");\nout center;\n");
        Ok(Self { text })
    }

    /// Wrap a hand-written query.
    #[must_use]
    pub fn raw(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Query text as sent to the interpreter.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Render the exterior ring as `"lat lon lat lon ..."`.
///
/// Coordinates use six decimal places and the closing vertex is omitted.
fn poly_filter(boundary: &Polygon<f64>) -> Result<String, OverpassQueryError> {
    let mut vertices: Vec<Coord<f64>> = boundary.exterior().coords().copied().collect();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    if vertices.len() < 3 {
        return Err(OverpassQueryError::DegeneratePolygon {
            vertices: vertices.len(),
        });
    }
    Ok(vertices
        .iter()
        .map(|coord| format!("{:.6} {:.6}", coord.y, coord.x))
        .collect::<Vec<_>>()
        .join(" "))
}

fn validate_tag_value(value: &str) -> Result<(), OverpassQueryError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-'));
    if valid {
        Ok(())
    } else {
        Err(OverpassQueryError::InvalidTagValue {
            value: value.to_owned(),
        })
    }
}

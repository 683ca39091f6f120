//! OSRM Table service response types.
//!
//! See: <http://project-osrm.org/docs/v5.24.0/api/#table-service>

use serde::Deserialize;

/// OSRM code reported when a coordinate cannot be snapped to the network.
pub(crate) const NO_SEGMENT: &str = "NoSegment";

/// OSRM Table API response.
///
/// Failed requests carry a `code` other than `"Ok"` and usually a `message`;
/// OSRM sends these bodies with 4xx statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct TableResponse {
    /// Status code from OSRM, e.g. `"Ok"`, `"InvalidQuery"` or `"NoSegment"`.
    pub code: String,

    /// Optional error message when `code` is not `"Ok"`.
    pub message: Option<String>,

    /// Durations in seconds from each source to each destination.
    ///
    /// Values are `None` when no route exists between a pair.
    pub durations: Option<Vec<Vec<Option<f64>>>>,
}

impl TableResponse {
    /// Check if the response indicates success.
    pub(crate) fn is_ok(&self) -> bool {
        self.code == "Ok"
    }
}

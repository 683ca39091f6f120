//! Overpass JSON response payload.
//!
//! Deserialisation doubles as validation: a payload missing `version`,
//! `generator` or an element's `tags`, or carrying an unknown element type,
//! fails to parse.

use std::collections::BTreeMap;

use geo::Coord;
use log::warn;
use reachscore_core::AmenityRecord;
use serde::Deserialize;

/// Top-level Overpass response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OverpassResponse {
    /// API version reported by the server.
    pub version: f64,
    /// Server software identifier.
    pub generator: String,
    /// Returned elements.
    pub elements: Vec<OverpassElement>,
}

/// OSM element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// A single point.
    Node,
    /// An ordered list of nodes.
    Way,
    /// A group of members.
    Relation,
}

impl ElementKind {
    /// Lowercase OSM name used as the record id prefix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

/// Centroid reported by `out center` for ways and relations.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Center {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// A single element of the response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OverpassElement {
    /// Element type.
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// OSM id, unique per element type.
    pub id: i64,
    /// Latitude for nodes.
    pub lat: Option<f64>,
    /// Longitude for nodes.
    pub lon: Option<f64>,
    /// Centroid for ways and relations.
    pub center: Option<Center>,
    /// Element tags.
    pub tags: OverpassTags,
}

/// Tags carried by an element.
///
/// `name`, `amenity` and `cuisine` are lifted out; all other string tags are
/// kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OverpassTags {
    /// `name` tag.
    pub name: Option<String>,
    /// `amenity` tag.
    pub amenity: Option<String>,
    /// `cuisine` tag.
    pub cuisine: Option<String>,
    /// Remaining tags.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl OverpassElement {
    /// Stable record id, e.g. `"node/42"`.
    #[must_use]
    pub fn record_id(&self) -> String {
        format!("{}/{}", self.kind.as_str(), self.id)
    }

    /// Location from `lat`/`lon`, falling back to `center`.
    #[must_use]
    pub fn location(&self) -> Option<Coord<f64>> {
        match (self.lat, self.lon, self.center) {
            (Some(lat), Some(lon), _) => Some(Coord { x: lon, y: lat }),
            (_, _, Some(center)) => Some(Coord {
                x: center.lon,
                y: center.lat,
            }),
            _ => None,
        }
    }

    /// Amenity type from the `amenity` tag, falling back to `shop`.
    #[must_use]
    pub fn amenity_type(&self) -> Option<&str> {
        self.tags
            .amenity
            .as_deref()
            .or_else(|| self.tags.extra.get("shop").map(String::as_str))
    }

    /// Convert into an [`AmenityRecord`].
    ///
    /// Returns `None` when the element lacks a location or a type.
    #[must_use]
    pub fn to_record(&self) -> Option<AmenityRecord> {
        let location = self.location()?;
        let amenity = self.amenity_type()?;
        let mut record = AmenityRecord::new(self.record_id(), amenity, location);
        record.name = self.tags.name.clone();
        record.cuisine = self.tags.cuisine.clone();
        Some(record)
    }
}

impl OverpassResponse {
    /// Convert every usable element, skipping the rest with a warning.
    #[must_use]
    pub fn into_records(self) -> Vec<AmenityRecord> {
        self.elements
            .iter()
            .filter_map(|element| {
                let record = element.to_record();
                if record.is_none() {
                    warn!(
                        "skipping {}: missing coordinates or amenity type",
                        element.record_id()
                    );
                }
                record
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PAYLOAD: &str = r#"{
        "version": 0.6,
        "generator": "Overpass API 0.7.62",
        "osm3s": {"copyright": "OpenStreetMap contributors"},
        "elements": [
            {"type": "node", "id": 1, "lat": 51.96, "lon": 7.62,
             "tags": {"amenity": "cafe", "name": "Kaffeehaus", "cuisine": "coffee_shop",
                      "opening_hours": "Mo-Fr 08:00-18:00"}},
            {"type": "way", "id": 2, "center": {"lat": 51.97, "lon": 7.63},
             "tags": {"shop": "bakery"}},
            {"type": "relation", "id": 3, "tags": {"amenity": "school"}},
            {"type": "node", "id": 4, "lat": 51.0, "lon": 7.0, "tags": {"name": "Nameless"}}
        ]
    }"#;

    #[rstest]
    fn payload_parses_and_keeps_extra_tags() {
        let response: OverpassResponse = serde_json::from_str(PAYLOAD).expect("valid payload");

        assert_eq!(response.generator, "Overpass API 0.7.62");
        assert_eq!(response.elements.len(), 4);
        let cafe = response.elements.first().expect("first element");
        assert_eq!(cafe.kind, ElementKind::Node);
        assert_eq!(
            cafe.tags.extra.get("opening_hours").map(String::as_str),
            Some("Mo-Fr 08:00-18:00")
        );
    }

    #[rstest]
    fn records_skip_elements_without_location_or_type() {
        let response: OverpassResponse = serde_json::from_str(PAYLOAD).expect("valid payload");

        let records = response.into_records();

        let ids: Vec<_> = records.iter().map(|record| record.id.as_str()).collect();
        assert_eq!(ids, vec!["node/1", "way/2"]);
        let cafe = records.first().expect("cafe record");
        assert_eq!(cafe.name.as_deref(), Some("Kaffeehaus"));
        assert_eq!(cafe.cuisine.as_deref(), Some("coffee_shop"));
        assert_eq!(cafe.location, Coord { x: 7.62, y: 51.96 });
        let bakery = records.get(1).expect("bakery record");
        assert_eq!(bakery.amenity, "bakery");
        assert_eq!(bakery.location, Coord { x: 7.63, y: 51.97 });
    }

    #[rstest]
    #[case::missing_tags(r#"{"version": 0.6, "generator": "g",
        "elements": [{"type": "node", "id": 1, "lat": 0.0, "lon": 0.0}]}"#)]
    #[case::unknown_type(r#"{"version": 0.6, "generator": "g",
        "elements": [{"type": "area", "id": 1, "tags": {}}]}"#)]
    #[case::missing_generator(r#"{"version": 0.6, "elements": []}"#)]
    #[case::non_string_tag(r#"{"version": 0.6, "generator": "g",
        "elements": [{"type": "node", "id": 1, "tags": {"level": 2}}]}"#)]
    fn invalid_payloads_are_rejected(#[case] json: &str) {
        assert!(serde_json::from_str::<OverpassResponse>(json).is_err());
    }
}

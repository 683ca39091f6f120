//! Amenities and the user-facing category configuration that weights them.

use std::collections::{BTreeMap, BTreeSet};

use geo::Coord;

/// A discovered point of interest.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude`. Records are
/// produced fresh for every query; `distance_m` is only populated by ranked
/// queries.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use reachscore_core::AmenityRecord;
///
/// let cafe = AmenityRecord::new("node/42", "cafe", Coord { x: 7.62, y: 51.96 })
///     .with_name("Kaffeehaus")
///     .with_distance(120.0);
///
/// assert_eq!(cafe.amenity, "cafe");
/// assert_eq!(cafe.distance_m, Some(120.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AmenityRecord {
    /// Stable external identifier, e.g. `node/42`.
    pub id: String,
    /// Display name, when tagged.
    pub name: Option<String>,
    /// Amenity type such as `cafe` or `pharmacy`.
    pub amenity: String,
    /// Cuisine tag for food venues.
    pub cuisine: Option<String>,
    /// Geospatial position.
    pub location: Coord<f64>,
    /// Geodesic distance to the query origin in metres.
    pub distance_m: Option<f64>,
}

impl AmenityRecord {
    /// Construct a record without name, cuisine or distance.
    pub fn new(id: impl Into<String>, amenity: impl Into<String>, location: Coord<f64>) -> Self {
        Self {
            id: id.into(),
            name: None,
            amenity: amenity.into(),
            cuisine: None,
            location,
            distance_m: None,
        }
    }

    /// Attach a display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a cuisine tag.
    #[must_use]
    pub fn with_cuisine(mut self, cuisine: impl Into<String>) -> Self {
        self.cuisine = Some(cuisine.into());
        self
    }

    /// Attach a distance to the query origin in metres.
    #[must_use]
    pub fn with_distance(mut self, distance_m: f64) -> Self {
        self.distance_m = Some(distance_m);
        self
    }
}

/// Enable flag for a single amenity type inside a [`Category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AmenityToggle {
    /// Whether the amenity type contributes to scoring.
    pub enabled: bool,
}

/// A ranked group of amenity types, e.g. `food_and_drinks`.
///
/// Lower `rank` values mean higher priority.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Category {
    /// Priority of the category; lower is more important.
    pub rank: i64,
    /// Whether the category contributes at all.
    pub enabled: bool,
    /// Amenity types belonging to this category.
    #[cfg_attr(feature = "serde", serde(default))]
    pub amenities: BTreeMap<String, AmenityToggle>,
}

impl Category {
    /// Create an empty category.
    pub const fn new(rank: i64, enabled: bool) -> Self {
        Self {
            rank,
            enabled,
            amenities: BTreeMap::new(),
        }
    }

    /// Add an amenity type with its enable flag.
    #[must_use]
    pub fn with_amenity(mut self, amenity: impl Into<String>, enabled: bool) -> Self {
        self.amenities
            .insert(amenity.into(), AmenityToggle { enabled });
        self
    }

    /// Iterate over the amenity types whose own flag is set.
    pub fn enabled_amenities(&self) -> impl Iterator<Item = &str> {
        self.amenities
            .iter()
            .filter(|(_, toggle)| toggle.enabled)
            .map(|(name, _)| name.as_str())
    }
}

/// Hierarchical enable-state keyed by category name.
///
/// Categories iterate in name order, which makes derived values
/// deterministic. Categories are expected to partition amenity types.
///
/// # Examples
/// ```
/// use reachscore_core::{AmenityCategoryState, Category};
///
/// let state = AmenityCategoryState::new()
///     .with_category("mobility", Category::new(10, true).with_amenity("parking", true))
///     .with_category("health", Category::new(20, false).with_amenity("pharmacy", true));
///
/// assert_eq!(state.enabled_amenity_types(), vec!["parking".to_owned()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct AmenityCategoryState {
    categories: BTreeMap<String, Category>,
}

impl AmenityCategoryState {
    /// Create an empty state.
    pub const fn new() -> Self {
        Self {
            categories: BTreeMap::new(),
        }
    }

    /// Insert or replace a category.
    pub fn insert(&mut self, name: impl Into<String>, category: Category) {
        self.categories.insert(name.into(), category);
    }

    /// Add a category while consuming `self`, enabling chaining.
    #[must_use]
    pub fn with_category(mut self, name: impl Into<String>, category: Category) -> Self {
        self.insert(name, category);
        self
    }

    /// Look up a category by name.
    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.get(name)
    }

    /// Iterate over all categories in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Category)> {
        self.categories
            .iter()
            .map(|(name, category)| (name.as_str(), category))
    }

    /// Iterate over enabled categories in name order.
    pub fn enabled_categories(&self) -> impl Iterator<Item = (&str, &Category)> {
        self.iter().filter(|(_, category)| category.enabled)
    }

    /// Sorted, de-duplicated amenity types that currently contribute.
    pub fn enabled_amenity_types(&self) -> Vec<String> {
        let types: BTreeSet<&str> = self
            .enabled_categories()
            .flat_map(|(_, category)| category.enabled_amenities())
            .collect();
        types.into_iter().map(str::to_owned).collect()
    }

    /// Sorted, de-duplicated amenity types mentioned anywhere, regardless of
    /// enable flags.
    pub fn all_amenity_types(&self) -> Vec<String> {
        let types: BTreeSet<&str> = self
            .categories
            .values()
            .flat_map(|category| category.amenities.keys().map(String::as_str))
            .collect();
        types.into_iter().map(str::to_owned).collect()
    }

    /// Report whether no categories are configured.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

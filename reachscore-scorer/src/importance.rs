//! Per-amenity importance derived from category ranks.
#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use reachscore_core::AmenityCategoryState;

/// Map every enabled amenity type to the importance of its category.
///
/// Only enabled categories take part. Ranks are normalised against the
/// lowest and highest enabled rank, so the best-ranked category scores `1.0`
/// and the worst approaches `0.0`, floored at `min_importance`. When all
/// enabled categories share a rank the span is treated as one. An amenity
/// type listed in several categories takes the importance of the last
/// category in name order.
///
/// # Examples
///
/// ```
/// use reachscore_core::{AmenityCategoryState, Category};
/// use reachscore_scorer::build_importance_map;
///
/// let state = AmenityCategoryState::new()
///     .with_category("mobility", Category::new(10, true).with_amenity("parking", true))
///     .with_category("education", Category::new(30, true).with_amenity("library", true));
///
/// let importance = build_importance_map(&state, 0.2);
/// assert_eq!(importance.get("parking"), Some(&1.0));
/// assert_eq!(importance.get("library"), Some(&0.2));
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "importance interpolates linearly between category ranks"
)]
#[expect(
    clippy::cast_precision_loss,
    reason = "category ranks are small integers"
)]
pub fn build_importance_map(
    state: &AmenityCategoryState,
    min_importance: f64,
) -> BTreeMap<String, f64> {
    let mut importance = BTreeMap::new();
    let Some((min_rank, max_rank)) = rank_bounds(state) else {
        return importance;
    };
    let span = max_rank.saturating_sub(min_rank).max(1) as f64;

    for (_, category) in state.enabled_categories() {
        let offset = category.rank.saturating_sub(min_rank) as f64;
        let weight = (1.0 - offset / span).max(min_importance);
        for amenity in category.enabled_amenities() {
            importance.insert(amenity.to_owned(), weight);
        }
    }
    importance
}

fn rank_bounds(state: &AmenityCategoryState) -> Option<(i64, i64)> {
    state
        .enabled_categories()
        .map(|(_, category)| category.rank)
        .fold(None, |bounds, rank| match bounds {
            None => Some((rank, rank)),
            Some((low, high)) => Some((low.min(rank), high.max(rank))),
        })
}

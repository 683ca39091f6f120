//! Amenity scoring for reachscore locations.
//!
//! The crate turns the amenities found inside a reachable area into a single
//! comparable number:
//! - [`build_importance_map`] flattens the user's ranked, hierarchical
//!   category preferences into a weight per amenity type.
//! - [`AmenityScorer`] decays each amenity by its distance, saturates
//!   repeated amenity types, and normalises the weighted total onto a
//!   `0..=10` scale.
//!
//! Scoring is a pure function of its inputs; the same amenities and
//! preferences always yield the same score.

#![forbid(unsafe_code)]

mod error;
mod importance;
mod score;

pub use error::ScoreConfigError;
pub use importance::build_importance_map;
pub use score::{AmenityScorer, MAX_SCORE, ScoreParams, score};

#[cfg(test)]
mod tests;

//! Error types raised while configuring the amenity scorer.
#![forbid(unsafe_code)]

use thiserror::Error;

/// Invalid scoring parameters.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ScoreConfigError {
    /// The decay distance was not a positive finite number.
    #[error("max distance must be positive and finite, got {value}")]
    MaxDistance {
        /// Rejected value in metres.
        value: f64,
    },
    /// The importance floor fell outside `0.0..=1.0`.
    #[error("min importance must lie in 0.0..=1.0, got {value}")]
    MinImportance {
        /// Rejected value.
        value: f64,
    },
    /// The saturation constant was not a positive finite number.
    #[error("density strength must be positive and finite, got {value}")]
    DensityStrength {
        /// Rejected value.
        value: f64,
    },
}

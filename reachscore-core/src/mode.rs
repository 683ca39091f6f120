//! Travel modes understood by the routing collaborator.
//!
//! The enum offers compile-time safety for cache keys and routing requests.
//!
//! # Examples
//! ```
//! use reachscore_core::TravelMode;
//!
//! assert_eq!(TravelMode::Walk.as_str(), "walk");
//! assert_eq!("bike".parse::<TravelMode>(), Ok(TravelMode::Bike));
//! ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum TravelMode {
    /// On foot.
    Walk,
    /// By bicycle.
    Bike,
    /// By car.
    Car,
}

impl TravelMode {
    /// Every supported mode, in declaration order.
    pub const ALL: [Self; 3] = [Self::Walk, Self::Bike, Self::Car];

    /// Return the mode as a lowercase `&str`.
    ///
    /// This is the value persisted in the `mode` column of cached isochrones.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Walk => "walk",
            Self::Bike => "bike",
            Self::Car => "car",
        }
    }

    /// Upper bound on travel speed in metres per second.
    ///
    /// Routing engines that sample candidate destinations use this to bound
    /// the search radius for a given time budget.
    pub const fn nominal_max_speed_mps(self) -> f64 {
        match self {
            Self::Walk => 1.6,
            Self::Bike => 6.5,
            Self::Car => 25.0,
        }
    }
}

impl std::fmt::Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "walk" => Ok(Self::Walk),
            "bike" => Ok(Self::Bike),
            "car" => Ok(Self::Car),
            _ => Err(format!("unknown travel mode '{s}'")),
        }
    }
}

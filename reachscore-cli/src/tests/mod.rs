//! Shared test harness modules for the reachscore CLI.

use super::*;

mod helpers;
mod score_unit;

//! Milestone achievements unlocked from flight history.
//!
//! Three rules are evaluated after every accepted flight:
//!
//! - `first_international`: the history holds exactly one international flight
//! - `frequent_flyer`: at least 10 flights were logged this calendar year
//! - `long_distance_traveler`: at least 10,000 km flown in total
//!
//! Each identifier unlocks at most once. `frequent_flyer` is not year-scoped:
//! once earned it stays earned and is never re-awarded in a later year.

mod classifier;
mod definitions;
mod engine;

pub use classifier::{DomesticPattern, RouteClassifier, DEFAULT_DOMESTIC_PATTERN};
pub use definitions::{Achievement, AchievementId, AchievementPayload, Definition, DEFINITIONS};
pub use engine::{AchievementEngine, Progress, Thresholds};

//! Achievement unlock evaluation.
//!
//! The engine is a pure function of the flight history, the set of already
//! unlocked identifiers and the current time. It never touches storage; the
//! caller persists whatever it returns and feeds the grown identifier set
//! back on the next call.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::classifier::{DomesticPattern, RouteClassifier};
use super::definitions::{Achievement, AchievementId, AchievementPayload};
use crate::record::FlightRecord;

/// Unlock thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Flights within one calendar year for `frequent_flyer`.
    pub frequent_flyer_flights: usize,
    /// Cumulative kilometers for `long_distance_traveler`.
    pub long_distance_km: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            frequent_flyer_flights: 10,
            long_distance_km: 10_000,
        }
    }
}

/// Progress toward one achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Achievement identifier.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Whether it is already unlocked.
    pub unlocked: bool,
    /// Current value of the measured quantity.
    pub current: u64,
    /// Value needed to unlock.
    pub target: u64,
}

/// Evaluates unlock rules against flight history.
#[derive(Debug, Clone)]
pub struct AchievementEngine<C = DomesticPattern> {
    classifier: C,
    thresholds: Thresholds,
}

impl Default for AchievementEngine {
    fn default() -> Self {
        Self::new(DomesticPattern::default(), Thresholds::default())
    }
}

impl<C: RouteClassifier> AchievementEngine<C> {
    /// Create an engine with the given route classifier and thresholds.
    pub fn new(classifier: C, thresholds: Thresholds) -> Self {
        Self {
            classifier,
            thresholds,
        }
    }

    /// The route classifier in use.
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// The thresholds in use.
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Determine which achievements `new_record` unlocks for the first time.
    ///
    /// `history` must already contain `new_record`. Identifiers in `unlocked`
    /// are never returned again. Unlock timestamps are the current time.
    pub fn evaluate(
        &self,
        new_record: &FlightRecord,
        history: &[FlightRecord],
        unlocked: &HashSet<String>,
    ) -> Vec<Achievement> {
        self.evaluate_at(new_record, history, unlocked, Utc::now())
    }

    /// Like [`AchievementEngine::evaluate`] with an explicit clock.
    ///
    /// `now` determines both the unlock timestamp and the calendar year used
    /// by the annual rule. An invalid `new_record` yields no achievements.
    pub fn evaluate_at(
        &self,
        new_record: &FlightRecord,
        history: &[FlightRecord],
        unlocked: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> Vec<Achievement> {
        if let Err(e) = new_record.validate() {
            warn!(
                flight = %new_record.flight_number,
                error = %e,
                "Skipping achievement evaluation for invalid record"
            );
            return Vec::new();
        }

        let is_new = |id: AchievementId| !unlocked.contains(id.as_str());
        let mut newly_unlocked = Vec::new();

        if is_new(AchievementId::FirstInternational) {
            if let Some(a) = self.check_first_international(history, now) {
                newly_unlocked.push(a);
            }
        }
        if is_new(AchievementId::FrequentFlyer) {
            if let Some(a) = self.check_frequent_flyer(history, now) {
                newly_unlocked.push(a);
            }
        }
        if is_new(AchievementId::LongDistanceTraveler) {
            if let Some(a) = self.check_long_distance(history, now) {
                newly_unlocked.push(a);
            }
        }

        debug!(
            flight = %new_record.flight_number,
            unlocked = newly_unlocked.len(),
            "Evaluated achievements"
        );
        newly_unlocked
    }

    /// Report current progress toward every achievement.
    pub fn progress(
        &self,
        history: &[FlightRecord],
        unlocked: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> Vec<Progress> {
        AchievementId::all()
            .iter()
            .map(|&id| {
                let (current, target) = match id {
                    AchievementId::FirstInternational => {
                        (self.international_count(history).min(1) as u64, 1)
                    }
                    AchievementId::FrequentFlyer => (
                        annual_count(history, now.year()) as u64,
                        self.thresholds.frequent_flyer_flights as u64,
                    ),
                    AchievementId::LongDistanceTraveler => {
                        (total_distance(history), self.thresholds.long_distance_km)
                    }
                };
                let def = id.definition();
                Progress {
                    id: id.as_str(),
                    name: def.name,
                    unlocked: unlocked.contains(id.as_str()),
                    current,
                    target,
                }
            })
            .collect()
    }

    /// Fires when exactly one international flight exists in the history.
    fn check_first_international(
        &self,
        history: &[FlightRecord],
        now: DateTime<Utc>,
    ) -> Option<Achievement> {
        let mut international = history
            .iter()
            .filter(|r| self.classifier.is_international_flight(r));
        let first = international.next()?;
        if international.next().is_some() {
            return None;
        }
        Some(Achievement::unlocked(
            AchievementId::FirstInternational,
            now,
            Some(AchievementPayload::Flight {
                flight_number: first.flight_number.clone(),
            }),
        ))
    }

    fn check_frequent_flyer(
        &self,
        history: &[FlightRecord],
        now: DateTime<Utc>,
    ) -> Option<Achievement> {
        let year = now.year();
        let flights = annual_count(history, year);
        (flights >= self.thresholds.frequent_flyer_flights).then(|| {
            Achievement::unlocked(
                AchievementId::FrequentFlyer,
                now,
                Some(AchievementPayload::AnnualFlights { year, flights }),
            )
        })
    }

    fn check_long_distance(
        &self,
        history: &[FlightRecord],
        now: DateTime<Utc>,
    ) -> Option<Achievement> {
        let distance_km = total_distance(history);
        (distance_km >= self.thresholds.long_distance_km).then(|| {
            Achievement::unlocked(
                AchievementId::LongDistanceTraveler,
                now,
                Some(AchievementPayload::TotalDistance { distance_km }),
            )
        })
    }

    fn international_count(&self, history: &[FlightRecord]) -> usize {
        history
            .iter()
            .filter(|r| self.classifier.is_international_flight(r))
            .count()
    }
}

/// Flights whose creation timestamp falls in `year`.
fn annual_count(history: &[FlightRecord], year: i32) -> usize {
    history
        .iter()
        .filter(|r| r.created_at.year() == year)
        .count()
}

fn total_distance(history: &[FlightRecord]) -> u64 {
    history.iter().map(|r| u64::from(r.distance_km)).sum()
}

//! Flight statistics.
//!
//! Aggregates counts and distances over a flight history for an optional
//! year/month window. Windows apply to the record's creation timestamp.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::achievements::RouteClassifier;
use crate::record::{CabinClass, FlightRecord};

/// Loyalty-style tier derived from distance flown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipTier {
    /// Under 10,000 km.
    Standard,
    /// 10,000 km or more.
    Silver,
    /// 50,000 km or more.
    Gold,
    /// 100,000 km or more.
    Platinum,
}

impl MembershipTier {
    /// Tier for a distance in kilometers.
    #[must_use]
    pub fn for_distance(distance_km: u64) -> Self {
        match distance_km {
            d if d >= 100_000 => Self::Platinum,
            d if d >= 50_000 => Self::Gold,
            d if d >= 10_000 => Self::Silver,
            _ => Self::Standard,
        }
    }
}

impl std::fmt::Display for MembershipTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "Standard"),
            Self::Silver => write!(f, "Silver"),
            Self::Gold => write!(f, "Gold"),
            Self::Platinum => write!(f, "Platinum"),
        }
    }
}

/// Aggregated statistics for a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightStatistics {
    /// Period label: `<year|ALL>-<month|ALL>`.
    pub period: String,
    /// Number of flights.
    pub total_flights: usize,
    /// Total kilometers.
    pub total_distance_km: u64,
    /// Mean kilometers per flight (0 when there are none).
    pub average_distance_km: f64,
    /// International flights.
    pub international_flights: usize,
    /// Domestic flights.
    pub domestic_flights: usize,
    /// Flights per carrier.
    pub per_carrier: BTreeMap<String, usize>,
    /// Flights per cabin class.
    pub per_cabin: BTreeMap<CabinClass, usize>,
    /// Most flown carrier; ties go to the alphabetically first.
    pub top_carrier: Option<String>,
    /// Flight number of the longest flight.
    pub longest_flight: Option<String>,
    /// Flight number of the shortest flight.
    pub shortest_flight: Option<String>,
    /// Tier for the period's distance.
    pub tier: MembershipTier,
}

/// Aggregate `history` for the given window.
///
/// `year` and `month` are independent filters; `month` without `year`
/// selects that month across all years.
pub fn aggregate<C: RouteClassifier + ?Sized>(
    history: &[FlightRecord],
    classifier: &C,
    year: Option<i32>,
    month: Option<u32>,
) -> FlightStatistics {
    let selected: Vec<&FlightRecord> = history
        .iter()
        .filter(|r| year.map_or(true, |y| r.created_at.year() == y))
        .filter(|r| month.map_or(true, |m| r.created_at.month() == m))
        .collect();

    let total_flights = selected.len();
    let total_distance_km: u64 = selected.iter().map(|r| u64::from(r.distance_km)).sum();
    #[allow(clippy::cast_precision_loss)]
    let average_distance_km = if total_flights == 0 {
        0.0
    } else {
        total_distance_km as f64 / total_flights as f64
    };

    let international_flights = selected
        .iter()
        .filter(|r| classifier.is_international_flight(r))
        .count();

    let mut per_carrier = BTreeMap::new();
    let mut per_cabin = BTreeMap::new();
    for record in &selected {
        *per_carrier.entry(record.carrier.clone()).or_insert(0) += 1;
        *per_cabin.entry(record.cabin).or_insert(0) += 1;
    }

    // BTreeMap iterates alphabetically, so the first max wins ties
    let top_carrier = per_carrier
        .iter()
        .fold(None::<(&String, usize)>, |best, (name, &count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((name, count)),
        })
        .map(|(name, _)| name.clone());

    let longest_flight = selected
        .iter()
        .max_by_key(|r| r.distance_km)
        .map(|r| r.flight_number.clone());
    let shortest_flight = selected
        .iter()
        .min_by_key(|r| r.distance_km)
        .map(|r| r.flight_number.clone());

    FlightStatistics {
        period: period_label(year, month),
        total_flights,
        total_distance_km,
        average_distance_km,
        international_flights,
        domestic_flights: total_flights - international_flights,
        per_carrier,
        per_cabin,
        top_carrier,
        longest_flight,
        shortest_flight,
        tier: MembershipTier::for_distance(total_distance_km),
    }
}

fn period_label(year: Option<i32>, month: Option<u32>) -> String {
    let year = year.map_or_else(|| "ALL".to_string(), |y| y.to_string());
    let month = month.map_or_else(|| "ALL".to_string(), |m| m.to_string());
    format!("{year}-{month}")
}

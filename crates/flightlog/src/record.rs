//! Flight record types for flightlog.
//!
//! A [`FlightRecord`] is created once from a [`NewFlight`], validated on the
//! way in, and never mutated afterwards. The serialized field names match the
//! flat JSON layout of `flight_records.json`.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Timestamp layouts accepted for departure and arrival times.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Cabin class a flight was taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CabinClass {
    /// Economy cabin.
    Economy,
    /// Premium economy cabin.
    PremiumEconomy,
    /// Business cabin.
    Business,
    /// First class cabin.
    First,
}

impl CabinClass {
    /// All cabin classes, cheapest first.
    pub const ALL: [CabinClass; 4] = [
        Self::Economy,
        Self::PremiumEconomy,
        Self::Business,
        Self::First,
    ];
}

impl std::fmt::Display for CabinClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Economy => write!(f, "Economy"),
            Self::PremiumEconomy => write!(f, "PremiumEconomy"),
            Self::Business => write!(f, "Business"),
            Self::First => write!(f, "First"),
        }
    }
}

impl FromStr for CabinClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "economy" => Ok(Self::Economy),
            "premiumeconomy" => Ok(Self::PremiumEconomy),
            "business" => Ok(Self::Business),
            "first" => Ok(Self::First),
            _ => Err(Error::invalid_record(format!("unknown cabin class: {s}"))),
        }
    }
}

/// Unvalidated input for a new flight record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFlight {
    /// Flight number, e.g. `CA888`.
    pub flight_number: String,
    /// Origin airport code.
    #[serde(alias = "departure_airport")]
    pub origin: String,
    /// Destination airport code.
    #[serde(alias = "arrival_airport")]
    pub destination: String,
    /// Scheduled departure time.
    #[serde(alias = "departure_time")]
    pub departure: String,
    /// Scheduled arrival time.
    #[serde(alias = "arrival_time")]
    pub arrival: String,
    /// Operating carrier.
    #[serde(alias = "airline")]
    pub carrier: String,
    /// Cabin class name.
    #[serde(alias = "cabin_class")]
    pub cabin: String,
    /// Distance flown in kilometers.
    #[serde(alias = "miles")]
    pub distance_km: u32,
    /// When the flight was first logged, if it was logged before.
    #[serde(
        default,
        alias = "record_date",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_logged_at"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// A recorded flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Flight number.
    pub flight_number: String,
    /// Origin airport code.
    #[serde(rename = "departure_airport")]
    pub origin: String,
    /// Destination airport code.
    #[serde(rename = "arrival_airport")]
    pub destination: String,
    /// Scheduled departure time (local wall clock of the ticket).
    #[serde(rename = "departure_time")]
    pub departure: NaiveDateTime,
    /// Scheduled arrival time (local wall clock of the ticket).
    #[serde(rename = "arrival_time")]
    pub arrival: NaiveDateTime,
    /// Operating carrier.
    #[serde(rename = "airline")]
    pub carrier: String,
    /// Cabin class.
    #[serde(rename = "cabin_class")]
    pub cabin: CabinClass,
    /// Distance flown in kilometers.
    #[serde(rename = "miles")]
    pub distance_km: u32,
    /// When this record was added to the log.
    #[serde(rename = "record_date", deserialize_with = "deserialize_logged_at")]
    pub created_at: DateTime<Utc>,
}

impl FlightRecord {
    /// Validate `input` and build a record stamped with its own
    /// `created_at`, or the current time if it has none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] if a field is empty or malformed, or
    /// if the departure is not strictly before the arrival.
    pub fn new(input: NewFlight) -> Result<Self> {
        let created_at = input.created_at.unwrap_or_else(Utc::now);
        Self::new_at(input, created_at)
    }

    /// Like [`FlightRecord::new`] with an explicit creation time that
    /// overrides the input's.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] on malformed input.
    pub fn new_at(input: NewFlight, created_at: DateTime<Utc>) -> Result<Self> {
        let flight_number = required("flight number", &input.flight_number)?.to_ascii_uppercase();
        let carrier = required("carrier", &input.carrier)?.to_string();
        let origin = airport_code("origin", &input.origin)?;
        let destination = airport_code("destination", &input.destination)?;
        let departure = parse_timestamp(&input.departure)?;
        let arrival = parse_timestamp(&input.arrival)?;
        let cabin = input.cabin.parse()?;

        let record = Self {
            flight_number,
            origin,
            destination,
            departure,
            arrival,
            carrier,
            cabin,
            distance_km: input.distance_km,
            created_at,
        };
        record.validate()?;
        Ok(record)
    }

    /// Check the record's invariants.
    ///
    /// Records read back from storage are not re-validated on load; callers
    /// that depend on the invariants (the achievement engine) check here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] describing the first broken invariant.
    pub fn validate(&self) -> Result<()> {
        if self.flight_number.trim().is_empty() {
            return Err(Error::invalid_record("flight number is empty"));
        }
        if self.origin.trim().is_empty() || self.destination.trim().is_empty() {
            return Err(Error::invalid_record("airport code is empty"));
        }
        if self.departure >= self.arrival {
            return Err(Error::invalid_record(format!(
                "departure {} is not before arrival {}",
                self.departure, self.arrival
            )));
        }
        Ok(())
    }

    /// Deduplication key: BLAKE3 of flight number, departure and origin.
    #[must_use]
    pub fn key(&self) -> String {
        let material = format!(
            "{}|{}|{}",
            self.flight_number,
            self.departure.format("%Y-%m-%dT%H:%M:%S"),
            self.origin
        );
        blake3::hash(material.as_bytes()).to_hex().to_string()
    }

    /// Scheduled block time.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.arrival - self.departure
    }

    /// Short route label, e.g. `PEK → JFK`.
    #[must_use]
    pub fn route(&self) -> String {
        format!("{} → {}", self.origin, self.destination)
    }
}

/// Parse a departure or arrival timestamp.
///
/// Accepts `YYYY-MM-DDTHH:MM[:SS[.fff]]`, the same with a space separator, or
/// RFC 3339 (the offset is dropped and the wall-clock time kept).
///
/// # Errors
///
/// Returns [`Error::InvalidRecord`] if no layout matches.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_local());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| Error::invalid_record(format!("unparseable timestamp: {value:?}")))
}

/// Parse a creation or unlock timestamp.
///
/// RFC 3339 keeps its offset. A value without one, as written by
/// `datetime.isoformat()`, is read as UTC.
///
/// # Errors
///
/// Returns [`Error::InvalidRecord`] if no layout matches.
pub fn parse_logged_at(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| Error::invalid_record(format!("unparseable timestamp: {value:?}")))
}

/// Serde adapter for [`parse_logged_at`].
pub(crate) fn deserialize_logged_at<'de, D>(
    deserializer: D,
) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_logged_at(&value).map_err(serde::de::Error::custom)
}

fn deserialize_optional_logged_at<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|value| parse_logged_at(&value).map_err(serde::de::Error::custom))
        .transpose()
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(Error::invalid_record(format!("{field} is empty")))
    } else {
        Ok(value)
    }
}

fn airport_code(field: &str, value: &str) -> Result<String> {
    let code = required(field, value)?.to_ascii_uppercase();
    let valid = (3..=4).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(code)
    } else {
        Err(Error::invalid_record(format!(
            "{field} must be a 3 or 4 character airport code, got {value:?}"
        )))
    }
}

/// Filters for reading flight records back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    /// Only flights with this carrier.
    pub airline: Option<String>,
    /// Only flights in this cabin.
    pub cabin: Option<CabinClass>,
    /// At most this many records.
    pub limit: Option<usize>,
}

impl RecordQuery {
    /// Check whether `record` passes the equality filters.
    #[must_use]
    pub fn matches(&self, record: &FlightRecord) -> bool {
        self.airline.as_ref().map_or(true, |a| *a == record.carrier)
            && self.cabin.map_or(true, |c| c == record.cabin)
    }

    /// Filter, sort newest first, and truncate `records`, which must be in
    /// insertion order.
    #[must_use]
    pub fn apply(&self, records: Vec<FlightRecord>) -> Vec<FlightRecord> {
        let mut selected: Vec<FlightRecord> =
            records.into_iter().rev().filter(|r| self.matches(r)).collect();
        // Stable, so equal timestamps stay newest-inserted first
        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn new_flight(flight: &str, origin: &str, destination: &str, km: u32) -> NewFlight {
        NewFlight {
            flight_number: flight.to_string(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure: "2024-01-15T10:30:00".to_string(),
            arrival: "2024-01-15T22:30:00".to_string(),
            carrier: "Air China".to_string(),
            cabin: "Economy".to_string(),
            distance_km: km,
            created_at: None,
        }
    }

    pub(crate) fn create_test_record(
        flight: &str,
        origin: &str,
        destination: &str,
        km: u32,
        created_at: DateTime<Utc>,
    ) -> FlightRecord {
        FlightRecord::new_at(new_flight(flight, origin, destination, km), created_at)
            .expect("valid test record")
    }

    #[test]
    fn test_cabin_class_parse() {
        assert_eq!("Economy".parse::<CabinClass>().unwrap(), CabinClass::Economy);
        assert_eq!("business".parse::<CabinClass>().unwrap(), CabinClass::Business);
        assert_eq!("FIRST".parse::<CabinClass>().unwrap(), CabinClass::First);
        assert_eq!(
            "premium_economy".parse::<CabinClass>().unwrap(),
            CabinClass::PremiumEconomy
        );
        assert_eq!(
            "Premium Economy".parse::<CabinClass>().unwrap(),
            CabinClass::PremiumEconomy
        );
        assert!("steerage".parse::<CabinClass>().is_err());
    }

    #[test]
    fn test_cabin_class_display_round_trips_through_parse() {
        for cabin in CabinClass::ALL {
            assert_eq!(cabin.to_string().parse::<CabinClass>().unwrap(), cabin);
        }
    }

    #[test]
    fn test_new_record_normalizes_codes() {
        let mut input = new_flight("ca888", " pek", "jfk ", 6850);
        input.cabin = "business".to_string();
        let record = FlightRecord::new(input).unwrap();

        assert_eq!(record.flight_number, "CA888");
        assert_eq!(record.origin, "PEK");
        assert_eq!(record.destination, "JFK");
        assert_eq!(record.cabin, CabinClass::Business);
        assert_eq!(record.distance_km, 6850);
    }

    #[test]
    fn test_new_record_rejects_arrival_before_departure() {
        let mut input = new_flight("CA888", "PEK", "JFK", 6850);
        input.arrival = "2024-01-15T09:00:00".to_string();
        let err = FlightRecord::new(input).unwrap_err();
        assert!(err.is_invalid_record());
        assert!(err.to_string().contains("not before arrival"));
    }

    #[test]
    fn test_new_record_rejects_equal_times() {
        let mut input = new_flight("CA888", "PEK", "JFK", 6850);
        input.arrival = input.departure.clone();
        assert!(FlightRecord::new(input).is_err());
    }

    #[test]
    fn test_new_record_rejects_empty_fields() {
        let mut input = new_flight("", "PEK", "JFK", 100);
        assert!(FlightRecord::new(input.clone()).is_err());

        input.flight_number = "CA1".to_string();
        input.carrier = "   ".to_string();
        assert!(FlightRecord::new(input).is_err());
    }

    #[test]
    fn test_new_record_rejects_bad_airport_code() {
        assert!(FlightRecord::new(new_flight("CA1", "Beijing", "JFK", 100)).is_err());
        assert!(FlightRecord::new(new_flight("CA1", "PE", "JFK", 100)).is_err());
        assert!(FlightRecord::new(new_flight("CA1", "ZBAA", "KJFK", 100)).is_ok());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDateTime::parse_from_str("2024-01-15 10:30:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        assert_eq!(parse_timestamp("2024-01-15T10:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-15T10:30").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-15 10:30").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-15T10:30:00.000").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-15T10:30:00+08:00").unwrap(), expected);
        assert!(parse_timestamp("next tuesday").is_err());
    }

    #[test]
    fn test_parse_logged_at() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 16, 9, 12, 33).unwrap();
        assert_eq!(parse_logged_at("2024-01-16T09:12:33").unwrap(), expected);
        assert_eq!(parse_logged_at("2024-01-16T09:12:33Z").unwrap(), expected);
        assert_eq!(parse_logged_at("2024-01-16T17:12:33+08:00").unwrap(), expected);
        assert_eq!(
            parse_logged_at("2024-01-16T09:12:33.250000").unwrap(),
            expected + chrono::Duration::milliseconds(250)
        );
        assert!(parse_logged_at("yesterday").is_err());
    }

    #[test]
    fn test_new_flight_keeps_record_date() {
        let json = r#"{
            "flight_number": "CA981",
            "departure_airport": "PEK",
            "arrival_airport": "JFK",
            "departure_time": "2019-06-01T13:00:00",
            "arrival_time": "2019-06-01T14:30:00",
            "airline": "Air China",
            "cabin_class": "Economy",
            "miles": 11000,
            "record_date": "2019-06-02T08:00:00.000001"
        }"#;
        let input: NewFlight = serde_json::from_str(json).unwrap();
        let record = FlightRecord::new(input).unwrap();
        assert_eq!(
            record.created_at,
            Utc.with_ymd_and_hms(2019, 6, 2, 8, 0, 0).unwrap() + chrono::Duration::microseconds(1)
        );

        // Without a record_date the record is stamped now
        let fresh = FlightRecord::new(new_flight("CA981", "PEK", "JFK", 11_000)).unwrap();
        assert!(Utc::now() - fresh.created_at < chrono::Duration::minutes(1));
    }

    #[test]
    fn test_new_flight_rejects_bad_record_date() {
        let json = r#"{
            "flight_number": "CA981", "origin": "PEK", "destination": "JFK",
            "departure": "2019-06-01T13:00", "arrival": "2019-06-01T14:30",
            "carrier": "Air China", "cabin": "Economy", "distance_km": 11000,
            "record_date": "last june"
        }"#;
        assert!(serde_json::from_str::<NewFlight>(json).is_err());
    }

    #[test]
    fn test_key_is_stable_and_distinct() {
        let now = Utc::now();
        let a = create_test_record("CA888", "PEK", "JFK", 6850, now);
        let b = create_test_record("CA888", "PEK", "JFK", 6850, now + chrono::Duration::hours(1));
        let c = create_test_record("CA999", "PEK", "JFK", 6850, now);

        // Creation time is not part of the key
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
        assert_eq!(a.key().len(), 64);
    }

    #[test]
    fn test_duration_and_route() {
        let record = create_test_record("CA888", "PEK", "JFK", 6850, Utc::now());
        assert_eq!(record.duration(), chrono::Duration::hours(12));
        assert_eq!(record.route(), "PEK → JFK");
    }

    #[test]
    fn test_serialization_uses_flat_json_names() {
        let created = Utc.with_ymd_and_hms(2024, 1, 16, 8, 0, 0).unwrap();
        let record = create_test_record("CA888", "PEK", "JFK", 6850, created);
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["departure_airport"], "PEK");
        assert_eq!(value["arrival_airport"], "JFK");
        assert_eq!(value["departure_time"], "2024-01-15T10:30:00");
        assert_eq!(value["airline"], "Air China");
        assert_eq!(value["cabin_class"], "Economy");
        assert_eq!(value["miles"], 6850);
        assert!(value["record_date"].as_str().unwrap().starts_with("2024-01-16"));

        let back: FlightRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_new_flight_accepts_legacy_field_names() {
        let json = r#"{
            "flight_number": "CZ3001",
            "departure_airport": "CTU",
            "arrival_airport": "SHA",
            "departure_time": "2024-01-20T08:00:00",
            "arrival_time": "2024-01-20T11:30:00",
            "airline": "China Southern",
            "cabin_class": "Economy",
            "miles": 1650
        }"#;
        let input: NewFlight = serde_json::from_str(json).unwrap();
        assert_eq!(input.origin, "CTU");
        assert_eq!(input.distance_km, 1650);
    }

    #[test]
    fn test_query_filters_sorts_and_limits() {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut older = create_test_record("CA1", "PEK", "SHA", 1000, base);
        older.cabin = CabinClass::Business;
        let mut newer = create_test_record("MU2", "SHA", "CAN", 1200, base + chrono::Duration::days(1));
        newer.carrier = "China Eastern".to_string();
        let newest = create_test_record("CA3", "PEK", "CAN", 1900, base + chrono::Duration::days(2));
        let records = vec![older, newer, newest];

        let all = RecordQuery::default().apply(records.clone());
        let numbers: Vec<_> = all.iter().map(|r| r.flight_number.as_str()).collect();
        assert_eq!(numbers, vec!["CA3", "MU2", "CA1"]);

        let air_china = RecordQuery {
            airline: Some("Air China".to_string()),
            ..RecordQuery::default()
        }
        .apply(records.clone());
        assert_eq!(air_china.len(), 2);

        let business = RecordQuery {
            cabin: Some(CabinClass::Business),
            ..RecordQuery::default()
        }
        .apply(records.clone());
        assert_eq!(business.len(), 1);
        assert_eq!(business[0].flight_number, "CA1");

        let limited = RecordQuery {
            limit: Some(1),
            ..RecordQuery::default()
        }
        .apply(records);
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].flight_number, "CA3");
    }

    #[test]
    fn test_query_ties_are_newest_inserted_first() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let records = vec![
            create_test_record("CA1", "PEK", "SHA", 1000, at),
            create_test_record("CA2", "PEK", "SHA", 1000, at),
            create_test_record("CA3", "PEK", "SHA", 1000, at),
        ];

        let sorted = RecordQuery::default().apply(records);
        let numbers: Vec<_> = sorted.iter().map(|r| r.flight_number.as_str()).collect();
        assert_eq!(numbers, vec!["CA3", "CA2", "CA1"]);
    }
}

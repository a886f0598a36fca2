//! Achievement definitions and unlocked-achievement records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of an achievement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AchievementId {
    /// First international flight.
    FirstInternational,
    /// Many flights within one calendar year.
    FrequentFlyer,
    /// Large cumulative distance.
    LongDistanceTraveler,
}

impl AchievementId {
    /// Get the string ID used in storage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstInternational => "first_international",
            Self::FrequentFlyer => "frequent_flyer",
            Self::LongDistanceTraveler => "long_distance_traveler",
        }
    }

    /// Parse a stored string ID.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "first_international" => Some(Self::FirstInternational),
            "frequent_flyer" => Some(Self::FrequentFlyer),
            "long_distance_traveler" => Some(Self::LongDistanceTraveler),
            _ => None,
        }
    }

    /// Get all achievement IDs.
    #[must_use]
    pub fn all() -> &'static [AchievementId] {
        &[
            Self::FirstInternational,
            Self::FrequentFlyer,
            Self::LongDistanceTraveler,
        ]
    }

    /// Static metadata for this achievement.
    #[must_use]
    pub fn definition(self) -> &'static Definition {
        DEFINITIONS
            .iter()
            .find(|d| d.id == self)
            .unwrap_or(&DEFINITIONS[0])
    }
}

impl std::fmt::Display for AchievementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display metadata for an achievement kind.
#[derive(Debug, Clone)]
pub struct Definition {
    /// Which achievement this describes.
    pub id: AchievementId,
    /// Display name.
    pub name: &'static str,
    /// What it takes to unlock.
    pub description: &'static str,
    /// Badge glyph for terminal output.
    pub icon: &'static str,
}

/// All achievement definitions.
pub static DEFINITIONS: &[Definition] = &[
    Definition {
        id: AchievementId::FirstInternational,
        name: "International Traveler",
        description: "Complete your first international flight",
        icon: "🌍",
    },
    Definition {
        id: AchievementId::FrequentFlyer,
        name: "Frequent Flyer",
        description: "Log 10 or more flights in one calendar year",
        icon: "✈️",
    },
    Definition {
        id: AchievementId::LongDistanceTraveler,
        name: "Long-Distance Traveler",
        description: "Fly 10,000 km or more in total",
        icon: "🚀",
    },
];

/// Supporting data captured when an achievement unlocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AchievementPayload {
    /// The flight that triggered the unlock.
    Flight {
        /// Flight number.
        flight_number: String,
    },
    /// Flight count for the calendar year at unlock time.
    AnnualFlights {
        /// Calendar year.
        year: i32,
        /// Flights logged in that year.
        flights: usize,
    },
    /// Cumulative distance at unlock time.
    TotalDistance {
        /// Total kilometers flown.
        distance_km: u64,
    },
}

/// An unlocked achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    /// Achievement kind identifier, unique across the store.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// When it was unlocked.
    #[serde(
        rename = "unlocked_date",
        deserialize_with = "crate::record::deserialize_logged_at"
    )]
    pub unlocked_at: DateTime<Utc>,
    /// Supporting data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<AchievementPayload>,
}

impl Achievement {
    /// Build an unlocked achievement from its definition.
    #[must_use]
    pub fn unlocked(
        id: AchievementId,
        unlocked_at: DateTime<Utc>,
        payload: Option<AchievementPayload>,
    ) -> Self {
        let def = id.definition();
        Self {
            id: id.as_str().to_string(),
            name: def.name.to_string(),
            description: def.description.to_string(),
            unlocked_at,
            payload,
        }
    }

    /// The typed identifier, if this is a known achievement.
    #[must_use]
    pub fn kind(&self) -> Option<AchievementId> {
        AchievementId::parse(&self.id)
    }

    /// Badge glyph, or a generic trophy for unknown kinds.
    #[must_use]
    pub fn icon(&self) -> &'static str {
        self.kind().map_or("🏆", |id| id.definition().icon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trip() {
        for id in AchievementId::all() {
            assert_eq!(AchievementId::parse(id.as_str()), Some(*id));
        }
        assert_eq!(AchievementId::parse("moon_landing"), None);
    }

    #[test]
    fn test_every_id_has_a_definition() {
        for id in AchievementId::all() {
            assert_eq!(id.definition().id, *id);
        }
        assert_eq!(DEFINITIONS.len(), AchievementId::all().len());
    }

    #[test]
    fn test_unlocked_copies_definition() {
        let now = Utc::now();
        let a = Achievement::unlocked(AchievementId::FrequentFlyer, now, None);
        assert_eq!(a.id, "frequent_flyer");
        assert_eq!(a.name, "Frequent Flyer");
        assert_eq!(a.unlocked_at, now);
        assert_eq!(a.kind(), Some(AchievementId::FrequentFlyer));
        assert_eq!(a.icon(), "✈️");
    }

    #[test]
    fn test_payload_serialization() {
        let a = Achievement::unlocked(
            AchievementId::FirstInternational,
            Utc::now(),
            Some(AchievementPayload::Flight {
                flight_number: "CA888".to_string(),
            }),
        );
        let value = serde_json::to_value(&a).unwrap();
        assert_eq!(value["payload"]["kind"], "flight");
        assert_eq!(value["payload"]["flight_number"], "CA888");
        assert!(value.get("unlocked_date").is_some());

        let back: Achievement = serde_json::from_value(value).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn test_missing_payload_deserializes() {
        let json = r#"{
            "id": "legacy_badge",
            "name": "Legacy",
            "description": "From an older version",
            "unlocked_date": "2024-01-01T00:00:00Z"
        }"#;
        let a: Achievement = serde_json::from_str(json).unwrap();
        assert!(a.payload.is_none());
        assert!(a.kind().is_none());
        assert_eq!(a.icon(), "🏆");
    }
}

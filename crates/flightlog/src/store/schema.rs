//! `SQLite` schema definitions for flightlog.

/// SQL statement to create the flights table.
///
/// `record_key` carries the deduplication key; the unique constraint keeps a
/// flight from being logged twice even if two writers race.
pub const CREATE_FLIGHTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS flights (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    record_key TEXT NOT NULL UNIQUE,
    flight_number TEXT NOT NULL,
    departure_airport TEXT NOT NULL,
    arrival_airport TEXT NOT NULL,
    departure_time TEXT NOT NULL,
    arrival_time TEXT NOT NULL,
    airline TEXT NOT NULL,
    cabin_class TEXT NOT NULL,
    distance_km INTEGER NOT NULL,
    record_date TEXT NOT NULL
)
";

/// Index on `record_date` for newest-first listing.
pub const CREATE_RECORD_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_flights_record_date ON flights(record_date DESC)
";

/// Index on `airline` for filtering.
pub const CREATE_AIRLINE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_flights_airline ON flights(airline)
";

/// Index on `cabin_class` for `list --cabin`.
pub const CREATE_CABIN_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_flights_cabin ON flights(cabin_class)
";

/// SQL statement to create the achievements table.
pub const CREATE_ACHIEVEMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS achievements (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    unlocked_date TEXT NOT NULL,
    payload TEXT
)
";

/// SQL statement to create the price alerts table, one row per route key.
pub const CREATE_PRICE_ALERTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS price_alerts (
    route_key TEXT PRIMARY KEY,
    departure TEXT NOT NULL,
    arrival TEXT NOT NULL,
    travel_date TEXT NOT NULL,
    current_price REAL NOT NULL,
    previous_price REAL,
    price_drop INTEGER NOT NULL,
    checked_at TEXT NOT NULL,
    raw_data TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_FLIGHTS_TABLE,
    CREATE_RECORD_DATE_INDEX,
    CREATE_AIRLINE_INDEX,
    CREATE_CABIN_INDEX,
    CREATE_ACHIEVEMENTS_TABLE,
    CREATE_PRICE_ALERTS_TABLE,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_flights_table_columns() {
        assert!(CREATE_FLIGHTS_TABLE.contains("record_key TEXT NOT NULL UNIQUE"));
        assert!(CREATE_FLIGHTS_TABLE.contains("departure_time TEXT NOT NULL"));
        assert!(CREATE_FLIGHTS_TABLE.contains("cabin_class TEXT NOT NULL"));
        assert!(CREATE_FLIGHTS_TABLE.contains("record_date TEXT NOT NULL"));
    }

    #[test]
    fn test_achievement_id_is_primary_key() {
        assert!(CREATE_ACHIEVEMENTS_TABLE.contains("id TEXT PRIMARY KEY"));
        assert!(CREATE_PRICE_ALERTS_TABLE.contains("route_key TEXT PRIMARY KEY"));
    }
}

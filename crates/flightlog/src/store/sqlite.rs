//! `SQLite` backend.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::achievements::Achievement;
use crate::error::{Error, Result};
use crate::price::PriceAlert;
use crate::record::{FlightRecord, RecordQuery};

use super::{migrations, AchievementStore, Backend, FlightStore, PriceAlertStore};

/// Database file name inside the data directory.
pub const DATABASE_FILE: &str = "flightlog.db";

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const FLIGHT_COLUMNS: &str = "flight_number, departure_airport, arrival_airport, \
     departure_time, arrival_time, airline, cabin_class, distance_km, record_date";

/// Storage in a single `SQLite` database.
#[derive(Debug)]
pub struct SqliteStore {
    path: PathBuf,
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a database at `path`.
    ///
    /// Creates parent directories as needed and brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn exists_by_key(&self, key: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM flights WHERE record_key = ?1",
            [key],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<FlightRecord> {
        let departure: String = row.get(3)?;
        let arrival: String = row.get(4)?;
        let cabin: String = row.get(6)?;
        let created_at: String = row.get(8)?;

        Ok(FlightRecord {
            flight_number: row.get(0)?,
            origin: row.get(1)?,
            destination: row.get(2)?,
            departure: parse_column(3, &departure, |s| {
                NaiveDateTime::parse_from_str(s, TIME_FORMAT).map_err(|e| e.to_string())
            })?,
            arrival: parse_column(4, &arrival, |s| {
                NaiveDateTime::parse_from_str(s, TIME_FORMAT).map_err(|e| e.to_string())
            })?,
            carrier: row.get(5)?,
            cabin: parse_column(6, &cabin, |s| s.parse().map_err(|e: Error| e.to_string()))?,
            distance_km: row.get(7)?,
            created_at: parse_column(8, &created_at, parse_utc)?,
        })
    }

    fn row_to_achievement(row: &rusqlite::Row) -> rusqlite::Result<Achievement> {
        let unlocked: String = row.get(3)?;
        let payload: Option<String> = row.get(4)?;
        let payload = payload
            .map(|p| parse_column(4, &p, |s| serde_json::from_str(s).map_err(|e| e.to_string())))
            .transpose()?;

        Ok(Achievement {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            unlocked_at: parse_column(3, &unlocked, parse_utc)?,
            payload,
        })
    }

    fn row_to_alert(row: &rusqlite::Row) -> rusqlite::Result<PriceAlert> {
        let travel_date: String = row.get(3)?;
        let checked_at: String = row.get(7)?;
        let raw_data: String = row.get(8)?;

        Ok(PriceAlert {
            route_key: row.get(0)?,
            origin: row.get(1)?,
            destination: row.get(2)?,
            travel_date: parse_column(3, &travel_date, |s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| e.to_string())
            })?,
            current_price: row.get(4)?,
            previous_price: row.get(5)?,
            price_drop: row.get(6)?,
            checked_at: parse_column(7, &checked_at, parse_utc)?,
            raw_data: parse_column(8, &raw_data, |s| {
                serde_json::from_str(s).map_err(|e| e.to_string())
            })?,
        })
    }
}

fn parse_utc(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| e.to_string())
}

/// Run a text column through `parse`, reporting failures as conversion errors.
fn parse_column<T>(
    idx: usize,
    value: &str,
    parse: impl FnOnce(&str) -> std::result::Result<T, String>,
) -> rusqlite::Result<T> {
    parse(value).map_err(|message| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::<dyn std::error::Error + Send + Sync>::from(format!("{value:?}: {message}")),
        )
    })
}

impl FlightStore for SqliteStore {
    fn append(&mut self, record: &FlightRecord) -> Result<bool> {
        let key = record.key();
        if self.exists_by_key(&key)? {
            debug!(
                flight = %record.flight_number,
                "Skipping duplicate record {}",
                &key[..16]
            );
            return Ok(false);
        }

        self.conn.execute(
            &format!(
                "INSERT INTO flights (record_key, {FLIGHT_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                key,
                record.flight_number,
                record.origin,
                record.destination,
                record.departure.format(TIME_FORMAT).to_string(),
                record.arrival.format(TIME_FORMAT).to_string(),
                record.carrier,
                record.cabin.to_string(),
                record.distance_km,
                record.created_at.to_rfc3339(),
            ],
        )?;
        debug!("Inserted flight {}", record.flight_number);
        Ok(true)
    }

    fn all(&self) -> Result<Vec<FlightRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {FLIGHT_COLUMNS} FROM flights ORDER BY id ASC"))?;
        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn query(&self, query: &RecordQuery) -> Result<Vec<FlightRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FLIGHT_COLUMNS} FROM flights \
             WHERE (?1 IS NULL OR airline = ?1) AND (?2 IS NULL OR cabin_class = ?2) \
             ORDER BY record_date DESC, id DESC LIMIT ?3"
        ))?;

        // SQLite treats a negative LIMIT as unbounded
        let limit = query
            .limit
            .map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let cabin = query.cabin.map(|c| c.to_string());
        let records = stmt
            .query_map(params![query.airline, cabin, limit], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM flights", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl AchievementStore for SqliteStore {
    fn read_all(&self) -> Result<Vec<Achievement>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, unlocked_date, payload \
             FROM achievements ORDER BY rowid ASC",
        )?;
        let achievements = stmt
            .query_map([], Self::row_to_achievement)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(achievements)
    }

    fn append_all(&mut self, achievements: &[Achievement]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut added = 0;
        for achievement in achievements {
            let payload = achievement
                .payload
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            added += tx.execute(
                "INSERT OR IGNORE INTO achievements (id, name, description, unlocked_date, payload) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    achievement.id,
                    achievement.name,
                    achievement.description,
                    achievement.unlocked_at.to_rfc3339(),
                    payload,
                ],
            )?;
        }
        tx.commit()?;
        Ok(added)
    }
}

impl PriceAlertStore for SqliteStore {
    fn alerts(&self) -> Result<Vec<PriceAlert>> {
        let mut stmt = self.conn.prepare(
            "SELECT route_key, departure, arrival, travel_date, current_price, previous_price, \
             price_drop, checked_at, raw_data FROM price_alerts ORDER BY route_key ASC",
        )?;
        let alerts = stmt
            .query_map([], Self::row_to_alert)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(alerts)
    }

    fn find_alert(&self, route_key: &str) -> Result<Option<PriceAlert>> {
        let alert = self
            .conn
            .query_row(
                "SELECT route_key, departure, arrival, travel_date, current_price, previous_price, \
                 price_drop, checked_at, raw_data FROM price_alerts WHERE route_key = ?1",
                [route_key],
                Self::row_to_alert,
            )
            .optional()?;
        Ok(alert)
    }

    fn upsert_alert(&mut self, alert: &PriceAlert) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO price_alerts (route_key, departure, arrival, travel_date, \
             current_price, previous_price, price_drop, checked_at, raw_data) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                alert.route_key,
                alert.origin,
                alert.destination,
                alert.travel_date.format("%Y-%m-%d").to_string(),
                alert.current_price,
                alert.previous_price,
                alert.price_drop,
                alert.checked_at.to_rfc3339(),
                serde_json::to_string(&alert.raw_data)?,
            ],
        )?;
        Ok(())
    }
}

impl Backend for SqliteStore {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

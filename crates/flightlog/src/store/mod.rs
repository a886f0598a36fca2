//! Persistence for flight records, achievements and price alerts.
//!
//! Two backends implement the same traits:
//!
//! - [`JsonStore`]: three JSON array files in a data directory, compatible
//!   with existing `flight_records.json` / `achievements.json` /
//!   `price_alerts.json` files
//! - [`SqliteStore`]: a single `SQLite` database with schema migrations
//!
//! Flight records and achievements are append-only. Price alerts hold one
//! entry per route key that is replaced on every check.

mod json;
pub mod migrations;
pub mod schema;
mod sqlite;

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::achievements::Achievement;
use crate::config::{Config, StorageBackend};
use crate::error::Result;
use crate::price::PriceAlert;
use crate::record::{FlightRecord, RecordQuery};

pub use json::{JsonStore, ACHIEVEMENTS_FILE, FLIGHT_RECORDS_FILE, PRICE_ALERTS_FILE};
pub use sqlite::{SqliteStore, DATABASE_FILE};

/// Append-only flight record storage.
pub trait FlightStore {
    /// Append a record unless one with the same key is already stored.
    ///
    /// Returns `false` for a duplicate.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    fn append(&mut self, record: &FlightRecord) -> Result<bool>;

    /// Every stored record in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn all(&self) -> Result<Vec<FlightRecord>>;

    /// Records matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn query(&self, query: &RecordQuery) -> Result<Vec<FlightRecord>> {
        Ok(query.apply(self.all()?))
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn count(&self) -> Result<usize> {
        Ok(self.all()?.len())
    }
}

/// Append-only achievement storage.
pub trait AchievementStore {
    /// Every unlocked achievement in unlock order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn read_all(&self) -> Result<Vec<Achievement>>;

    /// Append newly unlocked achievements. Identifiers already present are
    /// skipped; returns how many were written.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn append_all(&mut self, achievements: &[Achievement]) -> Result<usize>;

    /// Identifiers of every unlocked achievement.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn unlocked_ids(&self) -> Result<HashSet<String>> {
        Ok(self.read_all()?.into_iter().map(|a| a.id).collect())
    }
}

/// Price alert storage keyed by route key.
pub trait PriceAlertStore {
    /// Every stored alert.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn alerts(&self) -> Result<Vec<PriceAlert>>;

    /// The alert for `route_key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn find_alert(&self, route_key: &str) -> Result<Option<PriceAlert>> {
        Ok(self.alerts()?.into_iter().find(|a| a.route_key == route_key))
    }

    /// Insert `alert` or replace the one with the same route key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn upsert_alert(&mut self, alert: &PriceAlert) -> Result<()>;
}

/// A complete storage backend.
pub trait Backend: FlightStore + AchievementStore + PriceAlertStore + std::fmt::Debug {
    /// Backend name, `json` or `sqlite`.
    fn kind(&self) -> &'static str;

    /// Where the data lives.
    fn location(&self) -> &Path;
}

/// Record counts across a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    /// Backend name.
    pub backend: &'static str,
    /// Data file or directory.
    pub location: String,
    /// Flight records stored.
    pub flights: usize,
    /// Achievements unlocked.
    pub achievements: usize,
    /// Price alerts tracked.
    pub price_alerts: usize,
}

impl StoreSummary {
    /// Collect counts from `backend`.
    ///
    /// # Errors
    ///
    /// Returns an error if any store cannot be read.
    pub fn collect(backend: &dyn Backend) -> Result<Self> {
        Ok(Self {
            backend: backend.kind(),
            location: backend.location().display().to_string(),
            flights: backend.count()?,
            achievements: backend.read_all()?.len(),
            price_alerts: backend.alerts()?.len(),
        })
    }
}

/// Open the backend selected in `config`.
///
/// # Errors
///
/// Returns an error if the data directory or database cannot be opened.
pub fn open_backend(config: &Config) -> Result<Box<dyn Backend>> {
    let dir = &config.storage.data_dir;
    Ok(match config.storage.backend {
        StorageBackend::Json => Box::new(JsonStore::open(dir)?),
        StorageBackend::Sqlite => Box::new(SqliteStore::open(dir.join(DATABASE_FILE))?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::create_test_record;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn config_for(dir: &Path, backend: StorageBackend) -> Config {
        let mut config = Config::default();
        config.storage.backend = backend;
        config.storage.data_dir = dir.to_path_buf();
        config
    }

    #[test]
    fn test_open_backend_json() {
        let dir = TempDir::new().unwrap();
        let backend = open_backend(&config_for(dir.path(), StorageBackend::Json)).unwrap();
        assert_eq!(backend.kind(), "json");
        assert!(dir.path().join(FLIGHT_RECORDS_FILE).exists());
    }

    #[test]
    fn test_open_backend_sqlite() {
        let dir = TempDir::new().unwrap();
        let backend = open_backend(&config_for(dir.path(), StorageBackend::Sqlite)).unwrap();
        assert_eq!(backend.kind(), "sqlite");
        assert!(dir.path().join(DATABASE_FILE).exists());
    }

    #[test]
    fn test_summary_counts() {
        let dir = TempDir::new().unwrap();
        let mut backend = open_backend(&config_for(dir.path(), StorageBackend::Json)).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        backend
            .append(&create_test_record("CA981", "PEK", "JFK", 11_000, at))
            .unwrap();

        let summary = StoreSummary::collect(backend.as_ref()).unwrap();
        assert_eq!(summary.backend, "json");
        assert_eq!(summary.flights, 1);
        assert_eq!(summary.achievements, 0);
        assert_eq!(summary.price_alerts, 0);
    }
}

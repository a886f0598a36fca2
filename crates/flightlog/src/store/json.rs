//! JSON file backend.
//!
//! Each collection is a pretty-printed JSON array in its own file. Every
//! mutation holds an exclusive lock on `.flightlog.lock` in the data
//! directory for the whole load, modify and save cycle. Writes go to a
//! sibling temporary file which is synced and then renamed over the target,
//! so a crash mid-write leaves the previous contents intact.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::achievements::Achievement;
use crate::error::{Error, Result};
use crate::price::PriceAlert;
use crate::record::FlightRecord;

use super::{AchievementStore, Backend, FlightStore, PriceAlertStore};

/// Flight records file name.
pub const FLIGHT_RECORDS_FILE: &str = "flight_records.json";
/// Achievements file name.
pub const ACHIEVEMENTS_FILE: &str = "achievements.json";
/// Price alerts file name.
pub const PRICE_ALERTS_FILE: &str = "price_alerts.json";
/// Lock file serializing writers to one data directory.
pub const LOCK_FILE: &str = ".flightlog.lock";

/// Storage in a directory of JSON files.
#[derive(Debug)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Open a data directory, creating it and any missing files (as `[]`).
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or files cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|source| Error::DirectoryCreate {
                path: dir.clone(),
                source,
            })?;
        }

        let store = Self { dir };
        for file in [FLIGHT_RECORDS_FILE, ACHIEVEMENTS_FILE, PRICE_ALERTS_FILE] {
            let path = store.dir.join(file);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut created) => {
                    debug!("Initializing {}", path.display());
                    created.write_all(b"[]")?;
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
        }
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(store.dir.join(LOCK_FILE))?;

        info!("Using JSON data directory {}", store.dir.display());
        Ok(store)
    }

    /// The data directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Take the data directory's write lock, blocking until it is free.
    ///
    /// The lock is released when the returned file is dropped.
    fn write_lock(&self) -> Result<File> {
        let path = self.dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.lock_exclusive()
            .map_err(|e| Error::data_file(path, format!("cannot lock: {e}")))?;
        Ok(file)
    }

    fn load<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents).map_err(|e| Error::data_file(path, e.to_string()))
    }

    fn save<T: Serialize>(&self, file: &str, items: &[T]) -> Result<()> {
        let path = self.dir.join(file);
        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(items)?;
        let mut file = File::create(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &path)?;
        debug!("Wrote {} entries to {}", items.len(), path.display());
        Ok(())
    }
}

impl FlightStore for JsonStore {
    fn append(&mut self, record: &FlightRecord) -> Result<bool> {
        let _lock = self.write_lock()?;
        let mut records: Vec<FlightRecord> = self.load(FLIGHT_RECORDS_FILE)?;
        let key = record.key();
        if records.iter().any(|r| r.key() == key) {
            debug!(
                flight = %record.flight_number,
                "Skipping duplicate record {}",
                &key[..16]
            );
            return Ok(false);
        }
        records.push(record.clone());
        self.save(FLIGHT_RECORDS_FILE, &records)?;
        Ok(true)
    }

    fn all(&self) -> Result<Vec<FlightRecord>> {
        self.load(FLIGHT_RECORDS_FILE)
    }
}

impl AchievementStore for JsonStore {
    fn read_all(&self) -> Result<Vec<Achievement>> {
        self.load(ACHIEVEMENTS_FILE)
    }

    fn append_all(&mut self, achievements: &[Achievement]) -> Result<usize> {
        if achievements.is_empty() {
            return Ok(0);
        }
        let _lock = self.write_lock()?;
        let mut stored: Vec<Achievement> = self.load(ACHIEVEMENTS_FILE)?;
        let mut added = 0;
        for achievement in achievements {
            if stored.iter().any(|a| a.id == achievement.id) {
                debug!("Achievement {} already stored", achievement.id);
                continue;
            }
            stored.push(achievement.clone());
            added += 1;
        }
        if added > 0 {
            self.save(ACHIEVEMENTS_FILE, &stored)?;
        }
        Ok(added)
    }
}

impl PriceAlertStore for JsonStore {
    fn alerts(&self) -> Result<Vec<PriceAlert>> {
        self.load(PRICE_ALERTS_FILE)
    }

    fn upsert_alert(&mut self, alert: &PriceAlert) -> Result<()> {
        let _lock = self.write_lock()?;
        let mut alerts: Vec<PriceAlert> = self.load(PRICE_ALERTS_FILE)?;
        match alerts.iter_mut().find(|a| a.route_key == alert.route_key) {
            Some(existing) => *existing = alert.clone(),
            None => alerts.push(alert.clone()),
        }
        self.save(PRICE_ALERTS_FILE, &alerts)
    }
}

impl Backend for JsonStore {
    fn kind(&self) -> &'static str {
        "json"
    }

    fn location(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::{AchievementId, AchievementPayload};
    use crate::record::tests::create_test_record;
    use crate::record::{CabinClass, RecordQuery};
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        (dir, store)
    }

    fn alert(route_key: &str, price: f64) -> PriceAlert {
        PriceAlert {
            route_key: route_key.to_string(),
            origin: "PEK".to_string(),
            destination: "NRT".to_string(),
            travel_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            current_price: price,
            previous_price: None,
            price_drop: false,
            checked_at: Utc::now(),
            raw_data: serde_json::json!({ "min_price": price }),
        }
    }

    #[test]
    fn test_open_creates_empty_files() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = JsonStore::open(&nested).unwrap();

        assert_eq!(store.dir(), nested);
        for file in [FLIGHT_RECORDS_FILE, ACHIEVEMENTS_FILE, PRICE_ALERTS_FILE] {
            assert_eq!(fs::read_to_string(nested.join(file)).unwrap(), "[]");
        }
    }

    #[test]
    fn test_open_creates_lock_file() {
        let (dir, _store) = create_test_store();
        assert!(dir.path().join(LOCK_FILE).exists());
    }

    #[test]
    fn test_reopen_while_writer_holds_lock() {
        let (dir, mut store) = create_test_store();
        store
            .append(&create_test_record("CA981", "PEK", "JFK", 11_000, Utc::now()))
            .unwrap();

        let lock = store.write_lock().unwrap();
        // Opening and reading never take the lock
        let mut reopened = JsonStore::open(dir.path()).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
        assert!(reopened.read_all().unwrap().is_empty());
        drop(lock);

        assert!(reopened
            .append(&create_test_record("CA1501", "PEK", "SHA", 1_100, Utc::now()))
            .unwrap());
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_lock_is_released_after_each_write() {
        let (dir, mut store) = create_test_store();
        store
            .append(&create_test_record("CA981", "PEK", "JFK", 11_000, Utc::now()))
            .unwrap();

        let lock = File::open(dir.path().join(LOCK_FILE)).unwrap();
        assert!(lock.try_lock_exclusive().is_ok());
    }

    #[test]
    fn test_append_and_read_back() {
        let (_dir, mut store) = create_test_store();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let record = create_test_record("CA981", "PEK", "JFK", 11_000, at);

        assert!(store.append(&record).unwrap());
        let all = store.all().unwrap();
        assert_eq!(all, vec![record]);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_append_deduplicates() {
        let (_dir, mut store) = create_test_store();
        let first = create_test_record("CA981", "PEK", "JFK", 11_000, Utc::now());
        let mut again = first.clone();
        again.created_at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        assert!(store.append(&first).unwrap());
        assert!(!store.append(&again).unwrap());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_file_uses_flat_field_names() {
        let (dir, mut store) = create_test_store();
        store
            .append(&create_test_record("CA981", "PEK", "JFK", 11_000, Utc::now()))
            .unwrap();

        let raw = fs::read_to_string(dir.path().join(FLIGHT_RECORDS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entry = &value[0];
        assert_eq!(entry["departure_airport"], "PEK");
        assert_eq!(entry["arrival_airport"], "JFK");
        assert_eq!(entry["cabin_class"], "Economy");
        assert!(entry.get("record_date").is_some());
        assert!(!dir.path().join("flight_records.json.tmp").exists());
    }

    #[test]
    fn test_query_filters_and_orders() {
        let (_dir, mut store) = create_test_store();
        let old = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut business = create_test_record("CA981", "PEK", "JFK", 11_000, old);
        business.cabin = CabinClass::Business;
        store.append(&business).unwrap();
        store
            .append(&create_test_record("CA1501", "PEK", "SHA", 1_100, new))
            .unwrap();

        let all = store.query(&RecordQuery::default()).unwrap();
        assert_eq!(all[0].flight_number, "CA1501");

        let only_business = store
            .query(&RecordQuery {
                cabin: Some(CabinClass::Business),
                ..RecordQuery::default()
            })
            .unwrap();
        assert_eq!(only_business.len(), 1);
        assert_eq!(only_business[0].flight_number, "CA981");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let (dir, store) = create_test_store();
        fs::write(dir.path().join(FLIGHT_RECORDS_FILE), "{ not json").unwrap();

        let err = store.all().unwrap_err();
        assert!(matches!(err, Error::DataFile { .. }));
        assert!(err.to_string().contains(FLIGHT_RECORDS_FILE));
    }

    #[test]
    fn test_empty_file_reads_as_empty() {
        let (dir, store) = create_test_store();
        fs::write(dir.path().join(ACHIEVEMENTS_FILE), "").unwrap();
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_achievements_append_only_once() {
        let (_dir, mut store) = create_test_store();
        let first = Achievement::unlocked(
            AchievementId::FirstInternational,
            Utc::now(),
            Some(AchievementPayload::Flight {
                flight_number: "CA981".to_string(),
            }),
        );
        let distance = Achievement::unlocked(AchievementId::LongDistanceTraveler, Utc::now(), None);

        assert_eq!(store.append_all(&[first.clone()]).unwrap(), 1);
        assert_eq!(store.append_all(&[first, distance]).unwrap(), 1);
        assert_eq!(store.append_all(&[]).unwrap(), 0);

        let ids = store.unlocked_ids().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("first_international"));
        assert_eq!(store.read_all().unwrap()[1].id, "long_distance_traveler");
    }

    #[test]
    fn test_alert_upsert_replaces_by_route() {
        let (_dir, mut store) = create_test_store();
        store.upsert_alert(&alert("PEK_NRT_2024-03-01", 900.0)).unwrap();
        store.upsert_alert(&alert("PEK_ICN_2024-03-01", 400.0)).unwrap();
        store.upsert_alert(&alert("PEK_NRT_2024-03-01", 850.0)).unwrap();

        assert_eq!(store.alerts().unwrap().len(), 2);
        let found = store.find_alert("PEK_NRT_2024-03-01").unwrap().unwrap();
        assert!((found.current_price - 850.0).abs() < f64::EPSILON);
        assert!(store.find_alert("PEK_LAX_2024-03-01").unwrap().is_none());
    }

    #[test]
    fn test_reads_legacy_achievement_without_payload() {
        let (dir, store) = create_test_store();
        fs::write(
            dir.path().join(ACHIEVEMENTS_FILE),
            r#"[{"id":"frequent_flyer","name":"✈️ 常旅客","description":"年飞行10次以上","unlocked_date":"2024-05-01T08:00:00.512873"}]"#,
        )
        .unwrap();

        let achievements = store.read_all().unwrap();
        assert_eq!(achievements.len(), 1);
        assert_eq!(achievements[0].kind(), Some(AchievementId::FrequentFlyer));
        assert!(achievements[0].payload.is_none());
        assert_eq!(
            achievements[0].unlocked_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
                + chrono::Duration::microseconds(512_873)
        );
    }

    #[test]
    fn test_reads_legacy_records_with_naive_dates() {
        let (dir, mut store) = create_test_store();
        fs::write(
            dir.path().join(FLIGHT_RECORDS_FILE),
            r#"[
  {
    "flight_number": "CA981",
    "departure_airport": "PEK",
    "arrival_airport": "JFK",
    "departure_time": "2024-01-15T13:00:00",
    "arrival_time": "2024-01-15T14:30:00",
    "airline": "Air China",
    "cabin_class": "Business",
    "miles": 11000,
    "record_date": "2024-01-16T09:12:33.123456"
  }
]"#,
        )
        .unwrap();

        let records = store.all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].created_at.naive_utc().to_string(),
            "2024-01-16 09:12:33.123456"
        );

        // Rewriting the file keeps the legacy entry readable
        store
            .append(&create_test_record("CA1501", "PEK", "SHA", 1_100, Utc::now()))
            .unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }
}

//! The flight log: records flights and keeps achievements in step.
//!
//! Adding a flight validates it, appends it, then evaluates achievements
//! against the stored history. Evaluation is best-effort: once the record is
//! stored, a failure while reading history or writing achievements is logged
//! and reported as "nothing unlocked", never as a failed add.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::achievements::{Achievement, AchievementEngine, Progress};
use crate::config::Config;
use crate::error::Result;
use crate::record::{FlightRecord, NewFlight, RecordQuery};
use crate::stats::{self, FlightStatistics};
use crate::store::{self, Backend};

/// Result of adding one flight.
#[derive(Debug, Clone, PartialEq)]
pub struct AddOutcome {
    /// The validated record.
    pub record: FlightRecord,
    /// `true` if an identical flight was already logged and nothing changed.
    pub duplicate: bool,
    /// Achievements unlocked by this flight.
    pub unlocked: Vec<Achievement>,
}

/// A flight rejected during import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Position in the input.
    pub index: usize,
    /// Flight number as given.
    pub flight_number: String,
    /// Why it was rejected.
    pub reason: String,
}

/// Result of a batch import.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    /// Flights added.
    pub added: usize,
    /// Flights already logged.
    pub duplicates: usize,
    /// Flights that failed validation.
    pub rejected: Vec<Rejection>,
    /// Achievements unlocked along the way.
    pub unlocked: Vec<Achievement>,
}

/// Totals included in an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Number of flight records.
    pub total_records: usize,
    /// Number of unlocked achievements.
    pub total_achievements: usize,
}

/// Everything in the log, for backup or migration between backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    /// When the export was taken.
    #[serde(deserialize_with = "crate::record::deserialize_logged_at")]
    pub export_date: DateTime<Utc>,
    /// Totals.
    pub summary: ExportSummary,
    /// All flight records in insertion order.
    pub records: Vec<FlightRecord>,
    /// All unlocked achievements.
    pub achievements: Vec<Achievement>,
}

/// A flight log over a storage backend.
#[derive(Debug)]
pub struct FlightLog {
    backend: Box<dyn Backend>,
    engine: AchievementEngine,
}

impl FlightLog {
    /// Create a flight log from its parts.
    pub fn new(backend: Box<dyn Backend>, engine: AchievementEngine) -> Self {
        Self { backend, engine }
    }

    /// Open the configured backend with the configured achievement rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be opened or the domestic-code
    /// pattern is invalid.
    pub fn open(config: &Config) -> Result<Self> {
        let backend = store::open_backend(config)?;
        let engine = AchievementEngine::new(config.classifier()?, config.thresholds());
        Ok(Self::new(backend, engine))
    }

    /// The storage backend.
    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// The storage backend, mutably.
    pub fn backend_mut(&mut self) -> &mut dyn Backend {
        self.backend.as_mut()
    }

    /// Validate and log a flight, then unlock any achievements it earns.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidRecord`] if the flight fails validation,
    /// or a storage error if it cannot be appended.
    pub fn add_flight(&mut self, input: NewFlight) -> Result<AddOutcome> {
        let record = FlightRecord::new(input)?;
        self.add_record(record)
    }

    /// Log an already validated record.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the record cannot be appended.
    pub fn add_record(&mut self, record: FlightRecord) -> Result<AddOutcome> {
        if !self.backend.append(&record)? {
            info!(flight = %record.flight_number, "Flight already logged");
            return Ok(AddOutcome {
                record,
                duplicate: true,
                unlocked: Vec::new(),
            });
        }

        info!(
            flight = %record.flight_number,
            route = %record.route(),
            "Logged flight"
        );
        let unlocked = self.unlock_for(&record);
        Ok(AddOutcome {
            record,
            duplicate: false,
            unlocked,
        })
    }

    fn unlock_for(&mut self, record: &FlightRecord) -> Vec<Achievement> {
        match self.try_unlock(record) {
            Ok(unlocked) => unlocked,
            Err(e) => {
                warn!(
                    flight = %record.flight_number,
                    error = %e,
                    "Achievement evaluation failed; flight kept"
                );
                Vec::new()
            }
        }
    }

    fn try_unlock(&mut self, record: &FlightRecord) -> Result<Vec<Achievement>> {
        let history = self.backend.all()?;
        let unlocked_ids = self.backend.unlocked_ids()?;
        let newly_unlocked = self.engine.evaluate(record, &history, &unlocked_ids);
        if newly_unlocked.is_empty() {
            return Ok(newly_unlocked);
        }

        self.backend.append_all(&newly_unlocked)?;
        for achievement in &newly_unlocked {
            info!(
                achievement = %achievement.id,
                "Achievement unlocked: {}",
                achievement.name
            );
        }
        Ok(newly_unlocked)
    }

    /// Records matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn records(&self, query: &RecordQuery) -> Result<Vec<FlightRecord>> {
        self.backend.query(query)
    }

    /// Statistics for an optional year and month.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn statistics(&self, year: Option<i32>, month: Option<u32>) -> Result<FlightStatistics> {
        let history = self.backend.all()?;
        Ok(stats::aggregate(
            &history,
            self.engine.classifier(),
            year,
            month,
        ))
    }

    /// Every unlocked achievement.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn achievements(&self) -> Result<Vec<Achievement>> {
        self.backend.read_all()
    }

    /// Progress toward every achievement, locked or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn achievement_progress(&self) -> Result<Vec<Progress>> {
        let history = self.backend.all()?;
        let unlocked = self.backend.unlocked_ids()?;
        Ok(self.engine.progress(&history, &unlocked, Utc::now()))
    }

    /// Add many flights in order.
    ///
    /// Invalid flights are collected as rejections and do not stop the
    /// import; storage errors do.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a record cannot be appended.
    pub fn import(&mut self, flights: Vec<NewFlight>) -> Result<ImportSummary> {
        self.import_each(flights.into_iter().map(|input| {
            let flight_number = input.flight_number.clone();
            (flight_number, FlightRecord::new(input))
        }))
    }

    /// Load an export bundle, keeping each record's original creation time.
    ///
    /// The bundle's achievements are stored first so they are not unlocked a
    /// second time while its records are replayed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a record or achievement cannot be written.
    pub fn restore(&mut self, bundle: ExportBundle) -> Result<ImportSummary> {
        let restored = self.backend.append_all(&bundle.achievements)?;
        debug!(restored, "Restored achievements from bundle");
        self.import_each(bundle.records.into_iter().map(|record| {
            let flight_number = record.flight_number.clone();
            (flight_number, record.validate().map(|()| record))
        }))
    }

    fn import_each(
        &mut self,
        items: impl Iterator<Item = (String, Result<FlightRecord>)>,
    ) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        for (index, (flight_number, record)) in items.enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    debug!(index, flight = %flight_number, "Rejected: {}", e);
                    summary.rejected.push(Rejection {
                        index,
                        flight_number,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let outcome = self.add_record(record)?;
            if outcome.duplicate {
                summary.duplicates += 1;
            } else {
                summary.added += 1;
                summary.unlocked.extend(outcome.unlocked);
            }
        }

        info!(
            added = summary.added,
            duplicates = summary.duplicates,
            rejected = summary.rejected.len(),
            "Import finished"
        );
        Ok(summary)
    }

    /// Snapshot every record and achievement.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn export(&self) -> Result<ExportBundle> {
        let records = self.backend.all()?;
        let achievements = self.backend.read_all()?;
        Ok(ExportBundle {
            export_date: Utc::now(),
            summary: ExportSummary {
                total_records: records.len(),
                total_achievements: achievements.len(),
            },
            records,
            achievements,
        })
    }
}

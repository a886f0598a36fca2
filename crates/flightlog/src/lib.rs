//! `flightlog` - A personal flight log with achievements, statistics and fare alerts
//!
//! This library provides the core functionality for recording flights,
//! unlocking milestone achievements, aggregating statistics, rendering
//! itinerary cards and watching fares, backed by either JSON files or SQLite.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod achievements;
pub mod card;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod price;
pub mod record;
pub mod service;
pub mod stats;
pub mod store;

pub use achievements::{Achievement, AchievementEngine, AchievementId, Progress};
pub use card::CardRenderer;
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use price::{FareQuery, FareSource, HttpFareSource, PriceAlert, PriceMonitor};
pub use record::{CabinClass, FlightRecord, NewFlight, RecordQuery};
pub use service::{AddOutcome, ExportBundle, FlightLog, ImportSummary};
pub use stats::{FlightStatistics, MembershipTier};
pub use store::{Backend, JsonStore, SqliteStore};

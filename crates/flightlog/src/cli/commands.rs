//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::price::FareQuery;
use crate::record::{CabinClass, NewFlight, RecordQuery};

/// Add command arguments.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Flight number, e.g. CA981
    #[arg(short, long)]
    pub flight: String,

    /// Origin airport code
    #[arg(long)]
    pub from: String,

    /// Destination airport code
    #[arg(long)]
    pub to: String,

    /// Scheduled departure (YYYY-MM-DDTHH:MM)
    #[arg(long)]
    pub departure: String,

    /// Scheduled arrival (YYYY-MM-DDTHH:MM)
    #[arg(long)]
    pub arrival: String,

    /// Operating airline
    #[arg(short, long)]
    pub airline: String,

    /// Cabin class
    #[arg(long, value_enum, default_value = "economy")]
    pub cabin: CabinArg,

    /// Distance flown in kilometers
    #[arg(short, long)]
    pub distance: u32,

    /// Also render an itinerary card
    #[arg(long)]
    pub card: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

impl AddCommand {
    /// The flight described by these arguments.
    #[must_use]
    pub fn to_new_flight(&self) -> NewFlight {
        NewFlight {
            flight_number: self.flight.clone(),
            origin: self.from.clone(),
            destination: self.to.clone(),
            departure: self.departure.clone(),
            arrival: self.arrival.clone(),
            carrier: self.airline.clone(),
            cabin: CabinClass::from(self.cabin).to_string(),
            distance_km: self.distance,
            created_at: None,
        }
    }
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only flights with this airline
    #[arg(short, long)]
    pub airline: Option<String>,

    /// Only flights in this cabin
    #[arg(long, value_enum)]
    pub cabin: Option<CabinArg>,

    /// Maximum number of results
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl ListCommand {
    /// The record filter described by these arguments.
    #[must_use]
    pub fn to_query(&self) -> RecordQuery {
        RecordQuery {
            airline: self.airline.clone(),
            cabin: self.cabin.map(CabinClass::from),
            limit: self.limit,
        }
    }
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Only flights logged in this year
    #[arg(short, long)]
    pub year: Option<i32>,

    /// Only flights logged in this month (1-12)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Achievements command arguments.
#[derive(Debug, Args)]
pub struct AchievementsCommand {
    /// Include locked achievements with progress
    #[arg(short, long)]
    pub all: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Card command arguments.
#[derive(Debug, Args)]
pub struct CardCommand {
    /// Render cards for this flight number
    #[arg(short, long, conflicts_with = "latest")]
    pub flight: Option<String>,

    /// Render cards for the N most recently logged flights
    #[arg(short, long, default_value = "1")]
    pub latest: usize,

    /// Write cards here instead of the configured directory
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

/// Import command arguments.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// JSON file: an array of flights, or a bundle written by `export`
    pub file: PathBuf,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Fare monitoring commands.
#[derive(Debug, Subcommand)]
pub enum PriceCommand {
    /// Look up the current fare for a route and compare with the last check
    Check {
        /// Origin airport or city
        #[arg(long)]
        from: String,

        /// Destination airport or city
        #[arg(long)]
        to: String,

        /// Travel date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Only report drops of at least this amount
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the latest fare for every tracked route
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

impl PriceCommand {
    /// The fare query for `check`, if this is one.
    #[must_use]
    pub fn fare_query(&self) -> Option<FareQuery> {
        match self {
            Self::Check { from, to, date, .. } => Some(FareQuery::new(
                from.to_ascii_uppercase(),
                to.to_ascii_uppercase(),
                *date,
            )),
            Self::List { .. } => None,
        }
    }
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration (secrets masked)
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Cabin class argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CabinArg {
    /// Economy
    Economy,
    /// Premium economy
    PremiumEconomy,
    /// Business
    Business,
    /// First
    First,
}

impl From<CabinArg> for CabinClass {
    fn from(arg: CabinArg) -> Self {
        match arg {
            CabinArg::Economy => Self::Economy,
            CabinArg::PremiumEconomy => Self::PremiumEconomy,
            CabinArg::Business => Self::Business,
            CabinArg::First => Self::First,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

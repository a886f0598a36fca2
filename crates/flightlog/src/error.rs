//! Error types for flightlog.
//!
//! This module defines all error types used throughout the flightlog crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for flightlog operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A JSON data file could not be read or written.
    #[error("data file {path} is unusable: {message}")]
    DataFile {
        /// Path to the data file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Record Errors ===
    /// A flight record failed validation.
    #[error("invalid flight record: {message}")]
    InvalidRecord {
        /// Why the record was rejected.
        message: String,
    },

    // === Price Lookup Errors ===
    /// The fare API URL or key is missing.
    #[error("fare API is not configured (set FLIGHT_API_URL and FLIGHT_API_KEY)")]
    PriceApiNotConfigured,

    /// A fare lookup failed.
    #[error("fare lookup for {route} failed: {message}")]
    PriceLookup {
        /// Route key of the lookup.
        route: String,
        /// Description of what went wrong.
        message: String,
    },

    // === Card Errors ===
    /// An itinerary card could not be rendered.
    #[error("failed to render itinerary card for {flight}: {message}")]
    CardRender {
        /// Flight number of the card.
        flight: String,
        /// Description of what went wrong.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for flightlog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new invalid record error.
    #[must_use]
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Create a new fare lookup error.
    #[must_use]
    pub fn price_lookup(route: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PriceLookup {
            route: route.into(),
            message: message.into(),
        }
    }

    /// Create a new card render error.
    #[must_use]
    pub fn card_render(flight: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CardRender {
            flight: flight.into(),
            message: message.into(),
        }
    }

    /// Create a new data file error.
    #[must_use]
    pub fn data_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DataFile {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error means the fare API has not been configured.
    #[must_use]
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::PriceApiNotConfigured)
    }

    /// Check if this error is a rejected flight record.
    #[must_use]
    pub fn is_invalid_record(&self) -> bool {
        matches!(self, Self::InvalidRecord { .. })
    }
}

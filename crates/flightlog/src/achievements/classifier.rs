//! Domestic/international route classification.

use regex::Regex;

use crate::error::{Error, Result};
use crate::record::FlightRecord;

/// Default pattern for domestic airport codes (ICAO region prefix `Z`).
pub const DEFAULT_DOMESTIC_PATTERN: &str = "^Z";

/// Decides whether a route crosses the domestic/international boundary.
pub trait RouteClassifier {
    /// Returns `true` if a flight from `origin` to `destination` is international.
    fn is_international(&self, origin: &str, destination: &str) -> bool;

    /// Classify a recorded flight.
    fn is_international_flight(&self, record: &FlightRecord) -> bool {
        self.is_international(&record.origin, &record.destination)
    }
}

impl<F> RouteClassifier for F
where
    F: Fn(&str, &str) -> bool,
{
    fn is_international(&self, origin: &str, destination: &str) -> bool {
        self(origin, destination)
    }
}

/// A route is domestic when both airport codes match one pattern.
#[derive(Debug, Clone)]
pub struct DomesticPattern {
    regex: Regex,
}

impl DomesticPattern {
    /// Compile a domestic-code pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if `pattern` is not a valid regex.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| Error::ConfigValidation {
            message: format!("invalid domestic_code_pattern {pattern:?}: {e}"),
        })?;
        Ok(Self { regex })
    }

    /// The source pattern.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Whether a single airport code is domestic.
    #[must_use]
    pub fn is_domestic_code(&self, code: &str) -> bool {
        self.regex.is_match(code)
    }
}

impl Default for DomesticPattern {
    fn default() -> Self {
        Self {
            regex: Regex::new(DEFAULT_DOMESTIC_PATTERN).expect("default pattern compiles"),
        }
    }
}

impl RouteClassifier for DomesticPattern {
    fn is_international(&self, origin: &str, destination: &str) -> bool {
        !(self.is_domestic_code(origin) && self.is_domestic_code(destination))
    }
}

//! Fare monitoring.
//!
//! A [`FareSource`] looks up the current fares for a route and date. The
//! [`PriceMonitor`] compares the lowest fare against the last stored alert
//! for the same route and flags a drop.
//!
//! There is no scheduler here; run `flightlog price check` from cron at the
//! configured interval.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PriceConfig;
use crate::error::{Error, Result};
use crate::store::PriceAlertStore;

/// A route and travel date to price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FareQuery {
    /// Origin (airport code or city).
    pub origin: String,
    /// Destination (airport code or city).
    pub destination: String,
    /// Date of travel.
    pub travel_date: NaiveDate,
}

impl FareQuery {
    /// Create a fare query.
    #[must_use]
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        travel_date: NaiveDate,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            travel_date,
        }
    }

    /// Key identifying this route and date in the alert store.
    #[must_use]
    pub fn route_key(&self) -> String {
        format!(
            "{}_{}_{}",
            self.origin,
            self.destination,
            self.travel_date.format("%Y-%m-%d")
        )
    }
}

/// Latest observed fare for a route, with drop detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    /// Route key, `<origin>_<destination>_<date>`.
    pub route_key: String,
    /// Origin.
    #[serde(rename = "departure")]
    pub origin: String,
    /// Destination.
    #[serde(rename = "arrival")]
    pub destination: String,
    /// Date of travel.
    pub travel_date: NaiveDate,
    /// Lowest fare seen on this check.
    pub current_price: f64,
    /// Lowest fare seen on the previous check, if any.
    pub previous_price: Option<f64>,
    /// Whether this check registered a qualifying drop.
    pub price_drop: bool,
    /// When the check ran.
    #[serde(
        rename = "timestamp",
        deserialize_with = "crate::record::deserialize_logged_at"
    )]
    pub checked_at: DateTime<Utc>,
    /// The fare API's response body.
    #[serde(default)]
    pub raw_data: serde_json::Value,
}

impl PriceAlert {
    /// Whether `interval` has passed since this route was last checked.
    #[must_use]
    pub fn is_due(&self, interval: std::time::Duration, now: DateTime<Utc>) -> bool {
        (now - self.checked_at)
            .to_std()
            .is_ok_and(|elapsed| elapsed >= interval)
    }

    /// Amount the fare fell since the previous check, if it fell.
    #[must_use]
    pub fn drop_amount(&self) -> Option<f64> {
        self.previous_price
            .map(|previous| previous - self.current_price)
            .filter(|d| *d > 0.0)
    }
}

/// Something that can quote fares.
pub trait FareSource {
    /// Fetch the raw fare response for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PriceLookup`] if the lookup fails.
    fn fetch(&self, query: &FareQuery) -> Result<serde_json::Value>;
}

/// Fare source backed by an HTTP JSON API.
///
/// Sends `GET <api_url>?from=<origin>&to=<destination>&date=<YYYY-MM-DD>`
/// with a bearer token and expects a JSON object with a `min_price` field.
#[derive(Debug)]
pub struct HttpFareSource {
    agent: ureq::Agent,
    api_url: String,
    api_key: String,
    cookie: Option<String>,
}

impl HttpFareSource {
    /// Build a fare source from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PriceApiNotConfigured`] if the URL or key is missing.
    pub fn from_config(config: &PriceConfig) -> Result<Self> {
        let api_url = config.api_url.clone().filter(|s| !s.trim().is_empty());
        let api_key = config.api_key.clone().filter(|s| !s.trim().is_empty());
        let (Some(api_url), Some(api_key)) = (api_url, api_key) else {
            warn!("Fare API URL or key is not configured");
            return Err(Error::PriceApiNotConfigured);
        };

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build();

        Ok(Self {
            agent,
            api_url,
            api_key,
            cookie: config.cookie.clone().filter(|s| !s.is_empty()),
        })
    }
}

impl FareSource for HttpFareSource {
    fn fetch(&self, query: &FareQuery) -> Result<serde_json::Value> {
        let route = query.route_key();
        let date = query.travel_date.format("%Y-%m-%d").to_string();

        let mut request = self
            .agent
            .get(&self.api_url)
            .query("from", &query.origin)
            .query("to", &query.destination)
            .query("date", &date)
            .set("Authorization", &format!("Bearer {}", self.api_key));
        if let Some(cookie) = &self.cookie {
            request = request.set("Cookie", cookie);
        }

        debug!(route = %route, "Requesting fares");
        let response = request.call().map_err(|e| match e {
            ureq::Error::Status(code, _) => Error::price_lookup(&route, format!("HTTP {code}")),
            ureq::Error::Transport(t) => Error::price_lookup(&route, t.to_string()),
        })?;

        let body: serde_json::Value = response
            .into_json()
            .map_err(|e| Error::price_lookup(&route, format!("invalid JSON response: {e}")))?;
        info!(route = %route, "Fetched fares");
        Ok(body)
    }
}

/// Decide whether a fare change counts as a drop.
///
/// A drop needs a non-zero previous price, a strictly lower current price,
/// and, when a threshold is given, a fall of at least that much.
#[must_use]
pub fn detect_drop(previous: Option<f64>, current: f64, threshold: Option<f64>) -> Option<f64> {
    let previous = previous.filter(|p| *p != 0.0)?;
    let drop = previous - current;
    (drop > 0.0 && threshold.map_or(true, |t| drop >= t)).then_some(drop)
}

/// Checks fares and records alerts.
#[derive(Debug)]
pub struct PriceMonitor<F> {
    source: F,
}

impl<F: FareSource> PriceMonitor<F> {
    /// Create a monitor over a fare source.
    pub fn new(source: F) -> Self {
        Self { source }
    }

    /// Look up the current fare, compare with the stored alert, and store
    /// the new alert in its place.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or the store fails.
    pub fn check<S: PriceAlertStore + ?Sized>(
        &self,
        store: &mut S,
        query: &FareQuery,
        threshold: Option<f64>,
    ) -> Result<PriceAlert> {
        let raw = self.source.fetch(query)?;
        let current_price = raw
            .get("min_price")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(0.0);

        let route_key = query.route_key();
        let previous_price = store
            .find_alert(&route_key)?
            .map(|previous| previous.current_price);
        let drop = detect_drop(previous_price, current_price, threshold);

        if let Some(amount) = drop {
            warn!(
                route = %route_key,
                from = previous_price.unwrap_or_default(),
                to = current_price,
                "Fare dropped by {amount:.2}"
            );
        }

        let alert = PriceAlert {
            route_key,
            origin: query.origin.clone(),
            destination: query.destination.clone(),
            travel_date: query.travel_date,
            current_price,
            previous_price,
            price_drop: drop.is_some(),
            checked_at: Utc::now(),
            raw_data: raw,
        };
        store.upsert_alert(&alert)?;
        Ok(alert)
    }
}

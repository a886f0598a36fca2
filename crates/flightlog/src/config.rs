//! Configuration management for flightlog.
//!
//! Configuration is layered with figment: built-in defaults, then a TOML
//! file, then the legacy `FLIGHT_*` environment variables, then variables
//! prefixed with `FLIGHTLOG_` (use `__` between section and key, e.g.
//! `FLIGHTLOG_STORAGE__BACKEND=sqlite`).

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::achievements::{DomesticPattern, Thresholds, DEFAULT_DOMESTIC_PATTERN};
use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory name under the platform config and data directories.
const APP_DIR_NAME: &str = "flightlog";

/// Card output directory name inside the data directory.
const CARDS_DIR_NAME: &str = "flight_cards";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Achievement rules.
    pub achievements: AchievementsConfig,
    /// Fare monitoring.
    pub price: PriceConfig,
    /// Itinerary cards.
    pub cards: CardsConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON files in the data directory.
    #[default]
    Json,
    /// A `SQLite` database in the data directory.
    Sqlite,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selection.
    pub backend: StorageBackend,
    /// Directory holding the data files.
    /// Defaults to `~/.local/share/flightlog`
    pub data_dir: PathBuf,
}

/// Achievement rule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementsConfig {
    /// Regex matching domestic airport codes. A flight is domestic when both
    /// codes match.
    pub domestic_code_pattern: String,
    /// Flights in one calendar year needed for `frequent_flyer`.
    pub frequent_flyer_flights: usize,
    /// Cumulative kilometers needed for `long_distance_traveler`.
    pub long_distance_km: u64,
}

/// Fare API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    /// Fare API endpoint.
    pub api_url: Option<String>,
    /// Bearer token for the fare API.
    pub api_key: Option<String>,
    /// Optional cookie header.
    pub cookie: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Suggested interval between checks, for scheduling with cron.
    pub check_interval_hours: u64,
    /// User agent sent with fare requests.
    pub user_agent: String,
}

/// Itinerary card configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardsConfig {
    /// Output directory.
    /// Defaults to `<data_dir>/flight_cards`
    pub output_dir: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also append log lines to this file.
    pub file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: Config::default_data_dir(),
        }
    }
}

impl Default for AchievementsConfig {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            domestic_code_pattern: DEFAULT_DOMESTIC_PATTERN.to_string(),
            frequent_flyer_flights: thresholds.frequent_flyer_flights,
            long_distance_km: thresholds.long_distance_km,
        }
    }
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            cookie: None,
            timeout_secs: 10,
            check_interval_hours: 24,
            user_agent: format!("flightlog/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Map the legacy unprefixed variables onto their config keys.
fn legacy_env() -> Env {
    Env::raw().filter_map(|key| {
        let target = match key.as_str().to_ascii_uppercase().as_str() {
            "FLIGHT_API_KEY" => "price.api_key",
            "FLIGHT_API_URL" => "price.api_url",
            "FLIGHT_COOKIE" => "price.cookie",
            "PRICE_CHECK_INTERVAL_HOURS" => "price.check_interval_hours",
            _ => return None,
        };
        Some(target.into())
    })
}

impl Config {
    /// Load configuration from the default file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// A missing file is not an error; defaults and the environment apply.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Self::figment(config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// The provider stack used by [`Config::load_from`].
    #[must_use]
    pub fn figment(config_file: PathBuf) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(legacy_env())
            .merge(Env::prefixed("FLIGHTLOG_").split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(APP_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.classifier()?;

        if self.achievements.frequent_flyer_flights == 0 {
            return Err(Error::ConfigValidation {
                message: "frequent_flyer_flights must be greater than 0".to_string(),
            });
        }

        if self.achievements.long_distance_km == 0 {
            return Err(Error::ConfigValidation {
                message: "long_distance_km must be greater than 0".to_string(),
            });
        }

        if self.price.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.price.check_interval_hours == 0 {
            return Err(Error::ConfigValidation {
                message: "check_interval_hours must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Compile the domestic-code pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid regex.
    pub fn classifier(&self) -> Result<DomesticPattern> {
        DomesticPattern::new(&self.achievements.domestic_code_pattern)
    }

    /// Achievement thresholds.
    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            frequent_flyer_flights: self.achievements.frequent_flyer_flights,
            long_distance_km: self.achievements.long_distance_km,
        }
    }

    /// Get the card output directory, resolving defaults if not set.
    #[must_use]
    pub fn card_output_dir(&self) -> PathBuf {
        self.cards
            .output_dir
            .clone()
            .unwrap_or_else(|| self.storage.data_dir.join(CARDS_DIR_NAME))
    }

    /// Get the fare check interval as a Duration.
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.price.check_interval_hours * 60 * 60)
    }

    /// A copy with secrets masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mask = |value: &Option<String>| value.as_ref().map(|_| "********".to_string());
        let mut config = self.clone();
        config.price.api_key = mask(&self.price.api_key);
        config.price.cookie = mask(&self.price.cookie);
        config
    }
}

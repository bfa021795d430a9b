use config::{Case, Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::error::AdvisoryError;
use crate::location::LocationQuery;
use crate::planting::PlantingThresholds;

/// Open-Meteo never returns more than this many days to the advisor
pub const MAX_FORECAST_DAYS: u8 = 7;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Open-Meteo forecast endpoint
    #[serde(default = "default_forecast_api_url")]
    pub forecast_api_url: String,

    /// Nominatim base URL (search and reverse endpoints hang off it)
    #[serde(default = "default_geocoding_api_url")]
    pub geocoding_api_url: String,

    /// Identifying client tag, required by the Nominatim usage policy
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Preferred language for place names
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// Number of daily forecast entries to request (1-7)
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u8,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_http_connect_timeout_secs")]
    pub http_connect_timeout_secs: u64,

    /// How long geocoding results stay cached
    #[serde(default = "default_geocode_cache_ttl_secs")]
    pub geocode_cache_ttl_secs: u64,

    /// Location queried by the command-line host
    #[serde(default)]
    pub default_location: LocationConfig,

    /// Planting window thresholds
    #[serde(default)]
    pub planting: PlantingThresholds,
}

/// Either a place name or a coordinate pair; a non-blank place name wins
#[derive(Debug, Deserialize, Clone)]
pub struct LocationConfig {
    #[serde(default)]
    pub place_name: Option<String>,

    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            place_name: None,
            latitude: Some(28.6139),
            longitude: Some(77.2090),
        }
    }
}

impl LocationConfig {
    pub fn to_query(&self) -> Result<LocationQuery, AdvisoryError> {
        LocationQuery::from_input(self.place_name.as_deref(), self.latitude, self.longitude)
    }
}

fn default_forecast_api_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_geocoding_api_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    format!("sowcast/{}", env!("CARGO_PKG_VERSION"))
}

fn default_accept_language() -> String {
    "en".to_string()
}

fn default_forecast_days() -> u8 {
    MAX_FORECAST_DAYS
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_http_connect_timeout_secs() -> u64 {
    5
}

fn default_geocode_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            .set_default("forecast_api_url", default_forecast_api_url())?
            .set_default("geocoding_api_url", default_geocoding_api_url())?
            .set_default("user_agent", default_user_agent())?
            // Load from config file if present
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config.local").required(false))
            // Override with environment variables (prefixed with SOWCAST_)
            // Nested keys use a double underscore: SOWCAST_PLANTING__NEAR_TERM_DAYS
            .add_source(
                Environment::with_prefix("SOWCAST")
                    .prefix_separator("_")
                    .separator("__")
                    .convert_case(Case::Snake)
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_FORECAST_DAYS).contains(&self.forecast_days) {
            return Err(ConfigError::Message(format!(
                "forecast_days must be between 1 and {}, got {}",
                MAX_FORECAST_DAYS, self.forecast_days
            )));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Message(
                "user_agent must not be empty".to_string(),
            ));
        }

        self.planting.validate().map_err(ConfigError::Message)
    }
}

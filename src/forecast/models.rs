use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Open-Meteo Forecast API Response (Internal)
// Daily values arrive as parallel arrays aligned with `time`; any entry may be null
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct OpenMeteoResponse {
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub current: Option<OpenMeteoCurrent>,
    #[serde(default)]
    pub daily: Option<OpenMeteoDaily>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenMeteoCurrent {
    #[serde(default)]
    pub temperature_2m: Option<f64>,
    #[serde(default)]
    pub relative_humidity_2m: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenMeteoDaily {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m_mean: Vec<Option<f64>>,
}

/// Body returned alongside 4xx responses
#[derive(Debug, Deserialize)]
pub struct OpenMeteoError {
    pub reason: String,
}

// ============================================================================
// Normalized forecast (what the advisor and orchestrator consume)
// ============================================================================

/// Conditions right now, rounded to whole units
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub humidity: f64,
    pub precipitation_today: f64,
}

/// One day of the daily forecast, at source precision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub min_temp: f64,
    pub max_temp: f64,
    pub precipitation: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub current: CurrentConditions,
    /// Ordered by date, index 0 is today; never empty
    pub daily: Vec<DayForecast>,
}

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use thiserror::Error;

use super::models::*;
use crate::config::MAX_FORECAST_DAYS;

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m";
const DAILY_FIELDS: &str =
    "precipitation_sum,temperature_2m_min,temperature_2m_max,relative_humidity_2m_mean";

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Failed to fetch data: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

/// Upstream that returns current conditions plus a daily forecast
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<Forecast, ForecastError>;
}

/// Client for the Open-Meteo forecast API
/// https://open-meteo.com/en/docs
pub struct ForecastClient {
    client: Client,
    api_url: String,
    forecast_days: u8,
}

impl ForecastClient {
    pub fn new(client: Client, api_url: &str, forecast_days: u8) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
            forecast_days: forecast_days.clamp(1, MAX_FORECAST_DAYS),
        }
    }
}

#[async_trait]
impl ForecastProvider for ForecastClient {
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<Forecast, ForecastError> {
        tracing::debug!(
            lat = %latitude,
            lon = %longitude,
            days = self.forecast_days,
            "Fetching forecast"
        );

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("timezone", "auto".to_string()),
                ("forecast_days", self.forecast_days.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(status = %status, "Received Open-Meteo response");

        if !status.is_success() {
            let error: OpenMeteoError = response.json().await.unwrap_or(OpenMeteoError {
                reason: format!("HTTP {}", status),
            });
            return Err(ForecastError::ApiError(error.reason));
        }

        let data: OpenMeteoResponse = response
            .json()
            .await
            .map_err(|e| ForecastError::InvalidResponse(e.to_string()))?;

        // Daily dates are local to this zone (timezone=auto)
        let timezone = data.timezone.clone().unwrap_or_else(|| "GMT".to_string());
        let forecast = transform_response(data, self.forecast_days as usize)?;

        tracing::info!(
            lat = %latitude,
            lon = %longitude,
            timezone = %timezone,
            temp = %forecast.current.temperature,
            days = forecast.daily.len(),
            "Forecast fetched successfully"
        );

        Ok(forecast)
    }
}

/// Nearest integer, halves toward positive infinity. Never returns `-0.0`.
fn round_reading(value: f64) -> f64 {
    (value + 0.5).floor() + 0.0
}

fn required(
    values: &[Option<f64>],
    index: usize,
    field: &str,
    date: &str,
) -> Result<f64, ForecastError> {
    values
        .get(index)
        .copied()
        .flatten()
        .ok_or_else(|| ForecastError::InvalidResponse(format!("missing {} for {}", field, date)))
}

/// Convert the raw payload into a normalized forecast of at most `max_days` days.
///
/// Current readings are rounded; daily values are kept as-is because the
/// planting advisor compares them at sub-degree precision. A missing
/// precipitation value counts as no rain.
pub fn transform_response(
    data: OpenMeteoResponse,
    max_days: usize,
) -> Result<Forecast, ForecastError> {
    let current = data
        .current
        .ok_or_else(|| ForecastError::InvalidResponse("missing current conditions".to_string()))?;
    let daily = data
        .daily
        .ok_or_else(|| ForecastError::InvalidResponse("missing daily forecast".to_string()))?;

    let temperature = current
        .temperature_2m
        .ok_or_else(|| ForecastError::InvalidResponse("missing current temperature".to_string()))?;
    let humidity = current
        .relative_humidity_2m
        .ok_or_else(|| ForecastError::InvalidResponse("missing current humidity".to_string()))?;

    let days = daily
        .time
        .iter()
        .take(max_days)
        .enumerate()
        .map(|(i, time)| -> Result<DayForecast, ForecastError> {
            let date = NaiveDate::parse_from_str(time, "%Y-%m-%d").map_err(|e| {
                ForecastError::InvalidResponse(format!("invalid date '{}': {}", time, e))
            })?;

            Ok(DayForecast {
                date,
                min_temp: required(&daily.temperature_2m_min, i, "minimum temperature", time)?,
                max_temp: required(&daily.temperature_2m_max, i, "maximum temperature", time)?,
                precipitation: daily.precipitation_sum.get(i).copied().flatten().unwrap_or(0.0),
                humidity: required(&daily.relative_humidity_2m_mean, i, "humidity", time)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let rain_today = days
        .first()
        .map(|today| today.precipitation)
        .ok_or_else(|| ForecastError::InvalidResponse("empty daily forecast".to_string()))?;

    Ok(Forecast {
        current: CurrentConditions {
            temperature: round_reading(temperature),
            humidity: round_reading(humidity),
            precipitation_today: round_reading(rain_today),
        },
        daily: days,
    })
}

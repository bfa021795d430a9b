//! Weather and planting-window advisory engine.
//!
//! Resolves a place name or coordinate pair through Nominatim, pulls the
//! current conditions and a daily forecast from Open-Meteo, and derives a
//! planting recommendation. [`orchestrator::WeatherOrchestrator`] ties the
//! pieces together and publishes one state per accepted query.

pub mod cache;
pub mod config;
pub mod error;
pub mod forecast;
pub mod location;
pub mod orchestrator;
pub mod planting;

#[cfg(test)]
mod test_support;

use std::time::Duration;

use reqwest::Client;

use crate::config::AppConfig;

const HTTP_POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Create the HTTP client shared by both upstreams
pub fn create_http_client(config: &AppConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .connect_timeout(Duration::from_secs(config.http_connect_timeout_secs))
        .pool_idle_timeout(Duration::from_secs(HTTP_POOL_IDLE_TIMEOUT_SECS))
        .pool_max_idle_per_host(10)
        .build()
}

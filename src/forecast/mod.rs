pub mod models;
pub mod service;

pub use models::{CurrentConditions, DayForecast, Forecast};
pub use service::{ForecastClient, ForecastError, ForecastProvider};

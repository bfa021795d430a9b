use chrono::NaiveDate;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Limits a forecast day must stay within to count as a planting candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantingThresholds {
    /// Daily precipitation above this (mm) keeps the soil too wet
    pub max_precipitation_mm: f64,
    /// Overnight low below this (°C) risks cold damage to seedlings
    pub min_temperature_c: f64,
    /// Daytime high above this (°C) risks heat stress
    pub max_temperature_c: f64,
    /// How many leading days decide whether planting is recommended
    pub near_term_days: usize,
}

impl Default for PlantingThresholds {
    fn default() -> Self {
        Self {
            max_precipitation_mm: 10.0,
            min_temperature_c: 10.0,
            max_temperature_c: 35.0,
            near_term_days: 3,
        }
    }
}

impl PlantingThresholds {
    pub fn validate(&self) -> Result<(), String> {
        let values = [
            self.max_precipitation_mm,
            self.min_temperature_c,
            self.max_temperature_c,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err("planting thresholds must be finite numbers".to_string());
        }
        if self.max_precipitation_mm < 0.0 {
            return Err("planting.max_precipitation_mm must not be negative".to_string());
        }
        if self.min_temperature_c > self.max_temperature_c {
            return Err(format!(
                "planting.min_temperature_c ({}) exceeds planting.max_temperature_c ({})",
                self.min_temperature_c, self.max_temperature_c
            ));
        }
        if self.near_term_days == 0 {
            return Err("planting.near_term_days must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Derived recommendation; never persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantingWindow {
    pub recommended: bool,
    pub reason: String,
    /// Candidate dates in forecast order
    pub best_days: IndexSet<NaiveDate>,
}

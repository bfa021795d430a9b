//! Planting window heuristic.
//!
//! Every forecast day runs through the same three threshold checks. The
//! recommendation only looks at the leading `near_term_days`; later candidate
//! days are still listed in `best_days` so callers can show them.

use indexmap::IndexSet;

use super::models::{PlantingThresholds, PlantingWindow};
use crate::forecast::DayForecast;

pub const INSUFFICIENT_DATA_REASON: &str = "insufficient forecast data";

/// What a reason template is keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Factor {
    Favorable,
    ExcessRain,
    TemperatureExtremes,
}

struct Check {
    factor: Factor,
    passes: fn(&DayForecast, &PlantingThresholds) -> bool,
}

fn low_rain(day: &DayForecast, limits: &PlantingThresholds) -> bool {
    day.precipitation <= limits.max_precipitation_mm
}

fn above_cold_floor(day: &DayForecast, limits: &PlantingThresholds) -> bool {
    day.min_temp >= limits.min_temperature_c
}

fn below_heat_ceiling(day: &DayForecast, limits: &PlantingThresholds) -> bool {
    day.max_temp <= limits.max_temperature_c
}

/// Candidate checks; a day must pass all of them
const CHECKS: &[Check] = &[
    Check {
        factor: Factor::ExcessRain,
        passes: low_rain,
    },
    Check {
        factor: Factor::TemperatureExtremes,
        passes: above_cold_floor,
    },
    Check {
        factor: Factor::TemperatureExtremes,
        passes: below_heat_ceiling,
    },
];

/// Disqualifying factors in tie-break order
const DISQUALIFIERS: &[Factor] = &[Factor::ExcessRain, Factor::TemperatureExtremes];

const REASONS: &[(Factor, &str)] = &[
    (
        Factor::Favorable,
        "Good planting window: {good} suitable for planting in the {total}-day forecast",
    ),
    (
        Factor::ExcessRain,
        "Heavy rain expected over the {near}; wait for the soil to drain before planting",
    ),
    (
        Factor::TemperatureExtremes,
        "Temperatures over the {near} fall outside the safe planting range of {min}-{max}°C",
    ),
];

const LATER_WINDOW_HINT: &str = "; {later} later in the forecast";

fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", n, noun)
    }
}

fn next_days(n: usize) -> String {
    if n == 1 {
        "next day".to_string()
    } else {
        format!("next {} days", n)
    }
}

fn template(factor: Factor) -> &'static str {
    REASONS
        .iter()
        .find(|(f, _)| *f == factor)
        .map(|(_, text)| *text)
        .unwrap_or(INSUFFICIENT_DATA_REASON)
}

fn render(template: &str, values: &[(&str, String)]) -> String {
    values.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("{{{}}}", key), value)
    })
}

/// Turns a daily forecast into a planting recommendation
#[derive(Debug, Clone, Default)]
pub struct PlantingWindowAdvisor {
    thresholds: PlantingThresholds,
}

impl PlantingWindowAdvisor {
    pub fn new(thresholds: PlantingThresholds) -> Self {
        Self { thresholds }
    }

    fn failed_factors(&self, day: &DayForecast) -> Vec<Factor> {
        CHECKS
            .iter()
            .filter(|check| !(check.passes)(day, &self.thresholds))
            .map(|check| check.factor)
            .collect()
    }

    pub fn is_candidate(&self, day: &DayForecast) -> bool {
        CHECKS
            .iter()
            .all(|check| (check.passes)(day, &self.thresholds))
    }

    /// Evaluate a forecast ordered from today onwards
    pub fn evaluate(&self, daily: &[DayForecast]) -> PlantingWindow {
        if daily.is_empty() {
            return PlantingWindow {
                recommended: false,
                reason: INSUFFICIENT_DATA_REASON.to_string(),
                best_days: IndexSet::new(),
            };
        }

        let near = self.thresholds.near_term_days.min(daily.len());
        let near_term = &daily[..near];

        let best_days: IndexSet<_> = daily
            .iter()
            .filter(|day| self.is_candidate(day))
            .map(|day| day.date)
            .collect();

        let recommended = near_term.iter().any(|day| self.is_candidate(day));

        let reason = if recommended {
            render(
                template(Factor::Favorable),
                &[
                    ("good", count(best_days.len(), "day")),
                    ("total", daily.len().to_string()),
                ],
            )
        } else {
            let factor = self.dominant_factor(near_term);
            let mut reason = render(
                template(factor),
                &[
                    ("near", next_days(near)),
                    ("min", self.thresholds.min_temperature_c.to_string()),
                    ("max", self.thresholds.max_temperature_c.to_string()),
                ],
            );
            if !best_days.is_empty() {
                reason.push_str(&render(
                    LATER_WINDOW_HINT,
                    &[("later", count(best_days.len(), "suitable day"))],
                ));
            }
            reason
        };

        tracing::debug!(
            recommended,
            best_days = best_days.len(),
            days = daily.len(),
            "Planting window evaluated"
        );

        PlantingWindow {
            recommended,
            reason,
            best_days,
        }
    }

    /// The factor that disqualified the most near-term days; ties go to the
    /// earlier entry in `DISQUALIFIERS`
    fn dominant_factor(&self, near_term: &[DayForecast]) -> Factor {
        let counts: Vec<usize> = DISQUALIFIERS
            .iter()
            .map(|factor| {
                near_term
                    .iter()
                    .filter(|day| self.failed_factors(day).contains(factor))
                    .count()
            })
            .collect();

        let mut dominant = DISQUALIFIERS[0];
        let mut best = 0;
        for (factor, count) in DISQUALIFIERS.iter().zip(counts) {
            if count > best {
                dominant = *factor;
                best = count;
            }
        }
        dominant
    }
}

/// Evaluate with the default thresholds
pub fn evaluate(daily: &[DayForecast]) -> PlantingWindow {
    PlantingWindowAdvisor::default().evaluate(daily)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn day(offset: u64, min_temp: f64, max_temp: f64, precipitation: f64) -> DayForecast {
        DayForecast {
            date: start() + Days::new(offset),
            min_temp,
            max_temp,
            precipitation,
            humidity: 60.0,
        }
    }

    fn good(offset: u64) -> DayForecast {
        day(offset, 15.0, 28.0, 1.0)
    }

    fn rainy(offset: u64) -> DayForecast {
        day(offset, 15.0, 28.0, 25.0)
    }

    fn hot(offset: u64) -> DayForecast {
        day(offset, 24.0, 41.5, 0.0)
    }

    fn cold(offset: u64) -> DayForecast {
        day(offset, 2.0, 12.0, 0.0)
    }

    fn dates(window: &PlantingWindow) -> Vec<NaiveDate> {
        window.best_days.iter().copied().collect()
    }

    #[test]
    fn test_empty_forecast() {
        let window = evaluate(&[]);
        assert!(!window.recommended);
        assert!(window.best_days.is_empty());
        assert_eq!(window.reason, "insufficient forecast data");
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let daily = vec![rainy(0), good(1), hot(2), good(3), cold(4)];
        assert_eq!(evaluate(&daily), evaluate(&daily));
    }

    #[test]
    fn test_recommended_lists_good_days() {
        let daily = vec![good(0), rainy(1), good(2), good(3), hot(4), good(5), good(6)];
        let window = evaluate(&daily);

        assert!(window.recommended);
        assert_eq!(
            window.reason,
            "Good planting window: 5 days suitable for planting in the 7-day forecast"
        );
    }

    #[test]
    fn test_best_days_keep_forecast_order() {
        let daily = vec![good(0), rainy(1), good(2), day(3, 10.5, 20.0, 9.9), good(4)];
        let window = evaluate(&daily);

        assert_eq!(
            dates(&window),
            vec![daily[0].date, daily[2].date, daily[3].date, daily[4].date]
        );
    }

    #[test]
    fn test_only_near_term_candidates_recommend() {
        // Only day 5 qualifies
        let daily = vec![rainy(0), rainy(1), rainy(2), hot(3), good(4), rainy(5), cold(6)];
        let window = evaluate(&daily);

        assert!(!window.recommended);
        assert_eq!(dates(&window), vec![daily[4].date]);
        assert!(window
            .reason
            .ends_with("; 1 suitable day later in the forecast"));
    }

    #[test]
    fn test_rain_dominates_reason() {
        let daily = vec![rainy(0), rainy(1), hot(2)];
        let window = evaluate(&daily);

        assert!(!window.recommended);
        assert_eq!(
            window.reason,
            "Heavy rain expected over the next 3 days; wait for the soil to drain before planting"
        );
    }

    #[test]
    fn test_temperature_dominates_reason() {
        let daily = vec![hot(0), cold(1), rainy(2), rainy(3)];
        let window = evaluate(&daily);

        assert!(!window.recommended);
        assert_eq!(
            window.reason,
            "Temperatures over the next 3 days fall outside the safe planting range of 10-35°C"
        );
    }

    #[test]
    fn test_tie_goes_to_rain() {
        let daily = vec![rainy(0), hot(1)];
        let window = evaluate(&daily);
        assert!(window.reason.starts_with("Heavy rain expected over the next 2 days"));
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let edge = day(0, 10.0, 35.0, 10.0);
        assert!(PlantingWindowAdvisor::default().is_candidate(&edge));

        let just_over = day(0, 10.0, 35.0, 10.01);
        assert!(!PlantingWindowAdvisor::default().is_candidate(&just_over));

        let just_cold = day(0, 9.99, 35.0, 0.0);
        assert!(!PlantingWindowAdvisor::default().is_candidate(&just_cold));
    }

    #[test]
    fn test_sub_degree_precision_matters() {
        let daily = vec![day(0, 9.6, 20.0, 0.0)];
        assert!(!evaluate(&daily).recommended);
    }

    #[test]
    fn test_custom_near_term_window() {
        let advisor = PlantingWindowAdvisor::new(PlantingThresholds {
            near_term_days: 5,
            ..PlantingThresholds::default()
        });
        let daily = vec![rainy(0), rainy(1), rainy(2), hot(3), good(4), rainy(5)];

        assert!(advisor.evaluate(&daily).recommended);
        assert!(!evaluate(&daily).recommended);
    }

    #[test]
    fn test_single_day_forecast() {
        let window = evaluate(&[good(0)]);
        assert!(window.recommended);
        assert_eq!(
            window.reason,
            "Good planting window: 1 day suitable for planting in the 1-day forecast"
        );
    }

    #[test]
    fn test_single_day_rejection_reads_naturally() {
        let window = evaluate(&[rainy(0)]);
        assert_eq!(
            window.reason,
            "Heavy rain expected over the next day; wait for the soil to drain before planting"
        );

        let window = evaluate(&[cold(0), good(1), good(2), good(3)]);
        assert!(window.recommended);

        let advisor = PlantingWindowAdvisor::new(PlantingThresholds {
            near_term_days: 1,
            ..PlantingThresholds::default()
        });
        let window = advisor.evaluate(&[cold(0), good(1), good(2)]);
        assert_eq!(
            window.reason,
            "Temperatures over the next day fall outside the safe planting range of 10-35°C; \
             2 suitable days later in the forecast"
        );
    }
}

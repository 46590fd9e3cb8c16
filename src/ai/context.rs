//! Structured JSON context handed to the model with a question

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::aggregation::aggregate_daily_by_timezone;
use crate::models::{ClimatologyAverage, Forecast};

/// Future days included after today
pub const FUTURE_DAYS: i64 = 2;

#[derive(Debug, Serialize)]
pub struct AiContext {
    pub city: String,
    pub generated_utc: String,
    pub days: Vec<ContextDay>,
    pub historical: Option<ContextHistorical>,
}

#[derive(Debug, Serialize)]
pub struct ContextDay {
    pub label: String,
    pub date: String,
    pub avg_temp_c: f64,
    pub avg_humidity_pct: f64,
    pub avg_wind_ms: f64,
    pub total_rain_mm: f64,
}

#[derive(Debug, Serialize)]
pub struct ContextHistorical {
    pub month: u32,
    pub avg_rainfall_mm: Option<f64>,
    pub avg_temperature_c: Option<f64>,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

/// Local today plus [`FUTURE_DAYS`], with the monthly climatology when known
#[must_use]
pub fn build_context(
    city: &str,
    forecast: Option<&Forecast>,
    historical: Option<&ClimatologyAverage>,
    now: DateTime<Utc>,
) -> AiContext {
    let days = forecast
        .map(|forecast| {
            (0..=FUTURE_DAYS)
                .filter_map(|offset| {
                    let day = aggregate_daily_by_timezone(forecast, offset, now)?;
                    Some(ContextDay {
                        label: if offset == 0 { "today".to_string() } else { format!("day+{offset}") },
                        date: day.date.to_string(),
                        avg_temp_c: round_to(day.avg_temp_c, 2),
                        avg_humidity_pct: round_to(day.avg_humidity_pct, 1),
                        avg_wind_ms: round_to(day.avg_wind_ms, 2),
                        total_rain_mm: round_to(day.total_rain_mm, 2),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    AiContext {
        city: city.to_string(),
        generated_utc: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        days,
        historical: historical.map(|h| ContextHistorical {
            month: h.month,
            avg_rainfall_mm: h.avg_rainfall_mm,
            avg_temperature_c: h.avg_temperature_c,
        }),
    }
}

impl AiContext {
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayPhase, ForecastSample, Location};
    use chrono::TimeZone;

    fn sample(hour_offset: i64, temp: f64) -> ForecastSample {
        ForecastSample {
            timestamp: Utc.with_ymd_and_hms(2025, 10, 3, 12, 0, 0).unwrap()
                + chrono::Duration::hours(hour_offset),
            temperature_c: temp,
            humidity_pct: 55.56,
            wind_speed_ms: 3.333,
            precipitation_probability: None,
            rain_mm: 0.125,
            condition: "Clear".to_string(),
            description: "clear sky".to_string(),
            phase: DayPhase::Day,
        }
    }

    #[test]
    fn test_context_labels_and_rounding() {
        let forecast = Forecast {
            location: Location::new(18.52, 73.86, "Pune".to_string()),
            timezone_offset_seconds: 0,
            samples: vec![sample(0, 25.0), sample(24, 26.0), sample(72, 30.0)],
        };
        let now = Utc.with_ymd_and_hms(2025, 10, 3, 8, 0, 0).unwrap();
        let historical = ClimatologyAverage {
            latitude: 18.52,
            longitude: 73.86,
            year: 2024,
            month: 10,
            avg_rainfall_mm: Some(3.1),
            avg_temperature_c: None,
        };

        let context = build_context("Pune", Some(&forecast), Some(&historical), now);
        let labels: Vec<&str> = context.days.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["today", "day+1"]);
        assert_eq!(context.days[0].avg_humidity_pct, 55.6);
        assert_eq!(context.days[0].avg_wind_ms, 3.33);
        assert_eq!(context.generated_utc, "2025-10-03T08:00:00Z");

        let json: serde_json::Value = serde_json::from_str(&context.to_json()).unwrap();
        assert_eq!(json["historical"]["month"], 10);
        assert!(json["historical"]["avg_temperature_c"].is_null());
    }

    #[test]
    fn test_context_without_forecast() {
        let now = Utc.with_ymd_and_hms(2025, 10, 3, 8, 0, 0).unwrap();
        let context = build_context("Oslo", None, None, now);
        assert!(context.days.is_empty());
        assert!(context.historical.is_none());
    }
}

//! Forecast samples, forecasts and daily aggregates

use super::Location;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Whether a forecast slot falls in daylight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPhase {
    Day,
    Night,
}

impl DayPhase {
    /// Provider icons end in `d` or `n` (e.g. `10d`, `01n`); anything else counts as day
    #[must_use]
    pub fn from_icon(icon: Option<&str>) -> Self {
        match icon {
            Some(icon) if icon.ends_with('n') => DayPhase::Night,
            _ => DayPhase::Day,
        }
    }
}

/// One 3-hour slot of the 5-day forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    /// Start of the slot
    pub timestamp: DateTime<Utc>,
    /// Temperature in Celsius
    pub temperature_c: f64,
    /// Relative humidity (0-100)
    pub humidity_pct: f64,
    /// Wind speed in m/s
    pub wind_speed_ms: f64,
    /// Probability of precipitation (0-1), when the provider sends it
    pub precipitation_probability: Option<f64>,
    /// Rain volume over the slot in mm
    pub rain_mm: f64,
    /// Condition group such as `Clear`, `Rain` or `Clouds`
    pub condition: String,
    /// Free-text condition description
    pub description: String,
    pub phase: DayPhase,
}

/// A resolved forecast for one city
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub location: Location,
    /// Offset of the city's local time from UTC in seconds
    pub timezone_offset_seconds: i32,
    /// Samples in chronological order
    pub samples: Vec<ForecastSample>,
}

impl Forecast {
    /// Distinct UTC dates covered by the samples, in order of first appearance
    #[must_use]
    pub fn available_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = Vec::new();
        for sample in &self.samples {
            let date = sample.timestamp.date_naive();
            if !dates.contains(&date) {
                dates.push(date);
            }
        }
        dates
    }

    /// Samples whose UTC date is `date`
    #[must_use]
    pub fn samples_on(&self, date: NaiveDate) -> Vec<&ForecastSample> {
        self.samples
            .iter()
            .filter(|sample| sample.timestamp.date_naive() == date)
            .collect()
    }
}

/// Aggregated weather for one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeather {
    pub date: NaiveDate,
    pub avg_temp_c: f64,
    pub avg_humidity_pct: f64,
    pub avg_wind_ms: f64,
    /// Sum of the slots' rain volume in mm
    pub total_rain_mm: f64,
    /// Highest slot probability of precipitation (0-1)
    pub max_precipitation_probability: Option<f64>,
    pub sample_count: usize,
    /// Dominant condition group
    pub condition: String,
    pub condition_emoji: String,
    pub condition_description: String,
    pub condition_phase: DayPhase,
}

impl DailyWeather {
    /// Chance of rain for the day (0-1).
    ///
    /// Uses the provider's probability when present, otherwise estimates it
    /// from the rain volume: more than 5 mm is 0.9, any rain 0.7, none 0.
    #[must_use]
    pub fn rain_probability(&self) -> f64 {
        if let Some(pop) = self.max_precipitation_probability {
            return pop.clamp(0.0, 1.0);
        }
        if self.total_rain_mm > 5.0 {
            0.9
        } else if self.total_rain_mm > 0.0 {
            0.7
        } else {
            0.0
        }
    }

    /// Emoji and condition group, e.g. "🌧️ Rain"
    #[must_use]
    pub fn condition_label(&self) -> String {
        format!("{} {}", self.condition_emoji, self.condition)
    }
}

/// Emoji for a condition group and day phase
#[must_use]
pub fn condition_emoji(condition: &str, phase: DayPhase) -> &'static str {
    match (condition, phase) {
        ("Clear", DayPhase::Day) => "☀️",
        ("Clear", DayPhase::Night) => "🌕",
        ("Clouds", _) => "☁️",
        ("Rain", _) => "🌧️",
        ("Drizzle", DayPhase::Day) => "🌦️",
        ("Drizzle", DayPhase::Night) => "🌧️",
        ("Thunderstorm", _) => "⛈️",
        ("Snow", _) => "❄️",
        ("Mist" | "Smoke" | "Haze" | "Dust" | "Fog" | "Sand" | "Ash", _) => "🌫️",
        ("Squall", _) => "💨",
        ("Tornado", _) => "🌪️",
        _ => "☀️",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn daily(total_rain_mm: f64, pop: Option<f64>) -> DailyWeather {
        DailyWeather {
            date: NaiveDate::from_ymd_opt(2025, 10, 4).unwrap(),
            avg_temp_c: 24.0,
            avg_humidity_pct: 50.0,
            avg_wind_ms: 3.0,
            total_rain_mm,
            max_precipitation_probability: pop,
            sample_count: 8,
            condition: "Clear".to_string(),
            condition_emoji: "☀️".to_string(),
            condition_description: "clear sky".to_string(),
            condition_phase: DayPhase::Day,
        }
    }

    #[rstest]
    #[case(0.0, None, 0.0)]
    #[case(0.4, None, 0.7)]
    #[case(7.5, None, 0.9)]
    #[case(7.5, Some(0.35), 0.35)]
    #[case(0.0, Some(1.4), 1.0)]
    fn test_rain_probability(#[case] rain: f64, #[case] pop: Option<f64>, #[case] expected: f64) {
        assert_eq!(daily(rain, pop).rain_probability(), expected);
    }

    #[test]
    fn test_day_phase_from_icon() {
        assert_eq!(DayPhase::from_icon(Some("10d")), DayPhase::Day);
        assert_eq!(DayPhase::from_icon(Some("01n")), DayPhase::Night);
        assert_eq!(DayPhase::from_icon(None), DayPhase::Day);
    }

    #[test]
    fn test_condition_emoji() {
        assert_eq!(condition_emoji("Clear", DayPhase::Night), "🌕");
        assert_eq!(condition_emoji("Haze", DayPhase::Day), "🌫️");
        assert_eq!(condition_emoji("Volcano", DayPhase::Day), "☀️");
        assert_eq!(daily(0.0, None).condition_label(), "☀️ Clear");
    }
}

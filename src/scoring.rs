//! Event suitability scoring
//!
//! A pure function from rain probability, temperature, wind and humidity to
//! an integer score in `0..=100`, plus a classification and an event
//! suggestion. Rain dominates: a certain chance of rain scores 0.

use serde::{Deserialize, Serialize};

use crate::models::DailyWeather;

/// Comfortable temperature band in °C
pub const COMFORT_BAND_C: (f64, f64) = (20.0, 32.0);
const TEMP_PENALTY_PER_C: f64 = 2.0;
const TEMP_PENALTY_CAP: f64 = 30.0;

/// Wind speed (m/s) above which wind is penalised
pub const CALM_WIND_MS: f64 = 5.0;
const WIND_PENALTY_PER_MS: f64 = 3.0;
const WIND_PENALTY_CAP: f64 = 20.0;

/// Humidity (%) above which humidity is penalised
pub const COMFORT_HUMIDITY_PCT: f64 = 70.0;
const HUMIDITY_PENALTY_PER_PCT: f64 = 0.5;
const HUMIDITY_PENALTY_CAP: f64 = 15.0;

const CLIMATE_PENALTY_PER_C: f64 = 2.0;
const CLIMATE_PENALTY_CAP: f64 = 20.0;

/// Score reported when inputs are missing
pub const NEUTRAL_SCORE: u8 = 50;

/// 30 km/h
const STRONG_WIND_MS: f64 = 30.0 / 3.6;

/// Score classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suitability {
    Safe,
    Caution,
    Risky,
    Uncertain,
}

impl Suitability {
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            71.. => Suitability::Safe,
            40..=70 => Suitability::Caution,
            _ => Suitability::Risky,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Suitability::Safe => "Safe for parade 🎉",
            Suitability::Caution => "Caution, keep backup 🌈",
            Suitability::Risky => "Risky, expect issues ☔",
            Suitability::Uncertain => "Not enough data to judge ❔",
        }
    }
}

/// Inputs to the score; any of the first four missing makes the result uncertain
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    /// Chance of rain, 0-1
    pub rain_probability: Option<f64>,
    pub temperature_c: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    /// Relative humidity, 0-100
    pub humidity_pct: Option<f64>,
    /// Long-term mean temperature for the month, when known
    #[serde(default)]
    pub climate_mean_temp_c: Option<f64>,
}

impl ScoreInputs {
    #[must_use]
    pub fn new(rain_probability: f64, temperature_c: f64, wind_speed_ms: f64, humidity_pct: f64) -> Self {
        Self {
            rain_probability: Some(rain_probability),
            temperature_c: Some(temperature_c),
            wind_speed_ms: Some(wind_speed_ms),
            humidity_pct: Some(humidity_pct),
            climate_mean_temp_c: None,
        }
    }

    /// Inputs for one aggregated day
    #[must_use]
    pub fn from_daily(daily: &DailyWeather, climate_mean_temp_c: Option<f64>) -> Self {
        Self {
            climate_mean_temp_c,
            ..Self::new(
                daily.rain_probability(),
                daily.avg_temp_c,
                daily.avg_wind_ms,
                daily.avg_humidity_pct,
            )
        }
    }

    /// The four primary inputs, when all are present and finite
    fn complete(&self) -> Option<(f64, f64, f64, f64)> {
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
        Some((
            finite(self.rain_probability)?,
            finite(self.temperature_c)?,
            finite(self.wind_speed_ms)?,
            finite(self.humidity_pct)?,
        ))
    }
}

/// Result of scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityScore {
    pub score: u8,
    pub class: Suitability,
    pub message: String,
    pub suggestion: String,
}

fn temperature_penalty(temp: f64) -> f64 {
    let (low, high) = COMFORT_BAND_C;
    let outside = if temp < low {
        low - temp
    } else if temp > high {
        temp - high
    } else {
        0.0
    };
    (outside * TEMP_PENALTY_PER_C).min(TEMP_PENALTY_CAP)
}

/// Raw 0-100 score; `None` when a primary input is missing or not finite
#[must_use]
pub fn raw_score(inputs: &ScoreInputs) -> Option<u8> {
    let (rain, temp, wind, humidity) = inputs.complete()?;
    let rain = rain.clamp(0.0, 1.0);
    let humidity = humidity.clamp(0.0, 100.0);
    let wind = wind.max(0.0);

    let mut score = 100.0 - 100.0 * rain;
    score -= temperature_penalty(temp);
    score -= ((wind - CALM_WIND_MS).max(0.0) * WIND_PENALTY_PER_MS).min(WIND_PENALTY_CAP);
    score -= ((humidity - COMFORT_HUMIDITY_PCT).max(0.0) * HUMIDITY_PENALTY_PER_PCT)
        .min(HUMIDITY_PENALTY_CAP);
    if let Some(mean) = inputs.climate_mean_temp_c.filter(|m| m.is_finite()) {
        score -= ((temp - mean).abs() * CLIMATE_PENALTY_PER_C).min(CLIMATE_PENALTY_CAP);
    }

    Some(score.round().clamp(0.0, 100.0) as u8)
}

/// Short advice for the kind of event the weather allows
#[must_use]
pub fn event_suggestion(inputs: &ScoreInputs) -> &'static str {
    let Some((rain, temp, wind, _)) = inputs.complete() else {
        return "Not enough data for a suggestion ❔";
    };
    if rain > 0.5 {
        "Consider indoor backup ☔🎭"
    } else if temp > 35.0 {
        "Better for evening/night events 🌙🎤"
    } else if wind > STRONG_WIND_MS {
        "Outdoor risky, try indoor 🎪"
    } else {
        "Great for outdoor events 🎶🎉"
    }
}

/// Score, classify and suggest. Never fails; missing inputs give the neutral midpoint
#[must_use]
pub fn suitability_score(inputs: &ScoreInputs) -> SuitabilityScore {
    let (score, class) = match raw_score(inputs) {
        Some(score) => (score, Suitability::from_score(score)),
        None => (NEUTRAL_SCORE, Suitability::Uncertain),
    };
    SuitabilityScore {
        score,
        class,
        message: class.message().to_string(),
        suggestion: event_suggestion(inputs).to_string(),
    }
}

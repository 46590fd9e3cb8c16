//! OpenWeatherMap response structures and conversion into domain models

use chrono::DateTime;
use serde::Deserialize;

use crate::models::{DayPhase, Forecast, ForecastSample, Location};

/// `/data/2.5/forecast` response
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub list: Vec<ForecastItem>,
    pub city: CityInfo,
}

#[derive(Debug, Deserialize)]
pub struct ForecastItem {
    pub dt: i64,
    pub main: MainBlock,
    pub wind: Option<WindBlock>,
    pub pop: Option<f64>,
    pub rain: Option<RainBlock>,
    #[serde(default)]
    pub weather: Vec<ConditionBlock>,
}

#[derive(Debug, Deserialize)]
pub struct MainBlock {
    pub temp: f64,
    pub humidity: f64,
}

#[derive(Debug, Deserialize)]
pub struct WindBlock {
    pub speed: f64,
}

#[derive(Debug, Deserialize)]
pub struct RainBlock {
    #[serde(rename = "3h")]
    pub three_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ConditionBlock {
    pub main: String,
    #[serde(default)]
    pub description: String,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CityInfo {
    pub name: String,
    pub country: Option<String>,
    pub coord: Option<Coord>,
    pub timezone: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// One `/geo/1.0/direct` match
#[derive(Debug, Deserialize)]
pub struct GeoDirectEntry {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub country: Option<String>,
}

impl From<GeoDirectEntry> for Location {
    fn from(entry: GeoDirectEntry) -> Self {
        Location {
            latitude: entry.lat,
            longitude: entry.lon,
            name: entry.name,
            country: entry.country,
        }
    }
}

impl ForecastResponse {
    /// Convert into a [`Forecast`]; `requested` coordinates stand in when the city block has none
    pub fn into_forecast(self, requested: Option<(f64, f64)>) -> Forecast {
        let (latitude, longitude) = self
            .city
            .coord
            .as_ref()
            .map(|coord| (coord.lat, coord.lon))
            .or(requested)
            .unwrap_or_default();

        let location = Location {
            latitude,
            longitude,
            name: self.city.name,
            country: self.city.country,
        };

        let samples = self
            .list
            .into_iter()
            .filter_map(ForecastItem::into_sample)
            .collect();

        Forecast {
            location,
            timezone_offset_seconds: self.city.timezone.unwrap_or(0),
            samples,
        }
    }
}

impl ForecastItem {
    fn into_sample(self) -> Option<ForecastSample> {
        let timestamp = DateTime::from_timestamp(self.dt, 0)?;
        let condition = self.weather.into_iter().next();
        let phase = DayPhase::from_icon(condition.as_ref().and_then(|c| c.icon.as_deref()));
        let (condition, description) = condition
            .map(|c| (c.main, c.description))
            .unwrap_or_else(|| ("Unknown".to_string(), String::new()));

        Some(ForecastSample {
            timestamp,
            temperature_c: self.main.temp,
            humidity_pct: self.main.humidity,
            wind_speed_ms: self.wind.map_or(0.0, |wind| wind.speed),
            precipitation_probability: self.pop,
            rain_mm: self.rain.and_then(|rain| rain.three_hours).unwrap_or(0.0),
            condition,
            description,
            phase,
        })
    }
}

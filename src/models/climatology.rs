//! NASA POWER derived climatology values

use serde::{Deserialize, Serialize};

/// Monthly means for one location and calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimatologyAverage {
    pub latitude: f64,
    pub longitude: f64,
    pub year: i32,
    pub month: u32,
    /// Mean corrected precipitation in mm/day, absent when every day was a fill value
    pub avg_rainfall_mm: Option<f64>,
    /// Mean 2 m air temperature in Celsius
    pub avg_temperature_c: Option<f64>,
}

/// Single-day point values at 2 m
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointWeather {
    pub temperature_c: f64,
    pub wind_speed_ms: f64,
    pub humidity_pct: f64,
}

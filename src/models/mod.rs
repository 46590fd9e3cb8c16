//! Data models for Astrocast
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic coordinates and metadata
//! - Forecast: 3-hour forecast samples and their daily aggregates
//! - Climatology: NASA POWER monthly means and point values
//! - Air quality: pollution index and component concentrations

pub mod air_quality;
pub mod climatology;
pub mod forecast;
pub mod location;

// Re-export all public types for convenient access
pub use air_quality::AirQuality;
pub use climatology::{ClimatologyAverage, PointWeather};
pub use forecast::{DailyWeather, DayPhase, Forecast, ForecastSample};
pub use location::{Location, LocationInput};

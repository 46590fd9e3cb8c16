//! Astrocast - will it rain on my parade?
//!
//! This library provides forecast aggregation, climatology, air quality,
//! AI commentary and the suitability score behind the `astrocast` CLI and
//! its JSON API.

pub mod aggregation;
pub mod ai;
pub mod api;
pub mod cache;
pub mod climate;
pub mod climatology;
pub mod compare;
pub mod config;
pub mod error;
pub mod geocoding;
pub mod http;
pub mod location_resolver;
pub mod map;
pub mod models;
pub mod planner;
pub mod pollution;
pub mod report;
pub mod scoring;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use cache::PersistentCache;
pub use config::{AstrocastConfig, Secrets};
pub use error::{AstrocastError, ErrorCode};
pub use models::{DailyWeather, Forecast, Location, LocationInput};
pub use planner::Planner;
pub use scoring::{ScoreInputs, Suitability, SuitabilityScore, suitability_score};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, AstrocastError>;

//! Location model for geographic coordinates and metadata

use serde::{Deserialize, Serialize};
use std::fmt;

/// Location coordinates
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Location name (city, region, etc.)
    pub name: String,
    /// Country code (ISO 3166-1 alpha-2)
    pub country: Option<String>,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, name: String) -> Self {
        Self {
            latitude,
            longitude,
            name,
            country: None,
        }
    }

    /// Create location with country
    #[must_use]
    pub fn with_country(latitude: f64, longitude: f64, name: String, country: String) -> Self {
        Self {
            latitude,
            longitude,
            name,
            country: Some(country),
        }
    }

    /// Location named after its own coordinates
    #[must_use]
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, format!("{latitude:.4}, {longitude:.4}"))
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Round coordinates for cache key generation
    #[must_use]
    pub fn rounded_coordinates(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.latitude * multiplier).round() / multiplier;
        let lon = (self.longitude * multiplier).round() / multiplier;
        (lat, lon)
    }

    /// Generate cache key for this location
    #[must_use]
    pub fn cache_key(&self, kind: &str, period: &str) -> String {
        let (lat, lon) = self.rounded_coordinates(2); // Round to 2 decimal places
        format!("{kind}:{lat:.2}:{lon:.2}:{period}")
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.country {
            Some(country) => write!(f, "{}, {}", self.name, country),
            None => f.write_str(&self.name),
        }
    }
}

/// Types of location input
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    /// Coordinates (latitude, longitude)
    Coordinates(f64, f64),
    /// Location name (city, region, etc.)
    Name(String),
}

impl LocationInput {
    /// Parse user input; a valid "lat,lon" pair becomes coordinates, anything else a name
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match parse_coordinates(input) {
            Some((lat, lon)) => LocationInput::Coordinates(lat, lon),
            None => LocationInput::Name(input.to_string()),
        }
    }
}

/// Parse coordinates from string like "46.8182,8.2275" or "46.8182 8.2275"
fn parse_coordinates(input: &str) -> Option<(f64, f64)> {
    let parts: Vec<&str> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();

    if parts.len() != 2 {
        return None;
    }

    let lat = parts[0].parse::<f64>().ok()?;
    let lon = parts[1].parse::<f64>().ok()?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }

    Some((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_cache_key() {
        let location = Location::new(46.8182, 8.2275, "Interlaken".to_string());
        let key = location.cache_key("forecast", "2023-12-01");
        assert_eq!(key, "forecast:46.82:8.23:2023-12-01");
    }

    #[test]
    fn test_location_rounded_coordinates() {
        let location = Location::new(46.818_234, 8.227_456, "Test".to_string());
        let (lat, lon) = location.rounded_coordinates(2);
        assert_eq!(lat, 46.82);
        assert_eq!(lon, 8.23);
    }

    #[test]
    fn test_parse_coordinates() {
        assert_eq!(
            LocationInput::parse("46.8182,8.2275"),
            LocationInput::Coordinates(46.8182, 8.2275)
        );
        assert_eq!(
            LocationInput::parse("-46.8182, -8.2275"),
            LocationInput::Coordinates(-46.8182, -8.2275)
        );
        assert_eq!(
            LocationInput::parse("28.6139 77.2090"),
            LocationInput::Coordinates(28.6139, 77.209)
        );
    }

    #[test]
    fn test_out_of_range_or_malformed_become_names() {
        assert!(matches!(LocationInput::parse("91.0,8.0"), LocationInput::Name(_)));
        assert!(matches!(LocationInput::parse("46.0,181.0"), LocationInput::Name(_)));
        assert!(matches!(LocationInput::parse("46.0"), LocationInput::Name(_)));
        assert!(matches!(LocationInput::parse("46.0,8.0,0.0"), LocationInput::Name(_)));
        assert_eq!(
            LocationInput::parse("  New Delhi "),
            LocationInput::Name("New Delhi".to_string())
        );
    }

    #[test]
    fn test_from_coordinates_name() {
        let location = Location::from_coordinates(46.8182, 8.2275);
        assert_eq!(location.name, "46.8182, 8.2275");
    }
}

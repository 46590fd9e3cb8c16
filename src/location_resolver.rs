//! Location Resolution Module
//!
//! Turns user input (a coordinate pair or a place name) into a structured
//! [`Location`] using the Nominatim geocoder.

use crate::AstrocastError;
use crate::geocoding::NominatimClient;
use crate::models::{Location, LocationInput};
use anyhow::Result;
use tracing::debug;

/// Service for resolving location inputs
pub struct LocationResolver;

impl LocationResolver {
    /// Resolve a location input into a structured Location
    pub async fn resolve_location(
        geocoder: &NominatimClient,
        location_input: LocationInput,
    ) -> Result<Location> {
        debug!("Resolving location input: {:?}", location_input);

        let location = match location_input {
            LocationInput::Coordinates(lat, lon) => {
                Self::resolve_coordinates(geocoder, lat, lon).await
            }
            LocationInput::Name(name) => Self::resolve_name(geocoder, &name).await?,
        };

        debug!(
            "Resolved location: {} at ({}, {})",
            location.name, location.latitude, location.longitude
        );

        Ok(location)
    }

    /// Name a coordinate pair via reverse geocoding, falling back to the coordinates
    pub async fn resolve_coordinates(geocoder: &NominatimClient, lat: f64, lon: f64) -> Location {
        debug!("Resolving coordinates: ({}, {})", lat, lon);

        match geocoder.reverse(lat, lon).await {
            Ok(Some(found)) => Location {
                latitude: lat,
                longitude: lon,
                ..found
            },
            Ok(None) => {
                debug!("No reverse geocoding results found, using coordinates as name");
                Location::from_coordinates(lat, lon)
            }
            Err(e) => {
                debug!("Reverse geocoding failed: {}, using coordinates as name", e);
                Location::from_coordinates(lat, lon)
            }
        }
    }

    /// Geocode a place name; an unknown name is a validation error
    pub async fn resolve_name(geocoder: &NominatimClient, name: &str) -> Result<Location> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AstrocastError::validation("City name must not be empty").into());
        }
        debug!("Geocoding location name: {}", name);

        geocoder
            .search(name)
            .await?
            .ok_or_else(|| AstrocastError::validation(format!("City '{name}' not found.")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeocodingConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn geocoder(server: &MockServer) -> NominatimClient {
        NominatimClient::new(&GeocodingConfig {
            base_url: server.uri(),
            max_retries: 0,
            ..GeocodingConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_coordinates_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let location = LocationResolver::resolve_location(
            &geocoder(&server),
            LocationInput::Coordinates(46.8182, 8.2275),
        )
        .await
        .unwrap();

        assert_eq!(location.latitude, 46.8182);
        assert_eq!(location.longitude, 8.2275);
        assert_eq!(location.name, "46.8182, 8.2275");
    }

    #[tokio::test]
    async fn test_unknown_name_is_validation_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = LocationResolver::resolve_location(
            &geocoder(&server),
            LocationInput::Name("Atlantis".to_string()),
        )
        .await
        .unwrap_err();

        assert_eq!(crate::error::user_message(&err), "Invalid input: City 'Atlantis' not found.");
    }
}

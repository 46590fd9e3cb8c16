//! Nominatim forward and reverse geocoding

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::Url;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::GeocodingConfig;
use crate::http::{build_client, check_status};
use crate::models::Location;
use crate::{AstrocastError, ErrorCode};

const SERVICE: &str = "Nominatim";

/// One Nominatim place, shared by `search` and `reverse`
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    country_code: Option<String>,
}

impl Place {
    fn into_location(self) -> Result<Location> {
        let latitude: f64 = self
            .lat
            .parse()
            .with_context(|| format!("Invalid latitude from Nominatim: {}", self.lat))?;
        let longitude: f64 = self
            .lon
            .parse()
            .with_context(|| format!("Invalid longitude from Nominatim: {}", self.lon))?;

        let settlement = self
            .address
            .as_ref()
            .and_then(|a| a.city.clone().or_else(|| a.town.clone()).or_else(|| a.village.clone()));
        let name = settlement
            .or(self.name.filter(|n| !n.is_empty()))
            .or_else(|| self.display_name.split(',').next().map(|s| s.trim().to_string()))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("{latitude:.4}, {longitude:.4}"));
        let country = self
            .address
            .and_then(|a| a.country_code)
            .map(|code| code.to_uppercase());

        Ok(Location {
            latitude,
            longitude,
            name,
            country,
        })
    }
}

/// Nominatim client with retry/backoff
#[derive(Clone)]
pub struct NominatimClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl NominatimClient {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let client = build_client(
            Duration::from_secs(config.timeout_seconds.into()),
            &config.user_agent,
            config.max_retries,
            Duration::from_millis(config.backoff_base_ms),
        )?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Best match for a free-text place name
    #[instrument(skip(self), fields(query = query))]
    pub async fn search(&self, query: &str) -> Result<Option<Location>> {
        info!("Geocoding location: '{}'", query);
        let start_time = Instant::now();

        let url = Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[("q", query), ("format", "json"), ("limit", "1"), ("addressdetails", "1")],
        )
        .with_context(|| "Invalid Nominatim search URL")?;

        let places: Vec<Place> = self.fetch(url, query).await?;
        let location = places.into_iter().next().map(Place::into_location).transpose()?;

        match &location {
            Some(found) => info!(
                "Found '{}' at ({:.4}, {:.4}) in {:.3}s",
                found.name,
                found.latitude,
                found.longitude,
                start_time.elapsed().as_secs_f64()
            ),
            None => warn!("No results found for location '{}'", query),
        }
        Ok(location)
    }

    /// Place name for a coordinate pair
    #[instrument(skip(self))]
    pub async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<Location>> {
        let lat_s = lat.to_string();
        let lon_s = lon.to_string();
        let url = Url::parse_with_params(
            &format!("{}/reverse", self.base_url),
            &[("lat", lat_s.as_str()), ("lon", lon_s.as_str()), ("format", "json"), ("addressdetails", "1")],
        )
        .with_context(|| "Invalid Nominatim reverse URL")?;

        // Unresolvable points come back as `{"error": "..."}`
        let body: serde_json::Value = self.fetch(url, &format!("{lat:.4},{lon:.4}")).await?;
        if body.get("error").is_some() {
            debug!("Reverse geocoding found nothing at ({:.4}, {:.4})", lat, lon);
            return Ok(None);
        }
        let place: Place = serde_json::from_value(body).map_err(|e| {
            AstrocastError::api(
                format!("Invalid reverse geocoding data from Nominatim: {e}"),
                ErrorCode::ApiInvalidResponse,
            )
        })?;
        place.into_location().map(Some)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: Url, subject: &str) -> Result<T> {
        debug!("Nominatim request URL: {}", url);
        let response = self.client.get(url).send().await.map_err(|e| {
            AstrocastError::api_with_context(
                format!("Nominatim request failed: {e}"),
                ErrorCode::ApiNetworkError,
                HashMap::from([("query".to_string(), subject.to_string())]),
            )
        })?;
        let response = check_status(response, SERVICE)?;
        let body = response.json().await.map_err(|e| {
            AstrocastError::api_with_context(
                format!("Invalid geocoding data received from Nominatim: {e}"),
                ErrorCode::ApiInvalidResponse,
                HashMap::from([("query".to_string(), subject.to_string())]),
            )
        })?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> NominatimClient {
        NominatimClient::new(&GeocodingConfig {
            base_url: server.uri(),
            user_agent: "astrocast-test".to_string(),
            timeout_seconds: 5,
            max_retries: 0,
            backoff_base_ms: 10,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_sends_user_agent_and_parses_place() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Pune"))
            .and(header("user-agent", "astrocast-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "lat": "18.5204",
                "lon": "73.8567",
                "name": "Pune",
                "display_name": "Pune, Maharashtra, India",
                "address": {"city": "Pune", "country_code": "in"}
            }])))
            .mount(&server)
            .await;

        let location = client_for(&server).search("Pune").await.unwrap().unwrap();
        assert_eq!(location.name, "Pune");
        assert_eq!(location.country.as_deref(), Some("IN"));
        assert!((location.latitude - 18.5204).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_search_without_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        assert!(client_for(&server).search("Qwxyzzy").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reverse_error_body_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "Unable to geocode"})))
            .mount(&server)
            .await;

        assert!(client_for(&server).reverse(0.0, -140.0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reverse_uses_display_name_when_no_settlement() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lat": "46.5",
                "lon": "8.0",
                "display_name": "Jungfrau, Bern, Switzerland",
                "address": {"country_code": "ch"}
            })))
            .mount(&server)
            .await;

        let location = client_for(&server).reverse(46.5, 8.0).await.unwrap().unwrap();
        assert_eq!(location.name, "Jungfrau");
        assert_eq!(location.country.as_deref(), Some("CH"));
    }

    #[tokio::test]
    async fn test_forbidden_search_does_not_blame_the_weather_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client_for(&server).search("Pune").await.unwrap_err();
        assert_eq!(
            crate::error::user_message(&err),
            "Nominatim refused the request. Please try again later."
        );
    }
}

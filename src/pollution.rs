//! Air quality from the OpenWeatherMap Air Pollution API
//!
//! Every failure path (no key, unknown city, transport or decode error)
//! yields `None` after a log line; callers show a notice instead.

use anyhow::Result;
use serde::Deserialize;
use tracing::{info, warn};

use crate::models::{AirQuality, Location};
use crate::weather::OpenWeatherClient;

#[derive(Debug, Deserialize)]
struct PollutionResponse {
    #[serde(default)]
    list: Vec<PollutionEntry>,
}

#[derive(Debug, Deserialize)]
struct PollutionEntry {
    main: PollutionIndex,
    components: Components,
}

#[derive(Debug, Deserialize)]
struct PollutionIndex {
    aqi: u8,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Components {
    co: f64,
    no: f64,
    no2: f64,
    o3: f64,
    so2: f64,
    pm2_5: f64,
    pm10: f64,
    nh3: f64,
}

impl From<PollutionEntry> for AirQuality {
    fn from(entry: PollutionEntry) -> Self {
        let c = entry.components;
        AirQuality {
            aqi: entry.main.aqi,
            co: c.co,
            no: c.no,
            no2: c.no2,
            o3: c.o3,
            so2: c.so2,
            pm2_5: c.pm2_5,
            pm10: c.pm10,
            nh3: c.nh3,
        }
    }
}

async fn fetch_at(client: &OpenWeatherClient, lat: f64, lon: f64) -> Result<Option<AirQuality>> {
    let response: PollutionResponse = client
        .get_json(
            client.base_url(),
            "/data/2.5/air_pollution",
            &[("lat", lat.to_string()), ("lon", lon.to_string())],
        )
        .await?;
    Ok(response.list.into_iter().next().map(AirQuality::from))
}

/// Current air quality at a coordinate pair
pub async fn air_quality_at(client: &OpenWeatherClient, lat: f64, lon: f64) -> Option<AirQuality> {
    if !client.is_configured() {
        return None;
    }
    match fetch_at(client, lat, lon).await {
        Ok(reading) => reading,
        Err(e) => {
            warn!("Air quality lookup failed at ({:.4}, {:.4}): {}", lat, lon, e);
            None
        }
    }
}

/// Current air quality for a city, resolved through OpenWeatherMap direct geocoding
pub async fn air_quality_for_city(
    client: &OpenWeatherClient,
    city: &str,
) -> Option<(Location, AirQuality)> {
    if !client.is_configured() {
        return None;
    }
    let location = match client.direct_geocode(city).await {
        Ok(Some(location)) => location,
        Ok(None) => return None,
        Err(e) => {
            warn!("Geocoding '{}' for air quality failed: {}", city, e);
            return None;
        }
    };

    let reading = air_quality_at(client, location.latitude, location.longitude).await?;
    info!("Air quality in {}: AQI {} ({})", location.name, reading.aqi, reading.aqi_label());
    Some((location, reading))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeatherConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, key: Option<&str>) -> OpenWeatherClient {
        OpenWeatherClient::new(
            &WeatherConfig {
                base_url: server.uri(),
                geo_base_url: server.uri(),
                timeout_seconds: 5,
                max_retries: 0,
            },
            key.map(str::to_string),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_air_quality_for_city() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "Delhi", "lat": 28.65, "lon": 77.23, "country": "IN"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/air_pollution"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "coord": {"lon": 77.23, "lat": 28.65},
                "list": [{
                    "main": {"aqi": 4},
                    "components": {"co": 1201.6, "no": 2.1, "no2": 40.4, "o3": 12.0,
                                   "so2": 15.3, "pm2_5": 88.5, "pm10": 120.2, "nh3": 9.1},
                    "dt": 1_759_579_200
                }]
            })))
            .mount(&server)
            .await;

        let (location, reading) = air_quality_for_city(&client_for(&server, Some("k")), "Delhi")
            .await
            .unwrap();
        assert_eq!(location.name, "Delhi");
        assert_eq!(reading.aqi, 4);
        assert_eq!(reading.aqi_label(), "Poor");
        assert_eq!(reading.pm2_5, 88.5);
    }

    #[tokio::test]
    async fn test_failures_become_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/air_pollution"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("k"));
        assert!(air_quality_for_city(&client, "Nowhere").await.is_none());
        assert!(air_quality_at(&client, 1.0, 2.0).await.is_none());
        assert!(air_quality_at(&client_for(&server, None), 1.0, 2.0).await.is_none());
    }
}

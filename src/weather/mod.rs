//! OpenWeatherMap client
//!
//! Fetches the 5-day / 3-hour forecast by city name or coordinates and
//! exposes the shared request plumbing used by the air-quality lookup.
//! Every call needs `OPENWEATHER_API_KEY`; without it nothing is sent.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::Url;
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::{PersistentCache, cached};
use crate::config::WeatherConfig;
use crate::http::{build_client, check_status, redact_url};
use crate::models::{Forecast, Location};
use crate::{AstrocastError, ErrorCode};

mod openweather;

pub(crate) use openweather::GeoDirectEntry;

const SERVICE: &str = "OpenWeatherMap";

/// Notice shown in place of forecast data when no key is configured
pub const MISSING_KEY_NOTICE: &str =
    "OpenWeatherMap key missing (add OPENWEATHER_API_KEY to secrets or env); forecast skipped.";

/// Forecast and geocoding client for OpenWeatherMap
#[derive(Clone)]
pub struct OpenWeatherClient {
    client: ClientWithMiddleware,
    base_url: String,
    geo_base_url: String,
    api_key: Option<String>,
    cache: Option<PersistentCache>,
    forecast_ttl: Duration,
}

impl OpenWeatherClient {
    /// Create a client; `api_key` of `None` leaves every call unconfigured
    pub fn new(config: &WeatherConfig, api_key: Option<String>) -> Result<Self> {
        let client = build_client(
            Duration::from_secs(config.timeout_seconds.into()),
            &format!("astrocast/{}", crate::VERSION),
            config.max_retries,
            Duration::from_millis(500),
        )?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            geo_base_url: config.geo_base_url.trim_end_matches('/').to_string(),
            api_key,
            cache: None,
            forecast_ttl: Duration::from_secs(30 * 60),
        })
    }

    /// Serve repeated forecast lookups from `cache` for `ttl`
    #[must_use]
    pub fn with_cache(mut self, cache: PersistentCache, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.forecast_ttl = ttl;
        self
    }

    /// Whether an API key is available
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            AstrocastError::config("OPENWEATHER_API_KEY is not configured").into()
        })
    }

    /// 5-day / 3-hour forecast for a city name
    #[instrument(skip(self), fields(city = city))]
    pub async fn forecast_by_city(&self, city: &str) -> Result<Forecast> {
        let city = city.trim();
        if city.is_empty() {
            return Err(AstrocastError::validation("City name must not be empty").into());
        }
        let key = format!("forecast:city:{}", city.to_lowercase());

        cached(self.cache.as_ref(), &key, self.forecast_ttl, || async {
            let response: openweather::ForecastResponse = self
                .get_json(
                    &self.base_url,
                    "/data/2.5/forecast",
                    &[("q", city.to_string()), ("units", "metric".to_string())],
                )
                .await?;
            Ok(response.into_forecast(None))
        })
        .await
    }

    /// 5-day / 3-hour forecast for a coordinate pair
    #[instrument(skip(self), fields(lat, lon))]
    pub async fn forecast_by_coordinates(&self, lat: f64, lon: f64) -> Result<Forecast> {
        let key = Location::from_coordinates(lat, lon).cache_key("forecast", "5d");

        cached(self.cache.as_ref(), &key, self.forecast_ttl, || async {
            let response: openweather::ForecastResponse = self
                .get_json(
                    &self.base_url,
                    "/data/2.5/forecast",
                    &[
                        ("lat", lat.to_string()),
                        ("lon", lon.to_string()),
                        ("units", "metric".to_string()),
                    ],
                )
                .await?;
            Ok(response.into_forecast(Some((lat, lon))))
        })
        .await
    }

    /// First direct-geocoding match for a city name, `None` when unknown
    #[instrument(skip(self), fields(city = city))]
    pub async fn direct_geocode(&self, city: &str) -> Result<Option<Location>> {
        let entries: Vec<GeoDirectEntry> = self
            .get_json(
                &self.geo_base_url,
                "/geo/1.0/direct",
                &[("q", city.to_string()), ("limit", "1".to_string())],
            )
            .await?;

        let location = entries.into_iter().next().map(Location::from);
        if location.is_none() {
            warn!("No geocoding results found for '{}'", city);
        }
        Ok(location)
    }

    /// GET `{base}{path}` with the API key attached and decode the JSON body
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        base: &str,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let api_key = self.api_key()?;
        let mut query: Vec<(&str, &str)> =
            params.iter().map(|(name, value)| (*name, value.as_str())).collect();
        query.push(("appid", api_key));

        let url = Url::parse_with_params(&format!("{base}{path}"), &query)
            .with_context(|| format!("Invalid OpenWeatherMap URL: {base}{path}"))?;
        let shown = redact_url(url.as_str());
        debug!("OpenWeatherMap request URL: {}", shown);

        let start_time = Instant::now();
        let response = self.client.get(url).send().await.map_err(|e| {
            error!("OpenWeatherMap request failed: {}", e);
            AstrocastError::api_with_context(
                format!("OpenWeatherMap request failed: {e}"),
                ErrorCode::ApiNetworkError,
                HashMap::from([("url".to_string(), shown.clone())]),
            )
        })?;
        let response = check_status(response, SERVICE)?;

        let parse_start = Instant::now();
        let body: T = response.json().await.map_err(|e| {
            error!("Failed to parse OpenWeatherMap response: {}", e);
            AstrocastError::api_with_context(
                format!("Invalid data received from OpenWeatherMap: {e}"),
                ErrorCode::ApiInvalidResponse,
                HashMap::from([("path".to_string(), path.to_string())]),
            )
        })?;

        let total_duration = start_time.elapsed();
        info!(
            "OpenWeatherMap {} answered in {:.3}s (parse: {:.3}s)",
            path,
            total_duration.as_secs_f64(),
            parse_start.elapsed().as_secs_f64()
        );
        if total_duration.as_secs() > 5 {
            warn!("Slow API response detected: {:.3}s", total_duration.as_secs_f64());
        }

        Ok(body)
    }
}

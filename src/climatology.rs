//! NASA POWER climatology client
//!
//! Monthly means are derived from the daily point API over a whole calendar
//! month. Days carrying the fill value are excluded from every mean.

use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::{StreamExt, stream};
use reqwest::Url;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::cache::{PersistentCache, cached};
use crate::config::ClimatologyConfig;
use crate::http::{build_client, check_status};
use crate::models::{ClimatologyAverage, Location, PointWeather};
use crate::{AstrocastError, ErrorCode};

/// Value NASA POWER reports for days without data
pub const FILL_VALUE: f64 = -999.0;

const SERVICE: &str = "NASA POWER";

#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: HashMap<String, BTreeMap<String, f64>>,
}

impl PowerResponse {
    fn series(&self, name: &str) -> Vec<f64> {
        self.properties
            .parameter
            .get(name)
            .map(|days| days.values().copied().collect())
            .unwrap_or_default()
    }
}

/// Mean of the values that are not fill values; `None` when nothing is left
#[must_use]
pub fn mean_excluding_fill(values: &[f64]) -> Option<f64> {
    let valid: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > FILL_VALUE)
        .collect();
    if valid.is_empty() {
        return None;
    }
    Some(valid.iter().sum::<f64>() / valid.len() as f64)
}

/// First and last day of a calendar month; December's end is computed from January of the next year
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AstrocastError::validation(format!("Invalid month: {year}-{month:02}")))?;
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .ok_or_else(|| AstrocastError::validation(format!("Invalid month: {year}-{month:02}")))?;
    Ok((start, end))
}

/// NASA POWER daily point client
#[derive(Clone)]
pub struct PowerClient {
    client: ClientWithMiddleware,
    base_url: String,
    community: String,
    max_concurrent_years: usize,
    cache: Option<PersistentCache>,
    ttl: Duration,
}

impl PowerClient {
    pub fn new(config: &ClimatologyConfig) -> Result<Self> {
        let client = build_client(
            Duration::from_secs(config.timeout_seconds.into()),
            &format!("astrocast/{}", crate::VERSION),
            2,
            Duration::from_millis(500),
        )?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            community: config.community.clone(),
            max_concurrent_years: config.max_concurrent_years.max(1),
            cache: None,
            ttl: Duration::from_secs(60 * 60),
        })
    }

    #[must_use]
    pub fn with_cache(mut self, cache: PersistentCache, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.ttl = ttl;
        self
    }

    /// Mean rainfall and temperature for one calendar month
    #[instrument(skip(self))]
    pub async fn monthly_average(
        &self,
        latitude: f64,
        longitude: f64,
        year: i32,
        month: u32,
    ) -> Result<ClimatologyAverage> {
        let (start, end) = month_bounds(year, month)?;
        let key = Location::from_coordinates(latitude, longitude)
            .cache_key("climatology", &format!("{year}-{month:02}"));

        cached(self.cache.as_ref(), &key, self.ttl, || async {
            let response = self
                .fetch("PRECTOTCORR,T2M", latitude, longitude, start, end)
                .await?;
            Ok(ClimatologyAverage {
                latitude,
                longitude,
                year,
                month,
                avg_rainfall_mm: mean_excluding_fill(&response.series("PRECTOTCORR")),
                avg_temperature_c: mean_excluding_fill(&response.series("T2M")),
            })
        })
        .await
    }

    /// Monthly averages for each year in `years`, fetched with bounded concurrency.
    ///
    /// Years that fail are logged and skipped; the result is sorted by year.
    pub async fn yearly_averages(
        &self,
        latitude: f64,
        longitude: f64,
        month: u32,
        years: RangeInclusive<i32>,
    ) -> Vec<ClimatologyAverage> {
        let mut averages: Vec<ClimatologyAverage> = stream::iter(years)
            .map(|year| async move {
                match self.monthly_average(latitude, longitude, year, month).await {
                    Ok(average) => Some(average),
                    Err(e) => {
                        warn!("Skipping climatology for {year}-{month:02}: {e}");
                        None
                    }
                }
            })
            .buffer_unordered(self.max_concurrent_years)
            .filter_map(|average| async move { average })
            .collect()
            .await;

        averages.sort_by_key(|average| average.year);
        averages
    }

    /// Temperature, wind and humidity at 2 m for one day.
    ///
    /// `None` when the call fails or any value is a fill value.
    #[instrument(skip(self))]
    pub async fn point_weather(
        &self,
        latitude: f64,
        longitude: f64,
        date: NaiveDate,
    ) -> Option<PointWeather> {
        let response = match self.fetch("T2M,WS2M,RH2M", latitude, longitude, date, date).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Point weather lookup failed: {e}");
                return None;
            }
        };

        let first = |name: &str| {
            response
                .series(name)
                .into_iter()
                .next()
                .filter(|v| v.is_finite() && *v > FILL_VALUE)
        };
        Some(PointWeather {
            temperature_c: first("T2M")?,
            wind_speed_ms: first("WS2M")?,
            humidity_pct: first("RH2M")?,
        })
    }

    async fn fetch(
        &self,
        parameters: &str,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PowerResponse> {
        let start_s = start.format("%Y%m%d").to_string();
        let end_s = end.format("%Y%m%d").to_string();
        let lat_s = latitude.to_string();
        let lon_s = longitude.to_string();
        let url = Url::parse_with_params(
            &self.base_url,
            &[
                ("parameters", parameters),
                ("community", self.community.as_str()),
                ("longitude", lon_s.as_str()),
                ("latitude", lat_s.as_str()),
                ("start", start_s.as_str()),
                ("end", end_s.as_str()),
                ("format", "JSON"),
            ],
        )
        .with_context(|| format!("Invalid NASA POWER URL: {}", self.base_url))?;
        debug!("NASA POWER request URL: {}", url);

        let start_time = Instant::now();
        let context = HashMap::from([
            ("coordinates".to_string(), format!("{latitude:.4},{longitude:.4}")),
            ("period".to_string(), format!("{start_s}-{end_s}")),
        ]);
        let response = self.client.get(url).send().await.map_err(|e| {
            AstrocastError::api_with_context(
                format!("NASA POWER request failed: {e}"),
                ErrorCode::ApiNetworkError,
                context.clone(),
            )
        })?;
        let response = check_status(response, SERVICE)?;
        let body: PowerResponse = response.json().await.map_err(|e| {
            AstrocastError::api_with_context(
                format!("Invalid climatology data received from NASA POWER: {e}"),
                ErrorCode::ApiInvalidResponse,
                context,
            )
        })?;

        info!(
            "NASA POWER {} for {}..{} in {:.3}s",
            parameters,
            start,
            end,
            start_time.elapsed().as_secs_f64()
        );
        Ok(body)
    }
}

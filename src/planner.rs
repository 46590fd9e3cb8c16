//! Request orchestration shared by the CLI and the HTTP API
//!
//! A [`Planner`] owns one client per upstream service. Each operation fans
//! out to the services it needs concurrently, then scores and renders the
//! result. Missing keys and failing services become notices on the report.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Datelike, Month, NaiveDate, Utc};
use tracing::{info, instrument, warn};

use crate::aggregation::{daily_outlook, process_forecast_with_fallback};
use crate::ai::context::build_context;
use crate::ai::prompts::{self, ClimateFacts};
use crate::ai::{AiAssistant, WeatherMetrics};
use crate::cache::PersistentCache;
use crate::climate::{YearSpan, climate_insight};
use crate::climatology::PowerClient;
use crate::compare::{CityFailure, Comparison, WeekendDay, compare_cities, next_weekend_day};
use crate::config::{AstrocastConfig, Secrets};
use crate::error::user_message;
use crate::geocoding::NominatimClient;
use crate::location_resolver::LocationResolver;
use crate::map::{PointReport, gibs_layers, point_lookup};
use crate::models::{Forecast, LocationInput};
use crate::pollution::{air_quality_at, air_quality_for_city};
use crate::report::{
    AskReport, ClimateReport, EventReport, HealthReport, HistoryReport, LayerList, PollutionReport,
};
use crate::scoring::{ScoreInputs, suitability_score};
use crate::weather::{MISSING_KEY_NOTICE, OpenWeatherClient};

/// Days listed in the outlook table
const OUTLOOK_DAYS: usize = 5;
/// Yearly points handed to the climate commentary
const CLIMATE_TAIL_ROWS: usize = 10;

pub struct Planner {
    weather: OpenWeatherClient,
    power: PowerClient,
    geocoder: NominatimClient,
    ai: AiAssistant,
    cache_enabled: bool,
}

fn minutes(value: u32) -> Duration {
    Duration::from_secs(u64::from(value) * 60)
}

impl Planner {
    /// Build every client from configuration, reading secrets from the configured file and the environment
    pub fn from_config(config: &AstrocastConfig) -> Result<Self> {
        let secrets = Secrets::load(config.secrets_path().as_deref())?;
        Self::with_secrets(config, &secrets)
    }

    pub fn with_secrets(config: &AstrocastConfig, secrets: &Secrets) -> Result<Self> {
        let cache = if config.cache.enabled {
            match PersistentCache::open(&config.cache.location) {
                Ok(cache) => Some(cache),
                Err(e) => {
                    warn!("Cache at {} unavailable, continuing without it: {}", config.cache.location, e);
                    None
                }
            }
        } else {
            None
        };

        let mut weather = OpenWeatherClient::new(&config.weather, secrets.openweather_api_key.clone())
            .context("Failed to create OpenWeatherMap client")?;
        let mut power = PowerClient::new(&config.climatology).context("Failed to create NASA POWER client")?;
        if let Some(cache) = &cache {
            weather = weather.with_cache(cache.clone(), minutes(config.cache.forecast_ttl_minutes));
            power = power.with_cache(cache.clone(), minutes(config.cache.climatology_ttl_minutes));
        }

        Ok(Self {
            weather,
            power,
            geocoder: NominatimClient::new(&config.geocoding).context("Failed to create geocoder")?,
            ai: AiAssistant::from_config(&config.ai, secrets)?,
            cache_enabled: cache.is_some(),
        })
    }

    /// Replace the AI assistant
    #[must_use]
    pub fn with_ai(mut self, ai: AiAssistant) -> Self {
        self.ai = ai;
        self
    }

    pub fn ai(&self) -> &AiAssistant {
        &self.ai
    }

    async fn forecast_for(&self, input: &LocationInput, notices: &mut Vec<String>) -> Option<Forecast> {
        if !self.weather.is_configured() {
            notices.push(MISSING_KEY_NOTICE.to_string());
            return None;
        }
        let result = match input {
            LocationInput::Coordinates(lat, lon) => self.weather.forecast_by_coordinates(*lat, *lon).await,
            LocationInput::Name(name) => self.weather.forecast_by_city(name).await,
        };
        match result {
            Ok(forecast) => Some(forecast),
            Err(e) => {
                warn!("Forecast lookup failed: {}", e);
                notices.push(format!("Forecast unavailable: {}", user_message(&e)));
                None
            }
        }
    }

    /// Forecast, climatology, air quality and score for `city` on `date`
    #[instrument(skip(self))]
    pub async fn report(&self, city: &str, date: NaiveDate, with_ai: bool) -> Result<EventReport> {
        let input = LocationInput::parse(city);
        let location = LocationResolver::resolve_location(&self.geocoder, input.clone()).await?;

        let mut notices = Vec::new();
        let (forecast, air_quality) = tokio::join!(
            self.forecast_for(&input, &mut notices),
            air_quality_at(&self.weather, location.latitude, location.longitude),
        );

        let (daily, used_date, substituted) = match &forecast {
            Some(forecast) => process_forecast_with_fallback(forecast, date),
            None => (None, date, false),
        };
        if forecast.is_some() && daily.is_none() {
            notices.push("No forecast data in window".to_string());
        }

        // Climatology follows the day actually scored
        let climatology = match self
            .power
            .monthly_average(location.latitude, location.longitude, used_date.year(), used_date.month())
            .await
        {
            Ok(average) => Some(average),
            Err(e) => {
                notices.push(format!("NASA POWER climatology unavailable: {}", user_message(&e)));
                None
            }
        };
        if self.weather.is_configured() && air_quality.is_none() {
            notices.push("Air quality data unavailable.".to_string());
        }

        let climate_mean = climatology.as_ref().and_then(|c| c.avg_temperature_c);
        let inputs = daily
            .as_ref()
            .map(|day| ScoreInputs::from_daily(day, climate_mean))
            .unwrap_or_default();
        let score = suitability_score(&inputs);
        info!("Score for {} on {}: {} ({:?})", location.name, used_date, score.score, score.class);

        let ai_summary = if !with_ai {
            None
        } else if !self.ai.is_configured() {
            notices.push(crate::ai::NOT_CONFIGURED.to_string());
            None
        } else {
            let metrics = daily
                .as_ref()
                .map(|day| WeatherMetrics {
                    temperature_c: Some(day.avg_temp_c),
                    humidity_pct: Some(day.avg_humidity_pct),
                    wind_ms: Some(day.avg_wind_ms),
                    rain_mm: Some(day.total_rain_mm),
                })
                .unwrap_or_default();
            Some(self.ai.summarize_weather(&metrics).await)
        };

        Ok(EventReport {
            outlook: forecast
                .as_ref()
                .map(|f| daily_outlook(f, OUTLOOK_DAYS))
                .unwrap_or_default(),
            location,
            requested_date: date,
            used_date,
            substituted,
            daily,
            score,
            climatology,
            air_quality,
            ai_summary,
            notices,
        })
    }

    /// Rank `cities` for the next Saturday or Sunday from `today`
    pub async fn compare(
        &self,
        cities: &[String],
        day: WeekendDay,
        today: NaiveDate,
        with_ai: bool,
    ) -> Result<Comparison> {
        if cities.len() < 2 {
            return Err(crate::AstrocastError::validation("Provide at least two cities to compare").into());
        }
        if !self.weather.is_configured() {
            return Ok(Comparison {
                target_date: next_weekend_day(today, day),
                day,
                rows: Vec::new(),
                failures: cities
                    .iter()
                    .map(|city| CityFailure {
                        city: city.clone(),
                        reason: MISSING_KEY_NOTICE.to_string(),
                    })
                    .collect(),
                ai_summary: None,
            });
        }
        let ai = with_ai.then_some(&self.ai);
        Ok(compare_cities(&self.weather, &self.power, ai, cities, today, day).await)
    }

    /// NASA POWER monthly means for one city and month
    #[instrument(skip(self))]
    pub async fn history(&self, city: &str, year: i32, month: u32) -> Result<HistoryReport> {
        if !(1..=12).contains(&month) {
            return Err(crate::AstrocastError::validation(format!("Month must be 1-12, got {month}")).into());
        }
        let location = LocationResolver::resolve_location(&self.geocoder, LocationInput::parse(city)).await?;
        let average = self
            .power
            .monthly_average(location.latitude, location.longitude, year, month)
            .await?;
        Ok(HistoryReport { location, average })
    }

    /// Compare a recent period against a historical one for `month`
    #[instrument(skip(self))]
    pub async fn climate(
        &self,
        city: &str,
        month: u32,
        historical: YearSpan,
        recent: YearSpan,
        with_ai: bool,
    ) -> Result<ClimateReport> {
        let location = LocationResolver::resolve_location(&self.geocoder, LocationInput::parse(city)).await?;
        let insight = climate_insight(&self.power, location, month, historical, recent).await?;

        let ai_commentary = if with_ai && self.ai.is_configured() {
            let month_name = u8::try_from(insight.month)
                .ok()
                .and_then(|m| Month::try_from(m).ok())
                .map_or_else(|| insight.month.to_string(), |m| m.name().to_string());
            let historical_label = insight.historical.span.to_string();
            let recent_label = insight.recent.span.to_string();
            let tail = insight.chart.tail_csv(CLIMATE_TAIL_ROWS);
            let prompt = prompts::climate_prompt(&ClimateFacts {
                city: &insight.location.name,
                month_name: &month_name,
                confidence: &insight.confidence.to_string(),
                rain_delta_mm: insight.rain_delta_mm,
                rain_delta_pct: insight.rain_delta_pct,
                temp_delta_c: insight.temp_delta_c,
                temp_delta_pct: insight.temp_delta_pct,
                recent_label: &recent_label,
                historical_label: &historical_label,
                recent_rows_csv: &tail,
            });
            Some(self.ai.answer_question(prompts::CLIMATE_QUESTION, &prompt).await)
        } else {
            None
        };

        Ok(ClimateReport { insight, ai_commentary })
    }

    /// Current air quality for a city
    #[instrument(skip(self))]
    pub async fn pollution(&self, city: &str) -> Result<PollutionReport> {
        let city = city.trim();
        if city.is_empty() {
            return Err(crate::AstrocastError::validation("City name must not be empty").into());
        }
        if !self.weather.is_configured() {
            return Ok(PollutionReport {
                query: city.to_string(),
                location: None,
                air_quality: None,
                notices: vec![MISSING_KEY_NOTICE.to_string()],
            });
        }

        let found = air_quality_for_city(&self.weather, city).await;
        let notices = if found.is_none() {
            vec![format!("Air quality data unavailable for {city}.")]
        } else {
            Vec::new()
        };
        let (location, air_quality) = found.map_or((None, None), |(l, a)| (Some(l), Some(a)));
        Ok(PollutionReport {
            query: city.to_string(),
            location,
            air_quality,
            notices,
        })
    }

    /// Answer a question, grounded in the city's forecast and climatology when a city is given
    #[instrument(skip(self))]
    pub async fn ask(&self, question: &str, city: Option<&str>) -> Result<AskReport> {
        let question = question.trim();
        if question.is_empty() {
            return Err(crate::AstrocastError::validation("Question must not be empty").into());
        }
        let city = city.map(str::trim).filter(|c| !c.is_empty());

        let answer = match city {
            Some(city) if self.ai.is_configured() => {
                let now = Utc::now();
                let mut ignored = Vec::new();
                let input = LocationInput::parse(city);
                let forecast = self.forecast_for(&input, &mut ignored).await;
                let historical = match LocationResolver::resolve_location(&self.geocoder, input).await {
                    Ok(location) => self
                        .power
                        .monthly_average(location.latitude, location.longitude, now.year() - 1, now.month())
                        .await
                        .ok(),
                    Err(e) => {
                        warn!("No location for AI context: {}", e);
                        None
                    }
                };
                let context = build_context(city, forecast.as_ref(), historical.as_ref(), now);
                self.ai
                    .answer_question(&prompts::strict_instruction(question), &context.to_json())
                    .await
            }
            _ => self.ai.answer_question(question, "").await,
        };

        Ok(AskReport {
            question: question.to_string(),
            city: city.map(str::to_string),
            answer,
        })
    }

    /// Pin lookup for the map view
    pub async fn point(&self, lat: f64, lon: f64, date: NaiveDate, with_ai: bool) -> Result<PointReport> {
        point_lookup(
            &self.geocoder,
            &self.power,
            &self.weather,
            with_ai.then_some(&self.ai),
            lat,
            lon,
            date,
        )
        .await
    }

    #[must_use]
    pub fn layers(date: NaiveDate) -> LayerList {
        LayerList {
            date,
            layers: gibs_layers(date),
        }
    }

    pub async fn health(&self) -> HealthReport {
        HealthReport {
            version: crate::VERSION.to_string(),
            weather_configured: self.weather.is_configured(),
            cache_enabled: self.cache_enabled,
            ai: self.ai.health().await,
        }
    }
}

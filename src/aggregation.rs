//! Reduction of 3-hour forecast samples into daily aggregates

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::debug;

use crate::models::forecast::condition_emoji;
use crate::models::{DailyWeather, DayPhase, Forecast, ForecastSample};

/// Most frequent condition group, ties broken alphabetically.
///
/// Description and phase come from the first sample in that group.
fn dominant_condition(samples: &[&ForecastSample]) -> Option<(String, String, DayPhase)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for sample in samples {
        *counts.entry(sample.condition.as_str()).or_default() += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (condition, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((condition, count));
        }
    }
    let (condition, _) = best?;

    samples
        .iter()
        .find(|sample| sample.condition == condition)
        .map(|sample| (sample.condition.clone(), sample.description.clone(), sample.phase))
}

/// Aggregate an arbitrary set of samples as the weather of `date`
#[must_use]
pub fn summarize_samples(date: NaiveDate, samples: &[&ForecastSample]) -> Option<DailyWeather> {
    if samples.is_empty() {
        return None;
    }
    let count = samples.len() as f64;
    let mean = |pick: fn(&ForecastSample) -> f64| samples.iter().map(|s| pick(s)).sum::<f64>() / count;

    let max_precipitation_probability = samples
        .iter()
        .filter_map(|s| s.precipitation_probability)
        .fold(None, |max: Option<f64>, p| Some(max.map_or(p, |m| m.max(p))));

    let (condition, condition_description, condition_phase) = dominant_condition(samples)?;

    Some(DailyWeather {
        date,
        avg_temp_c: mean(|s| s.temperature_c),
        avg_humidity_pct: mean(|s| s.humidity_pct),
        avg_wind_ms: mean(|s| s.wind_speed_ms),
        total_rain_mm: samples.iter().map(|s| s.rain_mm).sum(),
        max_precipitation_probability,
        sample_count: samples.len(),
        condition_emoji: condition_emoji(&condition, condition_phase).to_string(),
        condition,
        condition_description,
        condition_phase,
    })
}

/// Aggregate the samples whose UTC date equals `date`
#[must_use]
pub fn process_forecast(forecast: &Forecast, date: NaiveDate) -> Option<DailyWeather> {
    summarize_samples(date, &forecast.samples_on(date))
}

/// The covered date nearest to `date`; earlier dates win ties
#[must_use]
pub fn closest_forecast_day(forecast: &Forecast, date: NaiveDate) -> Option<NaiveDate> {
    forecast
        .available_dates()
        .into_iter()
        .min_by_key(|candidate| (*candidate - date).num_days().abs())
}

/// Aggregate `date`, or the nearest covered date when `date` is outside the forecast.
///
/// Returns the aggregate, the date actually used and whether it was substituted.
#[must_use]
pub fn process_forecast_with_fallback(
    forecast: &Forecast,
    date: NaiveDate,
) -> (Option<DailyWeather>, NaiveDate, bool) {
    let Some(used) = closest_forecast_day(forecast, date) else {
        return (None, date, false);
    };
    if used != date {
        debug!("No forecast for {}, using nearest day {}", date, used);
    }
    (process_forecast(forecast, used), used, used != date)
}

/// One aggregate for each of the first `days` covered dates
#[must_use]
pub fn daily_outlook(forecast: &Forecast, days: usize) -> Vec<DailyWeather> {
    forecast
        .available_dates()
        .into_iter()
        .take(days)
        .filter_map(|date| process_forecast(forecast, date))
        .collect()
}

/// Aggregate by the city's local calendar day: local today plus `day_offset`
#[must_use]
pub fn aggregate_daily_by_timezone(
    forecast: &Forecast,
    day_offset: i64,
    now: DateTime<Utc>,
) -> Option<DailyWeather> {
    let offset = Duration::seconds(i64::from(forecast.timezone_offset_seconds));
    let target = (now + offset).date_naive() + Duration::days(day_offset);

    let samples: Vec<&ForecastSample> = forecast
        .samples
        .iter()
        .filter(|sample| (sample.timestamp + offset).date_naive() == target)
        .collect();
    summarize_samples(target, &samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;
    use chrono::TimeZone;

    fn sample(ts: &str, temp: f64, condition: &str, pop: Option<f64>, rain: f64) -> ForecastSample {
        let timestamp = DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc);
        ForecastSample {
            timestamp,
            temperature_c: temp,
            humidity_pct: 60.0,
            wind_speed_ms: 4.0,
            precipitation_probability: pop,
            rain_mm: rain,
            condition: condition.to_string(),
            description: format!("{} here", condition.to_lowercase()),
            phase: DayPhase::Day,
        }
    }

    fn forecast(samples: Vec<ForecastSample>, offset: i32) -> Forecast {
        Forecast {
            location: Location::new(19.07, 72.88, "Mumbai".to_string()),
            timezone_offset_seconds: offset,
            samples,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_process_forecast_averages_and_totals() {
        let fc = forecast(
            vec![
                sample("2025-10-04T00:00:00Z", 20.0, "Rain", Some(0.3), 1.0),
                sample("2025-10-04T12:00:00Z", 30.0, "Rain", Some(0.8), 2.5),
                sample("2025-10-05T00:00:00Z", 10.0, "Clear", None, 0.0),
            ],
            0,
        );

        let day = process_forecast(&fc, date("2025-10-04")).unwrap();
        assert_eq!(day.avg_temp_c, 25.0);
        assert_eq!(day.total_rain_mm, 3.5);
        assert_eq!(day.max_precipitation_probability, Some(0.8));
        assert_eq!(day.sample_count, 2);
        assert_eq!(day.condition_emoji, "🌧️");
        assert!(process_forecast(&fc, date("2025-10-09")).is_none());
    }

    #[test]
    fn test_dominant_condition_tie_breaks_alphabetically() {
        let fc = forecast(
            vec![
                sample("2025-10-04T00:00:00Z", 20.0, "Rain", None, 0.0),
                sample("2025-10-04T03:00:00Z", 20.0, "Clouds", None, 0.0),
                sample("2025-10-04T06:00:00Z", 20.0, "Rain", None, 0.0),
                sample("2025-10-04T09:00:00Z", 20.0, "Clouds", None, 0.0),
            ],
            0,
        );
        let day = process_forecast(&fc, date("2025-10-04")).unwrap();
        assert_eq!(day.condition, "Clouds");
        assert_eq!(day.condition_description, "clouds here");
    }

    #[test]
    fn test_closest_day_and_fallback() {
        let fc = forecast(
            vec![
                sample("2025-10-04T00:00:00Z", 20.0, "Clear", None, 0.0),
                sample("2025-10-06T00:00:00Z", 22.0, "Clear", None, 0.0),
            ],
            0,
        );
        assert_eq!(closest_forecast_day(&fc, date("2025-10-04")), Some(date("2025-10-04")));
        assert_eq!(closest_forecast_day(&fc, date("2025-10-05")), Some(date("2025-10-04")));
        assert_eq!(closest_forecast_day(&fc, date("2025-10-20")), Some(date("2025-10-06")));

        let (day, used, substituted) = process_forecast_with_fallback(&fc, date("2025-10-20"));
        assert_eq!(used, date("2025-10-06"));
        assert!(substituted);
        assert_eq!(day.unwrap().avg_temp_c, 22.0);

        let (_, used, substituted) = process_forecast_with_fallback(&fc, date("2025-10-04"));
        assert_eq!(used, date("2025-10-04"));
        assert!(!substituted);

        let empty = forecast(vec![], 0);
        assert_eq!(closest_forecast_day(&empty, date("2025-10-04")), None);
        let (day, used, substituted) = process_forecast_with_fallback(&empty, date("2025-10-04"));
        assert!(day.is_none());
        assert_eq!(used, date("2025-10-04"));
        assert!(!substituted);
    }

    #[test]
    fn test_daily_outlook_limits_days() {
        let fc = forecast(
            (0..6)
                .map(|d| sample(&format!("2025-10-0{}T12:00:00Z", d + 1), 20.0, "Clear", None, 0.0))
                .collect(),
            0,
        );
        let outlook = daily_outlook(&fc, 5);
        assert_eq!(outlook.len(), 5);
        assert_eq!(outlook[0].date, date("2025-10-01"));
        assert_eq!(outlook[4].date, date("2025-10-05"));
    }

    #[test]
    fn test_aggregate_daily_by_timezone_shifts_local_day() {
        // 21:00 UTC on the 3rd is already the 4th in UTC+5:30
        let fc = forecast(
            vec![
                sample("2025-10-03T15:00:00Z", 30.0, "Clear", None, 0.0),
                sample("2025-10-03T21:00:00Z", 18.0, "Clear", None, 0.0),
                sample("2025-10-04T06:00:00Z", 24.0, "Clear", None, 0.0),
            ],
            19_800,
        );
        let now = Utc.with_ymd_and_hms(2025, 10, 3, 10, 0, 0).unwrap();

        let today = aggregate_daily_by_timezone(&fc, 0, now).unwrap();
        assert_eq!(today.date, date("2025-10-03"));
        assert_eq!(today.sample_count, 1);

        let tomorrow = aggregate_daily_by_timezone(&fc, 1, now).unwrap();
        assert_eq!(tomorrow.date, date("2025-10-04"));
        assert_eq!(tomorrow.avg_temp_c, 21.0);

        assert!(aggregate_daily_by_timezone(&fc, 3, now).is_none());
    }
}

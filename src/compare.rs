//! Weekend comparison of several cities ranked by suitability score

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::AstrocastError;
use crate::aggregation::process_forecast_with_fallback;
use crate::ai::{AiAssistant, prompts};
use crate::climatology::PowerClient;
use crate::scoring::{ScoreInputs, SuitabilityScore, suitability_score};
use crate::weather::OpenWeatherClient;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekendDay {
    #[default]
    Saturday,
    Sunday,
}

impl WeekendDay {
    fn days_from_monday(self) -> u32 {
        match self {
            WeekendDay::Saturday => 5,
            WeekendDay::Sunday => 6,
        }
    }
}

impl FromStr for WeekendDay {
    type Err = AstrocastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "saturday" | "sat" => Ok(WeekendDay::Saturday),
            "sunday" | "sun" => Ok(WeekendDay::Sunday),
            other => Err(AstrocastError::validation(format!(
                "Unknown weekend day '{other}', expected saturday or sunday"
            ))),
        }
    }
}

impl fmt::Display for WeekendDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekendDay::Saturday => f.write_str("Saturday"),
            WeekendDay::Sunday => f.write_str("Sunday"),
        }
    }
}

/// The next `day` on or after `today`
#[must_use]
pub fn next_weekend_day(today: NaiveDate, day: WeekendDay) -> NaiveDate {
    let delta = (day.days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    today + Duration::days(i64::from(delta))
}

/// One scored city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRow {
    pub city: String,
    pub condition: String,
    pub score: SuitabilityScore,
    /// Chance of rain in percent
    pub rain_probability_pct: f64,
    pub temp_c: f64,
    pub humidity_pct: f64,
    pub wind_ms: f64,
    pub rain_mm: f64,
    pub used_date: NaiveDate,
    pub substituted: bool,
}

/// A city that could not be scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityFailure {
    pub city: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub target_date: NaiveDate,
    pub day: WeekendDay,
    /// Best score first
    pub rows: Vec<CityRow>,
    pub failures: Vec<CityFailure>,
    pub ai_summary: Option<String>,
}

impl Comparison {
    #[must_use]
    pub fn leader(&self) -> Option<&CityRow> {
        self.rows.first()
    }

    /// "City→date" for every city scored on a substitute date
    #[must_use]
    pub fn substitutions(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter(|row| row.substituted)
            .map(|row| format!("{}→{}", row.city, row.used_date))
            .collect()
    }

    /// Rows as CSV, in ranking order
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(
            "City,Cond,Score,RainProb(%),Temp(°C),Humidity(%),Wind(m/s),Rain(mm),Suggestion\n",
        );
        for row in &self.rows {
            csv.push_str(&format!(
                "{},{},{},{:.0},{:.1},{:.0},{:.1},{:.1},{}\n",
                row.city,
                row.condition,
                row.score.score,
                row.rain_probability_pct,
                row.temp_c,
                row.humidity_pct,
                row.wind_ms,
                row.rain_mm,
                row.score.suggestion
            ));
        }
        csv
    }
}

/// Capitalise each word
fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Sort best score first; equal scores keep their input order
pub fn rank(rows: &mut [CityRow]) {
    rows.sort_by(|a, b| b.score.score.cmp(&a.score.score));
}

async fn score_city(
    weather: &OpenWeatherClient,
    power: &PowerClient,
    city: &str,
    target: NaiveDate,
) -> Result<CityRow, String> {
    let city = city.trim();
    if city.is_empty() {
        return Err("Empty city".to_string());
    }

    let forecast = weather
        .forecast_by_city(city)
        .await
        .map_err(|e| format!("Forecast error: {}", crate::error::user_message(&e)))?;

    let (daily, used_date, substituted) = process_forecast_with_fallback(&forecast, target);
    let daily = daily.ok_or_else(|| "No forecast data in window".to_string())?;

    let climate_mean = match power
        .monthly_average(
            forecast.location.latitude,
            forecast.location.longitude,
            used_date.year(),
            used_date.month(),
        )
        .await
    {
        Ok(average) => average.avg_temperature_c,
        Err(e) => {
            warn!("No climatology for {}: {}", city, e);
            None
        }
    };

    let inputs = ScoreInputs::from_daily(&daily, climate_mean);
    Ok(CityRow {
        city: title_case(city),
        condition: daily.condition_label(),
        score: suitability_score(&inputs),
        rain_probability_pct: daily.rain_probability() * 100.0,
        temp_c: daily.avg_temp_c,
        humidity_pct: daily.avg_humidity_pct,
        wind_ms: daily.avg_wind_ms,
        rain_mm: daily.total_rain_mm,
        used_date,
        substituted,
    })
}

/// Score every city for the next `day`, concurrently
pub async fn compare_cities(
    weather: &OpenWeatherClient,
    power: &PowerClient,
    ai: Option<&AiAssistant>,
    cities: &[String],
    today: NaiveDate,
    day: WeekendDay,
) -> Comparison {
    let target_date = next_weekend_day(today, day);
    info!("Comparing {} cities for {} ({})", cities.len(), target_date, day);

    let results = join_all(
        cities
            .iter()
            .map(|city| async move { (city.clone(), score_city(weather, power, city, target_date).await) }),
    )
    .await;

    let mut rows = Vec::new();
    let mut failures = Vec::new();
    for (city, result) in results {
        match result {
            Ok(row) => rows.push(row),
            Err(reason) => failures.push(CityFailure { city, reason }),
        }
    }
    rank(&mut rows);

    let mut comparison = Comparison {
        target_date,
        day,
        rows,
        failures,
        ai_summary: None,
    };

    if let Some(ai) = ai.filter(|ai| ai.is_configured())
        && !comparison.rows.is_empty()
    {
        let prompt = prompts::comparison_prompt(&comparison.to_csv());
        comparison.ai_summary = Some(ai.answer_question(prompts::COMPARISON_QUESTION, &prompt).await);
    }

    comparison
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Suitability;
    use rstest::rstest;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    // 2025-10-01 is a Wednesday
    #[rstest]
    #[case("2025-10-01", WeekendDay::Saturday, "2025-10-04")]
    #[case("2025-10-01", WeekendDay::Sunday, "2025-10-05")]
    #[case("2025-10-04", WeekendDay::Saturday, "2025-10-04")]
    #[case("2025-10-05", WeekendDay::Saturday, "2025-10-11")]
    #[case("2025-10-05", WeekendDay::Sunday, "2025-10-05")]
    fn test_next_weekend_day(#[case] today: &str, #[case] day: WeekendDay, #[case] expected: &str) {
        assert_eq!(next_weekend_day(date(today), day), date(expected));
    }

    #[test]
    fn test_weekend_day_parsing() {
        assert_eq!("Sunday".parse::<WeekendDay>().unwrap(), WeekendDay::Sunday);
        assert_eq!("sat".parse::<WeekendDay>().unwrap(), WeekendDay::Saturday);
        assert!("friday".parse::<WeekendDay>().is_err());
    }

    fn row(city: &str, score: u8, substituted: bool) -> CityRow {
        CityRow {
            city: city.to_string(),
            condition: "☀️ Clear".to_string(),
            score: SuitabilityScore {
                score,
                class: Suitability::from_score(score),
                message: Suitability::from_score(score).message().to_string(),
                suggestion: "Great for outdoor events 🎶🎉".to_string(),
            },
            rain_probability_pct: 0.0,
            temp_c: 25.04,
            humidity_pct: 48.6,
            wind_ms: 3.24,
            rain_mm: 0.0,
            used_date: date("2025-10-04"),
            substituted,
        }
    }

    #[test]
    fn test_rank_leader_and_substitutions() {
        let mut rows = vec![row("Pune", 64, false), row("Goa", 91, true), row("Agra", 64, false)];
        rank(&mut rows);
        let names: Vec<&str> = rows.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(names, vec!["Goa", "Pune", "Agra"]);

        let comparison = Comparison {
            target_date: date("2025-10-04"),
            day: WeekendDay::Saturday,
            rows,
            failures: vec![],
            ai_summary: None,
        };
        assert_eq!(comparison.leader().unwrap().city, "Goa");
        assert_eq!(comparison.substitutions(), vec!["Goa→2025-10-04".to_string()]);

        let csv = comparison.to_csv();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("City,Cond,Score,RainProb(%),Temp(°C),Humidity(%),Wind(m/s),Rain(mm),Suggestion")
        );
        assert_eq!(lines.next(), Some("Goa,☀️ Clear,91,0,25.0,49,3.2,0.0,Great for outdoor events 🎶🎉"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("new DELHI"), "New Delhi");
        assert_eq!(title_case("  paris "), "Paris");
    }
}

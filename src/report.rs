//! Report types produced by the planner and their terminal rendering
//!
//! Every report is `Serialize` for `--json` and the HTTP API; `Display`
//! gives the plain text tables printed by the CLI.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::ai::AiHealth;
use crate::climate::ClimateInsight;
use crate::compare::Comparison;
use crate::map::{MapLayer, PointReport};
use crate::models::{AirQuality, ClimatologyAverage, DailyWeather, Location};
use crate::scoring::SuitabilityScore;

/// Forecast, climate, air quality and score for one city and date
#[derive(Debug, Clone, Serialize)]
pub struct EventReport {
    pub location: Location,
    pub requested_date: NaiveDate,
    /// Date the forecast figures come from
    pub used_date: NaiveDate,
    pub substituted: bool,
    pub daily: Option<DailyWeather>,
    pub score: SuitabilityScore,
    pub climatology: Option<ClimatologyAverage>,
    pub air_quality: Option<AirQuality>,
    pub outlook: Vec<DailyWeather>,
    pub ai_summary: Option<String>,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryReport {
    pub location: Location,
    pub average: ClimatologyAverage,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClimateReport {
    pub insight: ClimateInsight,
    pub ai_commentary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollutionReport {
    pub query: String,
    pub location: Option<Location>,
    pub air_quality: Option<AirQuality>,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskReport {
    pub question: String,
    pub city: Option<String>,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub version: String,
    pub weather_configured: bool,
    pub cache_enabled: bool,
    pub ai: AiHealth,
}

/// Map overlays for a date
#[derive(Debug, Clone, Serialize)]
pub struct LayerList {
    pub date: NaiveDate,
    pub layers: Vec<MapLayer>,
}

fn opt(value: Option<f64>, precision: usize, unit: &str) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.precision$}{unit}"))
}

fn write_notices(f: &mut fmt::Formatter<'_>, notices: &[String]) -> fmt::Result {
    for notice in notices {
        writeln!(f, "  ℹ️  {notice}")?;
    }
    Ok(())
}

fn write_outlook(f: &mut fmt::Formatter<'_>, outlook: &[DailyWeather]) -> fmt::Result {
    writeln!(f, "\n📅 5-Day Weather Forecast")?;
    writeln!(
        f,
        "  {:<12} {:<22} {:>8} {:>9} {:>9} {:>9}",
        "Date", "Condition", "Temp", "Humidity", "Wind", "Rain"
    )?;
    for day in outlook {
        writeln!(
            f,
            "  {:<12} {:<22} {:>6.1}°C {:>8.0}% {:>5.1}m/s {:>7.1}mm",
            day.date.to_string(),
            day.condition_label(),
            day.avg_temp_c,
            day.avg_humidity_pct,
            day.avg_wind_ms,
            day.total_rain_mm
        )?;
    }
    Ok(())
}

impl fmt::Display for EventReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "🎪 Will it rain on my parade? {} on {}", self.location, self.requested_date)?;
        if self.substituted {
            writeln!(
                f,
                "  Forecast for {} not available, showing nearest day {}",
                self.requested_date, self.used_date
            )?;
        }

        if let Some(day) = &self.daily {
            writeln!(f, "\n{}  {}", day.condition_label(), day.condition_description)?;
            writeln!(f, "  Temperature: {:.1}°C", day.avg_temp_c)?;
            writeln!(f, "  Humidity:    {:.0}%", day.avg_humidity_pct)?;
            writeln!(f, "  Wind:        {:.1} m/s", day.avg_wind_ms)?;
            writeln!(f, "  Rain:        {:.1} mm ({:.0}% chance)", day.total_rain_mm, day.rain_probability() * 100.0)?;
        }

        writeln!(f, "\n🎯 Parade score: {}/100  {}", self.score.score, self.score.message)?;
        writeln!(f, "  {}", self.score.suggestion)?;

        if let Some(climate) = &self.climatology {
            writeln!(
                f,
                "\n📚 NASA POWER {}-{:02}: rainfall {} / temperature {}",
                climate.year,
                climate.month,
                opt(climate.avg_rainfall_mm, 2, " mm/day"),
                opt(climate.avg_temperature_c, 1, "°C")
            )?;
        }

        if let Some(aq) = &self.air_quality {
            writeln!(f, "\n🌫️ Air quality: AQI {} ({})", aq.aqi, aq.aqi_label())?;
        }

        if let Some(summary) = &self.ai_summary {
            writeln!(f, "\n🤖 {summary}")?;
        }

        if !self.outlook.is_empty() {
            write_outlook(f, &self.outlook)?;
        }

        if !self.notices.is_empty() {
            writeln!(f)?;
            write_notices(f, &self.notices)?;
        }
        Ok(())
    }
}

impl fmt::Display for HistoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.average;
        writeln!(f, "📚 Historical averages for {} in {}-{:02}:", self.location, a.year, a.month)?;
        writeln!(f, "  Avg rainfall:    {}", opt(a.avg_rainfall_mm, 2, " mm/day"))?;
        writeln!(f, "  Avg temperature: {}", opt(a.avg_temperature_c, 1, "°C"))
    }
}

impl fmt::Display for ClimateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let i = &self.insight;
        writeln!(f, "🌍 Climate Change Insight – {} (month {})", i.location.name, i.month)?;
        writeln!(
            f,
            "  {:<12} {:>10} {:>14} {:>10}",
            "Period", "Years", "Rain (mm/day)", "Temp (°C)"
        )?;
        for (label, period) in [("Historical", &i.historical), ("Recent", &i.recent)] {
            writeln!(
                f,
                "  {:<12} {:>10} {:>14.2} {:>10.1}",
                label,
                period.span.to_string(),
                period.avg_rainfall_mm,
                period.avg_temperature_c
            )?;
        }
        writeln!(f, "  Rain Δ {:+.2} mm/day ({:+.1}%)", i.rain_delta_mm, i.rain_delta_pct)?;
        writeln!(f, "  Temp Δ {:+.1} °C ({:+.1}%)", i.temp_delta_c, i.temp_delta_pct)?;
        writeln!(f, "  {}", i.rain_note)?;
        writeln!(f, "  {}", i.temp_note)?;
        writeln!(
            f,
            "  Data confidence: {} ({}/{} and {}/{} years)",
            i.confidence,
            i.historical.years_found,
            i.historical.years_expected,
            i.recent.years_found,
            i.recent.years_expected
        )?;

        writeln!(f, "\n  {:<6} {:>14} {:>10}", "Year", i.chart.left_axis, i.chart.right_axis)?;
        for (idx, year) in i.chart.years.iter().enumerate() {
            writeln!(
                f,
                "  {:<6} {:>14} {:>10}",
                year,
                opt(i.chart.rainfall_mm[idx], 2, ""),
                opt(i.chart.temperature_c[idx], 1, "")
            )?;
        }

        if let Some(commentary) = &self.ai_commentary {
            writeln!(f, "\n🤖 {commentary}")?;
        }
        Ok(())
    }
}

impl fmt::Display for PollutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.location, &self.air_quality) {
            (Some(location), Some(aq)) => {
                writeln!(f, "🌫️ Air quality in {}: AQI {} ({})", location, aq.aqi, aq.aqi_label())?;
                for (name, value) in aq.rows() {
                    writeln!(f, "  {name:<6} {value:>9.2} μg/m³")?;
                }
            }
            _ => writeln!(f, "🌫️ No air quality data for {}", self.query)?,
        }
        write_notices(f, &self.notices)
    }
}

impl fmt::Display for AskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.city {
            Some(city) => writeln!(f, "❓ {} ({city})", self.question)?,
            None => writeln!(f, "❓ {}", self.question)?,
        }
        writeln!(f, "🤖 {}", self.answer)
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Astrocast {}", self.version)?;
        writeln!(
            f,
            "  OpenWeatherMap: {}",
            if self.weather_configured { "configured" } else { "missing key" }
        )?;
        writeln!(f, "  Cache:          {}", if self.cache_enabled { "enabled" } else { "disabled" })?;
        let provider = self.ai.provider.as_deref().unwrap_or("none");
        if self.ai.ok {
            writeln!(
                f,
                "  AI:             {provider} OK (model {})",
                self.ai.model.as_deref().unwrap_or("?")
            )?;
        } else {
            writeln!(
                f,
                "  AI:             {provider} FAIL: {}",
                self.ai.error.as_deref().unwrap_or("unknown error")
            )?;
        }
        for error in &self.ai.recent_errors {
            writeln!(f, "    - {error}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "🏙️ City comparison for {} {}", self.day, self.target_date)?;
        writeln!(
            f,
            "  {:<16} {:>5} {:>6} {:>8} {:>6} {:>7} {:>6}  {}",
            "City", "Score", "Rain%", "Temp", "Hum%", "Wind", "Rain", "Cond"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "  {:<16} {:>5} {:>6.0} {:>6.1}°C {:>6.0} {:>7.1} {:>6.1}  {}",
                row.city,
                row.score.score,
                row.rain_probability_pct,
                row.temp_c,
                row.humidity_pct,
                row.wind_ms,
                row.rain_mm,
                row.condition
            )?;
        }

        if let Some(leader) = self.leader() {
            writeln!(
                f,
                "\n🏆 Best city: {} • Score {}/100 – {}",
                leader.city, leader.score.score, leader.score.suggestion
            )?;
        }
        let substitutions = self.substitutions();
        if !substitutions.is_empty() {
            writeln!(
                f,
                "  Forecast fallback used (nearest available date): {}",
                substitutions.join(", ")
            )?;
        }
        for failure in &self.failures {
            writeln!(f, "  ⚠️ {}: {}", failure.city, failure.reason)?;
        }
        if let Some(summary) = &self.ai_summary {
            writeln!(f, "\n🤖 {summary}")?;
        }
        Ok(())
    }
}

impl fmt::Display for PointReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "📍 Pin Location: {} — {} ({})",
            self.location.format_coordinates(),
            self.location.name,
            self.date
        )?;
        if let Some(nasa) = &self.nasa {
            writeln!(f, "  [NASA POWER]")?;
            writeln!(f, "  🌡 Temperature: {:.1} °C", nasa.temperature_c)?;
            writeln!(f, "  🌬 Wind Speed:  {:.1} m/s", nasa.wind_speed_ms)?;
            writeln!(f, "  💧 Humidity:    {:.0} %", nasa.humidity_pct)?;
        }
        if let Some(day) = &self.forecast {
            writeln!(f, "  [OpenWeatherMap]")?;
            writeln!(f, "  🌡 Temperature: {:.1} °C", day.avg_temp_c)?;
            writeln!(f, "  🌬 Wind:        {:.1} m/s", day.avg_wind_ms)?;
            writeln!(f, "  💧 Humidity:    {:.0}%", day.avg_humidity_pct)?;
            writeln!(f, "  🌧 Rain:        {:.1} mm", day.total_rain_mm)?;
        }
        if let Some(tile) = &self.preview_tile {
            writeln!(f, "  🛰 Satellite: {tile}")?;
        }
        if let Some(summary) = &self.ai_summary {
            writeln!(f, "  🤖 {summary}")?;
        }
        write_notices(f, &self.notices)
    }
}

impl fmt::Display for LayerList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "🛰️ NASA GIBS layers for {}", self.date)?;
        for layer in &self.layers {
            writeln!(f, "  {} (zoom {}-{})", layer.title, layer.min_zoom, layer.max_zoom)?;
            writeln!(f, "    {}", layer.tile_url)?;
        }
        Ok(())
    }
}

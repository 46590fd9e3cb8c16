//! Climate change insight: compare a month's climatology across two periods

use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AstrocastError;
use crate::climatology::PowerClient;
use crate::models::{ClimatologyAverage, Location};

/// Default historical period
pub const DEFAULT_HISTORICAL: YearSpan = YearSpan { start: 1985, end: 2000 };
/// Default recent period
pub const DEFAULT_RECENT: YearSpan = YearSpan { start: 2015, end: 2025 };

const INSUFFICIENT: &str = "Climate data not sufficient for comparison.";

/// Earliest year accepted for a period
pub const MIN_YEAR: i32 = 1950;
/// Latest year accepted for a period
pub const MAX_YEAR: i32 = 2090;

/// Inclusive range of years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearSpan {
    pub start: i32,
    pub end: i32,
}

impl YearSpan {
    #[must_use]
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Number of years covered
    #[must_use]
    pub fn len(&self) -> usize {
        usize::try_from(i64::from(self.end) - i64::from(self.start) + 1).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn validate(&self, name: &str) -> Result<()> {
        let years = MIN_YEAR..=MAX_YEAR;
        if !years.contains(&self.start) || !years.contains(&self.end) {
            return Err(AstrocastError::validation(format!(
                "{name} years must be within {MIN_YEAR}-{MAX_YEAR}, got {self}"
            ))
            .into());
        }
        if self.start > self.end {
            return Err(AstrocastError::validation(format!("{name} start must be <= end")).into());
        }
        if self.end - self.start < 4 {
            return Err(AstrocastError::validation(format!("{name} span must be at least 5 years")).into());
        }
        Ok(())
    }
}

impl fmt::Display for YearSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.start, self.end)
    }
}

/// Check both periods and that the recent one starts after the historical one ends
pub fn validate_periods(historical: YearSpan, recent: YearSpan) -> Result<()> {
    historical.validate("Historical")?;
    recent.validate("Recent")?;
    if recent.start <= historical.end {
        return Err(AstrocastError::validation(
            "Recent period should start after historical period ends to avoid overlap",
        )
        .into());
    }
    Ok(())
}

/// How much of the requested data was actually available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Moderate,
    Low,
}

impl Confidence {
    #[must_use]
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.8 {
            Confidence::High
        } else if ratio >= 0.5 {
            Confidence::Moderate
        } else {
            Confidence::Low
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::High => "High",
            Confidence::Moderate => "Moderate",
            Confidence::Low => "Low",
        };
        f.write_str(label)
    }
}

/// Means over one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub span: YearSpan,
    pub years_expected: usize,
    pub years_found: usize,
    /// Mean rainfall in mm/day
    pub avg_rainfall_mm: f64,
    pub avg_temperature_c: f64,
}

/// Yearly series for a dual-axis chart: rainfall bars on the left axis, temperature line on the right
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimateChart {
    pub years: Vec<i32>,
    pub rainfall_mm: Vec<Option<f64>>,
    pub temperature_c: Vec<Option<f64>>,
    pub left_axis: String,
    pub right_axis: String,
}

impl ClimateChart {
    /// Union of both periods, one point per year in ascending order
    #[must_use]
    pub fn from_points(historical: &[ClimatologyAverage], recent: &[ClimatologyAverage]) -> Self {
        let mut points: Vec<&ClimatologyAverage> = historical.iter().chain(recent).collect();
        points.sort_by_key(|p| p.year);
        points.dedup_by_key(|p| p.year);

        Self {
            years: points.iter().map(|p| p.year).collect(),
            rainfall_mm: points.iter().map(|p| p.avg_rainfall_mm).collect(),
            temperature_c: points.iter().map(|p| p.avg_temperature_c).collect(),
            left_axis: "Rainfall (mm/day)".to_string(),
            right_axis: "Temperature (°C)".to_string(),
        }
    }

    /// Last `rows` points as `Year,Rainfall(mm/day),Temp(°C)` CSV
    #[must_use]
    pub fn tail_csv(&self, rows: usize) -> String {
        let skip = self.years.len().saturating_sub(rows);
        let cell = |v: Option<f64>| v.map(|x| format!("{x:.2}")).unwrap_or_default();
        let mut csv = String::from("Year,Rainfall(mm/day),Temp(°C)\n");
        for i in skip..self.years.len() {
            csv.push_str(&format!(
                "{},{},{}\n",
                self.years[i],
                cell(self.rainfall_mm[i]),
                cell(self.temperature_c[i])
            ));
        }
        csv
    }
}

/// Outcome of a climate comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateInsight {
    pub location: Location,
    pub month: u32,
    pub historical: PeriodSummary,
    pub recent: PeriodSummary,
    pub rain_delta_mm: f64,
    pub rain_delta_pct: f64,
    pub temp_delta_c: f64,
    pub temp_delta_pct: f64,
    pub rain_note: String,
    pub temp_note: String,
    pub confidence: Confidence,
    pub chart: ClimateChart,
}

fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let valid: Vec<f64> = values.flatten().collect();
    if valid.is_empty() {
        None
    } else {
        Some(valid.iter().sum::<f64>() / valid.len() as f64)
    }
}

fn summarize(span: YearSpan, points: &[ClimatologyAverage]) -> Option<PeriodSummary> {
    Some(PeriodSummary {
        span,
        years_expected: span.len(),
        years_found: points.len(),
        avg_rainfall_mm: mean(points.iter().map(|p| p.avg_rainfall_mm))?,
        avg_temperature_c: mean(points.iter().map(|p| p.avg_temperature_c))?,
    })
}

/// Delta as a percentage of `base`; 0 when the base is 0
fn percent_of(delta: f64, base: f64) -> f64 {
    if base == 0.0 { 0.0 } else { delta / base * 100.0 }
}

#[must_use]
pub fn rain_note(ratio: f64) -> String {
    if ratio > 0.5 {
        format!("🚨 Rainfall increased by {:.0}%; higher precipitation risk for events.", ratio * 100.0)
    } else if ratio < -0.2 {
        format!("🌿 Rainfall decreased by {:.0}%; slightly lower rain risk.", ratio.abs() * 100.0)
    } else {
        "✅ Rainfall change is moderate.".to_string()
    }
}

#[must_use]
pub fn temp_note(delta: f64) -> String {
    if delta > 1.5 {
        format!("🔥 Temp up {delta:.1}°C – added heat stress potential.")
    } else if delta < -1.0 {
        format!("❄️ Temp down {:.1}°C – cooler conditions trend.", delta.abs())
    } else {
        "🌡️ Temperature shift modest.".to_string()
    }
}

/// Build the insight from already fetched yearly points
pub fn build_insight(
    location: Location,
    month: u32,
    historical_span: YearSpan,
    recent_span: YearSpan,
    historical_points: &[ClimatologyAverage],
    recent_points: &[ClimatologyAverage],
) -> Result<ClimateInsight> {
    let (Some(historical), Some(recent)) = (
        summarize(historical_span, historical_points),
        summarize(recent_span, recent_points),
    ) else {
        return Err(AstrocastError::general(INSUFFICIENT).into());
    };

    let rain_delta_mm = recent.avg_rainfall_mm - historical.avg_rainfall_mm;
    let temp_delta_c = recent.avg_temperature_c - historical.avg_temperature_c;
    let rain_delta_pct = percent_of(rain_delta_mm, historical.avg_rainfall_mm);
    let temp_delta_pct = percent_of(temp_delta_c, historical.avg_temperature_c);

    let ratio = |summary: &PeriodSummary| {
        if summary.years_expected == 0 {
            0.0
        } else {
            summary.years_found as f64 / summary.years_expected as f64
        }
    };
    let confidence = Confidence::from_ratio(ratio(&historical).min(ratio(&recent)));

    Ok(ClimateInsight {
        location,
        month,
        rain_note: rain_note(rain_delta_pct / 100.0),
        temp_note: temp_note(temp_delta_c),
        chart: ClimateChart::from_points(historical_points, recent_points),
        historical,
        recent,
        rain_delta_mm,
        rain_delta_pct,
        temp_delta_c,
        temp_delta_pct,
        confidence,
    })
}

/// Fetch both periods for `location` and compare them
pub async fn climate_insight(
    power: &PowerClient,
    location: Location,
    month: u32,
    historical: YearSpan,
    recent: YearSpan,
) -> Result<ClimateInsight> {
    if !(1..=12).contains(&month) {
        return Err(AstrocastError::validation(format!("Month must be 1-12, got {month}")).into());
    }
    validate_periods(historical, recent)?;

    let (historical_points, recent_points) = tokio::join!(
        power.yearly_averages(location.latitude, location.longitude, month, historical.start..=historical.end),
        power.yearly_averages(location.latitude, location.longitude, month, recent.start..=recent.end),
    );
    info!(
        "Climate data for {}: {}/{} historical years, {}/{} recent years",
        location.name,
        historical_points.len(),
        historical.len(),
        recent_points.len(),
        recent.len()
    );

    build_insight(location, month, historical, recent, &historical_points, &recent_points)
}

//! Prompt text for the generative providers

use serde::{Deserialize, Serialize};

/// Prompt used by the health probe
pub const HEALTH_PROMPT: &str = "Return the word OK";

/// Question sent along with the city comparison CSV
pub const COMPARISON_QUESTION: &str = "Which city is better and why?";

/// Question sent along with the climate trend prompt
pub const CLIMATE_QUESTION: &str = "Climate trend commentary";

const QA_BASE: &str = "You are a concise helpful weather assistant. Use only the factual data provided in context if present. \
If user asks for a forecast beyond available range (5 days) politely explain the limit.";

/// Weather figures a summary can mention; absent figures are left out of the prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherMetrics {
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub wind_ms: Option<f64>,
    pub rain_mm: Option<f64>,
}

/// Summary prompt, `None` when there is nothing to summarise
#[must_use]
pub fn summary_prompt(metrics: &WeatherMetrics) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(temp) = metrics.temperature_c {
        parts.push(format!("temperature {temp:.1}°C"));
    }
    if let Some(humidity) = metrics.humidity_pct {
        parts.push(format!("humidity {humidity:.0}%"));
    }
    if let Some(wind) = metrics.wind_ms {
        parts.push(format!("wind {wind:.1} m/s"));
    }
    if let Some(rain) = metrics.rain_mm {
        if rain > 0.0 {
            parts.push(format!("rain total ~{rain:.1} mm expected"));
        } else {
            parts.push("no rain expected".to_string());
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(format!(
        "Write a friendly 2 sentence summary highlighting {}. Keep it concise and helpful for planning an outdoor event.",
        parts.join(", ")
    ))
}

/// Free-form question with optional factual context
#[must_use]
pub fn question_prompt(question: &str, context: &str) -> String {
    format!("{QA_BASE}\nContext:\n{context}\n\nUser question: {question}\nAnswer:")
}

/// Wrap a question so the model sticks to the numbers in the JSON context
#[must_use]
pub fn strict_instruction(question: &str) -> String {
    format!(
        "You are a precise weather assistant. Use ONLY the numeric facts in the JSON context. \
If a value for a requested day (e.g., day+1 rain) is missing, state that it is unavailable. \
Provide concise sentences (<=120 words). Avoid speculation. User question: {question}"
    )
}

/// Context for comparing cities from CSV rows
#[must_use]
pub fn comparison_prompt(csv: &str) -> String {
    format!(
        "Compare these cities for a weekend outdoor parade and give pros and cons then a recommendation.\n{csv}"
    )
}

/// Figures behind a climate trend commentary
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateFacts<'a> {
    pub city: &'a str,
    pub month_name: &'a str,
    pub confidence: &'a str,
    pub rain_delta_mm: f64,
    pub rain_delta_pct: f64,
    pub temp_delta_c: f64,
    pub temp_delta_pct: f64,
    pub recent_label: &'a str,
    pub historical_label: &'a str,
    /// Last rows of the yearly series as CSV
    pub recent_rows_csv: &'a str,
}

/// Context for a short climate trend commentary
#[must_use]
pub fn climate_prompt(facts: &ClimateFacts<'_>) -> String {
    format!(
        "Provide a concise (<=120 words) climate trend commentary for {} for month {}. \
Highlight rainfall and temperature direction, magnitude (% and °C), and event planning implications. \
Data confidence is {}. Data (recent vs historical):\n\
Rain delta {:+.2} mm/day ({:+.1}%), Temp delta {:+.1} °C ({:+.1}%).\n\
Recent period {} vs historical {}.\nRecent tail data:\n{}",
        facts.city,
        facts.month_name,
        facts.confidence,
        facts.rain_delta_mm,
        facts.rain_delta_pct,
        facts.temp_delta_c,
        facts.temp_delta_pct,
        facts.recent_label,
        facts.historical_label,
        facts.recent_rows_csv
    )
}

//! JSON HTTP API over the planner

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::climate::{DEFAULT_HISTORICAL, DEFAULT_RECENT, YearSpan};
use crate::compare::{Comparison, WeekendDay};
use crate::error::user_message;
use crate::map::PointReport;
use crate::planner::Planner;
use crate::report::{AskReport, ClimateReport, EventReport, HealthReport, HistoryReport, LayerList, PollutionReport};
use crate::scoring::{ScoreInputs, SuitabilityScore, suitability_score};
use crate::{AstrocastError, ErrorCode};

pub type AppState = Arc<Planner>;

/// Error body `{ "error": <friendly message> }` with a status picked from the error kind
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        let kind = self
            .0
            .chain()
            .find_map(|cause| cause.downcast_ref::<AstrocastError>());
        match kind {
            Some(AstrocastError::Validation { .. }) => StatusCode::BAD_REQUEST,
            Some(err) if err.code() == Some(ErrorCode::ApiLocationNotFound) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {:#}", self.0);
        }
        (status, Json(json!({ "error": user_message(&self.0) }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/report", get(get_report))
        .route("/compare", get(get_compare))
        .route("/history", get(get_history))
        .route("/climate", get(get_climate))
        .route("/pollution", get(get_pollution))
        .route("/map/layers", get(get_layers))
        .route("/map/point", get(get_point))
        .route("/ask", post(post_ask))
        .route("/health", get(get_health))
        .route("/score", post(post_score))
        .with_state(state)
}

fn default_ai() -> bool {
    true
}

#[derive(Deserialize)]
struct ReportQuery {
    city: String,
    date: Option<NaiveDate>,
    #[serde(default = "default_ai")]
    ai: bool,
}

async fn get_report(State(planner): State<AppState>, Query(q): Query<ReportQuery>) -> ApiResult<EventReport> {
    let report = planner.report(&q.city, q.date.unwrap_or_else(today), q.ai).await?;
    Ok(Json(report))
}

#[derive(Deserialize)]
struct CompareQuery {
    /// Comma separated city names
    cities: String,
    #[serde(default)]
    day: WeekendDay,
    #[serde(default = "default_ai")]
    ai: bool,
}

async fn get_compare(State(planner): State<AppState>, Query(q): Query<CompareQuery>) -> ApiResult<Comparison> {
    let cities: Vec<String> = q
        .cities
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    let comparison = planner.compare(&cities, q.day, today(), q.ai).await?;
    Ok(Json(comparison))
}

#[derive(Deserialize)]
struct HistoryQuery {
    city: String,
    year: i32,
    month: u32,
}

async fn get_history(State(planner): State<AppState>, Query(q): Query<HistoryQuery>) -> ApiResult<HistoryReport> {
    Ok(Json(planner.history(&q.city, q.year, q.month).await?))
}

#[derive(Deserialize)]
struct ClimateQuery {
    city: String,
    month: Option<u32>,
    hist_start: Option<i32>,
    hist_end: Option<i32>,
    recent_start: Option<i32>,
    recent_end: Option<i32>,
    #[serde(default = "default_ai")]
    ai: bool,
}

async fn get_climate(State(planner): State<AppState>, Query(q): Query<ClimateQuery>) -> ApiResult<ClimateReport> {
    let month = q.month.unwrap_or_else(|| chrono::Datelike::month(&today()));
    let historical = YearSpan::new(
        q.hist_start.unwrap_or(DEFAULT_HISTORICAL.start),
        q.hist_end.unwrap_or(DEFAULT_HISTORICAL.end),
    );
    let recent = YearSpan::new(
        q.recent_start.unwrap_or(DEFAULT_RECENT.start),
        q.recent_end.unwrap_or(DEFAULT_RECENT.end),
    );
    Ok(Json(planner.climate(&q.city, month, historical, recent, q.ai).await?))
}

#[derive(Deserialize)]
struct CityQuery {
    city: String,
}

async fn get_pollution(State(planner): State<AppState>, Query(q): Query<CityQuery>) -> ApiResult<PollutionReport> {
    Ok(Json(planner.pollution(&q.city).await?))
}

#[derive(Deserialize)]
struct DateQuery {
    date: Option<NaiveDate>,
}

async fn get_layers(Query(q): Query<DateQuery>) -> Json<LayerList> {
    Json(Planner::layers(q.date.unwrap_or_else(today)))
}

#[derive(Deserialize)]
struct PointQuery {
    lat: f64,
    lon: f64,
    date: Option<NaiveDate>,
    #[serde(default = "default_ai")]
    ai: bool,
}

async fn get_point(State(planner): State<AppState>, Query(q): Query<PointQuery>) -> ApiResult<PointReport> {
    let report = planner
        .point(q.lat, q.lon, q.date.unwrap_or_else(today), q.ai)
        .await?;
    Ok(Json(report))
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    city: Option<String>,
}

async fn post_ask(State(planner): State<AppState>, Json(body): Json<AskRequest>) -> ApiResult<AskReport> {
    Ok(Json(planner.ask(&body.question, body.city.as_deref()).await?))
}

async fn get_health(State(planner): State<AppState>) -> Json<HealthReport> {
    Json(planner.health().await)
}

async fn post_score(Json(inputs): Json<ScoreInputs>) -> Json<SuitabilityScore> {
    Json(suitability_score(&inputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AstrocastConfig, Secrets};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        let mut config = AstrocastConfig::default();
        config.cache.enabled = false;
        let planner = Planner::with_secrets(&config, &Secrets::default()).unwrap();
        Router::new().nest("/api", router(Arc::new(planner)))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_score_endpoint() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/score")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"rain_probability":0.0,"temperature_c":26.0,"wind_speed_ms":2.0,"humidity_pct":50.0}"#,
            ))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["score"], 100);
        assert_eq!(body["class"], "safe");
        assert_eq!(body["message"], "Safe for parade 🎉");
    }

    #[tokio::test]
    async fn test_score_endpoint_missing_input_is_uncertain() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/score")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"rain_probability":0.2}"#))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["score"], 50);
        assert_eq!(body["class"], "uncertain");
    }

    #[tokio::test]
    async fn test_layers_endpoint() {
        let request = Request::builder()
            .uri("/api/map/layers?date=2025-10-04")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["date"], "2025-10-04");
        assert_eq!(body["layers"].as_array().unwrap().len(), 3);
        assert_eq!(body["layers"][0]["key"], "true_color");
    }

    #[tokio::test]
    async fn test_validation_errors_are_bad_request() {
        let request = Request::builder()
            .uri("/api/history?city=Paris&year=2020&month=13")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid input: Month must be 1-12, got 13");
    }

    #[tokio::test]
    async fn test_empty_city_is_bad_request() {
        let request = Request::builder()
            .uri("/api/pollution?city=%20")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_compare_without_key_lists_failures() {
        let request = Request::builder()
            .uri("/api/compare?cities=Paris,Rome&day=sunday&ai=false")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["day"], "sunday");
        assert_eq!(body["rows"].as_array().unwrap().len(), 0);
        assert_eq!(body["failures"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_health_without_keys() {
        let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["weather_configured"], false);
        assert_eq!(body["cache_enabled"], false);
        assert_eq!(body["ai"]["configured"], false);
    }

    #[test]
    fn test_not_found_status() {
        let err = ApiError(AstrocastError::api("missing", ErrorCode::ApiLocationNotFound).into());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        let err = ApiError(AstrocastError::api("down", ErrorCode::ApiNetworkError).into());
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}

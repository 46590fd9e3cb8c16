//! NASA GIBS map layers and click-to-fetch point weather

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::AstrocastError;
use crate::aggregation::process_forecast;
use crate::ai::{AiAssistant, WeatherMetrics};
use crate::climatology::PowerClient;
use crate::geocoding::NominatimClient;
use crate::location_resolver::LocationResolver;
use crate::models::{DailyWeather, Location, PointWeather};
use crate::weather::OpenWeatherClient;

pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 9;
/// Zoom of the true colour preview attached to a pin
pub const PREVIEW_ZOOM: u8 = 6;
/// Web Mercator latitude limit
const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

const GIBS_BASE: &str = "https://gibs.earthdata.nasa.gov/wmts/epsg3857/best";
const TILE_MATRIX_SET: &str = "GoogleMapsCompatible_Level9";

/// (key, title, GIBS layer identifier, tile extension)
const LAYERS: [(&str, &str, &str, &str); 3] = [
    ("true_color", "True Color", "MODIS_Terra_CorrectedReflectance_TrueColor", "jpg"),
    ("cloud_fraction", "Cloud Fraction", "MODIS_Terra_Cloud_Fraction_Day", "png"),
    ("surface_temperature", "Surface Temp", "MERRA2_Surface_Temperature", "png"),
];

/// One WMTS overlay with `{z}/{y}/{x}` placeholders left in the URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapLayer {
    pub key: String,
    pub title: String,
    pub layer: String,
    pub tile_url: String,
    pub attribution: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

#[must_use]
pub fn gibs_layers(date: NaiveDate) -> Vec<MapLayer> {
    let date = date.format("%Y-%m-%d");
    LAYERS
        .iter()
        .map(|(key, title, layer, ext)| MapLayer {
            key: (*key).to_string(),
            title: (*title).to_string(),
            layer: (*layer).to_string(),
            tile_url: format!("{GIBS_BASE}/{layer}/default/{date}/{TILE_MATRIX_SET}/{{z}}/{{y}}/{{x}}.{ext}"),
            attribution: format!("NASA GIBS - {title}"),
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        })
        .collect()
}

/// A concrete tile URL; zoom is clamped to the supported range
#[must_use]
pub fn tile_url(layer: &MapLayer, z: u8, x: u32, y: u32) -> String {
    let z = z.clamp(layer.min_zoom, layer.max_zoom);
    layer
        .tile_url
        .replace("{z}", &z.to_string())
        .replace("{y}", &y.to_string())
        .replace("{x}", &x.to_string())
}

/// Web Mercator tile `(x, y)` containing a coordinate at zoom `z`
#[must_use]
pub fn tile_for(lat: f64, lon: f64, z: u8) -> (u32, u32) {
    let n = f64::from(1u32 << z);
    let max_index = n - 1.0;
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();

    let x = ((lon + 180.0) / 360.0 * n).floor().clamp(0.0, max_index);
    let y = ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * n)
        .floor()
        .clamp(0.0, max_index);
    (x as u32, y as u32)
}

/// True colour tile around the pin for `date`
#[must_use]
pub fn preview_tile(lat: f64, lon: f64, date: NaiveDate) -> Option<String> {
    let layer = gibs_layers(date).into_iter().next()?;
    let z = PREVIEW_ZOOM.clamp(layer.min_zoom, layer.max_zoom);
    let (x, y) = tile_for(lat, lon, z);
    Some(tile_url(&layer, z, x, y))
}

/// Everything shown for a pinned map location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointReport {
    pub location: Location,
    pub date: NaiveDate,
    /// NASA POWER values for the day
    pub nasa: Option<PointWeather>,
    /// OpenWeatherMap aggregate for the day, when a key is configured
    pub forecast: Option<DailyWeather>,
    /// Satellite tile containing the pin
    pub preview_tile: Option<String>,
    pub ai_summary: Option<String>,
    pub notices: Vec<String>,
}

pub fn validate_coordinates(lat: f64, lon: f64) -> crate::Result<()> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(AstrocastError::validation(format!(
            "Coordinates out of range: {lat}, {lon}"
        )));
    }
    Ok(())
}

/// Reverse geocode the pin, read NASA POWER and the forecast for `date` and summarise
pub async fn point_lookup(
    geocoder: &NominatimClient,
    power: &PowerClient,
    weather: &OpenWeatherClient,
    ai: Option<&AiAssistant>,
    lat: f64,
    lon: f64,
    date: NaiveDate,
) -> anyhow::Result<PointReport> {
    validate_coordinates(lat, lon)?;

    let forecast_task = async {
        if !weather.is_configured() {
            return None;
        }
        match weather.forecast_by_coordinates(lat, lon).await {
            Ok(forecast) => process_forecast(&forecast, date),
            Err(e) => {
                warn!("Forecast for map pin failed: {}", e);
                None
            }
        }
    };

    let (location, nasa, forecast) = tokio::join!(
        LocationResolver::resolve_coordinates(geocoder, lat, lon),
        power.point_weather(lat, lon, date),
        forecast_task,
    );
    info!("Map pin at {} resolved to {}", location.format_coordinates(), location.name);

    let mut notices = Vec::new();
    if nasa.is_none() {
        notices.push("No valid NASA POWER data for this location/date.".to_string());
    }
    if !weather.is_configured() {
        notices.push(crate::weather::MISSING_KEY_NOTICE.to_string());
    }

    let ai_summary = match (ai, &nasa) {
        (Some(ai), Some(point)) if ai.is_configured() => Some(
            ai.summarize_weather(&WeatherMetrics {
                temperature_c: Some(point.temperature_c),
                humidity_pct: Some(point.humidity_pct),
                wind_ms: Some(point.wind_speed_ms),
                rain_mm: None,
            })
            .await,
        ),
        (Some(ai), _) if !ai.is_configured() => {
            notices.push(crate::ai::NOT_CONFIGURED.to_string());
            None
        }
        _ => None,
    };

    Ok(PointReport {
        location,
        date,
        nasa,
        forecast,
        preview_tile: preview_tile(lat, lon, date),
        ai_summary,
        notices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 4).unwrap()
    }

    #[test]
    fn test_gibs_layers() {
        let layers = gibs_layers(date());
        assert_eq!(layers.len(), 3);
        assert_eq!(
            layers[0].tile_url,
            "https://gibs.earthdata.nasa.gov/wmts/epsg3857/best/MODIS_Terra_CorrectedReflectance_TrueColor/default/2025-10-04/GoogleMapsCompatible_Level9/{z}/{y}/{x}.jpg"
        );
        assert!(layers[1].tile_url.ends_with(".png"));
        assert_eq!(layers[2].attribution, "NASA GIBS - Surface Temp");
        assert!(layers.iter().all(|l| l.min_zoom == 1 && l.max_zoom == 9));
    }

    #[test]
    fn test_tile_url_clamps_zoom() {
        let layer = &gibs_layers(date())[1];
        let url = tile_url(layer, 12, 3, 5);
        assert!(url.ends_with("/GoogleMapsCompatible_Level9/9/5/3.png"));
        let url = tile_url(layer, 0, 0, 0);
        assert!(url.ends_with("/1/0/0.png"));
    }

    #[rstest]
    #[case(0.0, 0.0, 1, (1, 1))]
    #[case(28.61, 77.21, 6, (45, 26))]
    #[case(-33.87, 151.21, 6, (58, 38))]
    #[case(48.8566, 2.3522, 9, (259, 176))]
    #[case(90.0, 180.0, 3, (7, 0))]
    #[case(-90.0, -180.0, 3, (0, 7))]
    fn test_tile_for(#[case] lat: f64, #[case] lon: f64, #[case] z: u8, #[case] expected: (u32, u32)) {
        assert_eq!(tile_for(lat, lon, z), expected);
    }

    #[test]
    fn test_preview_tile_is_true_color_at_preview_zoom() {
        let url = preview_tile(28.61, 77.21, date()).unwrap();
        assert_eq!(
            url,
            "https://gibs.earthdata.nasa.gov/wmts/epsg3857/best/MODIS_Terra_CorrectedReflectance_TrueColor/default/2025-10-04/GoogleMapsCompatible_Level9/6/26/45.jpg"
        );
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(48.85, 2.35).is_ok());
        assert!(validate_coordinates(91.0, 0.0).is_err());
        assert!(validate_coordinates(0.0, -181.0).is_err());
    }
}

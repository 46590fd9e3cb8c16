//! Configuration management for Astrocast
//!
//! Handles loading configuration from files and environment variables,
//! resolving API secrets, and validating all configuration settings.

use crate::AstrocastError;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Secret name for the OpenWeatherMap key (forecast, geocoding, air pollution)
pub const OPENWEATHER_API_KEY: &str = "OPENWEATHER_API_KEY";
/// Secret name for the OpenAI key
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Secret name for the Gemini key
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// Old or alternate names that are never read, paired with the name that replaced them
const LEGACY_SECRET_NAMES: [(&str, &str); 4] = [
    ("OPENWEATHERMAP_API_KEY", OPENWEATHER_API_KEY),
    ("OWM_API_KEY", OPENWEATHER_API_KEY),
    ("OPENAI_KEY", OPENAI_API_KEY),
    ("GOOGLE_API_KEY", GEMINI_API_KEY),
];

/// Root configuration structure for Astrocast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstrocastConfig {
    /// OpenWeatherMap configuration
    #[serde(default)]
    pub weather: WeatherConfig,
    /// NASA POWER configuration
    #[serde(default)]
    pub climatology: ClimatologyConfig,
    /// Nominatim geocoding configuration
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Generative text configuration
    #[serde(default)]
    pub ai: AiConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Optional TOML file holding API keys
    #[serde(default)]
    pub secrets_file: Option<String>,
}

/// OpenWeatherMap API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL for the forecast and air pollution endpoints
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// Base URL for the direct geocoding endpoint
    #[serde(default = "default_weather_base_url")]
    pub geo_base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for failed requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// NASA POWER configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClimatologyConfig {
    /// Daily point endpoint
    #[serde(default = "default_climatology_base_url")]
    pub base_url: String,
    /// NASA POWER user community (RE, AG or SB)
    #[serde(default = "default_climatology_community")]
    pub community: String,
    /// Request timeout in seconds
    #[serde(default = "default_climatology_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of years fetched at once for climate insight
    #[serde(default = "default_climatology_concurrency")]
    pub max_concurrent_years: usize,
}

/// Nominatim geocoding configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Nominatim base URL
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    /// User agent required by the Nominatim usage policy
    #[serde(default = "default_geocoding_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds
    #[serde(default = "default_geocoding_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base of the exponential backoff in milliseconds
    #[serde(default = "default_geocoding_backoff_ms")]
    pub backoff_base_ms: u64,
}

/// Generative text configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Provider selection: auto, openai, gemini or none
    #[serde(default = "default_ai_provider")]
    pub provider: String,
    /// OpenAI API base URL
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    /// Gemini API base URL
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    /// Preferred OpenAI model, tried before the fallback list
    #[serde(default)]
    pub openai_model: Option<String>,
    /// Preferred Gemini model, tried before the fallback list
    #[serde(default)]
    pub gemini_model: Option<String>,
    /// Token budget for short summaries
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,
    /// Token budget for question answers
    #[serde(default = "default_answer_max_tokens")]
    pub answer_max_tokens: u32,
    /// Request timeout in seconds
    #[serde(default = "default_ai_timeout")]
    pub timeout_seconds: u32,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether responses are cached on disk
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Cache directory location
    #[serde(default = "default_cache_location")]
    pub location: String,
    /// Forecast TTL in minutes
    #[serde(default = "default_forecast_ttl")]
    pub forecast_ttl_minutes: u32,
    /// Climatology TTL in minutes
    #[serde(default = "default_climatology_ttl")]
    pub climatology_ttl_minutes: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Per-request timeout in seconds
    #[serde(default = "default_server_timeout")]
    pub request_timeout_seconds: u32,
}

// Default value functions
fn default_weather_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_weather_timeout() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_climatology_base_url() -> String {
    "https://power.larc.nasa.gov/api/temporal/daily/point".to_string()
}

fn default_climatology_community() -> String {
    "RE".to_string()
}

fn default_climatology_timeout() -> u32 {
    15
}

fn default_climatology_concurrency() -> usize {
    4
}

fn default_geocoding_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_geocoding_user_agent() -> String {
    format!("astrocast/{}", crate::VERSION)
}

fn default_geocoding_timeout() -> u32 {
    5
}

fn default_geocoding_backoff_ms() -> u64 {
    500
}

fn default_ai_provider() -> String {
    "auto".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_summary_max_tokens() -> u32 {
    120
}

fn default_answer_max_tokens() -> u32 {
    400
}

fn default_ai_timeout() -> u32 {
    30
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("astrocast"))
        .unwrap_or_else(|| PathBuf::from(".astrocast-cache"))
        .to_string_lossy()
        .into_owned()
}

fn default_forecast_ttl() -> u32 {
    30
}

fn default_climatology_ttl() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_server_timeout() -> u32 {
    60
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            geo_base_url: default_weather_base_url(),
            timeout_seconds: default_weather_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for ClimatologyConfig {
    fn default() -> Self {
        Self {
            base_url: default_climatology_base_url(),
            community: default_climatology_community(),
            timeout_seconds: default_climatology_timeout(),
            max_concurrent_years: default_climatology_concurrency(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            user_agent: default_geocoding_user_agent(),
            timeout_seconds: default_geocoding_timeout(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_geocoding_backoff_ms(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_ai_provider(),
            openai_base_url: default_openai_base_url(),
            gemini_base_url: default_gemini_base_url(),
            openai_model: None,
            gemini_model: None,
            summary_max_tokens: default_summary_max_tokens(),
            answer_max_tokens: default_answer_max_tokens(),
            timeout_seconds: default_ai_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            location: default_cache_location(),
            forecast_ttl_minutes: default_forecast_ttl(),
            climatology_ttl_minutes: default_climatology_ttl(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            request_timeout_seconds: default_server_timeout(),
        }
    }
}

impl Default for AstrocastConfig {
    fn default() -> Self {
        Self {
            weather: WeatherConfig::default(),
            climatology: ClimatologyConfig::default(),
            geocoding: GeocodingConfig::default(),
            ai: AiConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
            secrets_file: None,
        }
    }
}

impl AstrocastConfig {
    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            debug!("Reading configuration from {}", config_file.display());
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(FileFormat::Toml),
            );
        }

        // ASTROCAST_WEATHER__TIMEOUT_SECONDS=20 style overrides
        builder = builder.add_source(
            Environment::with_prefix("ASTROCAST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: AstrocastConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("astrocast").join("config.toml"))
    }

    /// Secrets file to consult, explicit setting first
    #[must_use]
    pub fn secrets_path(&self) -> Option<PathBuf> {
        match &self.secrets_file {
            Some(path) => Some(PathBuf::from(path)),
            None => dirs::config_dir().map(|dir| dir.join("astrocast").join("secrets.toml")),
        }
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.geo_base_url.is_empty() {
            self.weather.geo_base_url = default_weather_base_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_weather_timeout();
        }
        if self.climatology.base_url.is_empty() {
            self.climatology.base_url = default_climatology_base_url();
        }
        if self.climatology.community.is_empty() {
            self.climatology.community = default_climatology_community();
        }
        if self.climatology.timeout_seconds == 0 {
            self.climatology.timeout_seconds = default_climatology_timeout();
        }
        if self.climatology.max_concurrent_years == 0 {
            self.climatology.max_concurrent_years = default_climatology_concurrency();
        }
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoding_base_url();
        }
        if self.geocoding.user_agent.is_empty() {
            self.geocoding.user_agent = default_geocoding_user_agent();
        }
        if self.geocoding.timeout_seconds == 0 {
            self.geocoding.timeout_seconds = default_geocoding_timeout();
        }
        if self.ai.provider.is_empty() {
            self.ai.provider = default_ai_provider();
        }
        if self.ai.summary_max_tokens == 0 {
            self.ai.summary_max_tokens = default_summary_max_tokens();
        }
        if self.ai.answer_max_tokens == 0 {
            self.ai.answer_max_tokens = default_answer_max_tokens();
        }
        if self.ai.timeout_seconds == 0 {
            self.ai.timeout_seconds = default_ai_timeout();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.cache.forecast_ttl_minutes == 0 {
            self.cache.forecast_ttl_minutes = default_forecast_ttl();
        }
        if self.cache.climatology_ttl_minutes == 0 {
            self.cache.climatology_ttl_minutes = default_climatology_ttl();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_server_timeout();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        for (name, timeout) in [
            ("Weather API", self.weather.timeout_seconds),
            ("NASA POWER", self.climatology.timeout_seconds),
            ("Geocoding", self.geocoding.timeout_seconds),
            ("AI", self.ai.timeout_seconds),
        ] {
            if timeout > 300 {
                return Err(AstrocastError::config(format!(
                    "{name} timeout cannot exceed 300 seconds"
                ))
                .into());
            }
        }

        if self.weather.max_retries > 10 || self.geocoding.max_retries > 10 {
            return Err(AstrocastError::config("Max retries cannot exceed 10").into());
        }

        if self.climatology.max_concurrent_years > 16 {
            return Err(AstrocastError::config(
                "NASA POWER concurrency cannot exceed 16 parallel requests",
            )
            .into());
        }

        let week_minutes = 7 * 24 * 60;
        if self.cache.forecast_ttl_minutes > week_minutes
            || self.cache.climatology_ttl_minutes > week_minutes
        {
            return Err(AstrocastError::config("Cache TTL cannot exceed one week").into());
        }

        if self.ai.summary_max_tokens > 4096 || self.ai.answer_max_tokens > 4096 {
            return Err(AstrocastError::config("AI token budget cannot exceed 4096").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(AstrocastError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(AstrocastError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let valid_providers = ["auto", "openai", "gemini", "none"];
        if !valid_providers.contains(&self.ai.provider.as_str()) {
            return Err(AstrocastError::config(format!(
                "Invalid AI provider '{}'. Must be one of: {}",
                self.ai.provider,
                valid_providers.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Weather API base URL", &self.weather.base_url),
            ("Weather geocoding base URL", &self.weather.geo_base_url),
            ("NASA POWER base URL", &self.climatology.base_url),
            ("Geocoding base URL", &self.geocoding.base_url),
            ("OpenAI base URL", &self.ai.openai_base_url),
            ("Gemini base URL", &self.ai.gemini_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(AstrocastError::config(format!(
                    "{name} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

/// API keys resolved from the secrets file and the environment
#[derive(Clone, Default)]
pub struct Secrets {
    pub openweather_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |key: &Option<String>| if key.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Secrets")
            .field("openweather_api_key", &mask(&self.openweather_api_key))
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("gemini_api_key", &mask(&self.gemini_api_key))
            .finish()
    }
}

impl Secrets {
    /// Resolve secrets from the optional TOML file, then the process environment
    pub fn load(secrets_file: Option<&Path>) -> Result<Self> {
        let file_values = match secrets_file {
            Some(path) if path.exists() => read_secrets_file(path)?,
            _ => HashMap::new(),
        };
        Ok(Self::resolve_with(&file_values, |name| std::env::var(name).ok()))
    }

    /// Resolve secrets from explicit sources; a non-blank file value wins over the environment
    pub fn resolve_with<F>(file_values: &HashMap<String, String>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for (legacy, current) in LEGACY_SECRET_NAMES {
            if file_values.contains_key(legacy) || env(legacy).is_some() {
                debug!("Ignoring legacy secret {legacy}; set {current} instead");
            }
        }

        let lookup = |name: &str| {
            let raw = file_values
                .get(name)
                .filter(|value| !value.trim().is_empty())
                .cloned()
                .or_else(|| env(name))?;
            let value = raw.trim();
            if value.is_empty() {
                return None;
            }
            if is_placeholder_key(value) {
                warn!("Placeholder value detected for {name}; feature disabled");
                return None;
            }
            Some(value.to_string())
        };

        Self {
            openweather_api_key: lookup(OPENWEATHER_API_KEY),
            openai_api_key: lookup(OPENAI_API_KEY),
            gemini_api_key: lookup(GEMINI_API_KEY),
        }
    }
}

/// True for template values like `REPLACE_ME` or `YOUR_KEY_HERE`
#[must_use]
pub fn is_placeholder_key(key: &str) -> bool {
    key.starts_with("REPLACE_") || key.starts_with("YOUR_") || key.contains("REPLACE_WITH")
}

fn read_secrets_file(path: &Path) -> Result<HashMap<String, String>> {
    let settings = Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml))
        .build()
        .with_context(|| format!("Failed to read secrets file {}", path.display()))?;

    let raw: HashMap<String, String> = settings
        .try_deserialize()
        .with_context(|| format!("Secrets file {} must hold plain key = \"value\" pairs", path.display()))?;

    // Key case is not preserved by every config source
    let known = [OPENWEATHER_API_KEY, OPENAI_API_KEY, GEMINI_API_KEY]
        .into_iter()
        .chain(LEGACY_SECRET_NAMES.iter().map(|(legacy, _)| *legacy));
    let mut values = HashMap::new();
    for name in known {
        if let Some((_, value)) = raw.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
            values.insert(name.to_string(), value.clone());
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AstrocastConfig::default();
        assert_eq!(config.weather.base_url, "https://api.openweathermap.org");
        assert_eq!(config.weather.timeout_seconds, 10);
        assert_eq!(config.cache.forecast_ttl_minutes, 30);
        assert_eq!(config.cache.climatology_ttl_minutes, 60);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.ai.provider, "auto");
        assert_eq!(config.geocoding.backoff_base_ms, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = AstrocastConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = AstrocastConfig::default();
        config.weather.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_provider() {
        let mut config = AstrocastConfig::default();
        config.ai.provider = "claude".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_defaults_fills_blanks() {
        let mut config = AstrocastConfig::default();
        config.weather.base_url.clear();
        config.cache.forecast_ttl_minutes = 0;
        config.logging.format.clear();
        config.apply_defaults();
        assert_eq!(config.weather.base_url, "https://api.openweathermap.org");
        assert_eq!(config.cache.forecast_ttl_minutes, 30);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[weather]\ntimeout_seconds = 20\n\n[ai]\nprovider = \"gemini\"\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        let config = AstrocastConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.weather.timeout_seconds, 20);
        assert_eq!(config.ai.provider, "gemini");
        assert_eq!(config.logging.level, "debug");
        // Sections absent from the file keep their defaults
        assert_eq!(config.climatology.community, "RE");
    }

    #[test]
    fn test_config_path_generation() {
        let path = AstrocastConfig::get_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("astrocast"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[rstest]
    #[case("REPLACE_ME", true)]
    #[case("YOUR_OPENAI_KEY", true)]
    #[case("sk-REPLACE_WITH_REAL_KEY", true)]
    #[case("sk-live-1234567890", false)]
    fn test_placeholder_detection(#[case] key: &str, #[case] expected: bool) {
        assert_eq!(is_placeholder_key(key), expected);
    }

    #[test]
    fn test_secrets_file_wins_over_env() {
        let file = HashMap::from([(OPENAI_API_KEY.to_string(), " sk-file ".to_string())]);
        let secrets = Secrets::resolve_with(&file, |name| match name {
            OPENAI_API_KEY => Some("sk-env".to_string()),
            OPENWEATHER_API_KEY => Some("owm-env".to_string()),
            _ => None,
        });
        assert_eq!(secrets.openai_api_key.as_deref(), Some("sk-file"));
        assert_eq!(secrets.openweather_api_key.as_deref(), Some("owm-env"));
        assert!(secrets.gemini_api_key.is_none());
    }

    #[test]
    fn test_blank_file_secret_falls_back_to_env() {
        let file = HashMap::from([
            (OPENWEATHER_API_KEY.to_string(), "   ".to_string()),
            (GEMINI_API_KEY.to_string(), String::new()),
        ]);
        let secrets = Secrets::resolve_with(&file, |name| match name {
            OPENWEATHER_API_KEY => Some("real-env-key".to_string()),
            GEMINI_API_KEY => Some("g-env".to_string()),
            _ => None,
        });
        assert_eq!(secrets.openweather_api_key.as_deref(), Some("real-env-key"));
        assert_eq!(secrets.gemini_api_key.as_deref(), Some("g-env"));
        assert!(secrets.openai_api_key.is_none());
    }

    #[test]
    fn test_secrets_ignore_legacy_names_and_placeholders() {
        let file = HashMap::new();
        let secrets = Secrets::resolve_with(&file, |name| match name {
            "OPENWEATHERMAP_API_KEY" => Some("legacy-key".to_string()),
            "GOOGLE_API_KEY" => Some("legacy-gemini".to_string()),
            OPENAI_API_KEY => Some("YOUR_KEY_HERE".to_string()),
            GEMINI_API_KEY => Some("   ".to_string()),
            _ => None,
        });
        assert!(secrets.openweather_api_key.is_none());
        assert!(secrets.openai_api_key.is_none());
        assert!(secrets.gemini_api_key.is_none());
    }

    #[test]
    fn test_secrets_debug_is_redacted() {
        let secrets = Secrets {
            openweather_api_key: Some("super-secret".to_string()),
            ..Secrets::default()
        };
        let rendered = format!("{secrets:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<set>"));
    }

    #[test]
    fn test_secrets_from_toml_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "OPENWEATHER_API_KEY = \"owm-from-file\"").unwrap();
        let values = read_secrets_file(file.path()).unwrap();
        assert_eq!(
            values.get(OPENWEATHER_API_KEY).map(String::as_str),
            Some("owm-from-file")
        );
    }
}

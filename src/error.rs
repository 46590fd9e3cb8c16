//! Error types and handling for Astrocast

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Machine readable classification of API failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The provider rejected the credentials (HTTP 401)
    ApiUnauthorized,
    /// The provider does not know the requested location (HTTP 404)
    ApiLocationNotFound,
    /// The provider throttled us (HTTP 429)
    ApiRateLimit,
    /// Response body could not be decoded
    ApiInvalidResponse,
    /// Transport failure or unexpected status
    ApiNetworkError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ErrorCode::ApiUnauthorized => "API_UNAUTHORIZED",
            ErrorCode::ApiLocationNotFound => "API_LOCATION_NOT_FOUND",
            ErrorCode::ApiRateLimit => "API_RATE_LIMIT",
            ErrorCode::ApiInvalidResponse => "API_INVALID_RESPONSE",
            ErrorCode::ApiNetworkError => "API_NETWORK_ERROR",
        };
        f.write_str(code)
    }
}

/// Main error type for Astrocast
#[derive(Error, Debug)]
pub enum AstrocastError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// API communication errors
    #[error("API error [{code}]: {message}")]
    Api {
        message: String,
        code: ErrorCode,
        context: HashMap<String, String>,
    },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// General application errors
    #[error("Application error: {message}")]
    General { message: String },
}

impl AstrocastError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error without extra context
    pub fn api<S: Into<String>>(message: S, code: ErrorCode) -> Self {
        Self::api_with_context(message, code, HashMap::new())
    }

    /// Create a new API error carrying diagnostic key/value pairs
    pub fn api_with_context<S: Into<String>>(
        message: S,
        code: ErrorCode,
        context: HashMap<String, String>,
    ) -> Self {
        Self::Api {
            message: message.into(),
            code,
            context,
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    /// API error code, if this is an API error
    #[must_use]
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AstrocastError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            AstrocastError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            AstrocastError::Api {
                code,
                message,
                context,
            } => match code {
                ErrorCode::ApiUnauthorized => unauthorized_message(context),
                ErrorCode::ApiLocationNotFound => {
                    "Location not found. Check the city name.".to_string()
                }
                ErrorCode::ApiRateLimit => {
                    "Too many requests. Please wait a moment and try again.".to_string()
                }
                ErrorCode::ApiInvalidResponse => {
                    format!("Unexpected response from an external service: {message}")
                }
                ErrorCode::ApiNetworkError => {
                    "Unable to connect to external services. Please check your internet connection."
                        .to_string()
                }
            },
            AstrocastError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            AstrocastError::Cache { .. } => {
                "Cache operation failed. You may need to clear your cache.".to_string()
            }
            AstrocastError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
            AstrocastError::General { message } => message.clone(),
        }
    }
}

/// Names the rejecting service, and the key to check when it takes one
fn unauthorized_message(context: &HashMap<String, String>) -> String {
    let Some(service) = context.get("service") else {
        return "An external service rejected the request.".to_string();
    };
    let key = match service.as_str() {
        "OpenWeatherMap" => Some(crate::config::OPENWEATHER_API_KEY),
        "OpenAI" => Some(crate::config::OPENAI_API_KEY),
        "Gemini" => Some(crate::config::GEMINI_API_KEY),
        _ => None,
    };
    match key {
        Some(key) => format!("{service} rejected the API key. Check {key}."),
        None => format!("{service} refused the request. Please try again later."),
    }
}

/// Friendly message for any error chain, looking through `anyhow` wrappers
#[must_use]
pub fn user_message(err: &anyhow::Error) -> String {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<AstrocastError>())
        .map_or_else(|| err.to_string(), AstrocastError::user_message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = AstrocastError::config("missing API key");
        assert!(matches!(config_err, AstrocastError::Config { .. }));

        let api_err = AstrocastError::api("connection failed", ErrorCode::ApiNetworkError);
        assert!(matches!(api_err, AstrocastError::Api { .. }));
        assert_eq!(api_err.code(), Some(ErrorCode::ApiNetworkError));

        let validation_err = AstrocastError::validation("invalid coordinates");
        assert!(matches!(validation_err, AstrocastError::Validation { .. }));
        assert_eq!(validation_err.code(), None);
    }

    #[test]
    fn test_user_messages() {
        let config_err = AstrocastError::config("test");
        assert!(config_err.user_message().contains("Configuration error"));

        let api_err = AstrocastError::api("test", ErrorCode::ApiNetworkError);
        assert!(api_err.user_message().contains("Unable to connect"));

        let not_found = AstrocastError::api("test", ErrorCode::ApiLocationNotFound);
        assert!(not_found.user_message().contains("Location not found"));

        let validation_err = AstrocastError::validation("test input");
        assert!(validation_err.user_message().contains("test input"));
    }

    #[test]
    fn test_unauthorized_message_names_the_service() {
        let rejected = |service: &str| {
            AstrocastError::api_with_context(
                format!("{service} rejected the API key"),
                ErrorCode::ApiUnauthorized,
                HashMap::from([("service".to_string(), service.to_string())]),
            )
            .user_message()
        };

        assert_eq!(
            rejected("OpenWeatherMap"),
            "OpenWeatherMap rejected the API key. Check OPENWEATHER_API_KEY."
        );
        assert_eq!(rejected("Gemini"), "Gemini rejected the API key. Check GEMINI_API_KEY.");
        assert_eq!(
            rejected("Nominatim"),
            "Nominatim refused the request. Please try again later."
        );
        assert!(!rejected("NASA POWER").contains("OPENWEATHER_API_KEY"));
        assert_eq!(
            AstrocastError::api("denied", ErrorCode::ApiUnauthorized).user_message(),
            "An external service rejected the request."
        );
    }

    #[test]
    fn test_user_message_through_anyhow_context() {
        let err = anyhow::Error::new(AstrocastError::validation("empty city"))
            .context("while building report");
        assert_eq!(user_message(&err), "Invalid input: empty city");

        let plain = anyhow::anyhow!("boom");
        assert_eq!(user_message(&plain), "boom");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AstrocastError = io_err.into();
        assert!(matches!(err, AstrocastError::Io { .. }));
    }
}

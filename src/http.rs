//! Shared HTTP plumbing: retrying client construction and status mapping

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use tracing::{debug, warn};

use crate::{AstrocastError, ErrorCode};

/// Build a client that retries transient failures with exponential backoff
pub fn build_client(
    timeout: Duration,
    user_agent: &str,
    max_retries: u32,
    backoff_base: Duration,
) -> Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .with_context(|| "Failed to create HTTP client")?;

    let policy = ExponentialBackoff::builder()
        .retry_bounds(backoff_base, backoff_base * 16)
        .build_with_max_retries(max_retries);

    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(policy))
        .build())
}

/// Turn a non-success status into a typed API error; success passes through
pub fn check_status(response: Response, service: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        debug!("{service} responded {status}");
        return Ok(response);
    }

    let context = HashMap::from([
        ("service".to_string(), service.to_string()),
        ("status_code".to_string(), status.as_u16().to_string()),
    ]);

    let err = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AstrocastError::api_with_context(
            format!("{service} rejected the request ({status})"),
            ErrorCode::ApiUnauthorized,
            context,
        ),
        StatusCode::NOT_FOUND => AstrocastError::api_with_context(
            format!("{service} could not find the requested location"),
            ErrorCode::ApiLocationNotFound,
            context,
        ),
        StatusCode::TOO_MANY_REQUESTS => AstrocastError::api_with_context(
            format!("{service} rate limit exceeded"),
            ErrorCode::ApiRateLimit,
            context,
        ),
        _ => AstrocastError::api_with_context(
            format!(
                "{service} request failed with status: {} - {}",
                status,
                status.canonical_reason().unwrap_or("Unknown error")
            ),
            ErrorCode::ApiNetworkError,
            context,
        ),
    };
    warn!("{err}");
    Err(err.into())
}

/// Strip credentials from a URL before it reaches the logs
#[must_use]
pub fn redact_url(url: &str) -> String {
    match url.split_once("appid=") {
        Some((head, tail)) => {
            let rest = tail.find('&').map_or("", |idx| &tail[idx..]);
            format!("{head}appid=***{rest}")
        }
        None => url.to_string(),
    }
}

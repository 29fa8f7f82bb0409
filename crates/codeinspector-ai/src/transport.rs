// ABOUTME: Shared HTTP plumbing for the hosted providers: status checks and bounded retries.

use anyhow::{Context, Result};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Longest error body kept in an [`ApiError`].
const ERROR_BODY_CHARS: usize = 500;

/// Non-success HTTP status from a provider API.
#[derive(Error, Debug)]
#[error("{provider} API error ({status}): {body}")]
pub struct ApiError {
    pub provider: &'static str,
    pub status: StatusCode,
    pub body: String,
}

impl ApiError {
    /// Rate limits and server errors may succeed on a later attempt;
    /// other client errors never will.
    pub fn is_retryable(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS
            || self.status == StatusCode::REQUEST_TIMEOUT
            || self.status.is_server_error()
    }
}

/// Decode a JSON body, turning a non-success status into [`ApiError`].
pub async fn read_json<T: DeserializeOwned>(
    provider: &'static str,
    response: Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ApiError {
            provider,
            status,
            body: body.chars().take(ERROR_BODY_CHARS).collect(),
        }
        .into());
    }

    response
        .json::<T>()
        .await
        .with_context(|| format!("Failed to parse {} API response", provider))
}

/// Delay before retry `attempt` (1-based): 1s, 2s, 4s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.saturating_sub(1).min(6))
}

/// Only transient failures are retried: a retryable [`ApiError`] or a
/// request that never got a response. A body that fails to decode is final.
fn is_retryable(error: &anyhow::Error) -> bool {
    if let Some(api) = error.downcast_ref::<ApiError>() {
        return api.is_retryable();
    }
    error.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .is_some_and(|e| e.is_connect() || e.is_timeout() || e.is_request())
    })
}

/// Run `request` up to `max_retries + 1` times with exponential backoff.
/// Client errors other than 408 and 429, and undecodable bodies, are
/// returned immediately.
pub async fn with_retries<T, F, Fut>(
    provider: &'static str,
    max_retries: u32,
    mut request: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_retries && is_retryable(&e) => {
                attempt += 1;
                warn!(
                    "{} request failed (attempt {}/{}): {:#}; retrying",
                    provider,
                    attempt,
                    max_retries + 1,
                    e
                );
                tokio::time::sleep(backoff_delay(attempt)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

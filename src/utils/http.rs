// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::models::ApiConfig;

/// Message used when an error response carries none.
pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred while calling the API.";

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &ApiConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Value of the `Authorization` header for an API key.
pub fn authorization(api_key: &str) -> String {
    format!("KakaoAK {}", api_key)
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Extract the `message` of an error response body, falling back to
/// [`DEFAULT_ERROR_MESSAGE`] when the body is not JSON or has none.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string())
}

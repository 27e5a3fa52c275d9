// src/api/client.rs

//! HTTP implementation of [`BookSearchApi`].

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use url::Url;

use crate::api::BookSearchApi;
use crate::error::{AppError, Result};
use crate::models::{ApiConfig, BookSearchResponse, SearchParams};
use crate::utils::{get_domain, http, resolve_endpoint};

/// Path of the book search endpoint below the API base URL.
pub const SEARCH_PATH: &str = "/v3/search/book";

/// Client for the book search endpoint.
pub struct BookSearchClient {
    client: reqwest::Client,
    endpoint: Url,
    authorization: String,
}

impl BookSearchClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let api_key = config.resolved_api_key();
        if api_key.trim().is_empty() {
            log::warn!("No API key configured, search requests will be rejected");
        }

        Ok(Self {
            client: http::create_async_client(config)?,
            endpoint: resolve_endpoint(&config.base_url, SEARCH_PATH)?,
            authorization: http::authorization(&api_key),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl BookSearchApi for BookSearchClient {
    async fn search(&self, params: &SearchParams) -> Result<BookSearchResponse> {
        if params.is_blank() {
            return Err(AppError::validation("search query is empty"));
        }

        log::debug!(
            "Searching '{}' on {} (page {})",
            params.query.trim(),
            get_domain(self.endpoint.as_str()).unwrap_or_default(),
            params.effective_page()
        );

        let response = self
            .client
            .get(self.endpoint.clone())
            .header(AUTHORIZATION, &self.authorization)
            .query(&params.query_pairs())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = http::error_message(&body);
            log::warn!("Search request failed with {}: {}", status, message);
            return Err(AppError::api(status.as_u16(), message));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

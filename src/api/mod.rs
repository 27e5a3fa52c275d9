//! Book search API.

pub mod client;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BookSearchData, BookSearchResponse, SearchParams};

pub use client::{BookSearchClient, SEARCH_PATH};

/// A source of book search results.
#[async_trait]
pub trait BookSearchApi: Send + Sync {
    /// Run one search request.
    async fn search(&self, params: &SearchParams) -> Result<BookSearchResponse>;

    /// Run one search request and assign book identifiers.
    async fn search_books(&self, params: &SearchParams) -> Result<BookSearchData> {
        Ok(self.search(params).await?.into())
    }
}

// src/models/mod.rs

//! Domain models for the bookshelf library.
//!
//! This module contains all data structures used throughout the library,
//! organized by their primary purpose.

mod book;
mod config;
mod history;
mod search;

// Re-export all public types
pub use book::{Book, BookSearchData, BookSearchDocument, BookSearchMeta, BookSearchResponse};
pub use config::{
    API_KEY_ENV, ApiConfig, Config, FavoritesConfig, HistoryConfig, LoggingConfig, SearchConfig,
};
pub use history::SearchHistoryItem;
pub use search::{
    DEFAULT_PAGE_SIZE, MAX_PAGE, MIN_PAGE, SearchParams, SearchTarget, SortOrder,
};

#[cfg(test)]
pub(crate) use book::sample_book;

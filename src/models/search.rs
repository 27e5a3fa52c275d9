// src/models/search.rs

//! Search request parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Smallest and largest accepted `page` / `size` values.
pub const MIN_PAGE: u32 = 1;
pub const MAX_PAGE: u32 = 50;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Result ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Accuracy,
    Latest,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Accuracy => "accuracy",
            SortOrder::Latest => "latest",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "accuracy" => Ok(SortOrder::Accuracy),
            "latest" => Ok(SortOrder::Latest),
            other => Err(AppError::validation(format!("unknown sort order '{other}'"))),
        }
    }
}

/// Field the query is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTarget {
    Title,
    Isbn,
    Publisher,
    Person,
}

impl SearchTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTarget::Title => "title",
            SearchTarget::Isbn => "isbn",
            SearchTarget::Publisher => "publisher",
            SearchTarget::Person => "person",
        }
    }
}

impl fmt::Display for SearchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchTarget {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "title" => Ok(SearchTarget::Title),
            "isbn" => Ok(SearchTarget::Isbn),
            "publisher" => Ok(SearchTarget::Publisher),
            "person" | "author" => Ok(SearchTarget::Person),
            other => Err(AppError::validation(format!("unknown search target '{other}'"))),
        }
    }
}

/// Parameters of one search request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,

    #[serde(default)]
    pub sort: SortOrder,

    #[serde(default)]
    pub page: Option<u32>,

    #[serde(default)]
    pub size: Option<u32>,

    #[serde(default)]
    pub target: Option<SearchTarget>,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_target(mut self, target: SearchTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// True when the trimmed query is empty; such searches are never sent.
    pub fn is_blank(&self) -> bool {
        self.query.trim().is_empty()
    }

    /// Page clamped to the accepted range.
    pub fn effective_page(&self) -> u32 {
        self.page.unwrap_or(MIN_PAGE).clamp(MIN_PAGE, MAX_PAGE)
    }

    /// Page size clamped to the accepted range.
    pub fn effective_size(&self) -> u32 {
        self.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(MIN_PAGE, MAX_PAGE)
    }

    /// Query string pairs as sent to the search API.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("query", self.query.trim().to_string()),
            ("sort", self.sort.to_string()),
            ("page", self.effective_page().to_string()),
            ("size", self.effective_size().to_string()),
        ];
        if let Some(target) = self.target {
            pairs.push(("target", target.to_string()));
        }
        pairs
    }
}

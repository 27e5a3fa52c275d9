// src/models/book.rs

//! Book search documents and the `Book` identity derived from them.

use serde::{Deserialize, Serialize};

/// A document as returned by the book search API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookSearchDocument {
    pub title: String,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default)]
    pub contents: String,

    /// ISO 8601 publication date
    #[serde(default)]
    pub datetime: String,

    /// Space separated ISBN10/ISBN13, may be empty
    #[serde(default)]
    pub isbn: String,

    #[serde(default)]
    pub price: i64,

    #[serde(default)]
    pub publisher: String,

    /// Discounted price, `-1` when not on sale
    #[serde(default)]
    pub sale_price: i64,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub thumbnail: String,

    #[serde(default)]
    pub translators: Vec<String>,

    #[serde(default)]
    pub url: String,
}

/// A book with a stable identifier.
///
/// The identifier is the ISBN when present and the canonical URL otherwise.
/// Favorites are deduplicated by this identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Book {
    pub id: String,

    #[serde(flatten)]
    pub document: BookSearchDocument,
}

impl Book {
    /// Derive the identifier for a search document.
    pub fn identifier(document: &BookSearchDocument) -> String {
        let isbn = document.isbn.trim();
        if isbn.is_empty() {
            document.url.clone()
        } else {
            isbn.to_string()
        }
    }

    pub fn title(&self) -> &str {
        &self.document.title
    }

    /// Sale price if discounted, list price otherwise.
    pub fn effective_price(&self) -> i64 {
        if self.document.sale_price >= 0 {
            self.document.sale_price
        } else {
            self.document.price
        }
    }
}

impl From<BookSearchDocument> for Book {
    fn from(document: BookSearchDocument) -> Self {
        Self {
            id: Self::identifier(&document),
            document,
        }
    }
}

/// Paging metadata attached to a search response.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookSearchMeta {
    pub is_end: bool,
    pub pageable_count: u64,
    pub total_count: u64,
}

/// Raw search API response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookSearchResponse {
    #[serde(default)]
    pub documents: Vec<BookSearchDocument>,
    pub meta: BookSearchMeta,
}

/// Search results with identifiers assigned.
#[derive(Debug, Clone, Default)]
pub struct BookSearchData {
    pub books: Vec<Book>,
    pub meta: BookSearchMeta,
}

impl From<BookSearchResponse> for BookSearchData {
    fn from(response: BookSearchResponse) -> Self {
        Self {
            books: response.documents.into_iter().map(Book::from).collect(),
            meta: response.meta,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_book(isbn: &str, title: &str) -> Book {
    Book::from(BookSearchDocument {
        title: title.to_string(),
        authors: vec!["Author".to_string()],
        isbn: isbn.to_string(),
        price: 15000,
        sale_price: 13500,
        publisher: "Publisher".to_string(),
        url: format!("https://search.example.com/book?isbn={isbn}"),
        ..Default::default()
    })
}

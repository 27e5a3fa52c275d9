//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::search::{MAX_PAGE, MIN_PAGE, SortOrder};

/// Environment variable consulted when `api.api_key` is empty.
pub const API_KEY_ENV: &str = "KAKAO_API_KEY";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search API connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Search defaults
    #[serde(default)]
    pub search: SearchConfig,

    /// Search history store settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// Favorites database settings
    #[serde(default)]
    pub favorites: FavoritesConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(AppError::validation("api.base_url is empty"));
        }
        url::Url::parse(&self.api.base_url)?;
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if !(MIN_PAGE..=MAX_PAGE).contains(&self.search.page_size) {
            return Err(AppError::validation(format!(
                "search.page_size must be within {MIN_PAGE}..={MAX_PAGE}"
            )));
        }
        if self.history.storage_key.trim().is_empty() {
            return Err(AppError::validation("history.storage_key is empty"));
        }
        if self.history.max_items == 0 {
            return Err(AppError::validation("history.max_items must be > 0"));
        }
        if self.favorites.db_name.trim().is_empty() {
            return Err(AppError::validation("favorites.db_name is empty"));
        }
        if self.favorites.store_name.trim().is_empty() {
            return Err(AppError::validation("favorites.store_name is empty"));
        }
        if self.favorites.db_version == 0 {
            return Err(AppError::validation("favorites.db_version must be > 0"));
        }
        Ok(())
    }
}

/// Search API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the search API
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// API key sent as `KakaoAK {key}`
    #[serde(default)]
    pub api_key: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl ApiConfig {
    /// Configured key, or the value of [`API_KEY_ENV`] when unset.
    pub fn resolved_api_key(&self) -> String {
        if !self.api_key.trim().is_empty() {
            return self.api_key.clone();
        }
        std::env::var(API_KEY_ENV).unwrap_or_default()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            api_key: String::new(),
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Search defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results per page
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// Default result ordering
    #[serde(default)]
    pub sort: SortOrder,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::page_size(),
            sort: SortOrder::default(),
        }
    }
}

/// Search history store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Key the history list is persisted under
    #[serde(default = "defaults::history_key")]
    pub storage_key: String,

    /// Maximum number of remembered queries
    #[serde(default = "defaults::max_history_items")]
    pub max_items: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            storage_key: defaults::history_key(),
            max_items: defaults::max_history_items(),
        }
    }
}

/// Favorites database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritesConfig {
    #[serde(default = "defaults::db_name")]
    pub db_name: String,

    #[serde(default = "defaults::db_version")]
    pub db_version: u32,

    #[serde(default = "defaults::store_name")]
    pub store_name: String,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            db_name: defaults::db_name(),
            db_version: defaults::db_version(),
            store_name: defaults::store_name(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // API defaults
    pub fn base_url() -> String {
        "https://dapi.kakao.com".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn user_agent() -> String {
        concat!("bookshelf/", env!("CARGO_PKG_VERSION")).into()
    }

    // Search defaults
    pub fn page_size() -> u32 {
        10
    }

    // History defaults
    pub fn history_key() -> String {
        "book-search:history".into()
    }
    pub fn max_history_items() -> usize {
        8
    }

    // Favorites defaults
    pub fn db_name() -> String {
        "BookFavoritesDB".into()
    }
    pub fn db_version() -> u32 {
        1
    }
    pub fn store_name() -> String {
        "favorites".into()
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}

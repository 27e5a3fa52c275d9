// src/models/history.rs

//! Search history entries.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A past search query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchHistoryItem {
    pub id: String,
    pub query: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl SearchHistoryItem {
    /// Create an entry for an already trimmed query.
    ///
    /// `not_before` keeps timestamps monotonic when the clock steps back
    /// or two insertions land in the same millisecond.
    pub fn new(query: impl Into<String>, not_before: Option<i64>) -> Self {
        let query = query.into();
        let mut timestamp = Utc::now().timestamp_millis();
        if let Some(floor) = not_before {
            timestamp = timestamp.max(floor);
        }

        Self {
            id: generate_id(timestamp),
            query,
            timestamp,
        }
    }
}

/// `{millis}-{9 hex chars}`, the suffix cut from a random v4 uuid.
fn generate_id(timestamp: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", timestamp, &suffix[..9])
}

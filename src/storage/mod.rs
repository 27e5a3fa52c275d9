//! Storage abstractions for client-side persistence.
//!
//! Two kinds of backend are modelled:
//! - Key-value storage: synchronous `get/set/remove` of string values, shared
//!   by every "tab" opened on the same storage area. Writes from one tab are
//!   announced to the other tabs as [`StorageEvent`]s.
//! - Favorites databases: asynchronous, versioned object stores keyed by the
//!   book identifier. Every write replaces the whole store in one transaction.
//!
//! ## Directory Structure (file backends)
//!
//! ```text
//! {root}/
//! ├── local/                        # Key-value area
//! │   └── book-search%3Ahistory.json
//! └── BookFavoritesDB/              # Favorites database
//!     └── v1/
//!         └── favorites.json
//! ```

pub mod local;
pub mod memory;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::error::{AppError, Result};
use crate::models::Book;

// Re-export for convenience
pub use local::{FileFavoritesDb, FileStorage};
pub use memory::{MemoryFavoritesDb, MemoryStorage};

/// Buffered storage events per receiver before it starts lagging.
const EVENT_CAPACITY: usize = 64;

/// Identifies one handle ("tab") on a shared storage area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(u64);

/// Notification that another tab modified the storage area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Changed key; `None` when the whole area must be considered changed.
    pub key: Option<String>,
    /// New value; `None` when the key was removed.
    pub new_value: Option<String>,
    /// Tab that performed the write.
    pub source: Option<TabId>,
}

impl StorageEvent {
    fn resync() -> Self {
        Self {
            key: None,
            new_value: None,
            source: None,
        }
    }

    /// Whether a store persisted under `key` should react to this event.
    pub fn concerns(&self, key: &str) -> bool {
        self.key.as_deref().is_none_or(|k| k == key)
    }
}

/// Receiving half of a storage area's change feed, filtered to foreign tabs.
pub struct StorageEvents {
    rx: broadcast::Receiver<StorageEvent>,
    tab: TabId,
}

impl StorageEvents {
    /// Wait for the next change made by another tab.
    ///
    /// Returns `None` once every handle on the area has been dropped. A
    /// lagging receiver gets a whole-area event so it can re-read storage.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.source == Some(self.tab) => continue,
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Storage event feed lagged, {} events skipped", skipped);
                    return Some(StorageEvent::resync());
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Change feed shared by all tabs of one storage area.
#[derive(Clone)]
pub(crate) struct EventHub {
    tx: broadcast::Sender<StorageEvent>,
    next_tab: Arc<AtomicU64>,
}

impl EventHub {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            tx,
            next_tab: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) fn allocate_tab(&self) -> TabId {
        TabId(self.next_tab.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn publish(&self, source: TabId, key: &str, new_value: Option<&str>) {
        // No receivers is fine: nobody is watching yet.
        let _ = self.tx.send(StorageEvent {
            key: Some(key.to_string()),
            new_value: new_value.map(str::to_string),
            source: Some(source),
        });
    }

    pub(crate) fn subscribe(&self, tab: TabId) -> StorageEvents {
        StorageEvents {
            rx: self.tx.subscribe(),
            tab,
        }
    }
}

/// Synchronous string key-value storage.
pub trait KeyValueStorage: Send + Sync + 'static {
    /// Read a value, `None` when the key is absent.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Change feed of writes made by other tabs, if the backend has one.
    fn watch(&self) -> Option<StorageEvents> {
        None
    }
}

/// Persisted favorites entry: the book plus the time it was written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FavoriteRecord {
    #[serde(flatten)]
    pub book: Book,

    /// Write time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl FavoriteRecord {
    /// Tag every book with the current time, preserving order.
    pub fn stamp_all(books: &[Book]) -> Vec<Self> {
        let timestamp = Utc::now().timestamp_millis();
        books
            .iter()
            .map(|book| Self {
                book: book.clone(),
                timestamp,
            })
            .collect()
    }
}

/// Asynchronous transactional storage for favorites.
#[async_trait]
pub trait FavoritesBackend: Send + Sync + 'static {
    /// Open the database, creating the object store if it does not exist.
    async fn open(&self) -> Result<()>;

    /// Read every record in write order.
    async fn read_all(&self) -> Result<Vec<FavoriteRecord>>;

    /// Clear the object store and add each record in order, atomically.
    async fn replace_all(&self, records: &[FavoriteRecord]) -> Result<()>;
}

/// Clear-then-add semantics shared by the backends: each add fails on a key
/// already present, which aborts the whole transaction.
pub(crate) fn rewrite_object_store(records: &[FavoriteRecord]) -> Result<Vec<FavoriteRecord>> {
    let mut keys = HashSet::with_capacity(records.len());
    let mut store = Vec::with_capacity(records.len());
    for record in records {
        if !keys.insert(record.book.id.as_str()) {
            return Err(AppError::constraint(format!(
                "key '{}' already exists in the object store",
                record.book.id
            )));
        }
        store.push(record.clone());
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_book;

    #[test]
    fn test_rewrite_rejects_duplicate_keys() {
        let book = sample_book("1", "Dup");
        let records = FavoriteRecord::stamp_all(&[book.clone(), book]);
        assert!(matches!(
            rewrite_object_store(&records),
            Err(AppError::Constraint(_))
        ));
    }

    #[test]
    fn test_record_serializes_flat_with_timestamp() {
        let records = FavoriteRecord::stamp_all(&[sample_book("42", "Flat")]);
        let value = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(value["id"], "42");
        assert_eq!(value["title"], "Flat");
        assert!(value["timestamp"].is_i64());
    }

    #[test]
    fn test_event_concerns() {
        let event = StorageEvent {
            key: Some("a".to_string()),
            new_value: None,
            source: None,
        };
        assert!(event.concerns("a"));
        assert!(!event.concerns("b"));
        assert!(StorageEvent::resync().concerns("anything"));
    }

    #[tokio::test]
    async fn test_events_skip_own_tab() {
        let hub = EventHub::new();
        let mine = hub.allocate_tab();
        let other = hub.allocate_tab();
        let mut events = hub.subscribe(mine);

        hub.publish(mine, "k", Some("ignored"));
        hub.publish(other, "k", Some("seen"));

        let event = events.recv().await.unwrap();
        assert_eq!(event.new_value.as_deref(), Some("seen"));
        assert_eq!(event.source, Some(other));
    }
}

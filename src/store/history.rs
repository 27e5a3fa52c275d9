// src/store/history.rs

//! Recent search queries, persisted in key-value storage.
//!
//! The whole list is stored as one JSON array under a single key. Other tabs
//! on the same storage area see changes through storage events and
//! re-broadcast them to their own subscribers.

use std::sync::{Arc, Mutex, Once, PoisonError, RwLock};

use tokio::task::JoinHandle;

use crate::models::{HistoryConfig, SearchHistoryItem};
use crate::storage::{KeyValueStorage, StorageEvent};
use crate::store::{Broadcaster, ExternalStore, Listener, Subscription, read, write};

/// Snapshot of the search history, most recent first.
pub type History = Arc<Vec<SearchHistoryItem>>;

/// Capped, deduplicated, most-recent-first list of past queries.
///
/// Cloning yields another handle on the same store.
pub struct SearchHistoryStore<S: KeyValueStorage> {
    inner: Arc<HistoryInner<S>>,
}

impl<S: KeyValueStorage> Clone for SearchHistoryStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct HistoryInner<S> {
    storage: S,
    key: String,
    max_items: usize,
    history: RwLock<History>,
    init: Once,
    listeners: Broadcaster<History>,
    empty: History,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl<S: KeyValueStorage> SearchHistoryStore<S> {
    pub fn new(storage: S, config: &HistoryConfig) -> Self {
        Self::with_key(storage, &config.storage_key, config.max_items)
    }

    pub fn with_key(storage: S, key: impl Into<String>, max_items: usize) -> Self {
        let empty: History = Arc::new(Vec::new());
        Self {
            inner: Arc::new(HistoryInner {
                storage,
                key: key.into(),
                max_items,
                history: RwLock::new(Arc::clone(&empty)),
                init: Once::new(),
                listeners: Broadcaster::new(),
                empty,
                watcher: Mutex::new(None),
            }),
        }
    }

    /// Load the persisted list and start listening for other tabs' writes.
    ///
    /// Runs once; later calls return immediately. Called implicitly by
    /// every operation.
    pub fn init(&self) {
        self.inner.init.call_once(|| {
            let history = self.inner.read_from_storage();
            log::debug!(
                "Loaded {} search history items from '{}'",
                history.len(),
                self.inner.key
            );
            *write(&self.inner.history) = Arc::new(history);
            self.start_cross_tab_sync();
        });
    }

    fn start_cross_tab_sync(&self) {
        let Some(mut events) = self.inner.storage.watch() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::debug!(
                "No async runtime, cross-tab sync for '{}' is disabled",
                self.inner.key
            );
            return;
        };

        let store = Arc::downgrade(&self.inner);
        let handle = runtime.spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(inner) = store.upgrade() else {
                    break;
                };
                inner.apply_storage_event(&event);
            }
        });
        *self
            .inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Record a query at the front of the history.
    ///
    /// Blank queries are ignored. An existing entry with the same query is
    /// replaced, and the list is cut to the configured maximum.
    pub fn add_query(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        self.init();

        self.inner.update(|current| {
            let floor = current.first().map(|item| item.timestamp);
            let mut next = Vec::with_capacity(current.len() + 1);
            next.push(SearchHistoryItem::new(query, floor));
            next.extend(current.iter().filter(|item| item.query != query).cloned());
            next.truncate(self.inner.max_items);
            next
        });
    }

    /// Remove the entry with the given id, if any.
    pub fn remove_query(&self, id: &str) {
        self.init();
        self.inner.update(|current| {
            current
                .iter()
                .filter(|item| item.id != id)
                .cloned()
                .collect()
        });
    }

    pub fn clear_history(&self) {
        self.init();
        self.inner.update(|_| Vec::new());
    }

    /// Register a listener and deliver the current history to it at once.
    pub fn subscribe(
        &self,
        listener: impl Fn(&History) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_listener(Arc::new(listener))
    }

    fn subscribe_listener(&self, listener: Listener<History>) -> Subscription {
        self.init();
        let subscription = self.inner.listeners.subscribe(Arc::clone(&listener));
        listener(&self.get_snapshot());
        subscription
    }

    pub fn get_snapshot(&self) -> History {
        self.init();
        Arc::clone(&read(&self.inner.history))
    }

    pub fn get_server_snapshot(&self) -> History {
        Arc::clone(&self.inner.empty)
    }

    /// Queries only, most recent first.
    pub fn recent_queries(&self) -> Vec<String> {
        self.get_snapshot()
            .iter()
            .map(|item| item.query.clone())
            .collect()
    }

    pub fn has_history(&self) -> bool {
        !self.get_snapshot().is_empty()
    }

    /// Apply a storage event by hand, for hosts that deliver events
    /// themselves instead of through [`KeyValueStorage::watch`].
    pub fn handle_storage_event(&self, event: &StorageEvent) {
        self.init();
        self.inner.apply_storage_event(event);
    }

    pub fn storage_key(&self) -> &str {
        &self.inner.key
    }
}

impl<S: KeyValueStorage> HistoryInner<S> {
    /// Swap in the next list, persist it and notify.
    fn update(&self, next: impl FnOnce(&[SearchHistoryItem]) -> Vec<SearchHistoryItem>) {
        let snapshot = {
            let mut history = write(&self.history);
            let updated = next(&history);
            *history = Arc::new(updated);
            // Persist under the lock so storage order matches memory order.
            self.write_to_storage(&history);
            Arc::clone(&history)
        };
        self.listeners.emit(&snapshot);
    }

    fn apply_storage_event(&self, event: &StorageEvent) {
        if !event.concerns(&self.key) {
            return;
        }
        let history = match &event.new_value {
            Some(raw) => self.parse(raw),
            None => self.read_from_storage(),
        };
        log::debug!(
            "Search history changed in another tab ({} items)",
            history.len()
        );

        let snapshot: History = Arc::new(history);
        *write(&self.history) = Arc::clone(&snapshot);
        self.listeners.emit(&snapshot);
    }

    /// Persisted list; absent, unreadable or malformed data reads as empty.
    fn read_from_storage(&self) -> Vec<SearchHistoryItem> {
        match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => self.parse(&raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Failed to read search history from storage: {}", e);
                Vec::new()
            }
        }
    }

    fn parse(&self, raw: &str) -> Vec<SearchHistoryItem> {
        match serde_json::from_str::<Vec<SearchHistoryItem>>(raw) {
            Ok(mut history) => {
                history.truncate(self.max_items);
                history
            }
            Err(e) => {
                log::warn!("Failed to parse search history from storage: {}", e);
                Vec::new()
            }
        }
    }

    fn write_to_storage(&self, history: &[SearchHistoryItem]) {
        let result = serde_json::to_string(history)
            .map_err(crate::error::AppError::from)
            .and_then(|raw| self.storage.set_item(&self.key, &raw));
        if let Err(e) = result {
            log::warn!("Failed to persist search history: {}", e);
        }
    }
}

impl<S> Drop for HistoryInner<S> {
    fn drop(&mut self) {
        let watcher = self
            .watcher
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = watcher {
            handle.abort();
        }
    }
}

impl<S: KeyValueStorage> ExternalStore for SearchHistoryStore<S> {
    type Snapshot = History;

    fn subscribe(&self, listener: Listener<History>) -> Subscription {
        self.subscribe_listener(listener)
    }

    fn get_snapshot(&self) -> History {
        SearchHistoryStore::get_snapshot(self)
    }

    fn get_server_snapshot(&self) -> History {
        SearchHistoryStore::get_server_snapshot(self)
    }
}

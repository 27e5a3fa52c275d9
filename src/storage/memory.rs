//! In-process storage backends.
//!
//! Used when nothing should outlive the process and as the fault-injectable
//! backends of the store tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::storage::{
    EventHub, FavoriteRecord, FavoritesBackend, KeyValueStorage, StorageEvents, TabId,
    rewrite_object_store,
};

const BACKEND: &str = "memory";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Key-value area held in memory.
///
/// Cloning yields another handle on the same tab; [`MemoryStorage::new_tab`]
/// yields a handle that receives the writes of this one as events.
#[derive(Clone)]
pub struct MemoryStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    hub: EventHub,
    tab: TabId,
}

impl MemoryStorage {
    pub fn new() -> Self {
        let hub = EventHub::new();
        Self {
            items: Arc::new(Mutex::new(HashMap::new())),
            fail_reads: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            tab: hub.allocate_tab(),
            hub,
        }
    }

    /// Another tab on the same storage area.
    pub fn new_tab(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            fail_reads: Arc::clone(&self.fail_reads),
            fail_writes: Arc::clone(&self.fail_writes),
            tab: self.hub.allocate_tab(),
            hub: self.hub.clone(),
        }
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    /// Make every subsequent read fail, as a storage denied by the
    /// environment would.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail, as a full or disabled storage would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::storage(BACKEND, "quota exceeded"));
        }
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::storage(BACKEND, "storage unavailable"));
        }
        Ok(lock(&self.items).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        lock(&self.items).insert(key.to_string(), value.to_string());
        self.hub.publish(self.tab, key, Some(value));
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.check_writable()?;
        lock(&self.items).remove(key);
        self.hub.publish(self.tab, key, None);
        Ok(())
    }

    fn watch(&self) -> Option<StorageEvents> {
        Some(self.hub.subscribe(self.tab))
    }
}

/// Favorites database held in memory, with counters and fault injection.
#[derive(Clone, Default)]
pub struct MemoryFavoritesDb {
    inner: Arc<MemoryDbInner>,
}

#[derive(Default)]
struct MemoryDbInner {
    records: Mutex<Option<Vec<FavoriteRecord>>>,
    write_delays: Mutex<VecDeque<Duration>>,
    open_delay: Mutex<Option<Duration>>,
    fail_open: AtomicBool,
    fail_writes: AtomicBool,
    opens: AtomicUsize,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryFavoritesDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Database pre-populated with records, as left by an earlier session.
    pub fn with_records(records: Vec<FavoriteRecord>) -> Self {
        let db = Self::default();
        *lock(&db.inner.records) = Some(records);
        db
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.inner.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Delay applied to every open.
    pub fn set_open_delay(&self, delay: Duration) {
        *lock(&self.inner.open_delay) = Some(delay);
    }

    /// Delay applied to the next write; queued delays are consumed in order.
    pub fn push_write_delay(&self, delay: Duration) {
        lock(&self.inner.write_delays).push_back(delay);
    }

    pub fn open_count(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Currently persisted records.
    pub fn records(&self) -> Vec<FavoriteRecord> {
        lock(&self.inner.records).clone().unwrap_or_default()
    }

    async fn open_store(&self) -> Result<()> {
        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.inner.open_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.inner.fail_open.load(Ordering::SeqCst) {
            return Err(AppError::storage(BACKEND, "failed to open database"));
        }
        lock(&self.inner.records).get_or_insert_with(Vec::new);
        Ok(())
    }
}

#[async_trait]
impl FavoritesBackend for MemoryFavoritesDb {
    async fn open(&self) -> Result<()> {
        self.open_store().await
    }

    async fn read_all(&self) -> Result<Vec<FavoriteRecord>> {
        self.open_store().await?;
        self.inner.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.records())
    }

    async fn replace_all(&self, records: &[FavoriteRecord]) -> Result<()> {
        self.open_store().await?;
        let delay = lock(&self.inner.write_delays).pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::storage(BACKEND, "transaction aborted"));
        }

        let store = rewrite_object_store(records)?;
        *lock(&self.inner.records) = Some(store);
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_book;

    #[test]
    fn test_set_and_get_item() {
        let storage = MemoryStorage::new();
        storage.set_item("key", "value").unwrap();
        assert_eq!(storage.get_item("key").unwrap(), Some("value".to_string()));

        storage.remove_item("key").unwrap();
        assert_eq!(storage.get_item("key").unwrap(), None);
    }

    #[test]
    fn test_tabs_share_items() {
        let a = MemoryStorage::new();
        let b = a.new_tab();
        assert_ne!(a.tab(), b.tab());

        a.set_item("shared", "1").unwrap();
        assert_eq!(b.get_item("shared").unwrap(), Some("1".to_string()));
    }

    #[test]
    fn test_fail_reads() {
        let storage = MemoryStorage::new();
        storage.set_item("key", "value").unwrap();

        let other = storage.new_tab();
        storage.set_fail_reads(true);
        assert!(matches!(
            other.get_item("key"),
            Err(AppError::Storage { .. })
        ));
        // Writes are unaffected.
        storage.set_item("key", "next").unwrap();

        storage.set_fail_reads(false);
        assert_eq!(storage.get_item("key").unwrap(), Some("next".to_string()));
    }

    #[test]
    fn test_fail_writes() {
        let storage = MemoryStorage::new();
        storage.set_fail_writes(true);
        assert!(storage.set_item("key", "value").is_err());
        assert_eq!(storage.get_item("key").unwrap(), None);
    }

    #[tokio::test]
    async fn test_watch_receives_other_tab_writes() {
        let a = MemoryStorage::new();
        let b = a.new_tab();
        let mut events = b.watch().unwrap();

        a.set_item("key", "value").unwrap();
        let event = events.recv().await.unwrap();
        assert_eq!(event.key.as_deref(), Some("key"));
        assert_eq!(event.new_value.as_deref(), Some("value"));
        assert_eq!(event.source, Some(a.tab()));
    }

    #[tokio::test]
    async fn test_db_replace_and_read() {
        let db = MemoryFavoritesDb::new();
        db.open().await.unwrap();

        let records = FavoriteRecord::stamp_all(&[sample_book("1", "A"), sample_book("2", "B")]);
        db.replace_all(&records).await.unwrap();
        db.replace_all(&records[1..]).await.unwrap();

        let stored = db.read_all().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].book.id, "2");
        assert_eq!(db.write_count(), 2);
    }

    #[tokio::test]
    async fn test_db_fail_open() {
        let db = MemoryFavoritesDb::new();
        db.set_fail_open(true);
        assert!(db.open().await.is_err());
        assert!(db.read_all().await.is_err());
        assert_eq!(db.open_count(), 2);
    }
}

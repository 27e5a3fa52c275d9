//! Local filesystem storage implementation.
//!
//! Persists the key-value area and the favorites database as JSON documents
//! under a root directory. Every write goes to a temporary file that is then
//! renamed over the target, so readers never observe a half-written file.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── local/                 # Key-value area, one file per key
//! │   └── {urlencoded key}.json
//! └── {db_name}/
//!     └── v{version}/
//!         └── {store_name}.json   # Favorites object store
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::FavoritesConfig;
use crate::storage::{
    EventHub, FavoriteRecord, FavoritesBackend, KeyValueStorage, StorageEvents, TabId,
    rewrite_object_store,
};

/// Directory of the key-value area below the storage root.
const KEY_VALUE_DIR: &str = "local";

/// Key-value area stored as one file per key.
#[derive(Clone)]
pub struct FileStorage {
    root_dir: PathBuf,
    hub: EventHub,
    tab: TabId,
}

impl FileStorage {
    /// Create a new FileStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let hub = EventHub::new();
        Self {
            root_dir: root_dir.into().join(KEY_VALUE_DIR),
            tab: hub.allocate_tab(),
            hub,
        }
    }

    /// Another tab on the same directory, sharing this handle's event feed.
    pub fn new_tab(&self) -> Self {
        Self {
            root_dir: self.root_dir.clone(),
            tab: self.hub.allocate_tab(),
            hub: self.hub.clone(),
        }
    }

    /// Get the full path for a key.
    fn path(&self, key: &str) -> PathBuf {
        let encoded: String = url::form_urlencoded::byte_serialize(key.as_bytes()).collect();
        self.root_dir.join(format!("{encoded}.json"))
    }

    /// Write bytes atomically (write to temp, then rename).
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.flush()?;
        drop(file);

        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.write_bytes(&self.path(key), value.as_bytes())?;
        self.hub.publish(self.tab, key, Some(value));
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(AppError::Io(e)),
        }
        self.hub.publish(self.tab, key, None);
        Ok(())
    }

    fn watch(&self) -> Option<StorageEvents> {
        Some(self.hub.subscribe(self.tab))
    }
}

/// Favorites database stored as a JSON array of records.
pub struct FileFavoritesDb {
    store_path: PathBuf,
    // Serializes transactions issued through this handle.
    txn: Mutex<()>,
}

impl FileFavoritesDb {
    /// Database `{root}/{db_name}/v{version}/{store_name}.json`.
    pub fn new(root_dir: impl AsRef<Path>, config: &FavoritesConfig) -> Self {
        let store_path = root_dir
            .as_ref()
            .join(&config.db_name)
            .join(format!("v{}", config.db_version))
            .join(format!("{}.json", config.store_name));
        Self {
            store_path,
            txn: Mutex::new(()),
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Ensure the object store exists; this is the upgrade step.
    async fn ensure_store(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.store_path).await? {
            return Ok(());
        }
        log::info!("Creating favorites object store at {}", self.store_path.display());
        self.write_json(&Vec::<FavoriteRecord>::new()).await
    }

    /// Write JSON data atomically (write to temp, then rename).
    async fn write_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        if let Some(parent) = self.store_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.store_path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.store_path).await?;
        Ok(())
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self) -> Result<T> {
        let bytes = tokio::fs::read(&self.store_path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl FavoritesBackend for FileFavoritesDb {
    async fn open(&self) -> Result<()> {
        let _txn = self.txn.lock().await;
        self.ensure_store().await
    }

    async fn read_all(&self) -> Result<Vec<FavoriteRecord>> {
        let _txn = self.txn.lock().await;
        self.ensure_store().await?;
        self.read_json().await
    }

    async fn replace_all(&self, records: &[FavoriteRecord]) -> Result<()> {
        let _txn = self.txn.lock().await;
        self.ensure_store().await?;
        let store = rewrite_object_store(records)?;
        self.write_json(&store).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_book;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = FileStorage::new(tmp.path());

        storage.set_item("book-search:history", "[]").unwrap();
        let data = storage.get_item("book-search:history").unwrap();
        assert_eq!(data, Some("[]".to_string()));
        assert!(tmp.path().join("local/book-search%3Ahistory.json").exists());
    }

    #[test]
    fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = FileStorage::new(tmp.path());

        assert!(storage.get_item("nope").unwrap().is_none());
        storage.remove_item("nope").unwrap();
    }

    #[test]
    fn test_separate_handles_share_files() {
        let tmp = TempDir::new().unwrap();
        FileStorage::new(tmp.path()).set_item("k", "v").unwrap();

        let reopened = FileStorage::new(tmp.path());
        assert_eq!(reopened.get_item("k").unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_tab_events() {
        let tmp = TempDir::new().unwrap();
        let a = FileStorage::new(tmp.path());
        let b = a.new_tab();
        let mut events = b.watch().unwrap();

        a.remove_item("k").unwrap();
        let event = events.recv().await.unwrap();
        assert_eq!(event.key.as_deref(), Some("k"));
        assert!(event.new_value.is_none());
    }

    #[tokio::test]
    async fn test_db_open_creates_store() {
        let tmp = TempDir::new().unwrap();
        let db = FileFavoritesDb::new(tmp.path(), &FavoritesConfig::default());

        db.open().await.unwrap();
        assert!(tmp.path().join("BookFavoritesDB/v1/favorites.json").exists());
        assert!(db.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_db_replace_all_persists_across_handles() {
        let tmp = TempDir::new().unwrap();
        let config = FavoritesConfig::default();
        let db = FileFavoritesDb::new(tmp.path(), &config);

        let records = FavoriteRecord::stamp_all(&[sample_book("1", "A"), sample_book("2", "B")]);
        db.replace_all(&records).await.unwrap();

        let reopened = FileFavoritesDb::new(tmp.path(), &config);
        let stored = reopened.read_all().await.unwrap();
        assert_eq!(stored, records);
    }

    #[tokio::test]
    async fn test_db_duplicate_key_aborts_transaction() {
        let tmp = TempDir::new().unwrap();
        let db = FileFavoritesDb::new(tmp.path(), &FavoritesConfig::default());

        let first = FavoriteRecord::stamp_all(&[sample_book("1", "A")]);
        db.replace_all(&first).await.unwrap();

        let book = sample_book("2", "B");
        let duplicate = FavoriteRecord::stamp_all(&[book.clone(), book]);
        assert!(db.replace_all(&duplicate).await.is_err());

        // Previous contents survive the aborted transaction
        assert_eq!(db.read_all().await.unwrap(), first);
    }
}

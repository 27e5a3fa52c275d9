// src/store/favorites.rs

//! Favorited books, persisted in an asynchronous database.
//!
//! The store loads the database once, on first use, and keeps the list in
//! memory afterwards. Every mutation rewrites the whole object store through
//! a single persist worker, so writes reach the database in call order.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::{mpsc, oneshot, watch};

use crate::models::Book;
use crate::storage::{FavoriteRecord, FavoritesBackend};
use crate::store::{Broadcaster, ExternalStore, Listener, Subscription, read, write};

/// Snapshot of the favorites, in insertion order.
pub type Favorites = Arc<Vec<Book>>;

/// Progress of the one-time database load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    Initializing,
    Ready,
}

impl InitState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Uninitialized,
            1 => Self::Initializing,
            _ => Self::Ready,
        }
    }
}

/// Deduplicated set of favorited books keyed by [`Book::id`].
///
/// Cloning yields another handle on the same store.
pub struct FavoritesStore<B: FavoritesBackend> {
    inner: Arc<FavoritesInner<B>>,
}

impl<B: FavoritesBackend> Clone for FavoritesStore<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct FavoritesInner<B> {
    backend: Arc<B>,
    favorites: RwLock<Favorites>,
    state: AtomicU8,
    // `None` until the load task has finished.
    queue: watch::Sender<Option<PersistQueue>>,
    listeners: Broadcaster<Favorites>,
    empty: Favorites,
}

struct PersistJob {
    records: Vec<FavoriteRecord>,
    done: oneshot::Sender<()>,
}

/// Sending half of the persist worker; created by initialization.
#[derive(Clone)]
struct PersistQueue {
    tx: mpsc::UnboundedSender<PersistJob>,
}

impl PersistQueue {
    /// Start the worker. It stops once the store, and with it the sender,
    /// is dropped and the queued jobs are drained.
    fn spawn<B: FavoritesBackend>(backend: Arc<B>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PersistJob>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match backend.replace_all(&job.records).await {
                    Ok(()) => log::debug!("Persisted {} favorites", job.records.len()),
                    Err(e) => log::warn!("Failed to persist favorites: {}", e),
                }
                let _ = job.done.send(());
            }
        });
        Self { tx }
    }
}

impl<B: FavoritesBackend> FavoritesStore<B> {
    pub fn new(backend: B) -> Self {
        let empty: Favorites = Arc::new(Vec::new());
        Self {
            inner: Arc::new(FavoritesInner {
                backend: Arc::new(backend),
                favorites: RwLock::new(Arc::clone(&empty)),
                state: AtomicU8::new(InitState::Uninitialized as u8),
                queue: watch::Sender::new(None),
                listeners: Broadcaster::new(),
                empty,
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    pub fn init_state(&self) -> InitState {
        InitState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Load the persisted favorites.
    ///
    /// The first call starts the load on its own task; every caller,
    /// including later ones, waits for that same load. Dropping a waiting
    /// caller does not cancel it. A failed load leaves the store ready and
    /// empty.
    pub async fn init(&self) {
        self.queue().await;
    }

    async fn queue(&self) -> Option<PersistQueue> {
        let started = self.inner.state.compare_exchange(
            InitState::Uninitialized as u8,
            InitState::Initializing as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if started.is_ok() {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.initialize().await });
        }

        let mut ready = self.inner.queue.subscribe();
        let queue = ready
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|queue| queue.clone());
        queue
    }

    /// Open the database ahead of first use, creating the object store.
    pub async fn open_database(&self) {
        match self.inner.backend.open().await {
            Ok(()) => log::info!("Favorites database opened"),
            Err(e) => log::error!("Failed to open favorites database: {}", e),
        }
    }

    /// Remove the book if it is a favorite, add it otherwise.
    ///
    /// Returns whether the book is a favorite afterwards.
    pub async fn toggle(&self, book: &Book) -> bool {
        let mut added = false;
        self.update(|current| {
            let next = if current.iter().any(|b| b.id == book.id) {
                current.iter().filter(|b| b.id != book.id).cloned().collect()
            } else {
                added = true;
                let mut next = current.to_vec();
                next.push(book.clone());
                next
            };
            Some(next)
        })
        .await;
        added
    }

    /// Append the book unless a favorite with the same id exists.
    ///
    /// Returns `false`, without persisting or notifying, for a duplicate.
    pub async fn add(&self, book: &Book) -> bool {
        self.update(|current| {
            if current.iter().any(|b| b.id == book.id) {
                return None;
            }
            let mut next = current.to_vec();
            next.push(book.clone());
            Some(next)
        })
        .await
    }

    /// Remove the favorite with the given id. Persists and notifies even
    /// when no such favorite exists.
    pub async fn remove(&self, id: &str) {
        self.update(|current| Some(current.iter().filter(|b| b.id != id).cloned().collect()))
            .await;
    }

    pub async fn clear(&self) {
        self.update(|_| Some(Vec::new())).await;
    }

    pub async fn is_favorite(&self, id: &str) -> bool {
        self.init().await;
        read(&self.inner.favorites).iter().any(|b| b.id == id)
    }

    pub async fn count(&self) -> usize {
        self.init().await;
        read(&self.inner.favorites).len()
    }

    /// Current favorites once the database has been loaded.
    pub async fn favorites(&self) -> Favorites {
        self.init().await;
        self.get_snapshot()
    }

    /// Ids of the current snapshot, for membership checks while rendering
    /// a result list.
    pub fn favorites_map(&self) -> HashSet<String> {
        self.get_snapshot().iter().map(|b| b.id.clone()).collect()
    }

    /// Register a listener.
    ///
    /// The current favorites are delivered to it once the store has been
    /// initialized, from a task on the ambient tokio runtime.
    pub fn subscribe(
        &self,
        listener: impl Fn(&Favorites) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_listener(Arc::new(listener))
    }

    fn subscribe_listener(&self, listener: Listener<Favorites>) -> Subscription {
        let subscription = self.inner.listeners.subscribe(Arc::clone(&listener));
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let store = self.clone();
                runtime.spawn(async move {
                    store.init().await;
                    listener(&store.get_snapshot());
                });
            }
            Err(_) => log::debug!("No async runtime, initial favorites delivery skipped"),
        }
        subscription
    }

    /// The in-memory favorites when ready, a stable empty list before.
    pub fn get_snapshot(&self) -> Favorites {
        if self.init_state() != InitState::Ready {
            return Arc::clone(&self.inner.empty);
        }
        Arc::clone(&read(&self.inner.favorites))
    }

    pub fn get_server_snapshot(&self) -> Favorites {
        Arc::clone(&self.inner.empty)
    }

    /// Apply `change` to the current list and, when it yields a new list,
    /// persist it and notify once the write settled.
    async fn update(&self, change: impl FnOnce(&[Book]) -> Option<Vec<Book>>) -> bool {
        let queue = self.queue().await;

        let settled = {
            let mut favorites = write(&self.inner.favorites);
            let Some(next) = change(favorites.as_slice()) else {
                return false;
            };
            *favorites = Arc::new(next);

            // Enqueue under the lock so persists follow memory order.
            let (done, settled) = oneshot::channel();
            let job = PersistJob {
                records: FavoriteRecord::stamp_all(favorites.as_slice()),
                done,
            };
            let sent = queue.is_some_and(|queue| queue.tx.send(job).is_ok());
            if !sent {
                log::warn!("Favorites persist worker has stopped");
            }
            settled
        };

        // Settles on success and failure alike; a dropped sender counts too.
        let _ = settled.await;
        self.inner.listeners.emit(&self.get_snapshot());
        true
    }
}

impl<B: FavoritesBackend> FavoritesInner<B> {
    async fn initialize(&self) {
        let favorites: Vec<Book> = match self.backend.read_all().await {
            Ok(records) => records.into_iter().map(|record| record.book).collect(),
            Err(e) => {
                log::warn!("Failed to load favorites, starting empty: {}", e);
                Vec::new()
            }
        };
        log::debug!("Loaded {} favorites", favorites.len());

        *write(&self.favorites) = Arc::new(favorites);
        let queue = PersistQueue::spawn(Arc::clone(&self.backend));
        self.state.store(InitState::Ready as u8, Ordering::Release);
        self.queue.send_replace(Some(queue));
    }
}

impl<B: FavoritesBackend> ExternalStore for FavoritesStore<B> {
    type Snapshot = Favorites;

    fn subscribe(&self, listener: Listener<Favorites>) -> Subscription {
        self.subscribe_listener(listener)
    }

    fn get_snapshot(&self) -> Favorites {
        FavoritesStore::get_snapshot(self)
    }

    fn get_server_snapshot(&self) -> Favorites {
        FavoritesStore::get_server_snapshot(self)
    }
}

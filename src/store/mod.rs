//! Observable client-side stores.
//!
//! Both stores own their in-memory list, persist it to a storage backend and
//! notify subscribers after every change:
//! - [`SearchHistoryStore`]: recent queries in synchronous key-value storage,
//!   kept consistent across tabs through storage events.
//! - [`FavoritesStore`]: favorited books in an asynchronous database, loaded
//!   once on first use and written back through a FIFO persist queue.
//!
//! Snapshots are `Arc`s: a snapshot never changes after it is handed out,
//! and an unchanged store hands out the same allocation again.

pub mod broadcast;
pub mod favorites;
pub mod history;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use broadcast::{Broadcaster, Listener, Subscription};
pub use favorites::{Favorites, FavoritesStore, InitState};
pub use history::{History, SearchHistoryStore};

/// The subscribe / snapshot contract a UI binding consumes.
pub trait ExternalStore {
    type Snapshot: Clone;

    /// Register a listener for changes.
    fn subscribe(&self, listener: Listener<Self::Snapshot>) -> Subscription;

    /// Current state.
    fn get_snapshot(&self) -> Self::Snapshot;

    /// Referentially stable empty state for contexts without storage.
    fn get_server_snapshot(&self) -> Self::Snapshot;
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

// src/lib.rs

//! Bookshelf Library
//!
//! Book search against the Kakao book search API, with an observable search
//! history and favorites list persisted on the client side.

pub mod api;
pub mod error;
pub mod models;
pub mod pagination;
pub mod session;
pub mod storage;
pub mod store;
pub mod utils;

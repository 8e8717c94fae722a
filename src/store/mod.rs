// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Key-value store contract and backends.
//!
//! The engine only depends on [`KvStore`]: write a record under a key, read a
//! record back into a typed destination. Prefixing, expiration and encoding
//! are backend concerns.
//!
//! | Backend | Encoding | Concurrency |
//! |---------|----------|-------------|
//! | [`InMemoryStore`] | none (stores clones) | single mutex around the map |
//! | [`RedisStore`] | pluggable [`Marshaler`] | multiplexed connection |
//!
//! # Implementing a backend
//!
//! ```rust
//! use kv_mirror::store::{BoxFuture, KvStore};
//! use kv_mirror::{StoreError, Syncable};
//!
//! struct NullStore;
//!
//! impl KvStore for NullStore {
//!     fn put<'a, R: Syncable>(&'a self, _key: &'a str, _value: &'a R) -> BoxFuture<'a, ()> {
//!         Box::pin(async { Ok(()) })
//!     }
//!
//!     fn fetch<'a, R: Syncable>(&'a self, key: &'a str, _dest: &'a mut R) -> BoxFuture<'a, ()> {
//!         Box::pin(async move { Err(StoreError::not_found(key)) })
//!     }
//! }
//! ```

mod marshal;
mod memory;
mod redis_store;

pub use self::marshal::{JsonMarshaler, Marshaler, MsgPackMarshaler};
pub use self::memory::InMemoryStore;
pub use self::redis_store::RedisStore;

use crate::error::StoreResult;
use crate::model::Syncable;
use std::future::Future;
use std::pin::Pin;

/// Type alias for boxed store futures (reduces trait signature complexity).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// The storage contract every backend satisfies.
///
/// Both methods are called concurrently from several worker tasks and from
/// synchronous callers; implementations synchronize internally. Concurrent
/// writes to the same key have backend-defined ordering.
pub trait KvStore: Send + Sync + 'static {
    /// Store `value` under `key`, replacing any previous value.
    fn put<'a, R: Syncable>(&'a self, key: &'a str, value: &'a R) -> BoxFuture<'a, ()>;

    /// Load the value under `key` into `dest`.
    ///
    /// Fails with [`StoreError::NotFound`](crate::StoreError::NotFound) when
    /// the key is absent. `dest` is left untouched on failure.
    fn fetch<'a, R: Syncable>(&'a self, key: &'a str, dest: &'a mut R) -> BoxFuture<'a, ()>;
}

// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Records, their lookup keys, and per-write reports.
//!
//! A record type opts into replication by implementing [`Syncable`]: given an
//! instance it names every access path (logical key) and the literal store key
//! (physical key) for that path.
//!
//! ```rust
//! use kv_mirror::{Syncable, SyncKeys};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! struct User {
//!     id: u64,
//!     uuid: String,
//!     name: String,
//! }
//!
//! impl Syncable for User {
//!     fn sync_keys(&self) -> SyncKeys {
//!         SyncKeys::from([
//!             ("id".to_string(), format!("user:id:{}", self.id)),
//!             ("uuid".to_string(), format!("user:uuid:{}", self.uuid)),
//!         ])
//!     }
//! }
//! ```

use crate::error::StoreError;
use crate::store::{BoxFuture, KvStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Logical key name → physical key.
///
/// Ordered so that the synchronous path writes keys in a stable order.
pub type SyncKeys = BTreeMap<String, String>;

/// The key-producing contract.
///
/// `sync_keys` is called on every fan-out, sync and fetch; it must be cheap and
/// free of side effects. Logical names must be non-empty and physical keys
/// must be deterministic for the record's identity fields, otherwise later
/// fetches will not find what was written.
pub trait Syncable: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Map every logical key name to its physical store key.
    fn sync_keys(&self) -> SyncKeys;
}

/// Outcome of one asynchronous write.
///
/// Exactly one report is produced per task a worker performs; the
/// synchronous path never produces reports.
#[derive(Debug)]
pub struct Report {
    /// The record that was written.
    pub model: Arc<dyn Any + Send + Sync>,
    /// Type name of the record (for logging).
    pub model_type: &'static str,
    /// Logical key name, e.g. `"id"`.
    pub key_name: String,
    /// Physical key the record was written under.
    pub key: String,
    /// Store error, `None` on success.
    pub error: Option<StoreError>,
}

impl Report {
    /// Borrow the record as its concrete type.
    pub fn model<R: 'static>(&self) -> Option<&R> {
        self.model.downcast_ref::<R>()
    }

    /// Whether the write succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Callback invoked by the dispatcher once per report.
///
/// Never called concurrently with itself. A slow observer throttles workers.
pub type Observer = Arc<dyn Fn(Report) + Send + Sync>;

/// A record with its concrete type erased, so one queue can carry many types.
pub(crate) trait ErasedRecord<S: KvStore>: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn physical_keys(&self) -> SyncKeys;

    fn put_into<'a>(&'a self, store: &'a S, key: &'a str) -> BoxFuture<'a, ()>;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<R: Syncable, S: KvStore> ErasedRecord<S> for R {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<R>()
    }

    fn physical_keys(&self) -> SyncKeys {
        Syncable::sync_keys(self)
    }

    fn put_into<'a>(&'a self, store: &'a S, key: &'a str) -> BoxFuture<'a, ()> {
        store.put(key, self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory store.
//!
//! Stores a clone of each record behind a single mutex. `fetch` hands back a
//! clone only when the destination has the same concrete type as the stored
//! value; there is no field-by-field copying between different types.

use super::{BoxFuture, KvStore};
use crate::error::StoreError;
use crate::model::Syncable;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

/// A [`KvStore`] backed by a `HashMap`.
#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Clone out the value under `key` if it has type `R`.
    pub fn get<R: Clone + 'static>(&self, key: &str) -> Option<R> {
        self.lock()
            .get(key)
            .and_then(|entry| entry.value.downcast_ref::<R>().cloned())
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("len", &self.len())
            .finish()
    }
}

impl KvStore for InMemoryStore {
    fn put<'a, R: Syncable>(&'a self, key: &'a str, value: &'a R) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let entry = Entry {
                value: Arc::new(value.clone()),
                type_name: std::any::type_name::<R>(),
            };
            self.lock().insert(key.to_string(), entry);
            Ok(())
        })
    }

    fn fetch<'a, R: Syncable>(&'a self, key: &'a str, dest: &'a mut R) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let guard = self.lock();
            let entry = guard.get(key).ok_or_else(|| StoreError::not_found(key))?;

            match entry.value.downcast_ref::<R>() {
                Some(value) => {
                    *dest = value.clone();
                    Ok(())
                }
                None => Err(StoreError::TypeMismatch {
                    key: key.to_string(),
                    stored: entry.type_name.to_string(),
                    destination: std::any::type_name::<R>().to_string(),
                }),
            }
        })
    }
}

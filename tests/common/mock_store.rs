//! Mock KvStore for testing.
//!
//! Records every put() and fetch() for assertions and delegates storage to an
//! [`InMemoryStore`]. Failures and latency can be injected per test.

use kv_mirror::store::BoxFuture;
use kv_mirror::{InMemoryStore, KvStore, StoreError, Syncable};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A recorded put() call.
#[derive(Debug, Clone, PartialEq)]
pub struct PutCall {
    pub key: String,
    pub model: &'static str,
}

/// Mock implementation of KvStore that records all calls.
///
/// # Example
/// ```rust,ignore
/// let mock = MockStore::new();
/// mock.fail_key("User:uuid:abc");
///
/// // Use in tests...
///
/// assert_eq!(mock.put_count(), 2);
/// ```
pub struct MockStore {
    inner: InMemoryStore,
    puts: Mutex<Vec<PutCall>>,
    fetches: Mutex<Vec<String>>,
    /// Puts numbered at or above this fail
    fail_after_puts: AtomicUsize,
    failing_keys: Mutex<HashSet<String>>,
    put_delay: Mutex<Option<Duration>>,
    put_count: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// A mock that accepts every write.
    pub fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
            puts: Mutex::new(Vec::new()),
            fetches: Mutex::new(Vec::new()),
            fail_after_puts: AtomicUsize::new(usize::MAX),
            failing_keys: Mutex::new(HashSet::new()),
            put_delay: Mutex::new(None),
            put_count: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// A mock whose every write fails.
    pub fn failing() -> Self {
        let mock = Self::new();
        mock.fail_after(0);
        mock
    }

    /// A mock whose writes each take `delay`.
    pub fn slow(delay: Duration) -> Self {
        let mock = Self::new();
        *mock.put_delay.lock().unwrap() = Some(delay);
        mock
    }

    // =========================================================================
    // Failure injection
    // =========================================================================

    /// Fail every put after the first `n`.
    pub fn fail_after(&self, n: usize) {
        self.fail_after_puts.store(n, Ordering::SeqCst);
    }

    /// Fail every put to `key`.
    pub fn fail_key(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    // =========================================================================
    // Assertions
    // =========================================================================

    pub fn puts(&self) -> Vec<PutCall> {
        self.puts.lock().unwrap().clone()
    }

    pub fn put_keys(&self) -> Vec<String> {
        self.puts().into_iter().map(|call| call.key).collect()
    }

    pub fn put_count(&self) -> usize {
        self.put_count.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    /// Highest number of puts observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// The backing store.
    pub fn storage(&self) -> &InMemoryStore {
        &self.inner
    }

    fn should_fail(&self, attempt: usize, key: &str) -> bool {
        attempt >= self.fail_after_puts.load(Ordering::SeqCst)
            || self.failing_keys.lock().unwrap().contains(key)
    }
}

impl KvStore for MockStore {
    fn put<'a, R: Syncable>(&'a self, key: &'a str, value: &'a R) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let attempt = self.put_count.fetch_add(1, Ordering::SeqCst);
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);

            let delay = *self.put_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            self.puts.lock().unwrap().push(PutCall {
                key: key.to_string(),
                model: std::any::type_name::<R>(),
            });

            let fail = self.should_fail(attempt, key);
            let result = if fail {
                Err(StoreError::Backend(format!("injected failure for {}", key)))
            } else {
                self.inner.put(key, value).await
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }

    fn fetch<'a, R: Syncable>(&'a self, key: &'a str, dest: &'a mut R) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.fetches.lock().unwrap().push(key.to_string());
            self.inner.fetch(key, dest).await
        })
    }
}

// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Mirror engine.
//!
//! The engine ties together:
//! - A bounded task queue fed by fan-out (one task per logical key)
//! - A fixed pool of worker tasks performing the store writes
//! - A single dispatcher forwarding per-write [`Report`]s to the observer
//! - A synchronous path that writes on the caller's task, bypassing the queue
//!
//! # Architecture
//!
//! ```text
//!  enqueue(record) ──► fan-out ──► [ bounded queue ] ──► worker 0..N ──► store.put
//!                      (per key)                              │
//!                                                             ▼
//!                                  observer ◄── dispatcher ◄── [ report channel ]
//!
//!  sync(record) ──► store.put (each key, in order, caller's task)
//!  fetch(dest, name) ──► store.fetch(dest.sync_keys()[name])
//! ```
//!
//! # Cancellation
//!
//! One watch channel, passed to [`MirrorEngine::start`], governs every worker
//! and the dispatcher. On cancellation they exit at their next wait point:
//! queued tasks are abandoned, a write already in progress completes but its
//! report may be dropped. Callers needing a full drain count reports in the
//! observer.

mod dispatcher;
mod worker;

use crate::config::MirrorConfig;
use crate::error::{MirrorError, Result, StoreError};
use crate::metrics;
use crate::model::{ErasedRecord, Observer, Report, Syncable};
use crate::registry::{Extracted, FetchFuture, Registry};
use crate::resolve::resolve;
use crate::store::KvStore;
use std::any::{Any, TypeId};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use self::worker::Task;

/// Capacity of the worker → dispatcher channel.
///
/// Tokio has no zero-capacity channel; one slot is the closest hand-off.
const REPORT_CHANNEL_CAPACITY: usize = 1;

/// Create a cancellation pair for [`MirrorEngine::start`].
///
/// Send `true` to cancel. Dropping the sender without sending never cancels.
pub fn cancellation() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Resolve once `cancel` reads `true`.
pub(crate) async fn wait_cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|cancelled| *cancelled).await.is_err() {
        // Sender dropped without cancelling.
        std::future::pending::<()>().await;
    }
}

/// Everything needed to start an engine.
pub struct MirrorOptions<S: KvStore> {
    /// Store shared by all workers and the synchronous path.
    pub store: Arc<S>,
    /// Worker pool sizing.
    pub config: MirrorConfig,
    /// Called once per asynchronous write.
    pub observer: Option<Observer>,
}

impl<S: KvStore> MirrorOptions<S> {
    /// Options with default config and no observer.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            config: MirrorConfig::default(),
            observer: None,
        }
    }

    /// Set the worker count.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Replace the whole config.
    pub fn config(mut self, config: MirrorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the report observer.
    pub fn observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(Report) + Send + Sync + 'static,
    {
        let observer: Observer = Arc::new(observer);
        self.observer = Some(observer);
        self
    }
}

struct Inner<S: KvStore> {
    store: Arc<S>,
    queue_tx: mpsc::Sender<Task<S>>,
    registry: Registry<S>,
    cancel_rx: watch::Receiver<bool>,
    runtime: Handle,
    workers: usize,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Handle to a running engine. Cheap to clone; all clones share one pool.
pub struct MirrorEngine<S: KvStore> {
    inner: Arc<Inner<S>>,
}

impl<S: KvStore> Clone for MirrorEngine<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: KvStore> MirrorEngine<S> {
    /// Start the worker pool and dispatcher on the current Tokio runtime.
    ///
    /// Spawns `max(workers, 1)` workers. Fails with [`MirrorError::Config`]
    /// when called outside a runtime.
    pub fn start(options: MirrorOptions<S>, cancel: watch::Receiver<bool>) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| MirrorError::Config(format!("no Tokio runtime: {}", e)))?;

        let workers = options.config.effective_workers();
        let queue_capacity = options.config.effective_queue_capacity();

        let (queue_tx, queue_rx) = mpsc::channel(queue_capacity);
        let (report_tx, report_rx) = mpsc::channel(REPORT_CHANNEL_CAPACITY);
        let queue_rx = Arc::new(Mutex::new(queue_rx));

        let mut handles = Vec::with_capacity(workers + 1);
        for id in 0..workers {
            handles.push(runtime.spawn(worker::run_worker(
                id,
                Arc::clone(&options.store),
                Arc::clone(&queue_rx),
                report_tx.clone(),
                cancel.clone(),
            )));
        }
        // Workers own the only senders: the dispatcher ends when they do.
        drop(report_tx);

        let has_observer = options.observer.is_some();
        handles.push(runtime.spawn(dispatcher::run_dispatcher(
            report_rx,
            options.observer,
            cancel.clone(),
        )));

        info!(workers, queue_capacity, observer = has_observer, "Mirror engine started");

        Ok(Self {
            inner: Arc::new(Inner {
                store: options.store,
                queue_tx,
                registry: Registry::new(),
                cancel_rx: cancel,
                runtime,
                workers,
                handles: Mutex::new(handles),
            }),
        })
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<S> {
        &self.inner.store
    }

    /// Number of worker tasks.
    pub fn workers(&self) -> usize {
        self.inner.workers
    }

    /// Whether the cancellation signal has fired.
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancel_rx.borrow()
    }

    /// Wait for every worker and the dispatcher to exit.
    ///
    /// Only resolves after cancellation. A second call returns immediately.
    pub async fn stopped(&self) {
        let handles = std::mem::take(&mut *self.inner.handles.lock().await);
        for (i, handle) in handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                warn!(task = i, error = %e, "Engine task panicked");
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Runtime capability registry
    // ─────────────────────────────────────────────────────────────────────────

    /// Make `R` syncable through the `*_dyn` entry points and the mutation
    /// hook.
    ///
    /// Also covers `Arc<R>`, `Box<R>`, `Option<R>`, `Vec<R>`, `Vec<Arc<R>>`
    /// and `Vec<Box<R>>`.
    pub fn register<R: Syncable>(&self) -> &Self {
        self.inner.registry.register::<R>();
        debug!(model = std::any::type_name::<R>(), "Registered record type");
        self
    }

    /// Whether `T` is one of the shapes installed by [`register`](Self::register).
    pub fn is_registered<T: 'static>(&self) -> bool {
        self.inner.registry.contains(TypeId::of::<T>())
    }

    /// Dereference `value` and clone out its records.
    fn extract(&self, value: &dyn Any) -> std::result::Result<Extracted<S>, Skipped> {
        let resolved = resolve(value).ok_or(Skipped::Absent)?;
        let adapter = self
            .inner
            .registry
            .lookup((*resolved).type_id())
            .ok_or(Skipped::Unregistered)?;
        let records = adapter.extract(resolved).ok_or(Skipped::Absent)?;
        debug!(model = adapter.type_name(), records = records.len(), "Resolved value");
        Ok(records)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Asynchronous path
    // ─────────────────────────────────────────────────────────────────────────

    /// Fan `record` out into one queued task per logical key.
    ///
    /// Waits while the queue is full. Returns the number of tasks queued, or
    /// [`MirrorError::Shutdown`] if cancelled first (tasks already queued stay
    /// queued).
    pub async fn enqueue<R: Syncable>(&self, record: &R) -> Result<usize> {
        self.enqueue_erased(Arc::new(record.clone())).await
    }

    /// Enqueue a value whose type is only known at run time.
    ///
    /// Unregistered or absent values are dropped silently (`Ok(0)`). A
    /// registered batch enqueues every element.
    pub fn enqueue_dyn<'a>(&'a self, value: &dyn Any) -> impl Future<Output = Result<usize>> + Send + 'a {
        let records = self.extract(value);

        async move {
            let records = match records {
                Ok(records) => records,
                Err(skipped) => {
                    metrics::record_dropped(skipped.label());
                    debug!(reason = skipped.label(), "Dropped value that is not syncable");
                    return Ok(0);
                }
            };

            let mut queued = 0;
            for record in records {
                queued += self.enqueue_erased(record).await?;
            }
            Ok(queued)
        }
    }

    async fn enqueue_erased(&self, record: Arc<dyn ErasedRecord<S>>) -> Result<usize> {
        let model = record.type_name();
        let mut cancel = self.inner.cancel_rx.clone();
        let mut queued = 0;

        for (key_name, key) in record.physical_keys() {
            let task = Task {
                record: Arc::clone(&record),
                key_name,
                key,
            };

            let sent = tokio::select! {
                biased;
                _ = wait_cancelled(&mut cancel) => false,
                sent = self.inner.queue_tx.send(task) => sent.is_ok(),
            };

            if !sent {
                metrics::record_tasks_enqueued(model, queued);
                debug!(model, queued, "Fan-out interrupted by shutdown");
                return Err(MirrorError::Shutdown);
            }
            queued += 1;
        }

        metrics::record_tasks_enqueued(model, queued);
        debug!(model, tasks = queued, "Enqueued fan-out");
        Ok(queued)
    }

    /// Build a callback for a post-mutation hook.
    ///
    /// The callback resolves the mutated value, drops it if it is not a
    /// registered record, and otherwise enqueues it on a spawned task so the
    /// mutating caller never waits on the queue. Batches are enqueued element
    /// by element.
    pub fn mutation_hook(&self) -> impl Fn(&dyn Any) + Send + Sync + 'static {
        let engine = self.clone();

        move |value: &dyn Any| {
            let records = match engine.extract(value) {
                Ok(records) => records,
                Err(skipped) => {
                    metrics::record_dropped(skipped.label());
                    return;
                }
            };

            for record in records {
                let worker_engine = engine.clone();
                engine.inner.runtime.spawn(async move {
                    if let Err(e) = worker_engine.enqueue_erased(record).await {
                        debug!(error = %e, "Hook enqueue abandoned");
                    }
                });
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Synchronous path
    // ─────────────────────────────────────────────────────────────────────────

    /// Write every key of `record` on the caller's task, in key-name order.
    ///
    /// Every key is attempted even after a failure; the first error is
    /// returned. No reports are produced.
    pub async fn sync<R: Syncable>(&self, record: &R) -> Result<()> {
        self.sync_erased(record).await
    }

    /// Synchronous write for a value whose type is only known at run time.
    ///
    /// Fails with [`MirrorError::NotSyncable`] for unregistered or absent
    /// values. A registered batch syncs every element.
    pub fn sync_dyn<'a>(&'a self, value: &dyn Any) -> impl Future<Output = Result<()>> + Send + 'a {
        let records = self.extract(value);

        async move {
            let records = records.map_err(|skipped| MirrorError::not_syncable(skipped.describe()))?;

            let mut first_error = None;
            for record in &records {
                if let Err(e) = self.sync_erased(&**record).await {
                    first_error.get_or_insert(e);
                }
            }
            first_error.map_or(Ok(()), Err)
        }
    }

    async fn sync_erased(&self, record: &dyn ErasedRecord<S>) -> Result<()> {
        let model = record.type_name();
        let mut first_error: Option<StoreError> = None;

        for (key_name, key) in record.physical_keys() {
            let started = Instant::now();
            let result = record.put_into(&self.inner.store, &key).await;
            metrics::record_put("sync", &key_name, result.is_ok(), started.elapsed());

            if let Err(e) = result {
                warn!(model, key_name = %key_name, key = %key, error = %e, "Synchronous write failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fetch
    // ─────────────────────────────────────────────────────────────────────────

    /// Load the record stored under `dest`'s `key_name` key into `dest`.
    ///
    /// The physical key is computed from `dest`'s current fields, so set the
    /// identity fields first. An unknown `key_name` yields an empty key, which
    /// the store reports as not found.
    pub async fn fetch<R: Syncable>(&self, dest: &mut R, key_name: &str) -> Result<()> {
        fetch_into(&*self.inner.store, dest, key_name).await
    }

    /// Fetch into a destination whose type is only known at run time.
    ///
    /// Fails with [`MirrorError::InvalidDestination`] before touching the
    /// store when `dest` is not a registered record type.
    pub fn fetch_dyn<'a>(&'a self, dest: &'a mut dyn Any, key_name: &'a str) -> FetchFuture<'a> {
        let type_id = (*dest).type_id();

        match self.inner.registry.lookup(type_id) {
            Some(adapter) => adapter.fetch(&self.inner.store, dest, key_name),
            None => Box::pin(std::future::ready(Err(MirrorError::InvalidDestination(
                "destination is not a registered record type".to_string(),
            )))),
        }
    }
}

/// Why a runtime value produced no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skipped {
    /// `None`, or an empty erased pointer.
    Absent,
    /// No record type registered for the concrete type.
    Unregistered,
}

impl Skipped {
    fn label(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Unregistered => "unregistered",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Absent => "absent value",
            Self::Unregistered => "unregistered type",
        }
    }
}

/// Typed fetch shared by [`MirrorEngine::fetch`] and the registry.
pub(crate) async fn fetch_into<S: KvStore, R: Syncable>(
    store: &S,
    dest: &mut R,
    key_name: &str,
) -> Result<()> {
    let key = dest.sync_keys().remove(key_name).unwrap_or_default();
    if key.is_empty() {
        debug!(
            model = std::any::type_name::<R>(),
            key_name, "No physical key for key name"
        );
    }

    match store.fetch(&key, dest).await {
        Ok(()) => {
            metrics::record_fetch(key_name, "hit");
            Ok(())
        }
        Err(e) => {
            metrics::record_fetch(key_name, e.kind());
            Err(e.into())
        }
    }
}

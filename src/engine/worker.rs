// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Worker loop: one store write per task, one report per write.
//!
//! Workers share a single bounded queue. Each iteration waits for either
//! cancellation or the next task; a task that has been picked up always runs
//! to completion, its report is then handed to the dispatcher.
//!
//! The report send blocks until the dispatcher takes it. A slow observer
//! therefore throttles worker throughput; that is the backpressure path from
//! observer to producers.

use super::wait_cancelled;
use crate::metrics;
use crate::model::{ErasedRecord, Report};
use crate::store::KvStore;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info_span, warn, Instrument};

/// One unit of fan-out: write `record` under `key`.
pub(crate) struct Task<S: KvStore> {
    pub(crate) record: Arc<dyn ErasedRecord<S>>,
    pub(crate) key_name: String,
    pub(crate) key: String,
}

pub(crate) type SharedQueue<S> = Arc<Mutex<mpsc::Receiver<Task<S>>>>;

/// Run a worker until cancellation or until the queue closes.
pub(crate) async fn run_worker<S: KvStore>(
    id: usize,
    store: Arc<S>,
    queue: SharedQueue<S>,
    reports: mpsc::Sender<Report>,
    mut cancel: watch::Receiver<bool>,
) {
    let span = info_span!("mirror_worker", worker = id);

    async move {
        metrics::worker_started();
        debug!("Worker started");

        loop {
            let next = tokio::select! {
                biased;
                _ = wait_cancelled(&mut cancel) => {
                    debug!("Worker cancelled");
                    break;
                }
                task = next_task(&queue) => task,
            };

            let Some(task) = next else {
                debug!("Task queue closed, worker exiting");
                break;
            };

            let report = perform(&*store, task).await;
            let key = report.key.clone();

            tokio::select! {
                biased;
                _ = wait_cancelled(&mut cancel) => {
                    metrics::record_report_dropped();
                    debug!(key = %key, "Cancelled before report was dispatched");
                    break;
                }
                sent = reports.send(report) => {
                    if sent.is_err() {
                        metrics::record_report_dropped();
                    }
                }
            }
        }

        metrics::worker_exited();
    }
    .instrument(span)
    .await
}

async fn next_task<S: KvStore>(queue: &Mutex<mpsc::Receiver<Task<S>>>) -> Option<Task<S>> {
    queue.lock().await.recv().await
}

/// Write one task and build its report. Errors never stop the worker.
pub(crate) async fn perform<S: KvStore>(store: &S, task: Task<S>) -> Report {
    let started = Instant::now();
    let result = task.record.put_into(store, &task.key).await;
    let elapsed = started.elapsed();
    let model_type = task.record.type_name();

    metrics::record_put("async", &task.key_name, result.is_ok(), elapsed);
    match &result {
        Ok(()) => debug!(
            model = model_type,
            key_name = %task.key_name,
            key = %task.key,
            latency_us = elapsed.as_micros() as u64,
            "Replicated"
        ),
        Err(e) => warn!(
            model = model_type,
            key_name = %task.key_name,
            key = %task.key,
            error = %e,
            "Replication write failed"
        ),
    }

    Report {
        model: task.record.into_any(),
        model_type,
        key_name: task.key_name,
        key: task.key,
        error: result.err(),
    }
}

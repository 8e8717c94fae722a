// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - Fan-out (tasks enqueued, records dropped)
//! - Store writes per path (async workers vs. synchronous callers)
//! - Report dispatch
//! - Fetches
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `kvmirror_` and follow Prometheus conventions:
//! - Counters end in `_total`
//! - Gauges represent current state
//! - Histograms track distributions (duration)
//!
//! No recorder is installed by this crate; without one every call is a no-op.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record tasks pushed onto the queue for one record.
pub fn record_tasks_enqueued(model: &str, count: usize) {
    counter!("kvmirror_tasks_enqueued_total", "model" => model.to_string()).increment(count as u64);
}

/// Record a value dropped before fan-out.
pub fn record_dropped(reason: &str) {
    counter!("kvmirror_records_dropped_total", "reason" => reason.to_string()).increment(1);
}

/// Record one store write.
///
/// `path` is `"async"` for worker writes and `"sync"` for the synchronous path.
pub fn record_put(path: &str, key_name: &str, success: bool, duration: Duration) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "kvmirror_puts_total",
        "path" => path.to_string(),
        "key_name" => key_name.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!("kvmirror_put_duration_seconds", "path" => path.to_string())
        .record(duration.as_secs_f64());
}

/// Record a report handed to the observer.
pub fn record_report_dispatched(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("kvmirror_reports_dispatched_total", "status" => status).increment(1);
}

/// Record a report lost to cancellation.
pub fn record_report_dropped() {
    counter!("kvmirror_reports_dropped_total").increment(1);
}

/// Record a fetch.
pub fn record_fetch(key_name: &str, outcome: &str) {
    counter!(
        "kvmirror_fetches_total",
        "key_name" => key_name.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// A worker task started.
///
/// Paired with [`worker_exited`] so engines sharing a process sum correctly.
pub fn worker_started() {
    gauge!("kvmirror_active_workers").increment(1.0);
}

/// A worker task exited.
pub fn worker_exited() {
    gauge!("kvmirror_active_workers").decrement(1.0);
}

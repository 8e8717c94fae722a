// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Report dispatcher.
//!
//! A single task drains the report channel and hands each report to the
//! observer. Because there is exactly one dispatcher, the observer is never
//! invoked concurrently with itself.

use super::wait_cancelled;
use crate::metrics;
use crate::model::{Observer, Report};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info_span, Instrument};

/// Run the dispatcher until cancellation or until every worker has exited.
pub(crate) async fn run_dispatcher(
    mut reports: mpsc::Receiver<Report>,
    observer: Option<Observer>,
    mut cancel: watch::Receiver<bool>,
) {
    async move {
        debug!(observer = observer.is_some(), "Dispatcher started");

        loop {
            let next = tokio::select! {
                biased;
                _ = wait_cancelled(&mut cancel) => {
                    debug!("Dispatcher cancelled");
                    break;
                }
                report = reports.recv() => report,
            };

            let Some(report) = next else {
                debug!("Report channel closed, dispatcher exiting");
                break;
            };

            metrics::record_report_dispatched(report.is_ok());
            if let Some(observer) = &observer {
                observer(report);
            }
        }
    }
    .instrument(info_span!("mirror_dispatcher"))
    .await
}

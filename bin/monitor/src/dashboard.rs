//! Refresh-loop observer: turns loop events into screen output and metrics.

use crate::{
    metrics::Metrics,
    render::{render_page, render_qr},
};
use client::MerchantApi;
use store::KeyValueStore;
use tracing::{debug, info, warn};
use withdrawal::{FetchOutcome, LoopEvent, ScanStatus, WithdrawalReconciler};

pub struct Dashboard {
    metrics: Metrics,
    qr_provider: String,
    remaining: Option<u64>,
}

impl Dashboard {
    pub fn new(metrics: Metrics, qr_provider: impl Into<String>) -> Self {
        Self {
            metrics,
            qr_provider: qr_provider.into(),
            remaining: None,
        }
    }

    /// Handle one loop event. Returns text to print, if the screen should change.
    pub fn on_event<A, S>(
        &mut self,
        reconciler: &WithdrawalReconciler<A, S>,
        event: &LoopEvent,
    ) -> Option<String>
    where
        A: MerchantApi,
        S: KeyValueStore,
    {
        match event {
            LoopEvent::Tick { remaining } => {
                self.remaining = Some(*remaining);
                if *remaining % 10 == 0 {
                    debug!(remaining, "Refresh countdown");
                }
                None
            }
            LoopEvent::FetchIssued { seq, show_loading } => {
                debug!(seq, show_loading, "Fetch issued");
                show_loading.then(|| render_page(reconciler, self.remaining))
            }
            LoopEvent::Fetched { outcome, elapsed } => match outcome {
                FetchOutcome::Applied {
                    new_keys, total, ..
                } => {
                    self.metrics.record_fetch(true, *elapsed);
                    self.metrics.record_rows(*total, *new_keys);
                    self.record_scan_counts(reconciler);
                    Some(render_page(reconciler, self.remaining))
                }
                FetchOutcome::Stale { .. } => {
                    self.metrics.record_stale_fetch();
                    None
                }
            },
            LoopEvent::FetchFailed { error, elapsed } => {
                warn!(%error, "Refresh failed");
                self.metrics.record_fetch(false, *elapsed);
                Some(render_page(reconciler, self.remaining))
            }
            LoopEvent::PageChanged => Some(render_page(reconciler, self.remaining)),
            LoopEvent::QrShown(payload) => {
                self.metrics.record_qr_shown();
                Some(render_qr(payload, &self.qr_provider))
            }
            LoopEvent::QrClosed => Some(render_page(reconciler, self.remaining)),
            LoopEvent::ScanDone(key) => {
                info!(key = %key, "Scan confirmed");
                self.metrics.record_scan_done();
                self.record_scan_counts(reconciler);
                Some(render_page(reconciler, self.remaining))
            }
            LoopEvent::CommandFailed(message) => Some(format!("error: {message}\n")),
        }
    }

    fn record_scan_counts<A, S>(&self, reconciler: &WithdrawalReconciler<A, S>)
    where
        A: MerchantApi,
        S: KeyValueStore,
    {
        let book = reconciler.scan_book();
        self.metrics
            .set_scan_status("pending", book.count(ScanStatus::Pending));
        self.metrics
            .set_scan_status("done", book.count(ScanStatus::Done));
    }
}

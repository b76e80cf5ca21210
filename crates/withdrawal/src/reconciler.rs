//! The withdrawal reconciler: owns the merged superset, the scan status book
//! and the page state.
//!
//! A fetch is split into [`WithdrawalReconciler::begin_fetch`], which reads the
//! token and issues a sequence number, and [`WithdrawalReconciler::apply_fetch`],
//! which folds the response in. Only the most recently issued fetch is applied,
//! so a slow response can never overwrite newer data.

use crate::{
    error::ReconcileError,
    merge::{merge_rows, row_keys},
    page::{PageSize, PageState},
    qr::QrPayload,
    scan::ScanBook,
    types::{ScanStatus, WithdrawalKey, WithdrawalRecord},
    view::WithdrawalRow,
};
use client::{ClientError, MerchantApi};
use config::MerchantConfig;
use serde_json::Value;
use store::KeyValueStore;
use tracing::{debug, error, info, warn};

/// A fetch that has been issued but not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub show_loading: bool,
    token: String,
    per_page: u32,
}

impl FetchTicket {
    /// Request page 1 of the withdrawal feed.
    pub async fn run<A: MerchantApi>(&self, api: &A) -> Result<Vec<Value>, ClientError> {
        api.fetch_withdrawals(&self.token, 1, self.per_page).await
    }
}

/// A customer name lookup for an open QR, run apart from the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberLookup {
    pub key: WithdrawalKey,
    member_id: String,
    token: String,
}

impl MemberLookup {
    pub async fn run<A: MerchantApi>(&self, api: &A) -> Result<Value, ClientError> {
        api.fetch_member(&self.token, &self.member_id).await
    }

    /// Fold the lookup result into `payload`. Returns whether the name changed.
    ///
    /// On failure the payload keeps its fields and gains a note.
    pub fn apply(
        &self,
        payload: &mut QrPayload,
        result: Result<Value, ClientError>,
    ) -> Result<bool, ReconcileError> {
        match result {
            Ok(detail) => Ok(payload.apply_member_detail(&detail)),
            Err(e) => {
                warn!(member_id = %self.member_id, error = %e, "Customer name lookup failed");
                payload.annotate_lookup_failure();
                Err(ReconcileError::SecondaryLookupFailed(e.to_string()))
            }
        }
    }
}

/// Result of applying a fetch response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Response folded into the superset
    Applied {
        fetched: usize,
        new_keys: usize,
        total: usize,
    },
    /// A newer fetch was issued after this one; the response was dropped
    Stale { seq: u64, latest: u64 },
}

pub struct WithdrawalReconciler<A, S> {
    api: A,
    store: S,
    per_page: u32,
    token_key: String,
    rows: Vec<WithdrawalRecord>,
    scan: ScanBook,
    page: PageState,
    loading_seq: Option<u64>,
    error: Option<String>,
    issued: u64,
}

impl<A, S> WithdrawalReconciler<A, S>
where
    A: MerchantApi,
    S: KeyValueStore,
{
    pub fn new(api: A, store: S, config: &MerchantConfig) -> Self {
        let page_size = PageSize::try_from(config.default_page_size).unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default page size");
            PageSize::default()
        });
        let scan = ScanBook::load(&store, &config.scan_status_key);

        Self {
            api,
            store,
            per_page: config.per_page,
            token_key: config.token_key.clone(),
            rows: Vec::new(),
            scan,
            page: PageState::new(page_size),
            loading_seq: None,
            error: None,
            issued: 0,
        }
    }

    pub const fn api(&self) -> &A {
        &self.api
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// All merged rows, newest fetch first.
    pub fn rows(&self) -> &[WithdrawalRecord] {
        &self.rows
    }

    /// Keys of the merged rows, in order.
    pub fn keys(&self) -> Vec<WithdrawalKey> {
        row_keys(&self.rows)
    }

    pub const fn scan_book(&self) -> &ScanBook {
        &self.scan
    }

    pub const fn page(&self) -> &PageState {
        &self.page
    }

    pub const fn is_loading(&self) -> bool {
        self.loading_seq.is_some()
    }

    /// Message of the last failed operation, cleared by the next fetch.
    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Sequence number of the most recently issued fetch.
    pub const fn latest_seq(&self) -> u64 {
        self.issued
    }

    /// Fetch the newest page and fold it in.
    ///
    /// Failures are recorded for display and also returned for logging.
    pub async fn fetch_latest(&mut self, show_loading: bool) -> Result<FetchOutcome, ReconcileError> {
        let ticket = self.begin_fetch(show_loading)?;
        let result = ticket.run(&self.api).await;
        self.apply_fetch(&ticket, result)
    }

    /// Read the auth token and issue a new fetch sequence number.
    ///
    /// Without a token nothing is issued and the error is recorded.
    pub fn begin_fetch(&mut self, show_loading: bool) -> Result<FetchTicket, ReconcileError> {
        let token = match self.token() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Cannot fetch withdrawals");
                self.error = Some(e.to_string());
                if show_loading {
                    self.loading_seq = None;
                }
                return Err(e);
            }
        };

        self.issued += 1;
        self.error = None;
        if show_loading {
            self.loading_seq = Some(self.issued);
        }

        debug!(seq = self.issued, show_loading, "Issued withdrawal fetch");

        Ok(FetchTicket {
            seq: self.issued,
            show_loading,
            token,
            per_page: self.per_page,
        })
    }

    /// Apply the response of an issued fetch.
    pub fn apply_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<Value>, ClientError>,
    ) -> Result<FetchOutcome, ReconcileError> {
        if self.loading_seq.is_some_and(|seq| seq <= ticket.seq) {
            self.loading_seq = None;
        }

        if ticket.seq < self.issued {
            warn!(
                seq = ticket.seq,
                latest = self.issued,
                "Dropping stale withdrawal response"
            );
            return Ok(FetchOutcome::Stale {
                seq: ticket.seq,
                latest: self.issued,
            });
        }

        let list = match result {
            Ok(list) => list,
            Err(e) => {
                let err = ReconcileError::from(e);
                error!(seq = ticket.seq, error = %err, "Withdrawal fetch failed");
                self.error = Some(err.to_string());
                return Err(err);
            }
        };

        let fetched = list.len();
        let incoming: Vec<WithdrawalRecord> = list
            .into_iter()
            .filter_map(|value| {
                let record = WithdrawalRecord::from_value(value);
                if record.is_none() {
                    warn!("Skipping withdrawal entry that is not an object");
                }
                record
            })
            .collect();

        let keys = row_keys(&incoming);
        self.scan.sync(&self.store);
        let existing = std::mem::take(&mut self.rows);
        self.rows = merge_rows(existing, incoming);
        let new_keys = self.scan.observe(&mut self.store, keys);
        self.page.clamp(self.rows.len());
        self.error = None;

        info!(
            seq = ticket.seq,
            fetched,
            new_keys,
            total = self.rows.len(),
            "Merged withdrawals"
        );

        Ok(FetchOutcome::Applied {
            fetched,
            new_keys,
            total: self.rows.len(),
        })
    }

    /// Mark a withdrawal as scanned.
    pub fn record_scan_done(&mut self, key: &str) {
        self.scan.mark_done(&mut self.store, key);
        info!(key, "Marked withdrawal scanned");
    }

    pub fn scan_status(&self, key: &str) -> ScanStatus {
        self.scan.status(key)
    }

    /// Find a row by key, returning its index in the merged list.
    pub fn find(&self, key: &str) -> Option<(usize, &WithdrawalRecord)> {
        self.rows
            .iter()
            .enumerate()
            .find(|(index, row)| row.key(*index) == key)
    }

    /// Rows on the current page, ready for display.
    pub fn current_page_rows(&self) -> Vec<WithdrawalRow> {
        let start = self.page.start_index();
        self.page
            .slice(&self.rows)
            .iter()
            .enumerate()
            .map(|(offset, record)| {
                let index = start + offset;
                let key = record.key(index);
                let status = self.scan.status(&key);
                WithdrawalRow::new(index, key, record, status)
            })
            .collect()
    }

    pub fn total_pages(&self) -> usize {
        self.page.total_pages(self.rows.len())
    }

    /// Navigate to `page`; out-of-range requests are ignored.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        self.page.go_to(page, self.rows.len())
    }

    pub fn next_page(&mut self) -> bool {
        self.page.next(self.rows.len())
    }

    pub fn previous_page(&mut self) -> bool {
        self.page.previous(self.rows.len())
    }

    /// Change rows per page and return to page 1.
    pub fn set_page_size(&mut self, size: PageSize) {
        self.page.set_page_size(size);
        self.page.clamp(self.rows.len());
    }

    /// Build the QR payload for the row with `key`.
    pub fn qr_payload(&self, key: &str) -> Result<QrPayload, ReconcileError> {
        let (_, record) = self
            .find(key)
            .ok_or_else(|| ReconcileError::UnknownKey(key.to_string()))?;

        QrPayload::from_record(record, key.to_string())
    }

    /// Prepare the customer name lookup for `payload`.
    ///
    /// `None` without a member id or without a token. Storage errors are
    /// returned.
    pub fn begin_member_lookup(&self, payload: &QrPayload) -> Result<Option<MemberLookup>, ReconcileError> {
        let Some(member_id) = payload.member_id.clone() else {
            return Ok(None);
        };
        let token = match self.token() {
            Ok(token) => token,
            Err(ReconcileError::Unauthenticated { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(Some(MemberLookup {
            key: payload.withdraw_key.clone(),
            member_id,
            token,
        }))
    }

    /// Best-effort lookup of the customer's real name.
    ///
    /// Returns whether the name changed. On failure the payload keeps its
    /// fields and gains a note; the error is returned for logging only.
    pub async fn resolve_customer_name(&self, payload: &mut QrPayload) -> Result<bool, ReconcileError> {
        let Some(lookup) = self.begin_member_lookup(payload)? else {
            return Ok(false);
        };
        let result = lookup.run(&self.api).await;
        lookup.apply(payload, result)
    }

    /// Build a QR payload and try to fill in the customer's real name.
    pub async fn show_qr(&self, key: &str) -> Result<QrPayload, ReconcileError> {
        let mut payload = self.qr_payload(key)?;
        match self.resolve_customer_name(&mut payload).await {
            // Lookup failures are already annotated on the payload
            Ok(_) | Err(ReconcileError::SecondaryLookupFailed(_)) => {}
            Err(e) => warn!(key, error = %e, "Customer name lookup skipped"),
        }
        Ok(payload)
    }

    /// The operator paid the QR: mark its withdrawal scanned.
    pub fn confirm_qr(&mut self, payload: &QrPayload) {
        self.record_scan_done(&payload.withdraw_key);
    }

    fn token(&self) -> Result<String, ReconcileError> {
        let token = self.store.get(&self.token_key)?;
        token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ReconcileError::Unauthenticated {
                key: self.token_key.clone(),
            })
    }
}

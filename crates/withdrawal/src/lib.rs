//! Withdrawal reconciliation for the merchant back office dashboard.
//!
//! The merchant API only returns the newest page of withdrawals. This crate
//! accumulates everything seen into a deduplicated superset, tracks which
//! withdrawals the operator has paid by QR, and drives the dashboard's
//! pagination and refresh countdown.

pub mod error;
pub mod merge;
pub mod page;
pub mod qr;
pub mod reconciler;
pub mod refresh;
pub mod scan;
pub mod types;
pub mod view;

pub use error::ReconcileError;
pub use merge::merge_rows;
pub use page::{PageSize, PageState};
pub use qr::QrPayload;
pub use reconciler::{FetchOutcome, FetchTicket, MemberLookup, WithdrawalReconciler};
pub use refresh::{Command, LoopEvent, RefreshLoop, RefreshTimer};
pub use scan::ScanBook;
pub use types::{ScanStatus, WithdrawalKey, WithdrawalRecord};
pub use view::WithdrawalRow;

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::reconciler::WithdrawalReconciler;
    use client::{ClientError, MerchantApi};
    use config::MerchantConfig;
    use serde_json::Value;
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };
    use store::MemoryStore;

    pub const TOKEN_KEY: &str = "auth_token.laravelJWT";

    #[derive(Default)]
    struct Inner {
        pages: VecDeque<Result<Vec<Value>, u16>>,
        member: Option<Result<Value, u16>>,
        withdrawal_calls: usize,
        last_token: Option<String>,
    }

    /// Scripted merchant API. Pages are served in push order, then empty.
    #[derive(Clone, Default)]
    pub struct MockApi {
        inner: Arc<Mutex<Inner>>,
    }

    impl MockApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_page(&self, rows: Vec<Value>) {
            self.inner.lock().unwrap().pages.push_back(Ok(rows));
        }

        pub fn push_error(&self, status: u16) {
            self.inner.lock().unwrap().pages.push_back(Err(status));
        }

        pub fn set_member(&self, detail: Value) {
            self.inner.lock().unwrap().member = Some(Ok(detail));
        }

        pub fn fail_member(&self, status: u16) {
            self.inner.lock().unwrap().member = Some(Err(status));
        }

        pub fn withdrawal_calls(&self) -> usize {
            self.inner.lock().unwrap().withdrawal_calls
        }

        pub fn last_token(&self) -> Option<String> {
            self.inner.lock().unwrap().last_token.clone()
        }
    }

    fn status_error(status: u16) -> ClientError {
        ClientError::Status {
            status,
            body: "mock".to_string(),
        }
    }

    impl MerchantApi for MockApi {
        async fn fetch_withdrawals(
            &self,
            token: &str,
            _page: u32,
            _per_page: u32,
        ) -> Result<Vec<Value>, ClientError> {
            let mut inner = self.inner.lock().unwrap();
            inner.withdrawal_calls += 1;
            inner.last_token = Some(token.to_string());
            match inner.pages.pop_front() {
                Some(Ok(rows)) => Ok(rows),
                Some(Err(status)) => Err(status_error(status)),
                None => Ok(Vec::new()),
            }
        }

        async fn fetch_member(&self, _token: &str, _member_id: &str) -> Result<Value, ClientError> {
            match self.inner.lock().unwrap().member.clone() {
                Some(Ok(detail)) => Ok(detail),
                Some(Err(status)) => Err(status_error(status)),
                None => Ok(Value::Null),
            }
        }
    }

    pub fn reconciler_with(
        api: MockApi,
        store: MemoryStore,
    ) -> WithdrawalReconciler<MockApi, MemoryStore> {
        WithdrawalReconciler::new(api, store, &MerchantConfig::default())
    }
}

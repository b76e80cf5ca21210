use client::ClientError;
use store::StoreError;
use thiserror::Error;

/// Failures surfaced by the withdrawal dashboard.
///
/// Every variant is caught at the operation boundary and kept for display.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// No auth token in durable storage
    #[error("no auth token found in storage ({key})")]
    Unauthenticated { key: String },

    /// Non-success status or unusable response from the merchant API
    #[error("failed to load withdrawals{}: {}", status_suffix(.status), .message)]
    Upstream { status: Option<u16>, message: String },

    /// QR preconditions unmet: no phone or no amount
    #[error("no phone number or amount available for a PromptPay QR")]
    MissingPaymentInfo,

    /// Customer name lookup failed; the QR itself is still valid
    #[error("customer name lookup failed: {0}")]
    SecondaryLookupFailed(String),

    /// No row with this key in the current superset
    #[error("unknown withdrawal key: {0}")]
    UnknownKey(String),

    #[error("page size {0} is not one of 20, 30, 50, 100")]
    InvalidPageSize(usize),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ClientError> for ReconcileError {
    fn from(err: ClientError) -> Self {
        Self::Upstream {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

mod merchant;

pub use merchant::MerchantClient;
use serde_json::Value;
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Error parsing or validating URLs
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from the merchant API
    #[error("merchant API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not valid JSON
    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Read access to the merchant back office API.
pub trait MerchantApi: Send + Sync {
    /// Fetch one page of the withdrawal list.
    ///
    /// Returns the raw record array, already unwrapped from the response envelope.
    fn fetch_withdrawals(
        &self,
        token: &str,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Vec<Value>, ClientError>> + Send;

    /// Fetch a member's detail object, unwrapped from an optional `data` envelope.
    fn fetch_member(
        &self,
        token: &str,
        member_id: &str,
    ) -> impl Future<Output = Result<Value, ClientError>> + Send;
}

/// Pull the record array out of a withdrawal list response.
///
/// The API has been seen to return the array either at `data` or at
/// `data.data`. Anything else yields an empty list.
pub fn extract_withdrawals(body: Value) -> Vec<Value> {
    let Value::Object(mut root) = body else {
        return Vec::new();
    };

    match root.remove("data") {
        Some(Value::Array(list)) => list,
        Some(Value::Object(mut inner)) => match inner.remove("data") {
            Some(Value::Array(list)) => list,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Unwrap a member detail response from its optional `data` envelope.
pub fn extract_member(body: Value) -> Value {
    match body {
        Value::Object(mut root) if root.get("data").is_some_and(Value::is_object) => {
            root.remove("data").unwrap_or_default()
        }
        other => other,
    }
}

/// Format the `Authorization` header value for a stored token.
///
/// Tokens that already carry a scheme (e.g. `Bearer abc`) are sent verbatim.
pub fn authorization_value(token: &str) -> String {
    let token = token.trim();
    if token.contains(' ') {
        token.to_string()
    } else {
        format!("Bearer {token}")
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Stable identity of a withdrawal, used for dedup, merge and scan status.
pub type WithdrawalKey = String;

const KEY_FIELDS: &[&str] = &["transaction_id", "ref_statement_id", "id"];
const AMOUNT_FIELDS: &[&str] = &["amount", "total_amount", "value"];
const BANK_FIELDS: &[&str] = &["bank_name", "bank_account_name", "bank.name", "bank.code"];
const USERNAME_FIELDS: &[&str] = &[
    "member.username",
    "member_username",
    "member_account",
    "username",
];
const TIMESTAMP_FIELDS: &[&str] = &["created_at", "transaction_at", "requested_at"];
const OPERATOR_FIELDS: &[&str] = &["operator_name", "agent_name", "created_by"];
const PHONE_FIELDS: &[&str] = &[
    "member.phone_number",
    "operator_name",
    "agent_name",
    "created_by",
];
const MEMBER_ID_FIELDS: &[&str] = &["member.id", "member_id"];

/// Placeholder shown for a missing display field.
pub const MISSING: &str = "-";

/// Manual operator acknowledgement of a withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Done,
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Done => f.write_str("done"),
        }
    }
}

/// One withdrawal entry as returned by the merchant feed.
///
/// The upstream shape varies between API versions, so the record is kept as
/// an open JSON object and every accessor reads a list of candidate fields,
/// taking the first one that is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WithdrawalRecord(Map<String, Value>);

impl WithdrawalRecord {
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a feed entry. Returns `None` for anything that is not a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub const fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Look up a field by dotted path, e.g. `member.username`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Derive this record's key. `index` is its position in the list being keyed.
    pub fn key(&self, index: usize) -> WithdrawalKey {
        self.first_text(KEY_FIELDS)
            .unwrap_or_else(|| format!("row-{index}"))
    }

    /// Overlay `newer`'s fields onto this record. Fields only present here survive.
    pub fn overlay(&mut self, newer: &Self) {
        for (field, value) in &newer.0 {
            self.0.insert(field.clone(), value.clone());
        }
    }

    /// Raw amount value, before numeric parsing.
    pub fn amount_raw(&self) -> Option<&Value> {
        self.first_set(AMOUNT_FIELDS)
    }

    /// Amount parsed as a number. `None` when missing or not numeric.
    pub fn amount(&self) -> Option<f64> {
        self.amount_raw().and_then(number)
    }

    pub fn bank_label(&self) -> String {
        self.text_or_missing(BANK_FIELDS)
    }

    pub fn username(&self) -> String {
        self.text_or_missing(USERNAME_FIELDS)
    }

    /// Account number the customer asked to be paid into, as listed in the table.
    pub fn account_reference(&self) -> Option<String> {
        self.first_text(&["request_bank_account_no"])
    }

    /// Account number for the QR popup, with the nested bank account as fallback.
    pub fn bank_account_no(&self) -> String {
        self.text_or_missing(&["request_bank_account_no", "bank_account.bank_account_no"])
    }

    pub fn timestamp(&self) -> Option<String> {
        self.first_text(TIMESTAMP_FIELDS)
    }

    pub fn operator(&self) -> String {
        self.text_or_missing(OPERATOR_FIELDS)
    }

    /// Unnormalized phone-like identifier used as the PromptPay target.
    pub fn phone_source(&self) -> Option<String> {
        self.first_text(PHONE_FIELDS)
    }

    pub fn member_id(&self) -> Option<String> {
        self.first_text(MEMBER_ID_FIELDS)
    }

    /// Whether the record carries enough to offer a payment QR.
    pub fn has_payment_info(&self) -> bool {
        self.phone_source().is_some() && self.amount_raw().is_some()
    }

    fn first_set(&self, paths: &[&str]) -> Option<&Value> {
        paths
            .iter()
            .filter_map(|path| self.get(path))
            .find(|value| is_set(value))
    }

    fn first_text(&self, paths: &[&str]) -> Option<String> {
        self.first_set(paths).map(text)
    }

    fn text_or_missing(&self, paths: &[&str]) -> String {
        self.first_text(paths)
            .unwrap_or_else(|| MISSING.to_string())
    }
}

impl From<Map<String, Value>> for WithdrawalRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Upstream treats null, `false`, `0`, `""` and NaN as "not provided".
pub fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a field value as display text.
pub fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse a field value as a finite number.
pub fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

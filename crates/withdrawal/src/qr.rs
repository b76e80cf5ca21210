//! PromptPay QR payloads for paying out a withdrawal.
//!
//! No QR is rendered locally: the payload only yields the provider image url
//! `<provider>/<phone>/<amount>.png`.

use crate::{
    error::ReconcileError,
    types::{is_set, text, WithdrawalKey, WithdrawalRecord},
};
use serde_json::Value;

const NAME_FIELDS: &[&str] = &[
    "fullNameTH",
    "fullNameEN",
    "customer_name",
    "member_name",
    "full_name",
    "fullname",
];

/// Leading word banks often carry in their Thai display name ("Bank ...").
const BANK_PREFIX: &str = "ธนาคาร";

/// Note attached when the customer name lookup fails.
pub const LOOKUP_FAILED_NOTE: &str = "customer name lookup failed (QR is still valid)";

/// Everything the operator needs to pay a withdrawal by QR.
#[derive(Debug, Clone, PartialEq)]
pub struct QrPayload {
    pub withdraw_key: WithdrawalKey,
    pub customer_name: String,
    pub username: String,
    pub bank_name: String,
    pub bank_account_no: String,
    /// Phone as found on the record
    pub phone_raw: String,
    /// Digits only
    pub phone: String,
    pub amount: f64,
    /// Member id for the best-effort real name lookup
    pub member_id: Option<String>,
    /// Non-fatal annotation shown next to the QR
    pub note: Option<String>,
}

impl QrPayload {
    /// Derive a payload from a record.
    ///
    /// Fails with [`ReconcileError::MissingPaymentInfo`] when the record has no
    /// usable phone number or a zero/unparsable amount.
    pub fn from_record(record: &WithdrawalRecord, key: WithdrawalKey) -> Result<Self, ReconcileError> {
        let phone_raw = record.phone_source().unwrap_or_default();
        let phone = normalize_phone(&phone_raw);
        let amount = record.amount().unwrap_or(0.0);

        if phone.is_empty() || amount == 0.0 {
            return Err(ReconcileError::MissingPaymentInfo);
        }

        let username = record.username();

        Ok(Self {
            withdraw_key: key,
            customer_name: username.clone(),
            username,
            bank_name: record.bank_label(),
            bank_account_no: record.bank_account_no(),
            phone_raw,
            phone,
            amount,
            member_id: record.member_id(),
            note: None,
        })
    }

    /// Provider image url, e.g. `https://promptpay.io/0812345678/1500.50.png`.
    pub fn image_url(&self, provider: &str) -> String {
        format!(
            "{}/{}/{:.2}.png",
            provider.trim_end_matches('/'),
            self.phone,
            self.amount
        )
    }

    /// Bank name without the leading "ธนาคาร".
    pub fn bank_display_name(&self) -> &str {
        self.bank_name
            .strip_prefix(BANK_PREFIX)
            .map_or(self.bank_name.as_str(), str::trim_start)
    }

    /// Apply a member detail object. Keeps the current name if none is found.
    pub fn apply_member_detail(&mut self, detail: &Value) -> bool {
        match member_real_name(detail) {
            Some(name) => {
                self.customer_name = name;
                true
            }
            None => false,
        }
    }

    /// Record a failed name lookup without touching anything else.
    pub fn annotate_lookup_failure(&mut self) {
        self.note = Some(LOOKUP_FAILED_NOTE.to_string());
    }
}

/// Strip everything but ASCII digits.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Pick the most complete real name from a member detail object.
pub fn member_real_name(detail: &Value) -> Option<String> {
    let detail = detail.as_object()?;
    let field = |name: &str| detail.get(name).filter(|v| is_set(v)).map(text);

    NAME_FIELDS
        .iter()
        .find_map(|name| field(name))
        .or_else(|| match (field("first_name"), field("last_name")) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            _ => None,
        })
        .or_else(|| field("name"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> WithdrawalRecord {
        WithdrawalRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_image_url_formats_two_decimals() {
        let r = record(json!({ "member": { "phone_number": "0812345678" }, "amount": 1500.5 }));
        let payload = QrPayload::from_record(&r, "k".to_string()).unwrap();

        let url = payload.image_url("https://promptpay.io/");
        assert_eq!(url, "https://promptpay.io/0812345678/1500.50.png");
        assert!(url.ends_with("/0812345678/1500.50.png"));
    }

    #[test]
    fn test_phone_is_normalized() {
        let r = record(json!({ "operator_name": "081-234-5678 ", "total_amount": "200" }));
        let payload = QrPayload::from_record(&r, "k".to_string()).unwrap();

        assert_eq!(payload.phone, "0812345678");
        assert_eq!(payload.phone_raw, "081-234-5678 ");
        assert_eq!(payload.amount, 200.0);
    }

    #[test]
    fn test_missing_payment_info() {
        let no_phone = record(json!({ "amount": 100 }));
        assert!(matches!(
            QrPayload::from_record(&no_phone, "a".to_string()),
            Err(ReconcileError::MissingPaymentInfo)
        ));

        let letters_only = record(json!({ "operator_name": "admin", "amount": 100 }));
        assert!(matches!(
            QrPayload::from_record(&letters_only, "b".to_string()),
            Err(ReconcileError::MissingPaymentInfo)
        ));

        let zero_amount = record(json!({ "operator_name": "0812345678", "amount": "0.00" }));
        assert!(matches!(
            QrPayload::from_record(&zero_amount, "c".to_string()),
            Err(ReconcileError::MissingPaymentInfo)
        ));
    }

    #[test]
    fn test_payload_fields() {
        let r = record(json!({
            "transaction_id": "TX1",
            "member": { "id": 77, "username": "user77", "phone_number": "0899999999" },
            "bank_name": "ธนาคารกสิกรไทย",
            "bank_account": { "bank_account_no": "123-4-56789-0" },
            "amount": "350"
        }));
        let payload = QrPayload::from_record(&r, r.key(0)).unwrap();

        assert_eq!(payload.withdraw_key, "TX1");
        assert_eq!(payload.customer_name, "user77");
        assert_eq!(payload.bank_display_name(), "กสิกรไทย");
        assert_eq!(payload.bank_account_no, "123-4-56789-0");
        assert_eq!(payload.member_id.as_deref(), Some("77"));
    }

    #[test]
    fn test_member_real_name_priority() {
        assert_eq!(
            member_real_name(&json!({ "name": "nick", "fullNameEN": "Somchai Jaidee" })).as_deref(),
            Some("Somchai Jaidee")
        );
        assert_eq!(
            member_real_name(&json!({ "first_name": "Somchai", "last_name": "Jaidee", "name": "nick" }))
                .as_deref(),
            Some("Somchai Jaidee")
        );
        assert_eq!(
            member_real_name(&json!({ "first_name": "Somchai", "name": "nick" })).as_deref(),
            Some("nick")
        );
        assert_eq!(member_real_name(&json!({ "fullNameTH": "" })), None);
        assert_eq!(member_real_name(&json!("x")), None);
    }

    #[test]
    fn test_apply_and_annotate() {
        let r = record(json!({ "username": "u1", "created_by": "0800000000", "value": 10 }));
        let mut payload = QrPayload::from_record(&r, "k".to_string()).unwrap();

        assert!(!payload.apply_member_detail(&json!({})));
        assert_eq!(payload.customer_name, "u1");

        assert!(payload.apply_member_detail(&json!({ "customer_name": "Real Name" })));
        assert_eq!(payload.customer_name, "Real Name");

        payload.annotate_lookup_failure();
        assert_eq!(payload.customer_name, "Real Name");
        assert_eq!(payload.note.as_deref(), Some(LOOKUP_FAILED_NOTE));
    }
}

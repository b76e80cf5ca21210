//! Display projection of the current page.

use crate::types::{number, text, ScanStatus, WithdrawalKey, WithdrawalRecord, MISSING};
use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;

const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M:%S";
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// One dashboard table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalRow {
    /// 1-based position in the full merged list
    pub position: usize,
    pub key: WithdrawalKey,
    pub bank: String,
    pub username: String,
    pub account_reference: Option<String>,
    pub amount: String,
    pub timestamp: String,
    pub operator: String,
    pub scan_status: ScanStatus,
    pub has_qr: bool,
}

impl WithdrawalRow {
    pub fn new(index: usize, key: WithdrawalKey, record: &WithdrawalRecord, scan_status: ScanStatus) -> Self {
        Self {
            position: index + 1,
            key,
            bank: record.bank_label(),
            username: record.username(),
            account_reference: record.account_reference(),
            amount: format_money(record.amount_raw()),
            timestamp: format_datetime(record.timestamp().as_deref()),
            operator: record.operator(),
            scan_status,
            has_qr: record.has_payment_info(),
        }
    }
}

/// Two decimals with thousands separators. Non-numeric values are shown as-is.
pub fn format_money(value: Option<&Value>) -> String {
    let Some(value) = value else {
        return MISSING.to_string();
    };
    match number(value) {
        Some(amount) => group_thousands(amount),
        None => text(value),
    }
}

/// Format a 2-decimal amount as e.g. `1,500.50`.
pub fn group_thousands(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}

/// Reformat an upstream timestamp as `dd/mm/YYYY HH:MM:SS`.
///
/// Unrecognized formats are shown verbatim.
pub fn format_datetime(value: Option<&str>) -> String {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return MISSING.to_string();
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(DISPLAY_FORMAT).to_string();
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map_or_else(|| raw.to_string(), |dt| dt.format(DISPLAY_FORMAT).to_string())
}

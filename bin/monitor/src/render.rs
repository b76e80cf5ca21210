//! Plain-text rendering of the dashboard.

use client::MerchantApi;
use std::fmt::Write;
use store::KeyValueStore;
use withdrawal::{QrPayload, ScanStatus, WithdrawalReconciler, WithdrawalRow};

/// Render the current page with its header and pager line.
pub fn render_page<A, S>(reconciler: &WithdrawalReconciler<A, S>, remaining: Option<u64>) -> String
where
    A: MerchantApi,
    S: KeyValueStore,
{
    let mut out = String::new();

    match remaining {
        Some(secs) => {
            let _ = writeln!(out, "Withdrawals (refresh in {secs}s)");
        }
        None => out.push_str("Withdrawals\n"),
    }

    if let Some(error) = reconciler.last_error() {
        let _ = writeln!(out, "error: {error}");
    }

    let total = reconciler.rows().len();
    if total == 0 {
        if reconciler.is_loading() {
            out.push_str("Loading withdrawals...\n");
        } else if reconciler.last_error().is_none() {
            out.push_str("No withdrawals yet\n");
        }
        return out;
    }

    let _ = writeln!(
        out,
        "{:>4}  {:<16} {:<18} {:>14}  {:<19}  {:<14} {:<8} {}",
        "#", "bank", "account", "amount", "time", "operator", "scan", "key"
    );
    for row in reconciler.current_page_rows() {
        out.push_str(&render_row(&row));
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "page {} / {} ({} rows, {} per page)",
        reconciler.page().current_page(),
        reconciler.total_pages(),
        total,
        reconciler.page().page_size()
    );
    out
}

pub fn render_row(row: &WithdrawalRow) -> String {
    let account = match &row.account_reference {
        Some(reference) => format!("{} ({reference})", row.username),
        None => row.username.clone(),
    };
    let scan = match row.scan_status {
        ScanStatus::Done => "done",
        ScanStatus::Pending => "pending",
    };
    let qr = if row.has_qr { "" } else { " [no QR]" };

    format!(
        "{:>4}  {:<16} {:<18} {:>14}  {:<19}  {:<14} {:<8} {}{}",
        row.position, row.bank, account, row.amount, row.timestamp, row.operator, scan, row.key, qr
    )
}

/// Render the QR popup.
pub fn render_qr(payload: &QrPayload, qr_provider: &str) -> String {
    let mut out = String::from("PromptPay QR\n");
    if let Some(note) = &payload.note {
        let _ = writeln!(out, "  note:     {note}");
    }
    let _ = writeln!(out, "  customer: {}", payload.customer_name);
    let _ = writeln!(out, "  phone:    {}", payload.phone_raw);
    let _ = writeln!(
        out,
        "  bank:     {} ({})",
        payload.bank_display_name(),
        payload.bank_account_no
    );
    let _ = writeln!(
        out,
        "  amount:   {} THB",
        withdrawal::view::group_thousands(payload.amount)
    );
    let _ = writeln!(out, "  image:    {}", payload.image_url(qr_provider));
    let _ = writeln!(out, "  key:      {} (`ok` when paid, `close` to dismiss)", payload.withdraw_key);
    out
}

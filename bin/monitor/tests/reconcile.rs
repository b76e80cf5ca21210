//! Integration tests for the withdrawal reconciler.
//!
//! Covers accumulation of the merchant feed into the merged list, scan status
//! persistence across restarts and QR payload building.

use crate::setup::{
    logged_in_store, login, reconciler, withdrawal_row, withdrawals, ScriptedApi, TOKEN,
};
use serde_json::json;
use store::{FileStore, KeyValueStore, MemoryStore};
use withdrawal::{FetchOutcome, PageSize, ReconcileError, ScanStatus};


#[tokio::test]
async fn test_feed_accumulates_beyond_one_page() {
    let api = ScriptedApi::new()
        .page(withdrawals("w", 3))
        .page(vec![withdrawal_row("w-5", 500.0, "0800000000"), withdrawal_row("w-4", 400.0, "0800000000")]);

    let mut reconciler = reconciler(api, logged_in_store());

    reconciler.fetch_latest(true).await.unwrap();
    let outcome = reconciler.fetch_latest(false).await.unwrap();

    assert_eq!(
        outcome,
        FetchOutcome::Applied {
            fetched: 2,
            new_keys: 2,
            total: 5
        }
    );
    assert_eq!(reconciler.keys(), vec!["w-5", "w-4", "w-3", "w-2", "w-1"]);
}

#[tokio::test]
async fn test_refetched_row_is_updated_in_place_of_newest() {
    let mut updated = withdrawal_row("w-1", 100.0, "0812345678");
    updated["operator_name"] = json!("supervisor");

    let api = ScriptedApi::new()
        .page(withdrawals("w", 2))
        .page(vec![updated]);

    let mut reconciler = reconciler(api, logged_in_store());
    reconciler.fetch_latest(true).await.unwrap();
    reconciler.fetch_latest(false).await.unwrap();

    assert_eq!(reconciler.keys(), vec!["w-1", "w-2"]);
    assert_eq!(reconciler.rows()[0].operator(), "supervisor");
}

#[tokio::test]
async fn test_missing_token_makes_no_request() {
    let api = ScriptedApi::new().page(withdrawals("w", 1));
    let mut reconciler = reconciler(api.clone(), MemoryStore::new());

    let err = reconciler.fetch_latest(true).await.unwrap_err();

    assert!(matches!(err, ReconcileError::Unauthenticated { .. }));
    assert_eq!(api.withdrawal_calls(), 0);
    assert!(reconciler.last_error().is_some());
}

#[tokio::test]
async fn test_upstream_failure_then_recovery() {
    let api = ScriptedApi::new()
        .page(withdrawals("w", 2))
        .error(500)
        .page(withdrawals("w", 3));

    let mut reconciler = reconciler(api, logged_in_store());

    reconciler.fetch_latest(true).await.unwrap();
    assert!(reconciler.fetch_latest(false).await.is_err());
    assert_eq!(reconciler.rows().len(), 2);
    assert!(reconciler.last_error().is_some());

    reconciler.fetch_latest(false).await.unwrap();
    assert_eq!(reconciler.rows().len(), 3);
    assert!(reconciler.last_error().is_none());
}

#[tokio::test]
async fn test_scan_status_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let mut store = FileStore::new(&path);
    login(&mut store);

    let api = ScriptedApi::new().page(withdrawals("w", 2));
    let mut first = reconciler(api, store);
    first.fetch_latest(true).await.unwrap();
    first.record_scan_done("w-2");
    drop(first);

    let api = ScriptedApi::new().page(withdrawals("w", 3));
    let mut second = reconciler(api, FileStore::new(&path));

    assert_eq!(second.scan_status("w-2"), ScanStatus::Done);
    assert_eq!(second.scan_book().get("w-1"), Some(ScanStatus::Pending));

    second.fetch_latest(true).await.unwrap();
    assert_eq!(second.scan_status("w-3"), ScanStatus::Pending);
    assert_eq!(second.scan_status("w-2"), ScanStatus::Done);
    assert_eq!(second.scan_book().len(), 3);

    let raw = second
        .store()
        .get("withdraw_scan_status_v1")
        .unwrap()
        .unwrap();
    let persisted: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(persisted["w-2"], "done");
    assert_eq!(persisted["w-3"], "pending");
}

#[tokio::test]
async fn test_done_from_another_process_is_not_reverted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let mut store = FileStore::new(&path);
    login(&mut store);

    let api = ScriptedApi::new()
        .page(vec![withdrawal_row("a", 100.0, "0812345678")])
        .page(vec![withdrawal_row("b", 200.0, "0812345678")]);
    let mut monitor = reconciler(api, store);
    monitor.fetch_latest(true).await.unwrap();
    assert_eq!(monitor.scan_status("a"), ScanStatus::Pending);

    // `scan done a` in a second process
    let mut cli = reconciler(ScriptedApi::new(), FileStore::new(&path));
    cli.record_scan_done("a");
    drop(cli);

    monitor.record_scan_done("zzz");

    let reloaded = reconciler(ScriptedApi::new(), FileStore::new(&path));
    assert_eq!(reloaded.scan_status("a"), ScanStatus::Done);
    assert_eq!(reloaded.scan_status("zzz"), ScanStatus::Done);
    assert_eq!(monitor.scan_status("a"), ScanStatus::Done);

    // A later refresh keeps it too
    monitor.fetch_latest(false).await.unwrap();
    let raw = monitor.store().get("withdraw_scan_status_v1").unwrap().unwrap();
    let persisted: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(persisted["a"], "done");
    assert_eq!(persisted["b"], "pending");
}

#[tokio::test]
async fn test_done_from_another_process_shows_on_next_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let mut store = FileStore::new(&path);
    login(&mut store);

    let api = ScriptedApi::new()
        .page(withdrawals("w", 2))
        .page(withdrawals("w", 2));
    let mut monitor = reconciler(api, store);
    monitor.fetch_latest(true).await.unwrap();

    reconciler(ScriptedApi::new(), FileStore::new(&path)).record_scan_done("w-1");
    assert_eq!(monitor.scan_status("w-1"), ScanStatus::Pending);

    monitor.fetch_latest(false).await.unwrap();
    assert_eq!(monitor.scan_status("w-1"), ScanStatus::Done);
    assert_eq!(monitor.scan_status("w-2"), ScanStatus::Pending);
}

#[tokio::test]
async fn test_token_written_by_another_process_is_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let api = ScriptedApi::new().page(withdrawals("w", 1));
    let mut reconciler = reconciler(api, FileStore::new(&path));
    assert!(reconciler.fetch_latest(true).await.is_err());

    FileStore::new(&path)
        .set("auth_token.laravelJWT", TOKEN)
        .unwrap();

    reconciler.fetch_latest(true).await.unwrap();
    assert_eq!(reconciler.rows().len(), 1);
}

#[tokio::test]
async fn test_pagination_over_merged_rows() {
    let api = ScriptedApi::new().page(withdrawals("w", 45));
    let mut reconciler = reconciler(api, logged_in_store());
    reconciler.fetch_latest(true).await.unwrap();

    assert_eq!(reconciler.page().page_size(), PageSize::Twenty);
    assert_eq!(reconciler.total_pages(), 3);

    assert!(reconciler.go_to_page(3));
    let rows = reconciler.current_page_rows();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].position, 41);
    assert_eq!(rows[0].key, "w-5");

    reconciler.set_page_size(PageSize::Thirty);
    assert_eq!(reconciler.page().current_page(), 1);
    assert_eq!(reconciler.total_pages(), 2);
    assert!(!reconciler.go_to_page(3));
}

#[tokio::test]
async fn test_row_projection() {
    let api = ScriptedApi::new().page(vec![withdrawal_row("T100", 1500.5, "081-234-5678")]);
    let mut reconciler = reconciler(api, logged_in_store());
    reconciler.fetch_latest(true).await.unwrap();

    let row = &reconciler.current_page_rows()[0];
    assert_eq!(row.position, 1);
    assert_eq!(row.key, "T100");
    assert_eq!(row.bank, "ธนาคารกสิกรไทย");
    assert_eq!(row.username, "user-T100");
    assert_eq!(row.amount, "1,500.50");
    assert_eq!(row.timestamp, "01/03/2024 09:15:30");
    assert_eq!(row.operator, "admin");
    assert_eq!(row.scan_status, ScanStatus::Pending);
    assert!(row.has_qr);
}

#[tokio::test]
async fn test_qr_payload_for_withdrawal() {
    let api = ScriptedApi::new()
        .page(vec![withdrawal_row("T100", 1500.5, "081-234-5678")])
        .member(json!({ "first_name": "Somchai", "last_name": "Jaidee" }));

    let mut reconciler = reconciler(api.clone(), logged_in_store());
    reconciler.fetch_latest(true).await.unwrap();

    let payload = reconciler.show_qr("T100").await.unwrap();

    assert_eq!(api.member_calls(), 1);
    assert_eq!(payload.customer_name, "Somchai Jaidee");
    assert_eq!(payload.username, "user-T100");
    assert_eq!(payload.bank_display_name(), "กสิกรไทย");
    assert_eq!(payload.phone, "0812345678");
    assert_eq!(
        payload.image_url("https://promptpay.io/"),
        "https://promptpay.io/0812345678/1500.50.png"
    );

    reconciler.confirm_qr(&payload);
    assert_eq!(reconciler.scan_status("T100"), ScanStatus::Done);
}

#[tokio::test]
async fn test_qr_name_lookup_failure_keeps_payload() {
    let api = ScriptedApi::new()
        .page(vec![withdrawal_row("T100", 250.0, "0812345678")])
        .member_error(502);

    let mut reconciler = reconciler(api, logged_in_store());
    reconciler.fetch_latest(true).await.unwrap();

    let mut payload = reconciler.qr_payload("T100").unwrap();
    let err = reconciler
        .resolve_customer_name(&mut payload)
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::SecondaryLookupFailed(_)));
    assert_eq!(payload.customer_name, "user-T100");
    assert!(payload.note.is_some());
    assert!(payload.image_url("https://promptpay.io").ends_with("/250.00.png"));
}

#[tokio::test]
async fn test_qr_requires_amount() {
    let api = ScriptedApi::new().page(vec![
        withdrawal_row("paid", 100.0, "0812345678"),
        withdrawal_row("no-amount", 0.0, "0812345678"),
    ]);

    let mut reconciler = reconciler(api, logged_in_store());
    reconciler.fetch_latest(true).await.unwrap();

    let rows = reconciler.current_page_rows();
    assert!(rows[0].has_qr);
    assert!(!rows[1].has_qr);

    assert!(matches!(
        reconciler.qr_payload("no-amount"),
        Err(ReconcileError::MissingPaymentInfo)
    ));
    assert!(matches!(
        reconciler.qr_payload("missing"),
        Err(ReconcileError::UnknownKey(_))
    ));
}

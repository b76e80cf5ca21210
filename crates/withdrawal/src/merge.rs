//! Folding the feed's latest window into the accumulated superset.
//!
//! The merchant feed only ever returns the newest page. Merging keeps every
//! record seen so far, absorbs field updates for records the feed re-reports,
//! and never duplicates a key.
//!
//! Keys fall back to `row-<index>` when a record has no identifier. Those
//! positional keys are not stable across fetches if upstream ordering shifts,
//! and colliding keys within one batch resolve last-in-order wins.

use crate::types::{WithdrawalKey, WithdrawalRecord};
use std::collections::HashMap;

/// Merge a fresh feed page into the existing rows.
///
/// Result order: the incoming page in feed order, followed by every existing
/// record the page did not mention, in their original relative order.
/// Records present on both sides are the existing record overlaid with the
/// incoming one.
pub fn merge_rows(
    existing: Vec<WithdrawalRecord>,
    incoming: Vec<WithdrawalRecord>,
) -> Vec<WithdrawalRecord> {
    let mut previous: HashMap<WithdrawalKey, WithdrawalRecord> = HashMap::new();
    let mut previous_order: Vec<WithdrawalKey> = Vec::with_capacity(existing.len());
    for (index, row) in existing.into_iter().enumerate() {
        let key = row.key(index);
        if previous.insert(key.clone(), row).is_none() {
            previous_order.push(key);
        }
    }

    let mut merged: Vec<WithdrawalRecord> = Vec::with_capacity(incoming.len() + previous.len());
    let mut slots: HashMap<WithdrawalKey, usize> = HashMap::with_capacity(incoming.len());

    for (index, item) in incoming.into_iter().enumerate() {
        let key = item.key(index);
        let row = match previous.get(&key) {
            Some(old) => {
                let mut row = old.clone();
                row.overlay(&item);
                row
            }
            None => item,
        };

        match slots.get(&key) {
            Some(&slot) => merged[slot] = row,
            None => {
                slots.insert(key, merged.len());
                merged.push(row);
            }
        }
    }

    for key in previous_order {
        if slots.contains_key(&key) {
            continue;
        }
        if let Some(row) = previous.remove(&key) {
            merged.push(row);
        }
    }

    merged
}

/// Keys of `rows` in order, using each row's position for the fallback key.
pub fn row_keys(rows: &[WithdrawalRecord]) -> Vec<WithdrawalKey> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| row.key(index))
        .collect()
}

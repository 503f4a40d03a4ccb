// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! FIFO settlement allocation.
//!
//! A payment is spread over open items oldest due date first. Every item ahead
//! of the exhaustion point is settled in full, the item at the exhaustion point
//! may be settled partially, and later items get nothing (they are absent from
//! the result rather than present with zero).

use crate::models::{AllocationMap, OpenItem};
use crate::utils::{round_money, to_finite_money};
use rust_decimal::Decimal;
use tracing::debug;

/// Items in the order they are settled: due date ascending, then id.
pub fn allocation_order(items: &[OpenItem]) -> Vec<&OpenItem> {
    let mut sorted: Vec<&OpenItem> = items.iter().collect();
    sorted.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
    sorted
}

pub fn allocate_fifo_by_due_date(total: Decimal, items: &[OpenItem]) -> AllocationMap {
    let mut out = AllocationMap::new();
    let mut remaining = round_money(total);
    if remaining <= Decimal::ZERO {
        return out;
    }

    for item in allocation_order(items) {
        if remaining <= Decimal::ZERO {
            break;
        }
        let balance = round_money(item.open_balance);
        if balance <= Decimal::ZERO {
            continue;
        }
        let applied = balance.min(remaining);
        debug!(item = %item.id, due = %item.due_date, %balance, %applied, "fifo allocation");
        // Duplicate ids accumulate into one entry.
        *out.entry(item.id.clone()).or_insert(Decimal::ZERO) += applied;
        remaining -= applied;
    }
    out
}

/// Entry point for totals carried as binary floats.
pub fn allocate_fifo_by_due_date_f64(total: f64, items: &[OpenItem]) -> AllocationMap {
    match to_finite_money(total) {
        Some(t) => allocate_fifo_by_due_date(t, items),
        None => AllocationMap::new(),
    }
}

/// Sum of the allocations, saturating at `Decimal::MAX`.
pub fn allocated_total(allocations: &AllocationMap) -> Decimal {
    allocations
        .values()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .unwrap_or(Decimal::MAX)
}

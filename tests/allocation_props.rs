// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Properties of the FIFO allocator that must hold for every input.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use settleclip::allocation::{allocate_fifo_by_due_date, allocated_total, allocation_order};
use settleclip::models::{ItemKind, OpenItem};

fn cents(c: i64) -> Decimal {
    Decimal::new(c, 2)
}

fn build_items(shapes: &[(u32, i64)]) -> Vec<OpenItem> {
    shapes
        .iter()
        .enumerate()
        .map(|(i, (day, balance))| {
            let mut it = OpenItem::new(
                format!("t{:03}", i),
                ItemKind::Receivable,
                "P1",
                "Cliente",
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Days::new(*day as u64),
                cents(*balance),
                Decimal::ZERO,
            );
            it.open_balance = cents(*balance);
            it
        })
        .collect()
}

fn item_strategy() -> impl Strategy<Value = Vec<(u32, i64)>> {
    prop::collection::vec((0u32..30, -5_000i64..50_000), 0..12)
}

proptest! {
    #[test]
    fn applied_is_min_of_total_and_open_balances(shapes in item_strategy(), total in -10_000i64..200_000) {
        let items = build_items(&shapes);
        let out = allocate_fifo_by_due_date(cents(total), &items);
        let open: Decimal = items
            .iter()
            .map(|i| i.open_balance)
            .filter(|b| *b > Decimal::ZERO)
            .sum();
        let applied = allocated_total(&out);
        if total <= 0 {
            prop_assert!(out.is_empty());
        } else {
            prop_assert!(applied <= cents(total));
            prop_assert_eq!(applied, open.min(cents(total)));
        }
    }

    #[test]
    fn at_most_one_partial_and_everything_before_it_is_full(shapes in item_strategy(), total in 1i64..200_000) {
        let items = build_items(&shapes);
        let out = allocate_fifo_by_due_date(cents(total), &items);

        let mut partial_seen = false;
        for it in allocation_order(&items) {
            if it.open_balance <= Decimal::ZERO {
                prop_assert!(!out.contains_key(&it.id));
                continue;
            }
            match out.get(&it.id) {
                Some(v) if *v == it.open_balance => prop_assert!(!partial_seen),
                Some(v) => {
                    prop_assert!(*v > Decimal::ZERO && *v < it.open_balance);
                    prop_assert!(!partial_seen);
                    partial_seen = true;
                }
                None => {
                    // once an open item is skipped, nothing later gets money
                    partial_seen = true;
                }
            }
        }
    }

    #[test]
    fn no_zero_entries_and_deterministic(shapes in item_strategy(), total in 1i64..200_000) {
        let items = build_items(&shapes);
        let first = allocate_fifo_by_due_date(cents(total), &items);
        let second = allocate_fifo_by_due_date(cents(total), &items);
        prop_assert!(first.values().all(|v| *v > Decimal::ZERO));
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn input_order_does_not_matter(shapes in item_strategy(), total in 1i64..200_000) {
        let items = build_items(&shapes);
        let mut reversed = items.clone();
        reversed.reverse();
        prop_assert_eq!(
            allocate_fifo_by_due_date(cents(total), &items),
            allocate_fifo_by_due_date(cents(total), &reversed)
        );
    }
}

#[test]
fn four_items_of_109_with_400_leaves_73_on_the_last() {
    let items = build_items(&[(0, 10_900), (1, 10_900), (2, 10_900), (3, 10_900)]);
    let out = allocate_fifo_by_due_date(Decimal::from(400), &items);
    let values: Vec<Decimal> = allocation_order(&items)
        .iter()
        .map(|it| out[&it.id])
        .collect();
    assert_eq!(
        values,
        vec![
            Decimal::from(109),
            Decimal::from(109),
            Decimal::from(109),
            Decimal::from(73)
        ]
    );
    assert_eq!(allocated_total(&out), Decimal::from(400));
}

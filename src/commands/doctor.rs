// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::{ItemFilter, list_open_items};
use crate::utils::{MONEY_TOLERANCE, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn issues(conn: &Connection) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();

    // 1) Items paid beyond their total, to the cent
    for it in list_open_items(conn, &ItemFilter::default())? {
        if it.paid_amount > it.total_amount {
            rows.push(vec![
                "item_overpaid".into(),
                format!("{} paid {} of {}", it.id, it.paid_amount, it.total_amount),
            ]);
        }
    }

    // 2) Reconciled lines without any settlement
    let mut stmt = conn.prepare(
        "SELECT id FROM statement_lines WHERE reconciled=1 AND id NOT IN (SELECT statement_id FROM settlements) ORDER BY id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: String = r.get(0)?;
        rows.push(vec!["reconciled_without_settlement".into(), id]);
    }

    // 3) Allocations above the line amount
    let mut stmt = conn.prepare(
        "SELECT l.id, l.amount, a.amount FROM statement_lines l
         JOIN settlements s ON s.statement_id=l.id
         JOIN settlement_allocations a ON a.settlement_id=s.id
         ORDER BY l.id",
    )?;
    let mut cur = stmt.query([])?;
    let mut sums: Vec<(String, Decimal, Decimal)> = Vec::new();
    while let Some(r) = cur.next()? {
        let id: String = r.get(0)?;
        let line_s: String = r.get(1)?;
        let alloc_s: String = r.get(2)?;
        let line_amt = line_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' for statement {}", line_s, id))?;
        let alloc = alloc_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid allocation '{}' for statement {}", alloc_s, id))?;
        let same_line = matches!(sums.last(), Some((last, _, _)) if *last == id);
        if same_line {
            if let Some(entry) = sums.last_mut() {
                entry.2 = entry.2.checked_add(alloc).unwrap_or(Decimal::MAX);
            }
        } else {
            sums.push((id, line_amt, alloc));
        }
    }
    for (id, line_amt, applied) in sums {
        if applied - line_amt > MONEY_TOLERANCE {
            rows.push(vec![
                "settlement_exceeds_line".into(),
                format!("{} applied {} of {}", id, applied, line_amt),
            ]);
        }
    }

    // 4) Settlement totals that disagree with their allocation rows
    let mut stmt = conn.prepare(
        "SELECT s.id, s.applied_total, a.amount FROM settlements s
         LEFT JOIN settlement_allocations a ON a.settlement_id=s.id
         ORDER BY s.id",
    )?;
    let mut cur = stmt.query([])?;
    let mut totals: Vec<(i64, Decimal, Decimal)> = Vec::new();
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let total_s: String = r.get(1)?;
        let alloc_s: Option<String> = r.get(2)?;
        let alloc = match alloc_s {
            Some(a) => a
                .parse::<Decimal>()
                .with_context(|| format!("Invalid allocation '{}' for settlement #{}", a, id))?,
            None => Decimal::ZERO,
        };
        if matches!(totals.last(), Some((last, _, _)) if *last == id) {
            if let Some(entry) = totals.last_mut() {
                entry.2 = entry.2.checked_add(alloc).unwrap_or(Decimal::MAX);
            }
        } else {
            let recorded = total_s.parse::<Decimal>().with_context(|| {
                format!("Invalid applied total '{}' for settlement #{}", total_s, id)
            })?;
            totals.push((id, recorded, alloc));
        }
    }
    for (id, recorded, allocated) in totals {
        if recorded != allocated {
            rows.push(vec![
                "settlement_total_mismatch".into(),
                format!("#{} records {} but allocations sum to {}", id, recorded, allocated),
            ]);
        }
    }

    Ok(rows)
}

pub fn handle(conn: &Connection) -> Result<()> {
    let rows = issues(conn)?;
    if rows.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

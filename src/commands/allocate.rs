// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::allocation::{allocate_fifo_by_due_date, allocation_order};
use crate::db::{load_open_items, load_statement_line};
use crate::models::{AllocationMap, Counterparty};
use crate::reconcile::{AllocationSummary, batch_matches, distinct_counterparties, summarize};
use crate::utils::{
    MONEY_TOLERANCE, fmt_money, get_currency, maybe_print_json, parse_decimal, parse_id_list,
    pretty_table,
};
use anyhow::{Result, anyhow};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AllocationPreview {
    pub allocations: AllocationMap,
    pub summary: AllocationSummary,
    /// Selection settles in full with nothing left over.
    pub settles_in_full: bool,
    /// Candidates for `settle --credit-to` when money is left over.
    pub counterparties: Vec<Counterparty>,
}

pub fn preview(conn: &Connection, sub: &clap::ArgMatches) -> Result<(AllocationPreview, Vec<Vec<String>>)> {
    let total = match sub.get_one::<String>("statement") {
        Some(id) => load_statement_line(conn, id.trim())?.amount,
        None => parse_decimal(sub.get_one::<String>("total").unwrap())?,
    };
    let ids = parse_id_list(sub.get_one::<String>("items").unwrap());
    if ids.is_empty() {
        return Err(anyhow!("No item ids given"));
    }
    let items = load_open_items(conn, &ids)?;
    let allocations = allocate_fifo_by_due_date(total, &items);

    let rows = allocation_order(&items)
        .into_iter()
        .map(|it| {
            let applied = allocations.get(&it.id).copied().unwrap_or(Decimal::ZERO);
            vec![
                it.id.clone(),
                it.due_date.to_string(),
                it.counterparty_name.clone(),
                format!("{:.2}", it.open_balance),
                format!("{:.2}", applied),
                format!("{:.2}", (it.open_balance - applied).max(Decimal::ZERO)),
            ]
        })
        .collect();

    let summary = summarize(total, &allocations);
    Ok((
        AllocationPreview {
            allocations,
            summary,
            settles_in_full: batch_matches(total, &items),
            counterparties: distinct_counterparties(&items),
        },
        rows,
    ))
}

pub fn handle(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let (preview, rows) = preview(conn, sub)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &preview)? {
        return Ok(());
    }
    let ccy = get_currency(conn)?;
    println!(
        "{}",
        pretty_table(
            &["Item", "Due", "Counterparty", "Open", "Applied", "Left open"],
            rows
        )
    );
    let s = &preview.summary;
    println!(
        "Total {} | applied {} | difference {}",
        fmt_money(&s.statement_amount, &ccy),
        fmt_money(&s.applied_total, &ccy),
        fmt_money(&s.difference, &ccy)
    );
    if s.difference > MONEY_TOLERANCE {
        let names: Vec<String> = preview
            .counterparties
            .iter()
            .map(|c| format!("{} ({})", c.id, c.name))
            .collect();
        println!(
            "Leftover needs an account credit: settle with --credit-to one of {}",
            names.join(", ")
        );
    } else if preview.settles_in_full {
        println!("Selection settles in full");
    }
    Ok(())
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::allocation::allocate_fifo_by_due_date;
use crate::db::{load_open_items, load_statement_line};
use crate::models::AllocationMap;
use crate::settlement::{SettlementOutcome, settle};
use crate::utils::{fmt_money, get_currency, maybe_print_json, parse_alloc_pair, parse_id_list};
use anyhow::{Result, anyhow};
use rusqlite::Connection;
use rust_decimal::Decimal;

/// FIFO amounts for the selection, with `--alloc` entries taking precedence.
pub fn build_allocations(conn: &Connection, sub: &clap::ArgMatches) -> Result<(String, Vec<String>, AllocationMap)> {
    let statement_id = sub.get_one::<String>("statement").unwrap().trim().to_string();
    let ids = parse_id_list(sub.get_one::<String>("items").unwrap());
    if ids.is_empty() {
        return Err(anyhow!("No item ids given"));
    }
    let line = load_statement_line(conn, &statement_id)?;
    let items = load_open_items(conn, &ids)?;
    let mut allocations = allocate_fifo_by_due_date(line.amount, &items);
    if let Some(overrides) = sub.get_many::<String>("alloc") {
        for raw in overrides {
            let (id, amount) = parse_alloc_pair(raw)?;
            allocations.insert(id, amount);
        }
    }
    Ok((statement_id, ids, allocations))
}

pub fn handle(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let (statement_id, ids, allocations) = build_allocations(conn, sub)?;
    let items = load_open_items(conn, &ids)?;
    let credit_to = sub.get_one::<String>("credit_to").map(|s| s.as_str());

    let outcome = settle(conn, &statement_id, &items, &allocations, credit_to)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &outcome)? {
        return Ok(());
    }
    let ccy = get_currency(conn)?;
    match outcome {
        SettlementOutcome::Noop { message } => println!("{}", message),
        SettlementOutcome::Settled {
            settlement_id,
            applied_total,
            difference,
            credit_id,
        } => {
            println!(
                "Settlement #{} for '{}': applied {} across {} item(s)",
                settlement_id,
                statement_id,
                fmt_money(&applied_total, &ccy),
                allocations.values().filter(|v| **v > Decimal::ZERO).count()
            );
            if let Some(cid) = credit_id {
                println!(
                    "Leftover {} kept as account credit #{}",
                    fmt_money(&difference, &ccy),
                    cid
                );
            }
        }
    }
    Ok(())
}

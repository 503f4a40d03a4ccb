// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::{ItemFilter, insert_open_item, list_open_items};
use crate::models::{ItemKind, OpenItem};
use crate::utils::{get_currency, maybe_print_json, parse_date, parse_decimal, pretty_table};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rm", sub)) => {
            let id = sub.get_one::<String>("id").unwrap().trim();
            let settled: i64 = conn.query_row(
                "SELECT COUNT(*) FROM settlement_allocations WHERE item_id=?1",
                params![id],
                |r| r.get(0),
            )?;
            if settled > 0 {
                return Err(anyhow!(
                    "Open item '{}' has {} settlement allocation(s) and cannot be removed",
                    id,
                    settled
                ));
            }
            let n = conn.execute("DELETE FROM open_items WHERE id=?1", params![id])?;
            if n == 0 {
                return Err(anyhow!("Open item '{}' not found", id));
            }
            println!("Removed open item '{}'", id);
        }
        _ => {}
    }
    Ok(())
}

fn opt_trimmed(sub: &clap::ArgMatches, name: &str) -> Option<String> {
    sub.get_one::<String>(name)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = sub.get_one::<String>("id").unwrap().trim().to_string();
    let kind: ItemKind = sub.get_one::<String>("kind").unwrap().parse()?;
    let cp_id = sub.get_one::<String>("counterparty_id").unwrap().trim();
    let cp_name = sub.get_one::<String>("counterparty").unwrap().trim();
    let due = parse_date(sub.get_one::<String>("due").unwrap())?;
    let total = parse_decimal(sub.get_one::<String>("total").unwrap())?;
    let paid = match sub.get_one::<String>("paid") {
        Some(p) => parse_decimal(p)?,
        None => Decimal::ZERO,
    };
    if total < Decimal::ZERO || paid < Decimal::ZERO {
        return Err(anyhow!("Amounts must not be negative"));
    }
    if paid > total {
        return Err(anyhow!(
            "Paid amount {} exceeds total {} for '{}'",
            paid,
            total,
            id
        ));
    }

    let mut item = OpenItem::new(id, kind, cp_id, cp_name, due, total, paid);
    item.description = opt_trimmed(sub, "description");
    item.document_ref = opt_trimmed(sub, "document");
    if let Some(status) = opt_trimmed(sub, "status") {
        item.status = status;
    }
    insert_open_item(conn, &item)?;
    println!(
        "Added {} '{}' for {} due {} (open {})",
        item.kind, item.id, item.counterparty_name, item.due_date, item.open_balance
    );
    Ok(())
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<OpenItem>> {
    let kind = match sub.get_one::<String>("kind") {
        Some(k) => Some(k.parse::<ItemKind>()?),
        None => None,
    };
    let filter = ItemFilter {
        kind,
        counterparty_id: opt_trimmed(sub, "counterparty_id"),
        open_only: sub.get_flag("open"),
    };
    list_open_items(conn, &filter)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let ccy = get_currency(conn)?;
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|it| {
                vec![
                    it.id.clone(),
                    it.kind.to_string(),
                    it.counterparty_name.clone(),
                    it.due_date.to_string(),
                    format!("{:.2}", it.total_amount),
                    format!("{:.2}", it.paid_amount),
                    format!("{:.2}", it.open_balance),
                    it.status.clone(),
                    it.document_ref.clone().unwrap_or_default(),
                ]
            })
            .collect();
        let open_hdr = format!("Open ({})", ccy);
        println!(
            "{}",
            pretty_table(
                &["ID", "Kind", "Counterparty", "Due", "Total", "Paid", open_hdr.as_str(), "Status", "Doc"],
                rows,
            )
        );
    }
    Ok(())
}

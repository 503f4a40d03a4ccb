// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::{insert_statement_line, list_statement_lines};
use crate::models::{EntryKind, StatementLine};
use crate::utils::{maybe_print_json, parse_date, parse_decimal, pretty_table};
use anyhow::{Result, anyhow};
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = sub.get_one::<String>("id").unwrap().trim().to_string();
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    if amount <= Decimal::ZERO {
        return Err(anyhow!(
            "Statement amount must be positive, got {} (use --kind debito for outflows)",
            amount
        ));
    }
    let entry_kind: EntryKind = sub.get_one::<String>("kind").unwrap().parse()?;
    let line = StatementLine {
        id,
        date,
        description: sub
            .get_one::<String>("description")
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        document_ref: sub
            .get_one::<String>("document")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string()),
        amount,
        entry_kind,
        reconciled: false,
    };
    insert_statement_line(conn, &line)?;
    println!(
        "Recorded {} {} on {} ('{}')",
        line.entry_kind, line.amount, line.date, line.id
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = list_statement_lines(conn, sub.get_flag("pending"))?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|l| {
                vec![
                    l.id.clone(),
                    l.date.to_string(),
                    l.entry_kind.to_string(),
                    format!("{:.2}", l.amount),
                    l.description.clone(),
                    l.document_ref.clone().unwrap_or_default(),
                    if l.reconciled { "yes".into() } else { "no".into() },
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Kind", "Amount", "Description", "Doc", "Reconciled"],
                rows,
            )
        );
    }
    Ok(())
}

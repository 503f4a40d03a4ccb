// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, anyhow};
use rusqlite::Connection;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("settlements", sub)) => export_settlements(conn, sub),
        _ => Ok(()),
    }
}

/// One row per allocation, repeated settlement columns.
#[derive(Debug, Serialize)]
pub struct SettlementExportRow {
    pub settlement_id: i64,
    pub statement_id: String,
    pub created_at: String,
    pub item_id: String,
    pub counterparty: String,
    pub amount: String,
    pub difference: String,
    pub credit_id: Option<i64>,
}

pub fn query_rows(conn: &Connection) -> Result<Vec<SettlementExportRow>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.statement_id, s.created_at, a.item_id, COALESCE(i.counterparty_name, ''), a.amount, s.difference, s.credit_id
         FROM settlements s
         JOIN settlement_allocations a ON a.settlement_id=s.id
         LEFT JOIN open_items i ON i.id=a.item_id
         ORDER BY s.id, a.item_id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(SettlementExportRow {
            settlement_id: r.get(0)?,
            statement_id: r.get(1)?,
            created_at: r.get(2)?,
            item_id: r.get(3)?,
            counterparty: r.get(4)?,
            amount: r.get(5)?,
            difference: r.get(6)?,
            credit_id: r.get(7)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn export_settlements(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().trim().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap().trim();
    if fmt != "csv" && fmt != "json" {
        return Err(anyhow!("Unknown format: {} (use csv|json)", fmt));
    }

    let rows = query_rows(conn)?;
    if fmt == "csv" {
        let mut wtr = csv::Writer::from_path(out)?;
        for row in &rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
    } else {
        std::fs::write(out, serde_json::to_string_pretty(&rows)?)?;
    }
    println!("Exported {} settlement allocations to {}", rows.len(), out);
    Ok(())
}

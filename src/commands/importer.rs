// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::{insert_open_item, insert_statement_line};
use crate::models::{EntryKind, ItemKind, OpenItem, StatementLine};
use crate::utils::{parse_date, parse_decimal, to_finite_money};
use anyhow::{Context, Result, anyhow};
use csv::ReaderBuilder;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("items", sub)) => {
            let path = sub.get_one::<String>("path").unwrap().trim();
            let n = match sub.get_one::<String>("format").map(|s| s.as_str()) {
                Some("json") => import_items_json(conn, path)?,
                _ => import_items_csv(conn, path)?,
            };
            println!("Imported {} open items from {}", n, path);
            Ok(())
        }
        Some(("statements", sub)) => {
            let path = sub.get_one::<String>("path").unwrap().trim();
            let n = import_statements_csv(conn, path)?;
            println!("Imported {} statement lines from {}", n, path);
            Ok(())
        }
        _ => Ok(()),
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Columns: id,kind,counterparty_id,counterparty_name,due_date,total,paid,description,document_ref,status
pub fn import_items_csv(conn: &mut Connection, path: &str) -> Result<usize> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;

    let tx = conn.transaction()?;
    let mut count = 0;
    for (idx, result) in rdr.records().enumerate() {
        let rec = result?;
        let line_no = idx + 2;
        let id = rec.get(0).context("id missing")?.trim().to_string();
        let kind: ItemKind = rec
            .get(1)
            .context("kind missing")?
            .parse::<ItemKind>()
            .with_context(|| format!("Line {}: bad kind for {}", line_no, id))?;
        let cp_id = rec.get(2).context("counterparty_id missing")?.trim();
        let cp_name = rec.get(3).context("counterparty_name missing")?.trim();
        let due_raw = rec.get(4).context("due_date missing")?;
        let due = parse_date(due_raw)
            .with_context(|| format!("Line {}: invalid due date for {}", line_no, id))?;
        let total_raw = rec.get(5).context("total missing")?;
        let total = parse_decimal(total_raw)
            .with_context(|| format!("Invalid total '{}' for {}", total_raw.trim(), id))?;
        let paid = match non_empty(rec.get(6)) {
            Some(p) => parse_decimal(&p)
                .with_context(|| format!("Invalid paid amount '{}' for {}", p, id))?,
            None => Decimal::ZERO,
        };
        if total < Decimal::ZERO || paid < Decimal::ZERO {
            return Err(anyhow!(
                "Line {}: negative amount for {}",
                line_no,
                id
            ));
        }
        if paid > total {
            return Err(anyhow!(
                "Line {}: paid {} exceeds total {} for {}",
                line_no,
                paid,
                total,
                id
            ));
        }

        let mut item = OpenItem::new(id, kind, cp_id, cp_name, due, total, paid);
        item.description = non_empty(rec.get(7));
        item.document_ref = non_empty(rec.get(8));
        if let Some(status) = non_empty(rec.get(9)) {
            item.status = status;
        }
        insert_open_item(&tx, &item)?;
        count += 1;
    }
    tx.commit()?;
    info!(path, count, "imported open items");
    Ok(count)
}

/// Candidate rows as returned by the remote title search: amounts are binary floats.
#[derive(Debug, Deserialize)]
struct RemoteItemRow {
    tipo: ItemKind,
    titulo_id: String,
    pessoa_id: String,
    pessoa_nome: String,
    descricao: Option<String>,
    documento_ref: Option<String>,
    data_vencimento: String,
    valor_total: Option<f64>,
    valor_pago: Option<f64>,
    status: Option<String>,
}

/// Rows with missing or non-finite amounts are skipped.
pub fn import_items_json(conn: &mut Connection, path: &str) -> Result<usize> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Read JSON {}", path))?;
    let rows: Vec<RemoteItemRow> =
        serde_json::from_str(&raw).with_context(|| format!("Parse JSON {}", path))?;

    let tx = conn.transaction()?;
    let mut count = 0;
    for row in rows {
        let total = row.valor_total.and_then(to_finite_money);
        let paid = match row.valor_pago {
            Some(v) => to_finite_money(v),
            None => Some(Decimal::ZERO),
        };
        let (Some(total), Some(paid)) = (total, paid) else {
            warn!(item = %row.titulo_id, "skipping row with invalid amount");
            continue;
        };
        if total < Decimal::ZERO || paid < Decimal::ZERO || paid > total {
            warn!(item = %row.titulo_id, %total, %paid, "skipping row with inconsistent amounts");
            continue;
        }
        let due = parse_date(&row.data_vencimento)
            .with_context(|| format!("Invalid due date for {}", row.titulo_id))?;
        let mut item = OpenItem::new(
            row.titulo_id,
            row.tipo,
            row.pessoa_id,
            row.pessoa_nome,
            due,
            total,
            paid,
        );
        item.description = row.descricao;
        item.document_ref = row.documento_ref;
        if let Some(status) = row.status.filter(|s| !s.is_empty()) {
            item.status = status;
        }
        insert_open_item(&tx, &item)?;
        count += 1;
    }
    tx.commit()?;
    info!(path, count, "imported open items");
    Ok(count)
}

/// Columns: id,date,amount,kind,description,document_ref
///
/// A negative amount with an empty kind is read as a debit.
pub fn import_statements_csv(conn: &mut Connection, path: &str) -> Result<usize> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;

    let tx = conn.transaction()?;
    let mut count = 0;
    for result in rdr.records() {
        let rec = result?;
        let id = rec.get(0).context("id missing")?.trim().to_string();
        let date_raw = rec.get(1).context("date missing")?;
        let date = parse_date(date_raw)
            .with_context(|| format!("Invalid statement date for {}", id))?;
        let amount_raw = rec.get(2).context("amount missing")?;
        let signed = parse_decimal(amount_raw)
            .with_context(|| format!("Invalid amount '{}' for {}", amount_raw.trim(), id))?;
        if signed.is_zero() {
            warn!(line = %id, "skipping zero amount statement line");
            continue;
        }
        let entry_kind = match non_empty(rec.get(3)) {
            Some(k) => k.parse::<EntryKind>()?,
            None if signed < Decimal::ZERO => EntryKind::Debit,
            None => EntryKind::Credit,
        };
        let line = StatementLine {
            id,
            date,
            description: non_empty(rec.get(4)).unwrap_or_default(),
            document_ref: non_empty(rec.get(5)),
            amount: signed.abs(),
            entry_kind,
            reconciled: false,
        };
        insert_statement_line(&tx, &line)?;
        count += 1;
    }
    tx.commit()?;
    info!(path, count, "imported statement lines");
    Ok(count)
}

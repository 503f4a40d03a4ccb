// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{EntryKind, ItemKind, OpenItem, StatementLine};
use crate::utils::parse_date;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Settleclip", "settleclip"));

pub const DB_ENV: &str = "SETTLECLIP_DB";

pub fn db_path() -> Result<PathBuf> {
    if let Some(p) = std::env::var_os(DB_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(p));
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("settleclip.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    open_at(&db_path()?)
}

pub fn open_at(path: &Path) -> Result<Connection> {
    let conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS open_items(
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL CHECK(kind IN ('pagar','receber')),
        counterparty_id TEXT NOT NULL,
        counterparty_name TEXT NOT NULL,
        description TEXT,
        document_ref TEXT,
        due_date TEXT NOT NULL,
        total_amount TEXT NOT NULL,
        paid_amount TEXT NOT NULL DEFAULT '0',
        status TEXT NOT NULL DEFAULT 'pendente',
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_open_items_due ON open_items(due_date);

    CREATE TABLE IF NOT EXISTS statement_lines(
        id TEXT PRIMARY KEY,
        date TEXT NOT NULL,
        description TEXT NOT NULL,
        document_ref TEXT,
        amount TEXT NOT NULL,
        entry_kind TEXT NOT NULL CHECK(entry_kind IN ('credito','debito')),
        reconciled INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS settlements(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        statement_id TEXT NOT NULL,
        applied_total TEXT NOT NULL,
        difference TEXT NOT NULL,
        credit_id INTEGER,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(statement_id) REFERENCES statement_lines(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS settlement_allocations(
        settlement_id INTEGER NOT NULL,
        item_id TEXT NOT NULL,
        amount TEXT NOT NULL,
        PRIMARY KEY(settlement_id, item_id),
        FOREIGN KEY(settlement_id) REFERENCES settlements(id) ON DELETE CASCADE,
        FOREIGN KEY(item_id) REFERENCES open_items(id) ON DELETE RESTRICT
    );

    -- leftover of a statement line kept as credit for a counterparty
    CREATE TABLE IF NOT EXISTS account_credits(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        counterparty_id TEXT NOT NULL,
        statement_id TEXT NOT NULL,
        amount TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    )?;
    Ok(())
}

fn decimal_col(s: &str, what: &str, id: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid {} '{}' for {}", what, s, id))
}

const ITEM_COLS: &str = "id, kind, counterparty_id, counterparty_name, description, document_ref, due_date, total_amount, paid_amount, status";

type ItemRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    String,
    String,
);

fn read_item_row(r: &Row<'_>) -> rusqlite::Result<ItemRow> {
    Ok((
        r.get(0)?,
        r.get(1)?,
        r.get(2)?,
        r.get(3)?,
        r.get(4)?,
        r.get(5)?,
        r.get(6)?,
        r.get(7)?,
        r.get(8)?,
        r.get(9)?,
    ))
}

fn item_from_row(row: ItemRow) -> Result<OpenItem> {
    let (id, kind, cp_id, cp_name, description, document_ref, due, total, paid, status) = row;
    let kind: ItemKind = kind.parse()?;
    let due_date =
        parse_date(&due).with_context(|| format!("Invalid due date '{}' for {}", due, id))?;
    let total = decimal_col(&total, "total amount", &id)?;
    let paid = decimal_col(&paid, "paid amount", &id)?;
    let mut item = OpenItem::new(id, kind, cp_id, cp_name, due_date, total, paid);
    item.description = description;
    item.document_ref = document_ref;
    item.status = status;
    Ok(item)
}

pub fn load_open_item(conn: &Connection, id: &str) -> Result<OpenItem> {
    let sql = format!("SELECT {} FROM open_items WHERE id=?1", ITEM_COLS);
    let row = conn
        .query_row(&sql, params![id], read_item_row)
        .optional()?
        .with_context(|| format!("Open item '{}' not found", id))?;
    item_from_row(row)
}

/// Loads the given ids, in the given order.
pub fn load_open_items(conn: &Connection, ids: &[String]) -> Result<Vec<OpenItem>> {
    ids.iter().map(|id| load_open_item(conn, id)).collect()
}

#[derive(Debug, Default, Clone)]
pub struct ItemFilter {
    pub kind: Option<ItemKind>,
    pub counterparty_id: Option<String>,
    pub open_only: bool,
}

pub fn list_open_items(conn: &Connection, filter: &ItemFilter) -> Result<Vec<OpenItem>> {
    let mut sql = format!("SELECT {} FROM open_items WHERE 1=1", ITEM_COLS);
    let mut params_vec: Vec<String> = Vec::new();
    if let Some(kind) = filter.kind {
        sql.push_str(" AND kind=?");
        params_vec.push(kind.as_str().to_string());
    }
    if let Some(cp) = &filter.counterparty_id {
        sql.push_str(" AND counterparty_id=?");
        params_vec.push(cp.clone());
    }
    sql.push_str(" ORDER BY due_date, id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params_vec.iter()), read_item_row)?;
    let mut items = Vec::new();
    for row in rows {
        let item = item_from_row(row?)?;
        if filter.open_only && item.open_balance <= Decimal::ZERO {
            continue;
        }
        items.push(item);
    }
    Ok(items)
}

pub fn insert_open_item(conn: &Connection, item: &OpenItem) -> Result<()> {
    conn.execute(
        "INSERT INTO open_items(id, kind, counterparty_id, counterparty_name, description, document_ref, due_date, total_amount, paid_amount, status)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
        params![
            item.id,
            item.kind.as_str(),
            item.counterparty_id,
            item.counterparty_name,
            item.description,
            item.document_ref,
            item.due_date.to_string(),
            item.total_amount.to_string(),
            item.paid_amount.to_string(),
            item.status,
        ],
    )
    .with_context(|| format!("Insert open item '{}'", item.id))?;
    Ok(())
}

type StatementRow = (String, String, String, Option<String>, String, String, bool);

fn read_statement_row(r: &Row<'_>) -> rusqlite::Result<StatementRow> {
    Ok((
        r.get(0)?,
        r.get(1)?,
        r.get(2)?,
        r.get(3)?,
        r.get(4)?,
        r.get(5)?,
        r.get(6)?,
    ))
}

fn statement_from_row(row: StatementRow) -> Result<StatementLine> {
    let (id, date, description, document_ref, amount, entry_kind, reconciled) = row;
    let date = parse_date(&date)
        .with_context(|| format!("Invalid statement date '{}' for {}", date, id))?;
    let amount = decimal_col(&amount, "statement amount", &id)?;
    let entry_kind: EntryKind = entry_kind.parse()?;
    Ok(StatementLine {
        id,
        date,
        description,
        document_ref,
        amount,
        entry_kind,
        reconciled,
    })
}

pub fn load_statement_line(conn: &Connection, id: &str) -> Result<StatementLine> {
    let row = conn
        .query_row(
            "SELECT id, date, description, document_ref, amount, entry_kind, reconciled FROM statement_lines WHERE id=?1",
            params![id],
            read_statement_row,
        )
        .optional()?
        .with_context(|| format!("Statement line '{}' not found", id))?;
    statement_from_row(row)
}

pub fn list_statement_lines(conn: &Connection, pending_only: bool) -> Result<Vec<StatementLine>> {
    let mut sql = String::from(
        "SELECT id, date, description, document_ref, amount, entry_kind, reconciled FROM statement_lines",
    );
    if pending_only {
        sql.push_str(" WHERE reconciled=0");
    }
    sql.push_str(" ORDER BY date, id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], read_statement_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(statement_from_row(row?)?);
    }
    Ok(out)
}

pub fn insert_statement_line(conn: &Connection, line: &StatementLine) -> Result<()> {
    conn.execute(
        "INSERT INTO statement_lines(id, date, description, document_ref, amount, entry_kind, reconciled)
         VALUES (?1,?2,?3,?4,?5,?6,?7)",
        params![
            line.id,
            line.date.to_string(),
            line.description,
            line.document_ref,
            line.amount.to_string(),
            line.entry_kind.as_str(),
            line.reconciled,
        ],
    )
    .with_context(|| format!("Insert statement line '{}'", line.id))?;
    Ok(())
}

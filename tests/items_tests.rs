// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::Connection;
use rust_decimal::Decimal;
use settleclip::{
    allocation::allocate_fifo_by_due_date,
    cli,
    commands::{allocate, doctor, items},
    db,
    settlement::settle,
};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    for (id, due, paid) in [
        ("A", "2026-01-03", "0"),
        ("B", "2026-01-01", "109"),
        ("C", "2026-01-02", "9"),
    ] {
        conn.execute(
            "INSERT INTO open_items(id, kind, counterparty_id, counterparty_name, due_date, total_amount, paid_amount) VALUES (?1,'receber','P1','Ana',?2,'109',?3)",
            [id, due, paid],
        )
        .unwrap();
    }
    conn
}

fn sub_matches(args: &[&str], path: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["settleclip"];
    argv.extend_from_slice(args);
    let mut m = cli::build_cli().get_matches_from(argv);
    for name in path {
        m = match m.subcommand() {
            Some((n, sub)) if n == *name => sub.clone(),
            _ => panic!("no {} subcommand", name),
        };
    }
    m
}

#[test]
fn list_open_only_skips_settled_items() {
    let conn = setup();
    let m = sub_matches(&["item", "list", "--open"], &["item", "list"]);
    let rows = items::query_rows(&conn, &m).unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["C", "A"]);
}

#[test]
fn add_rejects_paid_above_total() {
    let conn = setup();
    let m = sub_matches(
        &[
            "item",
            "add",
            "--id",
            "Z",
            "--kind",
            "pagar",
            "--counterparty-id",
            "S1",
            "--counterparty",
            "Fornecedor",
            "--due",
            "2026-03-01",
            "--total",
            "10",
            "--paid",
            "11",
        ],
        &["item"],
    );
    assert!(items::handle(&conn, &m).is_err());
}

#[test]
fn allocate_preview_uses_open_balances() {
    let conn = setup();
    let m = sub_matches(
        &["allocate", "--total", "150", "--items", "A,B,C"],
        &["allocate"],
    );
    let (preview, rows) = allocate::preview(&conn, &m).unwrap();
    // B is fully paid, C has 100 open, A takes the rest
    assert_eq!(preview.allocations.len(), 2);
    assert_eq!(preview.allocations["C"], Decimal::from(100));
    assert_eq!(preview.allocations["A"], Decimal::from(50));
    assert!(preview.summary.difference.is_zero());
    assert_eq!(rows[0][0], "B");
    assert_eq!(rows[0][4], "0.00");
}

#[test]
fn allocate_preview_flags_leftover_and_full_batch() {
    let conn = setup();
    let m = sub_matches(
        &["allocate", "--total", "300", "--items", "A,B,C"],
        &["allocate"],
    );
    let (preview, _) = allocate::preview(&conn, &m).unwrap();
    assert_eq!(preview.summary.difference, Decimal::from(91));
    assert!(!preview.settles_in_full);
    assert_eq!(preview.counterparties.len(), 1);
    assert_eq!(preview.counterparties[0].id, "P1");
    assert_eq!(preview.counterparties[0].name, "Ana");

    let m = sub_matches(
        &["allocate", "--total", "209", "--items", "A,B,C"],
        &["allocate"],
    );
    let (preview, _) = allocate::preview(&conn, &m).unwrap();
    assert!(preview.settles_in_full);
}

fn settled_conn() -> Connection {
    let mut conn = setup();
    conn.execute(
        "INSERT INTO statement_lines(id, date, description, amount, entry_kind) VALUES ('E1','2026-01-05','PIX ANA','100','credito')",
        [],
    )
    .unwrap();
    let selected = db::load_open_items(&conn, &["C".to_string()]).unwrap();
    let allocations = allocate_fifo_by_due_date(Decimal::from(100), &selected);
    settle(&mut conn, "E1", &selected, &allocations, None).unwrap();
    conn
}

#[test]
fn rm_refuses_items_with_settlement_history() {
    let conn = settled_conn();
    let m = sub_matches(&["item", "rm", "--id", "C"], &["item"]);
    let err = items::handle(&conn, &m).unwrap_err();
    assert!(err.to_string().contains("cannot be removed"));

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM settlement_allocations", [], |r| r.get(0))
        .unwrap();
    assert_eq!(rows, 1);
    assert!(doctor::issues(&conn).unwrap().is_empty());

    // items never settled can still be removed
    let m = sub_matches(&["item", "rm", "--id", "A"], &["item"]);
    items::handle(&conn, &m).unwrap();
}

#[test]
fn schema_blocks_deleting_settled_items() {
    let conn = settled_conn();
    assert!(conn.execute("DELETE FROM open_items WHERE id='C'", []).is_err());
}

#[test]
fn doctor_flags_settlement_totals_without_allocations() {
    let conn = settled_conn();
    conn.execute("DELETE FROM settlement_allocations", []).unwrap();
    let issues = doctor::issues(&conn).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0][0], "settlement_total_mismatch");
}

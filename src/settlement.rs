// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::load_statement_line;
use crate::error::ReconcileError;
use crate::models::{AllocationMap, OpenItem};
use crate::reconcile::{OverpaymentMode, check_against_balances, clamp_to_balances, validate_plan};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

pub const STATUS_PAID: &str = "pago";
pub const STATUS_PARTIAL: &str = "parcial";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettlementOutcome {
    Settled {
        settlement_id: i64,
        applied_total: Decimal,
        difference: Decimal,
        credit_id: Option<i64>,
    },
    Noop {
        message: String,
    },
}

/// Apply `allocations` of a statement line to `items` in one transaction.
///
/// `items` is the caller's selection; every allocation must point into it.
pub fn settle(
    conn: &mut Connection,
    statement_id: &str,
    items: &[OpenItem],
    allocations: &AllocationMap,
    credit_to: Option<&str>,
) -> Result<SettlementOutcome> {
    let line = load_statement_line(conn, statement_id)?;
    if line.reconciled {
        return Ok(SettlementOutcome::Noop {
            message: format!("Statement line '{}' is already reconciled", line.id),
        });
    }

    let expected = line.entry_kind.item_kind();
    if let Some(bad) = items.iter().find(|it| it.kind != expected) {
        return Err(ReconcileError::KindMismatch {
            id: bad.id.clone(),
            item_kind: bad.kind,
            entry_kind: line.entry_kind,
        }
        .into());
    }

    let mut plan = validate_plan(line.amount, allocations, credit_to)?;
    check_against_balances(&plan, items)?;
    clamp_to_balances(&mut plan, items)?;

    let tx = conn.transaction()?;
    let credit_id = match (&plan.overpayment, plan.credit_amount()) {
        (OverpaymentMode::CreditOnAccount { counterparty_id }, Some(amount)) => {
            tx.execute(
                "INSERT INTO account_credits(counterparty_id, statement_id, amount) VALUES (?1,?2,?3)",
                params![counterparty_id, line.id, amount.to_string()],
            )?;
            Some(tx.last_insert_rowid())
        }
        _ => None,
    };

    tx.execute(
        "INSERT INTO settlements(statement_id, applied_total, difference, credit_id) VALUES (?1,?2,?3,?4)",
        params![
            line.id,
            plan.summary.applied_total.to_string(),
            plan.summary.difference.to_string(),
            credit_id
        ],
    )?;
    let settlement_id = tx.last_insert_rowid();

    for (item_id, applied) in &plan.allocations {
        // check_against_balances guarantees presence
        let Some(item) = items.iter().find(|it| &it.id == item_id) else {
            continue;
        };
        let paid: String = tx
            .query_row(
                "SELECT paid_amount FROM open_items WHERE id=?1",
                params![item_id],
                |r| r.get(0),
            )
            .with_context(|| format!("Open item '{}' not found", item_id))?;
        let paid = paid
            .parse::<Decimal>()
            .with_context(|| format!("Invalid paid amount '{}' for {}", paid, item_id))?;
        let new_paid = paid + *applied;
        let status = if item.total_amount - new_paid <= Decimal::ZERO {
            STATUS_PAID
        } else {
            STATUS_PARTIAL
        };
        tx.execute(
            "UPDATE open_items SET paid_amount=?1, status=?2 WHERE id=?3",
            params![new_paid.to_string(), status, item_id],
        )?;
        tx.execute(
            "INSERT INTO settlement_allocations(settlement_id, item_id, amount) VALUES (?1,?2,?3)",
            params![settlement_id, item_id, applied.to_string()],
        )?;
    }

    tx.execute(
        "UPDATE statement_lines SET reconciled=1 WHERE id=?1",
        params![line.id],
    )?;
    tx.commit()?;

    info!(
        statement = %line.id,
        settlement_id,
        applied = %plan.summary.applied_total,
        difference = %plan.summary.difference,
        items = plan.allocations.len(),
        "statement line settled"
    );

    Ok(SettlementOutcome::Settled {
        settlement_id,
        applied_total: plan.summary.applied_total,
        difference: plan.summary.difference,
        credit_id,
    })
}

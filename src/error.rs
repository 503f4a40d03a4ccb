// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{EntryKind, ItemKind};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ReconcileError {
    #[error("no positive allocation given for any item")]
    NoAllocations,

    #[error("applied total {applied} exceeds statement amount {statement}")]
    AppliedExceedsStatement { applied: Decimal, statement: Decimal },

    #[error(
        "statement amount leaves {difference} unapplied; pass a counterparty for an account credit or adjust the allocation"
    )]
    UnresolvedOverpayment { difference: Decimal },

    #[error("allocation references item '{0}' which is not part of the selection")]
    UnknownItem(String),

    #[error("allocation of {applied} to item '{id}' exceeds its open balance {balance}")]
    ExceedsOpenBalance {
        id: String,
        applied: Decimal,
        balance: Decimal,
    },

    #[error("item '{id}' is {item_kind} but statement line is {entry_kind}")]
    KindMismatch {
        id: String,
        item_kind: ItemKind,
        entry_kind: EntryKind,
    },

    #[error("counterparty '{0}' does not hold any of the selected items")]
    UnknownCounterparty(String),
}

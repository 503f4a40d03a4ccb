// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Item id -> amount applied to it. Ordered so output is reproducible.
pub type AllocationMap = BTreeMap<String, Decimal>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    #[serde(rename = "pagar", alias = "payable")]
    Payable,
    #[serde(rename = "receber", alias = "receivable")]
    Receivable,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Payable => "pagar",
            ItemKind::Receivable => "receber",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pagar" | "payable" => Ok(ItemKind::Payable),
            "receber" | "receivable" => Ok(ItemKind::Receivable),
            other => Err(anyhow::anyhow!(
                "Invalid item kind '{}', expected pagar|receber",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    #[serde(rename = "credito", alias = "credit")]
    Credit,
    #[serde(rename = "debito", alias = "debit")]
    Debit,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Credit => "credito",
            EntryKind::Debit => "debito",
        }
    }

    /// Money in settles receivables, money out settles payables.
    pub fn item_kind(&self) -> ItemKind {
        match self {
            EntryKind::Credit => ItemKind::Receivable,
            EntryKind::Debit => ItemKind::Payable,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credito" | "credit" => Ok(EntryKind::Credit),
            "debito" | "debit" => Ok(EntryKind::Debit),
            other => Err(anyhow::anyhow!(
                "Invalid entry kind '{}', expected credito|debito",
                other
            )),
        }
    }
}

/// An outstanding receivable or payable (título).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenItem {
    pub id: String,
    pub kind: ItemKind,
    pub counterparty_id: String,
    pub counterparty_name: String,
    pub description: Option<String>,
    pub document_ref: Option<String>,
    pub due_date: NaiveDate,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub open_balance: Decimal,
    pub status: String,
}

impl OpenItem {
    pub const DEFAULT_STATUS: &'static str = "pendente";

    pub fn new(
        id: impl Into<String>,
        kind: ItemKind,
        counterparty_id: impl Into<String>,
        counterparty_name: impl Into<String>,
        due_date: NaiveDate,
        total_amount: Decimal,
        paid_amount: Decimal,
    ) -> Self {
        // saturate: a negative paid amount can push the difference past Decimal::MAX
        let open_balance = match total_amount.checked_sub(paid_amount) {
            Some(open) => open.max(Decimal::ZERO),
            None if paid_amount.is_sign_negative() => Decimal::MAX,
            None => Decimal::ZERO,
        };
        OpenItem {
            id: id.into(),
            kind,
            counterparty_id: counterparty_id.into(),
            counterparty_name: counterparty_name.into(),
            description: None,
            document_ref: None,
            due_date,
            total_amount,
            paid_amount,
            open_balance,
            status: Self::DEFAULT_STATUS.to_string(),
        }
    }
}

/// A bank statement line (extrato). `amount` is always the positive magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    pub document_ref: Option<String>,
    pub amount: Decimal,
    pub entry_kind: EntryKind,
    pub reconciled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
    pub id: String,
    pub name: String,
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::prelude::*;

pub const MONEY_DP: u32 = 2;

/// Two amounts within one cent are considered equal.
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

pub const DEFAULT_CURRENCY: &str = "BRL";

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Round half-up at the cent boundary.
pub fn round_money(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a binary float coming from an external payload; NaN and infinities yield `None`.
pub fn to_finite_money(v: f64) -> Option<Decimal> {
    if !v.is_finite() {
        return None;
    }
    Decimal::from_f64(v)
}

pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    a.checked_sub(b)
        .is_some_and(|d| d.abs() <= MONEY_TOLERANCE)
}

pub fn fmt_money(d: &Decimal, ccy: &str) -> String {
    format!("{} {:.2}", ccy, round_money(*d))
}

/// Comma separated ids, trimmed, empties dropped, first occurrence wins.
pub fn parse_id_list(s: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for part in s.split(',') {
        let id = part.trim();
        if !id.is_empty() && !ids.iter().any(|x| x == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

/// `ID=AMOUNT` pairs as given to `settle --alloc`.
pub fn parse_alloc_pair(s: &str) -> Result<(String, Decimal)> {
    let (id, amount) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid allocation '{}', expected ID=AMOUNT", s))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(anyhow!("Invalid allocation '{}': empty item id", s));
    }
    Ok((id.to_string(), parse_decimal(amount)?))
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // Arrays stream one element per line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

pub fn get_currency(conn: &Connection) -> Result<String> {
    let v: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key='currency'", [], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(v.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()))
}

pub fn set_currency(conn: &Connection, ccy: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES('currency', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![ccy],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn round_money_is_half_up_at_cents() {
        assert_eq!(
            round_money(Decimal::from_str("0.005").unwrap()),
            Decimal::from_str("0.01").unwrap()
        );
        assert_eq!(
            round_money(Decimal::from_str("10.125").unwrap()),
            Decimal::from_str("10.13").unwrap()
        );
        assert_eq!(
            round_money(Decimal::from_str("10.124").unwrap()),
            Decimal::from_str("10.12").unwrap()
        );
    }

    #[test]
    fn to_finite_money_rejects_non_finite() {
        assert_eq!(to_finite_money(f64::NAN), None);
        assert_eq!(to_finite_money(f64::INFINITY), None);
        assert_eq!(to_finite_money(f64::NEG_INFINITY), None);
        assert_eq!(
            to_finite_money(109.0).map(round_money),
            Some(Decimal::from(109))
        );
    }

    #[test]
    fn parse_id_list_trims_and_dedups() {
        assert_eq!(parse_id_list(" a, b,,a , c "), vec!["a", "b", "c"]);
    }

    #[test]
    fn parse_alloc_pair_requires_id_and_amount() {
        let (id, amt) = parse_alloc_pair(" T1 = 12.50 ").unwrap();
        assert_eq!(id, "T1");
        assert_eq!(amt, Decimal::from_str("12.50").unwrap());
        assert!(parse_alloc_pair("T1").is_err());
        assert!(parse_alloc_pair("=5").is_err());
        assert!(parse_alloc_pair("T1=abc").is_err());
    }
}

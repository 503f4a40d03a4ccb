// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::{ItemFilter, list_open_items, load_statement_line};
use crate::reconcile::{
    AUTO_MATCH_SCORE, DirectMatch, MatchReason, classify_direct_match, exact_suggestions,
    score_candidate,
};
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use std::cmp::Reverse;

#[derive(Debug, Serialize)]
pub struct Suggestion {
    pub item_id: String,
    pub counterparty: String,
    pub due_date: String,
    pub open_balance: String,
    pub document_ref: Option<String>,
    #[serde(rename = "match")]
    pub direct_match: DirectMatch,
    pub score: u32,
    pub reasons: Vec<MatchReason>,
    /// Score reaches the unattended settlement threshold.
    pub auto_match: bool,
}

fn rank(m: DirectMatch) -> u8 {
    match m {
        DirectMatch::Exact => 0,
        DirectMatch::Partial => 1,
        DirectMatch::StatementExceedsItem => 2,
    }
}

/// Open items of the kind the line settles scoring at least `min_score`.
///
/// Exact amount matches come first; each group is ordered by score, then by
/// closeness of the balance, then settlement order.
pub fn suggestions(
    conn: &Connection,
    statement_id: &str,
    limit: usize,
    min_score: u32,
) -> Result<Vec<Suggestion>> {
    let line = load_statement_line(conn, statement_id)?;
    let filter = ItemFilter {
        kind: Some(line.entry_kind.item_kind()),
        counterparty_id: None,
        open_only: true,
    };
    let items = list_open_items(conn, &filter)?;
    let exact = exact_suggestions(line.amount, &items);

    let mut scored: Vec<_> = items
        .iter()
        .map(|it| {
            let m = classify_direct_match(line.amount, it);
            let group = if exact.iter().any(|e| e.id == it.id) { 0 } else { 1 };
            let closeness = line.amount.checked_sub(it.open_balance).map(|d| d.abs());
            (group, score_candidate(&line, it), rank(m), closeness, it, m)
        })
        .filter(|(_, ms, ..)| ms.score >= min_score)
        .collect();
    // list_open_items already returns settlement order; sort is stable
    scored.sort_by_key(|(group, ms, r, closeness, _, _)| {
        (*group, Reverse(ms.score), *r, closeness.is_none(), *closeness)
    });

    Ok(scored
        .into_iter()
        .take(limit)
        .map(|(_, ms, _, _, it, m)| Suggestion {
            item_id: it.id.clone(),
            counterparty: it.counterparty_name.clone(),
            due_date: it.due_date.to_string(),
            open_balance: format!("{:.2}", it.open_balance),
            document_ref: it.document_ref.clone(),
            direct_match: m,
            auto_match: ms.score >= AUTO_MATCH_SCORE,
            score: ms.score,
            reasons: ms.reasons,
        })
        .collect())
}

pub fn handle(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let statement_id = sub.get_one::<String>("statement").unwrap().trim();
    let limit = *sub.get_one::<usize>("limit").unwrap();
    let min_score = *sub.get_one::<u32>("min_score").unwrap();
    let data = suggestions(conn, statement_id, limit, min_score)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|s| {
                vec![
                    s.item_id.clone(),
                    s.counterparty.clone(),
                    s.due_date.clone(),
                    s.open_balance.clone(),
                    s.document_ref.clone().unwrap_or_default(),
                    match s.direct_match {
                        DirectMatch::Exact => "exact".to_string(),
                        DirectMatch::Partial => "partial".to_string(),
                        DirectMatch::StatementExceedsItem => "needs more items".to_string(),
                    },
                    if s.auto_match {
                        format!("{} (auto)", s.score)
                    } else {
                        s.score.to_string()
                    },
                    s.reasons
                        .iter()
                        .map(|r| format!("{} +{}", r.label, r.points))
                        .collect::<Vec<_>>()
                        .join("; "),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Item", "Counterparty", "Due", "Open", "Doc", "Match", "Score", "Why"],
                rows
            )
        );
    }
    Ok(())
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Checks run before a statement line is settled against open items.

use crate::allocation::{allocated_total, allocation_order};
use crate::error::ReconcileError;
use crate::models::{AllocationMap, Counterparty, OpenItem, StatementLine};
use crate::utils::{MONEY_TOLERANCE, round_money, within_tolerance};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectMatch {
    /// Statement and open balance agree within a cent.
    Exact,
    /// Open balance is larger; the item can only be settled partially.
    Partial,
    /// Statement is larger; more items or an adjustment are needed.
    StatementExceedsItem,
}

pub fn classify_direct_match(statement_amount: Decimal, item: &OpenItem) -> DirectMatch {
    let diff = statement_amount - item.open_balance;
    if diff.abs() <= MONEY_TOLERANCE {
        DirectMatch::Exact
    } else if diff < Decimal::ZERO {
        DirectMatch::Partial
    } else {
        DirectMatch::StatementExceedsItem
    }
}

pub fn exact_suggestions(statement_amount: Decimal, items: &[OpenItem]) -> Vec<&OpenItem> {
    allocation_order(items)
        .into_iter()
        .filter(|it| within_tolerance(it.open_balance, statement_amount))
        .collect()
}

/// Whether the selection can be settled in full by the statement line.
pub fn batch_matches(statement_amount: Decimal, items: &[OpenItem]) -> bool {
    if items.is_empty() {
        return false;
    }
    // overflow means the selection cannot match any representable amount
    items
        .iter()
        .try_fold(Decimal::ZERO, |acc, it| acc.checked_add(it.open_balance))
        .is_some_and(|sum| within_tolerance(sum, statement_amount))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllocationSummary {
    pub statement_amount: Decimal,
    pub applied_total: Decimal,
    pub difference: Decimal,
}

pub fn summarize(statement_amount: Decimal, allocations: &AllocationMap) -> AllocationSummary {
    let applied_total = allocated_total(allocations);
    AllocationSummary {
        statement_amount,
        applied_total,
        difference: statement_amount - applied_total,
    }
}

/// Unique counterparties of a selection, sorted by name.
pub fn distinct_counterparties(items: &[OpenItem]) -> Vec<Counterparty> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for it in items {
        if it.counterparty_id.is_empty() {
            continue;
        }
        seen.entry(it.counterparty_id.as_str())
            .or_insert(it.counterparty_name.as_str());
    }
    let mut out: Vec<Counterparty> = seen
        .into_iter()
        .map(|(id, name)| Counterparty {
            id: id.to_string(),
            name: if name.is_empty() {
                "—".to_string()
            } else {
                name.to_string()
            },
        })
        .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    out
}

/// Score at or above which a candidate is confident enough to settle unattended.
pub const AUTO_MATCH_SCORE: u32 = 85;

/// Days around the statement date in which a due date still earns points.
pub const DATE_WINDOW_DAYS: i64 = 5;

const POINTS_AMOUNT_EXACT: u32 = 50;
const POINTS_AMOUNT_CLOSE: u32 = 20;
const POINTS_DOCUMENT: u32 = 30;
const POINTS_DESCRIPTION: u32 = 20;
const POINTS_SAME_DAY: u32 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchReason {
    pub label: String,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchScore {
    /// 0 to 100.
    pub score: u32,
    pub reasons: Vec<MatchReason>,
}

fn description_tokens(s: &str) -> BTreeSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 3)
        .map(|t| t.to_lowercase())
        .collect()
}

fn normalized_ref(r: Option<&str>) -> Option<String> {
    r.map(|s| {
        s.chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect::<String>()
    })
    .filter(|s| !s.is_empty())
}

/// How well an open item explains a statement line, from its amount,
/// document reference, description and due date.
pub fn score_candidate(line: &StatementLine, item: &OpenItem) -> MatchScore {
    let mut reasons = Vec::new();

    if within_tolerance(line.amount, item.open_balance) {
        reasons.push(MatchReason {
            label: "amount matches open balance".into(),
            points: POINTS_AMOUNT_EXACT,
        });
    } else if line
        .amount
        .checked_sub(item.open_balance)
        .and_then(|d| d.abs().checked_mul(Decimal::from(20)))
        .is_some_and(|d| d <= line.amount)
    {
        // within 5% of the statement amount
        reasons.push(MatchReason {
            label: "amount within 5%".into(),
            points: POINTS_AMOUNT_CLOSE,
        });
    }

    if let (Some(a), Some(b)) = (
        normalized_ref(line.document_ref.as_deref()),
        normalized_ref(item.document_ref.as_deref()),
    ) {
        if a == b {
            reasons.push(MatchReason {
                label: "document reference matches".into(),
                points: POINTS_DOCUMENT,
            });
        }
    }

    let line_words = description_tokens(&line.description);
    let mut item_words = description_tokens(item.description.as_deref().unwrap_or(""));
    item_words.extend(description_tokens(&item.counterparty_name));
    let shared = line_words.intersection(&item_words).count();
    let smaller = line_words.len().min(item_words.len());
    if shared > 0 && smaller > 0 {
        let points = (POINTS_DESCRIPTION as usize * shared / smaller) as u32;
        reasons.push(MatchReason {
            label: format!("description shares {} word(s)", shared),
            points: points.max(1),
        });
    }

    let days = (line.date - item.due_date).num_days().abs();
    if days == 0 {
        reasons.push(MatchReason {
            label: "due on the statement date".into(),
            points: POINTS_SAME_DAY,
        });
    } else if days <= DATE_WINDOW_DAYS {
        reasons.push(MatchReason {
            label: format!("due {} day(s) from the statement date", days),
            points: POINTS_SAME_DAY - 2 * days as u32,
        });
    }

    let score = reasons.iter().map(|r| r.points).sum::<u32>().min(100);
    MatchScore { score, reasons }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OverpaymentMode {
    Error,
    CreditOnAccount { counterparty_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementPlan {
    pub allocations: AllocationMap,
    pub summary: AllocationSummary,
    pub overpayment: OverpaymentMode,
}

impl SettlementPlan {
    pub fn credit_amount(&self) -> Option<Decimal> {
        match self.overpayment {
            OverpaymentMode::CreditOnAccount { .. } => Some(self.summary.difference),
            OverpaymentMode::Error => None,
        }
    }
}

pub fn validate_plan(
    statement_amount: Decimal,
    allocations: &AllocationMap,
    credit_to: Option<&str>,
) -> Result<SettlementPlan, ReconcileError> {
    let kept: AllocationMap = allocations
        .iter()
        .map(|(id, v)| (id.clone(), round_money(*v)))
        .filter(|(_, v)| *v > Decimal::ZERO)
        .collect();
    if kept.is_empty() {
        return Err(ReconcileError::NoAllocations);
    }

    let summary = summarize(statement_amount, &kept);
    if summary.applied_total - statement_amount > MONEY_TOLERANCE {
        return Err(ReconcileError::AppliedExceedsStatement {
            applied: summary.applied_total,
            statement: statement_amount,
        });
    }

    let overpayment = if summary.difference > MONEY_TOLERANCE {
        match credit_to.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => OverpaymentMode::CreditOnAccount {
                counterparty_id: id.to_string(),
            },
            None => {
                return Err(ReconcileError::UnresolvedOverpayment {
                    difference: summary.difference,
                });
            }
        }
    } else {
        OverpaymentMode::Error
    };

    Ok(SettlementPlan {
        allocations: kept,
        summary,
        overpayment,
    })
}

/// Every allocation must land on a selected item and stay within its open balance.
pub fn check_against_balances(
    plan: &SettlementPlan,
    items: &[OpenItem],
) -> Result<(), ReconcileError> {
    for (id, applied) in &plan.allocations {
        let item = items
            .iter()
            .find(|it| &it.id == id)
            .ok_or_else(|| ReconcileError::UnknownItem(id.clone()))?;
        if *applied - item.open_balance > MONEY_TOLERANCE {
            return Err(ReconcileError::ExceedsOpenBalance {
                id: id.clone(),
                applied: *applied,
                balance: item.open_balance,
            });
        }
    }
    if let OverpaymentMode::CreditOnAccount { counterparty_id } = &plan.overpayment {
        if !items.iter().any(|it| &it.counterparty_id == counterparty_id) {
            return Err(ReconcileError::UnknownCounterparty(counterparty_id.clone()));
        }
    }
    Ok(())
}

/// Trims allocations that overshoot their item by the tolerated cent, so
/// settling never pays an item past its total.
pub fn clamp_to_balances(
    plan: &mut SettlementPlan,
    items: &[OpenItem],
) -> Result<(), ReconcileError> {
    let mut changed = false;
    for (id, applied) in plan.allocations.iter_mut() {
        if let Some(item) = items.iter().find(|it| &it.id == id) {
            if *applied > item.open_balance {
                *applied = item.open_balance;
                changed = true;
            }
        }
    }
    if !changed {
        return Ok(());
    }
    plan.allocations.retain(|_, v| *v > Decimal::ZERO);
    if plan.allocations.is_empty() {
        return Err(ReconcileError::NoAllocations);
    }
    plan.summary = summarize(plan.summary.statement_amount, &plan.allocations);
    if plan.overpayment == OverpaymentMode::Error && plan.summary.difference > MONEY_TOLERANCE {
        return Err(ReconcileError::UnresolvedOverpayment {
            difference: plan.summary.difference,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryKind, ItemKind};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(id: &str, who: (&str, &str), due: &str, balance: &str) -> OpenItem {
        OpenItem::new(
            id,
            ItemKind::Receivable,
            who.0,
            who.1,
            NaiveDate::parse_from_str(due, "%Y-%m-%d").unwrap(),
            dec(balance),
            Decimal::ZERO,
        )
    }

    fn allocs(pairs: &[(&str, &str)]) -> AllocationMap {
        pairs
            .iter()
            .map(|(id, v)| (id.to_string(), dec(v)))
            .collect()
    }

    #[test]
    fn direct_match_classification() {
        let it = item("t1", ("p1", "Ana"), "2026-01-01", "100.00");
        assert_eq!(classify_direct_match(dec("100.01"), &it), DirectMatch::Exact);
        assert_eq!(classify_direct_match(dec("99.99"), &it), DirectMatch::Exact);
        assert_eq!(classify_direct_match(dec("40"), &it), DirectMatch::Partial);
        assert_eq!(
            classify_direct_match(dec("150"), &it),
            DirectMatch::StatementExceedsItem
        );
    }

    #[test]
    fn exact_suggestions_keep_settlement_order() {
        let items = vec![
            item("b", ("p1", "Ana"), "2026-02-01", "50"),
            item("a", ("p1", "Ana"), "2026-01-01", "50.01"),
            item("c", ("p1", "Ana"), "2026-01-15", "80"),
        ];
        let ids: Vec<&str> = exact_suggestions(dec("50"), &items)
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn batch_requires_sum_to_match() {
        let items = vec![
            item("a", ("p1", "Ana"), "2026-01-01", "10"),
            item("b", ("p1", "Ana"), "2026-01-02", "15.50"),
        ];
        assert!(batch_matches(dec("25.50"), &items));
        assert!(!batch_matches(dec("25.60"), &items));
        assert!(!batch_matches(dec("0"), &[]));
    }

    #[test]
    fn counterparties_are_unique_and_sorted_by_name() {
        let items = vec![
            item("a", ("p2", "Zeca"), "2026-01-01", "1"),
            item("b", ("p1", "Ana"), "2026-01-01", "1"),
            item("c", ("p2", "Zeca"), "2026-01-01", "1"),
            item("d", ("", ""), "2026-01-01", "1"),
        ];
        let cps = distinct_counterparties(&items);
        assert_eq!(cps.len(), 2);
        assert_eq!(cps[0].name, "Ana");
        assert_eq!(cps[1].id, "p2");
    }

    #[test]
    fn plan_without_positive_allocations_is_rejected() {
        let err = validate_plan(dec("10"), &allocs(&[("a", "0"), ("b", "-2")]), None).unwrap_err();
        assert_eq!(err, ReconcileError::NoAllocations);
    }

    #[test]
    fn plan_applying_more_than_statement_is_rejected() {
        let err = validate_plan(dec("10"), &allocs(&[("a", "6"), ("b", "4.02")]), None).unwrap_err();
        assert!(matches!(err, ReconcileError::AppliedExceedsStatement { .. }));
        // one cent over is tolerated
        assert!(validate_plan(dec("10"), &allocs(&[("a", "6"), ("b", "4.01")]), None).is_ok());
    }

    #[test]
    fn leftover_needs_credit_counterparty() {
        let a = allocs(&[("a", "8")]);
        let err = validate_plan(dec("10"), &a, None).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::UnresolvedOverpayment {
                difference: dec("2")
            }
        );
        assert!(validate_plan(dec("10"), &a, Some("  ")).is_err());

        let plan = validate_plan(dec("10"), &a, Some("p1")).unwrap();
        assert_eq!(
            plan.overpayment,
            OverpaymentMode::CreditOnAccount {
                counterparty_id: "p1".into()
            }
        );
        assert_eq!(plan.credit_amount(), Some(dec("2")));
    }

    #[test]
    fn exact_plan_ignores_credit_counterparty() {
        let plan = validate_plan(dec("10"), &allocs(&[("a", "10")]), Some("p1")).unwrap();
        assert_eq!(plan.overpayment, OverpaymentMode::Error);
        assert_eq!(plan.credit_amount(), None);
        assert_eq!(plan.summary.difference, Decimal::ZERO);
    }

    #[test]
    fn balances_bound_each_allocation() {
        let items = vec![item("a", ("p1", "Ana"), "2026-01-01", "5")];
        let plan = validate_plan(dec("7"), &allocs(&[("a", "7")]), None).unwrap();
        assert!(matches!(
            check_against_balances(&plan, &items),
            Err(ReconcileError::ExceedsOpenBalance { .. })
        ));

        let plan = validate_plan(dec("5"), &allocs(&[("zz", "5")]), None).unwrap();
        assert_eq!(
            check_against_balances(&plan, &items),
            Err(ReconcileError::UnknownItem("zz".into()))
        );

        let plan = validate_plan(dec("9"), &allocs(&[("a", "5")]), Some("p9")).unwrap();
        assert_eq!(
            check_against_balances(&plan, &items),
            Err(ReconcileError::UnknownCounterparty("p9".into()))
        );
    }

    fn line(date: &str, amount: &str, description: &str, doc: Option<&str>) -> StatementLine {
        StatementLine {
            id: "e1".into(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: description.into(),
            document_ref: doc.map(String::from),
            amount: dec(amount),
            entry_kind: EntryKind::Credit,
            reconciled: false,
        }
    }

    #[test]
    fn score_rewards_amount_document_description_and_date() {
        let mut it = item("t1", ("p1", "Ana Souza"), "2026-01-10", "250.00");
        it.document_ref = Some("NF-1234".into());
        it.description = Some("Mensalidade janeiro".into());

        let full = score_candidate(
            &line("2026-01-10", "250", "PIX ANA SOUZA MENSALIDADE", Some("nf 1234")),
            &it,
        );
        assert_eq!(full.score, 100);
        let labels: Vec<&str> = full.reasons.iter().map(|r| r.label.as_str()).collect();
        assert!(labels.contains(&"amount matches open balance"));
        assert!(labels.contains(&"document reference matches"));
        assert!(labels.contains(&"due on the statement date"));

        let amount_only = score_candidate(&line("2026-03-01", "250", "TED", None), &it);
        assert_eq!(amount_only.score, 50);
        assert_eq!(amount_only.reasons.len(), 1);
    }

    #[test]
    fn score_gives_partial_credit_for_near_amounts_and_dates() {
        let it = item("t1", ("p1", "Ana"), "2026-01-10", "100");
        let near = score_candidate(&line("2026-01-12", "104", "TED", None), &it);
        assert_eq!(
            near.reasons,
            vec![
                MatchReason {
                    label: "amount within 5%".into(),
                    points: 20
                },
                MatchReason {
                    label: "due 2 day(s) from the statement date".into(),
                    points: 11
                },
            ]
        );
        assert_eq!(near.score, 31);

        let far = score_candidate(&line("2026-01-20", "300", "TED", None), &it);
        assert_eq!(far.score, 0);
        assert!(far.reasons.is_empty());
    }

    #[test]
    fn score_ignores_empty_document_refs() {
        let mut it = item("t1", ("p1", "Ana"), "2026-05-01", "10");
        it.document_ref = Some(" - ".into());
        let ms = score_candidate(&line("2026-01-01", "99", "X", Some("--")), &it);
        assert_eq!(ms.score, 0);
    }

    #[test]
    fn huge_balances_never_panic() {
        let items = vec![
            item("a", ("p1", "Ana"), "2026-01-01", "50000000000000000000000000000"),
            item("b", ("p1", "Ana"), "2026-01-02", "50000000000000000000000000000"),
        ];
        assert!(!batch_matches(dec("10"), &items));
        let ms = score_candidate(&line("2026-01-01", "10", "TED", None), &items[0]);
        assert!(ms.score < AUTO_MATCH_SCORE);

        let plan = validate_plan(
            dec("10"),
            &allocs(&[
                ("a", "50000000000000000000000000000"),
                ("b", "50000000000000000000000000000"),
            ]),
            None,
        );
        assert!(matches!(
            plan,
            Err(ReconcileError::AppliedExceedsStatement { .. })
        ));
    }

    #[test]
    fn open_balance_saturates_on_negative_paid() {
        let it = OpenItem::new(
            "t1",
            ItemKind::Payable,
            "s1",
            "Fornecedor",
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            dec("50000000000000000000000000000"),
            dec("-50000000000000000000000000000"),
        );
        assert_eq!(it.open_balance, Decimal::MAX);
    }

    #[test]
    fn clamp_trims_tolerated_overshoot() {
        let items = vec![item("a", ("p1", "Ana"), "2026-01-01", "100")];
        let mut plan = validate_plan(dec("100.01"), &allocs(&[("a", "100.01")]), None).unwrap();
        check_against_balances(&plan, &items).unwrap();
        clamp_to_balances(&mut plan, &items).unwrap();
        assert_eq!(plan.allocations["a"], dec("100"));
        assert_eq!(plan.summary.applied_total, dec("100"));
        assert_eq!(plan.summary.difference, dec("0.01"));
    }

    #[test]
    fn clamp_rejects_leftover_it_creates() {
        let items = vec![
            item("a", ("p1", "Ana"), "2026-01-01", "100"),
            item("b", ("p1", "Ana"), "2026-01-02", "100"),
        ];
        let mut plan = validate_plan(
            dec("200.02"),
            &allocs(&[("a", "100.01"), ("b", "100.01")]),
            None,
        )
        .unwrap();
        assert_eq!(
            clamp_to_balances(&mut plan, &items),
            Err(ReconcileError::UnresolvedOverpayment {
                difference: dec("0.02")
            })
        );
    }
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, ArgGroup, Command, arg, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(arg!(--json "Print pretty JSON"))
        .arg(arg!(--jsonl "Print one JSON object per line").conflicts_with("json"))
}

fn item_cmd() -> Command {
    Command::new("item")
        .about("Manage open receivables and payables")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Register an open item")
                .arg(arg!(--id <ID> "Item id").required(true))
                .arg(arg!(--kind <KIND> "pagar | receber").required(true))
                .arg(
                    Arg::new("counterparty_id")
                        .long("counterparty-id")
                        .value_name("ID")
                        .required(true),
                )
                .arg(
                    Arg::new("counterparty")
                        .long("counterparty")
                        .value_name("NAME")
                        .required(true),
                )
                .arg(arg!(--due <DATE> "Due date YYYY-MM-DD").required(true))
                .arg(arg!(--total <AMOUNT> "Total amount").required(true))
                .arg(arg!(--paid <AMOUNT> "Amount already paid"))
                .arg(arg!(--description <TEXT>))
                .arg(Arg::new("document").long("doc").value_name("REF"))
                .arg(arg!(--status <STATUS>)),
        )
        .subcommand(json_flags(
            Command::new("list")
                .about("List open items in settlement order")
                .arg(arg!(--kind <KIND> "pagar | receber"))
                .arg(
                    Arg::new("counterparty_id")
                        .long("counterparty-id")
                        .value_name("ID"),
                )
                .arg(arg!(--open "Only items with an open balance")),
        ))
        .subcommand(
            Command::new("rm")
                .about("Remove an open item")
                .arg(arg!(--id <ID>).required(true)),
        )
}

fn statement_cmd() -> Command {
    Command::new("statement")
        .about("Manage bank statement lines")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(arg!(--id <ID>).required(true))
                .arg(arg!(--date <DATE> "YYYY-MM-DD").required(true))
                .arg(arg!(--amount <AMOUNT> "Positive amount").required(true))
                .arg(arg!(--kind <KIND> "credito | debito").required(true))
                .arg(arg!(--description <TEXT>))
                .arg(Arg::new("document").long("doc").value_name("REF")),
        )
        .subcommand(json_flags(
            Command::new("list").arg(arg!(--pending "Only lines not yet reconciled")),
        ))
}

pub fn build_cli() -> Command {
    Command::new("settleclip")
        .version(clap::crate_version!())
        .about("FIFO settlement allocation and statement reconciliation")
        .subcommand(Command::new("init").about("Create the local ledger"))
        .subcommand(item_cmd())
        .subcommand(statement_cmd())
        .subcommand(
            Command::new("import")
                .about("Import items or statement lines")
                .subcommand_required(true)
                .subcommand(
                    Command::new("items")
                        .arg(arg!(--path <PATH> "CSV or JSON file").required(true))
                        .arg(
                            arg!(--format <FORMAT> "csv | json")
                                .value_parser(["csv", "json"])
                                .default_value("csv"),
                        ),
                )
                .subcommand(
                    Command::new("statements")
                        .arg(arg!(--path <PATH> "CSV file").required(true)),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Export settlements")
                .subcommand_required(true)
                .subcommand(
                    Command::new("settlements")
                        .arg(arg!(--format <FORMAT> "csv | json").required(true))
                        .arg(arg!(--out <PATH>).required(true)),
                ),
        )
        .subcommand(json_flags(
            Command::new("allocate")
                .about("Preview a FIFO allocation by due date")
                .arg(arg!(--statement <ID> "Statement line providing the total"))
                .arg(arg!(--total <AMOUNT> "Explicit total"))
                .group(
                    ArgGroup::new("source")
                        .args(["statement", "total"])
                        .required(true),
                )
                .arg(arg!(--items <IDS> "Comma separated item ids").required(true)),
        ))
        .subcommand(json_flags(
            Command::new("suggest")
                .about("Open items that could settle a statement line")
                .arg(arg!(--statement <ID>).required(true))
                .arg(
                    arg!(--limit <N>)
                        .value_parser(value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    Arg::new("min_score")
                        .long("min-score")
                        .value_name("SCORE")
                        .value_parser(value_parser!(u32).range(0..=100))
                        .default_value("0")
                        .help("Hide candidates scoring below this (0-100)"),
                ),
        ))
        .subcommand(json_flags(
            Command::new("settle")
                .about("Settle a statement line against open items")
                .arg(arg!(--statement <ID>).required(true))
                .arg(arg!(--items <IDS> "Comma separated item ids").required(true))
                .arg(
                    Arg::new("alloc")
                        .long("alloc")
                        .value_name("ID=AMOUNT")
                        .action(ArgAction::Append)
                        .help("Override the FIFO amount for one item"),
                )
                .arg(
                    Arg::new("credit_to")
                        .long("credit-to")
                        .value_name("COUNTERPARTY_ID")
                        .help("Keep any leftover as account credit for this counterparty"),
                ),
        ))
        .subcommand(
            Command::new("config")
                .about("Show or change settings")
                .subcommand_required(true)
                .subcommand(Command::new("show"))
                .subcommand(
                    Command::new("set-currency").arg(arg!(<CCY> "ISO currency code")),
                ),
        )
        .subcommand(Command::new("doctor").about("Check ledger consistency"))
}

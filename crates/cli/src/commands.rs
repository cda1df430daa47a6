//! Clap command tree.
//!
//! Shapes:
//! - `verdant batch create --commodity <label> --quantity <amount> --origin <place> --grower <id>`
//! - `verdant batch transfer <id> --from <role:id> --to <role:id>`
//! - `verdant evidence attach <id> --ref <handle> --type <type> --by <role:id>`
//! - `verdant product aggregate --name <name> --source <id>... --by <id>`
//! - `verdant resolve <token-or-url>`

use clap::{Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("verdant")
        .about("Chain-of-custody ledger for herbal and agricultural commodities")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .value_name("DIR")
                .help("Directory holding the custody journal"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_name("FILE")
                .conflicts_with("db")
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print results as JSON"),
        )
        .subcommand(batch_command())
        .subcommand(evidence_command())
        .subcommand(product_command())
        .subcommand(
            Command::new("resolve")
                .about("Resolve a scanned token or tracking URL to its journey")
                .arg(Arg::new("scan").required(true)),
        )
        .subcommand(
            Command::new("token")
                .about("Print the token and tracking URL of a unit")
                .arg(Arg::new("id").required(true)),
        )
}

fn batch_command() -> Command {
    Command::new("batch")
        .about("Record harvests and move batches between parties")
        .subcommand_required(true)
        .subcommand(
            Command::new("create")
                .about("Record a harvest as a new batch")
                .arg(
                    Arg::new("commodity")
                        .long("commodity")
                        .required(true)
                        .help("Commodity name, optionally \"Name (Botanical name)\""),
                )
                .arg(Arg::new("quantity").long("quantity").required(true))
                .arg(
                    Arg::new("unit")
                        .long("unit")
                        .default_value("kg")
                        .help("kg, g or tonnes"),
                )
                .arg(Arg::new("origin").long("origin").required(true))
                .arg(Arg::new("lat").long("lat").requires("lon").allow_hyphen_values(true))
                .arg(Arg::new("lon").long("lon").requires("lat").allow_hyphen_values(true))
                .arg(Arg::new("grower").long("grower").required(true))
                .arg(Arg::new("photo").long("photo"))
                .arg(
                    Arg::new("certified")
                        .long("certified")
                        .action(ArgAction::Append)
                        .value_name("TYPE=REF")
                        .help("Certification held at harvest time (repeatable)"),
                )
                .arg(occurred_at_arg()),
        )
        .subcommand(
            submission_args(Command::new("transfer").about("Hand a batch to another party"))
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("from").long("from").required(true).value_name("ROLE:ID"))
                .arg(Arg::new("to").long("to").required(true).value_name("ROLE:ID")),
        )
        .subcommand(
            submission_args(Command::new("receive").about("Accept custody of a batch"))
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("by").long("by").required(true).value_name("ROLE:ID")),
        )
        .subcommand(
            Command::new("show")
                .about("Show a batch and its history")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(
            Command::new("list")
                .about("List batches")
                .arg(Arg::new("party").long("party").help("Only batches involving this party id"))
                .arg(Arg::new("status").long("status")),
        )
}

fn evidence_command() -> Command {
    Command::new("evidence")
        .about("Attach lab reports and certifications")
        .subcommand_required(true)
        .subcommand(
            submission_args(Command::new("attach").about("Attach an evidence reference"))
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("ref").long("ref").required(true))
                .arg(
                    Arg::new("type")
                        .long("type")
                        .required(true)
                        .help("lab_report, organic, ayush, registration or other:<label>"),
                )
                .arg(Arg::new("by").long("by").required(true).value_name("ROLE:ID")),
        )
}

fn product_command() -> Command {
    Command::new("product")
        .about("Aggregate batches into products and move them to retail")
        .subcommand_required(true)
        .subcommand(
            submission_args(Command::new("aggregate").about("Consume received batches into a product"))
                .arg(Arg::new("name").long("name").required(true))
                .arg(
                    Arg::new("source")
                        .long("source")
                        .required(true)
                        .action(ArgAction::Append)
                        .help("Source batch id (repeatable)"),
                )
                .arg(Arg::new("by").long("by").required(true).help("Processor id"))
                .arg(Arg::new("manufactured").long("manufactured").value_name("YYYY-MM-DD"))
                .arg(Arg::new("best-before").long("best-before").value_name("YYYY-MM-DD")),
        )
        .subcommand(
            submission_args(Command::new("package").about("Package a product"))
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("lot").long("lot"))
                .arg(Arg::new("by").long("by").required(true).value_name("ROLE:ID")),
        )
        .subcommand(
            submission_args(Command::new("distribute").about("Hand a packaged product to retail"))
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("from").long("from").required(true).value_name("ROLE:ID"))
                .arg(Arg::new("to").long("to").required(true).value_name("ROLE:ID")),
        )
        .subcommand(
            Command::new("show")
                .about("Show a product, its history and sources")
                .arg(Arg::new("id").required(true)),
        )
}

fn occurred_at_arg() -> Arg {
    Arg::new("occurred-at")
        .long("occurred-at")
        .value_name("RFC3339")
        .help("Device time the action happened")
}

/// Flags shared by every custody submission.
fn submission_args(cmd: Command) -> Command {
    cmd.arg(occurred_at_arg())
        .arg(Arg::new("location").long("location").help("Where the action happened"))
        .arg(
            Arg::new("key")
                .long("key")
                .help("Idempotency key; resubmitting the same event with the same key is a no-op"),
        )
}

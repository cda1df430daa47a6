//! Verdant CLI: record custody events and resolve journeys from a shell.
//!
//! One command per invocation:
//! - `verdant --db ./custody batch create ...`
//! - `verdant --db ./custody resolve https://verdant.example/track/BATCH_...`
//!
//! Logs go to stderr and are controlled by `RUST_LOG` (default `verdant=info`).

mod commands;
mod format;
mod parse;

use std::process;

use tracing::debug;
use tracing_subscriber::EnvFilter;
use verdant::{NewProduct, Submission, UnitFilter, Verdant};

use commands::build_cli;
use format::{format_error, format_output, Output, OutputMode};
use parse::{matches_to_action, Action, SubmissionArgs};

const DEFAULT_DB_DIR: &str = "./verdant-data";

fn main() {
    init_tracing();

    let matches = build_cli().get_matches();
    let mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let action = match matches_to_action(&matches) {
        Ok(action) => action,
        Err(e) => {
            eprintln!("(error) {}", e);
            process::exit(1);
        }
    };

    let db = match open_database(&matches) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            process::exit(1);
        }
    };

    match execute(&db, action) {
        Ok(output) => match format_output(&output, mode) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("(error) {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("verdant=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_database(matches: &clap::ArgMatches) -> verdant::Result<Verdant> {
    if let Some(path) = matches.get_one::<String>("config") {
        return Verdant::from_config_file(path);
    }
    let dir = matches
        .get_one::<String>("db")
        .map(String::as_str)
        .unwrap_or(DEFAULT_DB_DIR);
    Verdant::open(dir)
}

fn submission(by: verdant::Party, args: SubmissionArgs) -> Submission {
    let mut submission = Submission::by(by);
    if let Some(at) = args.occurred_at {
        submission = submission.occurred_at(at);
    }
    if let Some(location) = args.location {
        submission = submission.at(location);
    }
    if let Some(key) = args.key {
        submission = submission.idempotent(key);
    }
    submission
}

fn execute(db: &Verdant, action: Action) -> verdant::Result<Output> {
    debug!(version = db.version(), "executing command");
    match action {
        Action::CreateBatch(request) => Ok(Output::Unit(db.batches.create(request)?)),
        Action::Transfer {
            id,
            from,
            to,
            submission: args,
        } => {
            let unit = db.journeys.decode(&id)?;
            let outcome = db.batches.transfer_with(&unit, to, submission(from, args))?;
            Ok(Output::Event { unit, outcome })
        }
        Action::Receive {
            id,
            by,
            submission: args,
        } => {
            let unit = db.journeys.decode(&id)?;
            let outcome = db.batches.receive_with(&unit, submission(by, args))?;
            Ok(Output::Event { unit, outcome })
        }
        Action::ShowBatch(id) => Ok(Output::Unit(db.batches.get(&db.journeys.decode(&id)?)?)),
        Action::ListBatches { party, status } => {
            let mut filter = UnitFilter::batches();
            if let Some(party) = party {
                filter = filter.involving(party);
            }
            if let Some(status) = status {
                filter = filter.with_status(status);
            }
            Ok(Output::Units(db.engine().list(&filter)?))
        }
        Action::AttachEvidence {
            id,
            evidence,
            by,
            submission: args,
        } => {
            let unit = db.journeys.decode(&id)?;
            let outcome = db.evidence.attach_with(&unit, evidence, submission(by, args))?;
            Ok(Output::Event { unit, outcome })
        }
        Action::Aggregate {
            request,
            submission: args,
        } => {
            let sources = request
                .sources
                .iter()
                .map(|raw| db.journeys.decode(raw))
                .collect::<verdant::Result<Vec<_>>>()?;
            let mut product = NewProduct::new(request.name, sources, request.by);
            if let Some(date) = request.manufactured_on {
                product = product.manufactured_on(date);
            }
            if let Some(date) = request.best_before {
                product = product.best_before(date);
            }
            if let Some(at) = args.occurred_at {
                product = product.occurred_at(at);
            }
            if let Some(location) = args.location {
                product = product.at(location);
            }
            if let Some(key) = args.key {
                product = product.idempotent(key);
            }
            Ok(Output::Unit(db.products.aggregate_with(product)?))
        }
        Action::Package {
            id,
            lot,
            by,
            submission: args,
        } => {
            let unit = db.journeys.decode(&id)?;
            let outcome = db.products.package_with(&unit, lot, submission(by, args))?;
            Ok(Output::Event { unit, outcome })
        }
        Action::Distribute {
            id,
            from,
            to,
            submission: args,
        } => {
            let unit = db.journeys.decode(&id)?;
            let outcome = db.products.distribute_with(&unit, to, submission(from, args))?;
            Ok(Output::Event { unit, outcome })
        }
        Action::ShowProduct(id) => Ok(Output::Unit(db.products.get(&db.journeys.decode(&id)?)?)),
        Action::Resolve(scan) => Ok(Output::Journey(Box::new(db.journeys.resolve(&scan)?))),
        Action::Token(raw) => {
            let id = db.journeys.decode(&raw)?;
            Ok(Output::Token {
                id,
                tracking_url: db.journeys.tracking_url(&id),
            })
        }
    }
}

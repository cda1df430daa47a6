//! ArgMatches → Action conversion.
//!
//! Everything that can be checked without the ledger is checked here, so a
//! typo in a party or date never reaches a write. Unit ids stay as typed
//! strings; they are decoded against the open ledger's tracking settings.

use chrono::{DateTime, NaiveDate, Utc};
use clap::ArgMatches;
use verdant::{
    Commodity, Evidence, EvidenceRef, EvidenceType, GeoPoint, IdempotencyKey, Location, MeasureUnit,
    MediaRef, NewBatch, Party, PartyRole, Quantity, UnitStatus,
};

/// Context shared by every custody submission
#[derive(Debug, Default)]
pub struct SubmissionArgs {
    pub occurred_at: Option<DateTime<Utc>>,
    pub location: Option<Location>,
    pub key: Option<IdempotencyKey>,
}

/// Aggregation request with its sources still undecoded
#[derive(Debug)]
pub struct AggregateArgs {
    pub name: String,
    pub sources: Vec<String>,
    pub by: Party,
    pub manufactured_on: Option<NaiveDate>,
    pub best_before: Option<NaiveDate>,
}

/// The result of parsing a command line.
#[derive(Debug)]
pub enum Action {
    CreateBatch(NewBatch),
    Transfer {
        id: String,
        from: Party,
        to: Party,
        submission: SubmissionArgs,
    },
    Receive {
        id: String,
        by: Party,
        submission: SubmissionArgs,
    },
    ShowBatch(String),
    ListBatches {
        party: Option<String>,
        status: Option<UnitStatus>,
    },
    AttachEvidence {
        id: String,
        evidence: Evidence,
        by: Party,
        submission: SubmissionArgs,
    },
    Aggregate {
        request: AggregateArgs,
        submission: SubmissionArgs,
    },
    Package {
        id: String,
        lot: Option<String>,
        by: Party,
        submission: SubmissionArgs,
    },
    Distribute {
        id: String,
        from: Party,
        to: Party,
        submission: SubmissionArgs,
    },
    ShowProduct(String),
    Resolve(String),
    Token(String),
}

pub fn matches_to_action(matches: &ArgMatches) -> Result<Action, String> {
    match matches.subcommand() {
        Some(("batch", sub)) => parse_batch(sub),
        Some(("evidence", sub)) => parse_evidence(sub),
        Some(("product", sub)) => parse_product(sub),
        Some(("resolve", sub)) => Ok(Action::Resolve(required(sub, "scan")?)),
        Some(("token", sub)) => Ok(Action::Token(required(sub, "id")?)),
        Some((name, _)) => Err(format!("Unknown command: {}", name)),
        None => Err("No command given".to_string()),
    }
}

fn parse_batch(matches: &ArgMatches) -> Result<Action, String> {
    match matches.subcommand() {
        Some(("create", sub)) => parse_create(sub),
        Some(("transfer", sub)) => Ok(Action::Transfer {
            id: required(sub, "id")?,
            from: parse_party(&required(sub, "from")?)?,
            to: parse_party(&required(sub, "to")?)?,
            submission: parse_submission(sub)?,
        }),
        Some(("receive", sub)) => Ok(Action::Receive {
            id: required(sub, "id")?,
            by: parse_party(&required(sub, "by")?)?,
            submission: parse_submission(sub)?,
        }),
        Some(("show", sub)) => Ok(Action::ShowBatch(required(sub, "id")?)),
        Some(("list", sub)) => {
            let status = match sub.get_one::<String>("status") {
                Some(raw) => Some(parse_status(raw)?),
                None => None,
            };
            Ok(Action::ListBatches {
                party: sub.get_one::<String>("party").cloned(),
                status,
            })
        }
        _ => Err("Unknown batch subcommand".to_string()),
    }
}

fn parse_create(matches: &ArgMatches) -> Result<Action, String> {
    let commodity = Commodity::from_label(&required(matches, "commodity")?).map_err(|e| e.to_string())?;
    let quantity = parse_quantity(
        &required(matches, "quantity")?,
        matches.get_one::<String>("unit").map(String::as_str).unwrap_or("kg"),
    )?;
    let mut origin = Location::named(required(matches, "origin")?).map_err(|e| e.to_string())?;
    if let (Some(lat), Some(lon)) = (
        matches.get_one::<String>("lat"),
        matches.get_one::<String>("lon"),
    ) {
        origin = origin.with_point(parse_point(lat, lon)?);
    }
    let grower = Party::grower(required(matches, "grower")?).map_err(|e| e.to_string())?;

    let mut request = NewBatch::new(commodity, quantity, origin, grower);
    if let Some(photo) = matches.get_one::<String>("photo") {
        request = request.photo(MediaRef::new(photo.as_str()).map_err(|e| e.to_string())?);
    }
    if let Some(certs) = matches.get_many::<String>("certified") {
        for cert in certs {
            request = request.certified(parse_certification(cert)?);
        }
    }
    if let Some(raw) = matches.get_one::<String>("occurred-at") {
        request = request.occurred_at(parse_timestamp(raw)?);
    }
    Ok(Action::CreateBatch(request))
}

fn parse_evidence(matches: &ArgMatches) -> Result<Action, String> {
    match matches.subcommand() {
        Some(("attach", sub)) => {
            let reference = EvidenceRef::new(required(sub, "ref")?).map_err(|e| e.to_string())?;
            let evidence_type = parse_evidence_type(&required(sub, "type")?)?;
            Ok(Action::AttachEvidence {
                id: required(sub, "id")?,
                evidence: Evidence::new(reference, evidence_type),
                by: parse_party(&required(sub, "by")?)?,
                submission: parse_submission(sub)?,
            })
        }
        _ => Err("Unknown evidence subcommand".to_string()),
    }
}

fn parse_product(matches: &ArgMatches) -> Result<Action, String> {
    match matches.subcommand() {
        Some(("aggregate", sub)) => {
            let sources = sub
                .get_many::<String>("source")
                .map(|v| v.cloned().collect())
                .unwrap_or_default();
            let request = AggregateArgs {
                name: required(sub, "name")?,
                sources,
                by: Party::processor(required(sub, "by")?).map_err(|e| e.to_string())?,
                manufactured_on: optional_date(sub, "manufactured")?,
                best_before: optional_date(sub, "best-before")?,
            };
            Ok(Action::Aggregate {
                request,
                submission: parse_submission(sub)?,
            })
        }
        Some(("package", sub)) => Ok(Action::Package {
            id: required(sub, "id")?,
            lot: sub.get_one::<String>("lot").cloned(),
            by: parse_party(&required(sub, "by")?)?,
            submission: parse_submission(sub)?,
        }),
        Some(("distribute", sub)) => Ok(Action::Distribute {
            id: required(sub, "id")?,
            from: parse_party(&required(sub, "from")?)?,
            to: parse_party(&required(sub, "to")?)?,
            submission: parse_submission(sub)?,
        }),
        Some(("show", sub)) => Ok(Action::ShowProduct(required(sub, "id")?)),
        _ => Err("Unknown product subcommand".to_string()),
    }
}

fn parse_submission(matches: &ArgMatches) -> Result<SubmissionArgs, String> {
    let occurred_at = match matches.get_one::<String>("occurred-at") {
        Some(raw) => Some(parse_timestamp(raw)?),
        None => None,
    };
    let location = match matches.get_one::<String>("location") {
        Some(raw) => Some(Location::named(raw.as_str()).map_err(|e| e.to_string())?),
        None => None,
    };
    let key = match matches.get_one::<String>("key") {
        Some(raw) => Some(IdempotencyKey::new(raw.as_str()).map_err(|e| e.to_string())?),
        None => None,
    };
    Ok(SubmissionArgs {
        occurred_at,
        location,
        key,
    })
}

fn required(matches: &ArgMatches, name: &str) -> Result<String, String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .ok_or_else(|| format!("Missing argument: {}", name))
}

fn optional_date(matches: &ArgMatches, name: &str) -> Result<Option<NaiveDate>, String> {
    match matches.get_one::<String>(name) {
        Some(raw) => parse_date(raw).map(Some),
        None => Ok(None),
    }
}

/// Parse `role:id`, e.g. `intermediary:collective-12`.
pub fn parse_party(s: &str) -> Result<Party, String> {
    let (role, id) = s
        .split_once(':')
        .ok_or_else(|| format!("Party must be ROLE:ID, got '{}'", s))?;
    Party::new(id, parse_role(role)?).map_err(|e| e.to_string())
}

fn parse_role(s: &str) -> Result<PartyRole, String> {
    match s.trim().to_lowercase().as_str() {
        "grower" | "farmer" | "collector" => Ok(PartyRole::Grower),
        "intermediary" | "dealer" | "aggregator" => Ok(PartyRole::Intermediary),
        "processor" | "manufacturer" => Ok(PartyRole::Processor),
        "laboratory" | "lab" => Ok(PartyRole::Laboratory),
        "retailer" | "shop" => Ok(PartyRole::Retailer),
        "consumer" => Ok(PartyRole::Consumer),
        _ => Err(format!("Unknown party role: {}", s)),
    }
}

pub fn parse_evidence_type(s: &str) -> Result<EvidenceType, String> {
    let lower = s.trim().to_lowercase();
    match lower.as_str() {
        "lab_report" | "lab" => Ok(EvidenceType::LabReport),
        "organic" | "organic_certification" => Ok(EvidenceType::OrganicCertification),
        "ayush" | "ayush_certification" => Ok(EvidenceType::AyushCertification),
        "registration" => Ok(EvidenceType::Registration),
        _ => match lower.strip_prefix("other:") {
            Some(label) if !label.trim().is_empty() => Ok(EvidenceType::Other(label.trim().to_string())),
            _ => Err(format!("Unknown evidence type: {}", s)),
        },
    }
}

/// Parse `TYPE=REF`, e.g. `organic=NPOP-2291`.
fn parse_certification(s: &str) -> Result<Evidence, String> {
    let (kind, reference) = s
        .split_once('=')
        .ok_or_else(|| format!("Certification must be TYPE=REF, got '{}'", s))?;
    let reference = EvidenceRef::new(reference.trim()).map_err(|e| e.to_string())?;
    Ok(Evidence::new(reference, parse_evidence_type(kind)?))
}

pub fn parse_quantity(amount: &str, unit: &str) -> Result<Quantity, String> {
    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|_| format!("Invalid quantity: {}", amount))?;
    let unit = MeasureUnit::parse(unit).map_err(|e| e.to_string())?;
    Quantity::new(amount, unit).map_err(|e| e.to_string())
}

fn parse_point(lat: &str, lon: &str) -> Result<GeoPoint, String> {
    let lat: f64 = lat.parse().map_err(|_| format!("Invalid latitude: {}", lat))?;
    let lon: f64 = lon.parse().map_err(|_| format!("Invalid longitude: {}", lon))?;
    GeoPoint::new(lat, lon).map_err(|e| e.to_string())
}

fn parse_status(s: &str) -> Result<UnitStatus, String> {
    UnitStatus::parse(s).ok_or_else(|| format!("Unknown status: {}", s))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("Invalid timestamp '{}': {}", s, e))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| format!("Invalid date '{}': {}", s, e))
}

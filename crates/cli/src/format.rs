//! Output rendering: human-readable or JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use verdant::{
    AppendOutcome, CustodyEvent, Error, Journey, Stage, TraceableUnit, TrustSummary, UnitAttributes,
    UnitId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// What a command produced
pub enum Output {
    Unit(TraceableUnit),
    Units(Vec<TraceableUnit>),
    Event { unit: UnitId, outcome: AppendOutcome },
    Journey(Box<Journey>),
    Token { id: UnitId, tracking_url: String },
}

pub fn format_output(output: &Output, mode: OutputMode) -> Result<String, String> {
    match mode {
        OutputMode::Json => {
            let value = match output {
                Output::Unit(unit) => serde_json::to_value(unit),
                Output::Units(units) => serde_json::to_value(units),
                Output::Event { unit, outcome } => Ok(json!({
                    "unit": unit,
                    "duplicate": outcome.is_duplicate(),
                    "event": outcome.event(),
                })),
                Output::Journey(journey) => serde_json::to_value(journey),
                Output::Token { id, tracking_url } => Ok(json!({
                    "id": id,
                    "token": id.token(),
                    "tracking_url": tracking_url,
                })),
            }
            .map_err(|e| e.to_string())?;
            serde_json::to_string_pretty(&value).map_err(|e| e.to_string())
        }
        OutputMode::Human => Ok(match output {
            Output::Unit(unit) => format_unit(unit),
            Output::Units(units) if units.is_empty() => "(none)".to_string(),
            Output::Units(units) => units.iter().map(format_unit_line).collect::<Vec<_>>().join("\n"),
            Output::Event { unit, outcome } => format_event_outcome(unit, outcome),
            Output::Journey(journey) => format_journey(journey),
            Output::Token { id, tracking_url } => format!("{}\n{}", id.token(), tracking_url),
        }),
    }
}

pub fn format_error(err: &Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => json!({
            "error": err.code(),
            "message": err.to_string(),
            "retryable": err.is_retryable(),
        })
        .to_string(),
        OutputMode::Human => format!("(error) {}: {}", err.code(), err),
    }
}

fn format_unit_line(unit: &TraceableUnit) -> String {
    format!(
        "{}  {:<11}  {}  held by {}",
        unit.id(),
        unit.status().as_str(),
        describe(unit.attributes()),
        unit.custody().holder,
    )
}

fn format_unit(unit: &TraceableUnit) -> String {
    let mut lines = vec![format_unit_line(unit)];
    let custody = unit.custody();
    if let Some(to) = custody.in_transit_to {
        lines.push(format!("  in transit to {}", to));
    }
    if let Some(product) = unit.consumed_by() {
        lines.push(format!("  consumed by {}", product));
    }
    if let UnitAttributes::Product(info) = unit.attributes() {
        let sources: Vec<String> = info.source_batch_ids.iter().map(UnitId::token).collect();
        lines.push(format!("  sources: {}", sources.join(", ")));
    }
    lines.push(format!("  trust: {}", format_trust(&unit.trust())));
    for event in unit.history() {
        lines.push(format!("  {}", format_event(event)));
    }
    lines.join("\n")
}

fn format_event(event: &CustodyEvent) -> String {
    let mut line = format!(
        "#{} {} by {} at {}",
        event.sequence,
        event.event_type(),
        event.actor,
        timestamp(&event.recorded_at),
    );
    if let Some(location) = &event.location {
        line.push_str(&format!(" @ {}", location.descriptor));
    }
    line
}

fn format_event_outcome(unit: &UnitId, outcome: &AppendOutcome) -> String {
    let mut line = format!("{} {}", unit, format_event(outcome.event()));
    if outcome.is_duplicate() {
        line.push_str(" (already recorded)");
    }
    line
}

fn format_journey(journey: &Journey) -> String {
    let unit = &journey.unit;
    let mut lines = vec![
        format!("{}  {}  {}", unit.token, unit.status.as_str(), describe(&unit.attributes)),
        format!("  {}", unit.tracking_url),
        format!("  trust: {}", format_trust(&journey.trust)),
    ];
    for source in &journey.source_batches {
        lines.push(format!(
            "  source {}  {}",
            source.summary.token,
            describe(&source.summary.attributes)
        ));
    }
    if !journey.evidence.is_empty() {
        lines.push("  evidence:".to_string());
        for record in &journey.evidence {
            lines.push(format!(
                "    {} {} on {}",
                record.evidence.evidence_type, record.evidence.reference, record.unit_id
            ));
        }
    }
    lines.push("  timeline:".to_string());
    for stage in &journey.timeline {
        lines.push(format!("    {}", format_stage(stage)));
    }
    lines.join("\n")
}

fn format_stage(stage: &Stage) -> String {
    let mut line = format!(
        "{}  {} #{} {} by {}",
        timestamp(&stage.timestamp),
        stage.unit_id,
        stage.sequence,
        stage.event_type,
        stage.actor,
    );
    if let Some(location) = &stage.location {
        line.push_str(&format!(" @ {}", location.descriptor));
    }
    line
}

fn describe(attributes: &UnitAttributes) -> String {
    match attributes {
        UnitAttributes::Batch(info) => format!("{}, {} from {}", info.commodity, info.quantity, info.origin.descriptor),
        UnitAttributes::Product(info) => format!("{} by {}", info.name, info.producing_party),
    }
}

fn format_trust(trust: &TrustSummary) -> String {
    let flags: Vec<&str> = [
        (trust.lab_tested, "lab tested"),
        (trust.organic_certified, "organic"),
        (trust.ayush_certified, "AYUSH certified"),
    ]
    .iter()
    .filter(|(set, _)| *set)
    .map(|(_, label)| *label)
    .collect();
    match (flags.is_empty(), trust.evidence_present) {
        (false, _) => flags.join(", "),
        (true, true) => "evidence on file".to_string(),
        (true, false) => "no evidence".to_string(),
    }
}

fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

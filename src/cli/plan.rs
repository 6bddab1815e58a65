//! Planning commands: plan, plans, override.

use std::path::PathBuf;

use clap::Args;
use jiff::Timestamp;

use crate::audit::{AuditEvent, AuditSink};
use crate::captain::CaptainOverride;
use crate::config::Config;
use crate::model::{PlanRequest, Propulsion, VoyagePlan, Waypoint};
use crate::storage::Storage;

use super::format::{format_override, format_plan};
use super::{build_planner, parse_waypoint};

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Forecast JSON file: an array of forecast records.
    #[arg(long)]
    forecast: PathBuf,

    /// Anchorage catalog JSON file. The built-in Princes' Islands catalog
    /// is used when omitted.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Departure as `name:lat:lon`.
    #[arg(long, value_parser = parse_waypoint)]
    from: Waypoint,

    /// Route waypoint as `name:lat:lon`. Repeat in order; the last one is
    /// the destination. Omit for a round trip.
    #[arg(long = "to", value_parser = parse_waypoint)]
    waypoints: Vec<Waypoint>,

    /// Nights at anchor.
    #[arg(long, default_value_t = 1)]
    nights: u32,

    /// Departure time (e.g. `2026-07-04T06:00:00Z`).
    #[arg(long)]
    depart: Timestamp,

    /// Vessel name, overriding the configured one.
    #[arg(long)]
    vessel: Option<String>,

    /// Propulsion, overriding the configured one.
    #[arg(long, value_parser = parse_propulsion)]
    propulsion: Option<Propulsion>,

    /// Print the plan as JSON instead of a summary.
    #[arg(long)]
    json: bool,
}

fn parse_propulsion(s: &str) -> Result<Propulsion, String> {
    match s {
        "sail" => Ok(Propulsion::Sail),
        "motor" => Ok(Propulsion::Motor),
        "motor-sail" => Ok(Propulsion::MotorSail),
        other => Err(format!(
            "unknown propulsion '{other}' (expected sail, motor or motor-sail)"
        )),
    }
}

pub(super) fn cmd_plan(config: &Config, storage: &Storage, args: &PlanArgs) -> Result<(), String> {
    let planner = build_planner(config, Some(&args.forecast), args.catalog.as_deref())?;

    let mut vessel = config.vessel.clone();
    if let Some(name) = &args.vessel {
        vessel.name.clone_from(name);
    }
    if let Some(propulsion) = args.propulsion {
        vessel.propulsion = propulsion;
    }
    let request = PlanRequest {
        vessel,
        departure: args.from.clone(),
        waypoints: args.waypoints.clone(),
        nights: args.nights,
        depart_at: args.depart,
    };

    let plan = planner
        .plan(&request)
        .map_err(|e| format!("failed to plan voyage: {e}"))?;
    storage
        .save_plan(&plan)
        .map_err(|e| format!("failed to save plan: {e}"))?;
    let logbook = storage
        .logbook()
        .map_err(|e| format!("failed to open logbook: {e}"))?;
    logbook.record(AuditEvent::plan_assessed(&plan));

    if args.json {
        let json =
            serde_json::to_string_pretty(&plan).map_err(|e| format!("failed to encode plan: {e}"))?;
        println!("{json}");
    } else {
        print!("{}", format_plan(&plan));
        println!("{}", plan.id);
    }
    Ok(())
}

pub(super) fn cmd_list(storage: &Storage) -> Result<(), String> {
    let plans = storage
        .list_plans()
        .map_err(|e| format!("failed to list plans: {e}"))?;

    if plans.is_empty() {
        println!("No plans");
        return Ok(());
    }

    for p in &plans {
        let short_id = &p.id.to_string()[..8];
        let flag = match (p.override_required, p.overrides) {
            (false, _) => String::new(),
            (true, 0) => "  (override required)".to_string(),
            (true, n) => format!("  (overridden x{n})"),
        };
        println!(
            "{short_id}  [{}]  {}: {} → {}{flag}",
            p.class, p.vessel, p.departure, p.destination
        );
    }

    Ok(())
}

pub(super) fn cmd_override(
    storage: &Storage,
    plan: &VoyagePlan,
    operator: &str,
    reason: &str,
    force_majeure: bool,
) -> Result<(), String> {
    let earlier = storage
        .load_overrides(plan.id)
        .map_err(|e| format!("failed to load overrides: {e}"))?;
    if let Some(last) = earlier.last() {
        eprintln!(
            "Note: plan {} was already overridden {} time{}, last by {} ({})",
            plan.short_id(),
            earlier.len(),
            if earlier.len() == 1 { "" } else { "s" },
            last.operator_id,
            last.reason
        );
    }

    let logbook = storage
        .logbook()
        .map_err(|e| format!("failed to open logbook: {e}"))?;
    let record = CaptainOverride::new(operator, reason, force_majeure)
        .apply(plan, &logbook)
        .map_err(|e| format!("override refused: {e}"))?;
    storage
        .save_override(&record)
        .map_err(|e| format!("failed to save override: {e}"))?;

    print!("{}", format_override(&record));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propulsion_names_match_config() {
        assert_eq!(parse_propulsion("motor-sail").unwrap(), Propulsion::MotorSail);
        assert!(parse_propulsion("oars").is_err());
    }
}

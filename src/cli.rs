//! CLI interface for Lookout.
//!
//! Each subcommand is non-interactive: arguments in, structured output out.
//! Plans are addressed by full UUID or unambiguous prefix (e.g. `a3b`).
//! Diagnostics go to stderr; stdout carries only results.

mod drill;
mod format;
mod logbook;
mod monitor;
mod plan;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::catalog::AnchorageCatalog;
use crate::config::Config;
use crate::forecast::StaticForecast;
use crate::model::{Position, VoyagePlan, Waypoint};
use crate::planner::RoutePlanner;
use crate::safety::SafetyAssessor;
use crate::selector::AnchorageSelector;
use crate::storage::Storage;

/// Lookout: voyage safety planning and person-overboard response.
#[derive(Debug, Parser)]
#[command(name = "lookout", version, after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Config file (overrides `LOOKOUT_CONFIG` and `~/.lookout/config.toml`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: a weekend around the islands
  1. lookout plan --forecast forecast.json --from "Kalamış:40.98:29.03" \
       --to "Büyükada:40.86:29.12" --nights 1 --depart 2026-07-04T06:00:00Z
     → prints the verdict, legs and anchorages, and a plan ID (e.g. a3b0fc12)
  2. lookout override --plan a3b --as deniz --reason "medical evacuation" --force-majeure
  3. lookout monitor --manifest crew.json --forecast forecast.json --plan a3b < requests.jsonl

Drills:
  lookout drill --manifest solo.json --disappear 1 --elapsed 2.5
  lookout drill --manifest crew.json --manual deniz --person ece --radio-offline

Audit:
  lookout logbook --verify"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Plan a voyage against a forecast. Prints the plan and saves it.
    Plan(plan::PlanArgs),

    /// List saved plans.
    Plans,

    /// Override the cancellation of a saved plan.
    ///
    /// The plan itself is not changed; the override is recorded against it
    /// together with the mitigations the captain accepts.
    Override {
        /// Plan ID: full UUID or unambiguous prefix.
        #[arg(long)]
        plan: String,

        /// Who is taking responsibility.
        #[arg(long = "as")]
        operator: String,

        /// Why the voyage must go ahead.
        #[arg(long)]
        reason: String,

        /// The voyage cannot be postponed (medical evacuation, vessel in danger).
        #[arg(long)]
        force_majeure: bool,
    },

    /// Run a person-overboard drill against simulated autopilot and radio.
    Drill(drill::DrillArgs),

    /// Run the emergency monitor, reading JSON requests from stdin until EOF.
    ///
    /// Each input line is one request; each output line is one reply.
    Monitor(monitor::MonitorArgs),

    /// Print the audit logbook.
    Logbook {
        /// Check the hash chain instead of printing entries.
        #[arg(long)]
        verify: bool,

        /// Print raw JSON entries.
        #[arg(long, conflicts_with = "verify")]
        json: bool,
    },
}

/// Run the CLI, returning an error message on failure.
pub fn run(command: Command, config: &Config, storage: &Storage) -> Result<(), String> {
    match command {
        Command::Plan(args) => plan::cmd_plan(config, storage, &args),
        Command::Plans => plan::cmd_list(storage),
        Command::Override {
            plan,
            operator,
            reason,
            force_majeure,
        } => {
            let plan = resolve_plan(storage, &plan)?;
            plan::cmd_override(storage, &plan, &operator, &reason, force_majeure)
        }
        Command::Drill(args) => drill::cmd_drill(config, &args),
        Command::Monitor(args) => monitor::cmd_monitor(config, storage, &args),
        Command::Logbook { verify, json } => {
            if verify {
                logbook::cmd_verify(storage)
            } else {
                logbook::cmd_print(storage, json)
            }
        }
    }
}

/// Build a planner from config, a forecast file and an optional catalog file.
fn build_planner(
    config: &Config,
    forecast: Option<&Path>,
    catalog: Option<&Path>,
) -> Result<RoutePlanner, String> {
    let forecast = match forecast {
        Some(path) => StaticForecast::load(path)
            .map_err(|e| format!("failed to load forecast: {e}"))?,
        None => StaticForecast::default(),
    };
    let catalog = match catalog {
        Some(path) => {
            AnchorageCatalog::load(path).map_err(|e| format!("failed to load catalog: {e}"))?
        }
        None => AnchorageCatalog::princes_islands(),
    };
    Ok(RoutePlanner::new(
        SafetyAssessor::new(config.safety),
        AnchorageSelector::new(config.anchorage),
        catalog,
        Arc::new(forecast),
    ))
}

/// Resolve a plan reference (full UUID or prefix) to a saved plan.
fn resolve_plan(storage: &Storage, reference: &str) -> Result<VoyagePlan, String> {
    // Try full UUID first.
    if let Ok(id) = reference.parse::<Uuid>() {
        return storage
            .load_plan(id)
            .map_err(|e| format!("failed to load plan: {e}"));
    }

    // Try as a prefix match against all plans.
    let plans = storage
        .list_plans()
        .map_err(|e| format!("failed to list plans: {e}"))?;

    let matches: Vec<Uuid> = plans
        .iter()
        .filter(|p| p.id.to_string().starts_with(reference))
        .map(|p| p.id)
        .collect();

    match matches.as_slice() {
        [] => Err(format!("no plan matching '{reference}'")),
        [id] => storage
            .load_plan(*id)
            .map_err(|e| format!("failed to load plan: {e}")),
        ids => {
            let short: Vec<String> = ids.iter().map(|id| id.to_string()[..8].to_string()).collect();
            Err(format!(
                "'{reference}' is ambiguous — matches {} plans: {}",
                ids.len(),
                short.join(", ")
            ))
        }
    }
}

/// Parse `name:lat:lon`. The name may itself contain colons.
fn parse_waypoint(s: &str) -> Result<Waypoint, String> {
    let mut parts = s.rsplitn(3, ':');
    let (Some(lon), Some(lat), Some(name)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected name:lat:lon, got '{s}'"));
    };
    if name.trim().is_empty() {
        return Err(format!("waypoint '{s}' has no name"));
    }
    Ok(Waypoint {
        name: name.trim().to_string(),
        position: parse_coordinates(lat, lon)?,
    })
}

/// Parse `lat:lon`.
fn parse_position(s: &str) -> Result<Position, String> {
    let Some((lat, lon)) = s.split_once(':') else {
        return Err(format!("expected lat:lon, got '{s}'"));
    };
    parse_coordinates(lat, lon)
}

fn parse_coordinates(lat: &str, lon: &str) -> Result<Position, String> {
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("invalid latitude '{lat}': {e}"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|e| format!("invalid longitude '{lon}': {e}"))?;
    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {lat} is out of range"));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(format!("longitude {lon} is out of range"));
    }
    Ok(Position::new(lat, lon))
}

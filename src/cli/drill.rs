//! Person-overboard drill against simulated hardware.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use jiff::{SignedDuration, Timestamp};
use serde_json::json;

use crate::audit::MemoryLogbook;
use crate::autopilot::{AutopilotCommand, SimulatedAutopilot, WilliamsonTurn};
use crate::config::Config;
use crate::coordinator::Capabilities;
use crate::manifest::{self, CrewManifest};
use crate::model::{DisappearanceSignal, NavigationFix, Position, TrackingId};
use crate::radio::SimulatedRadio;
use crate::request::{Request, Response};
use crate::station::Station;

use super::format::{format_command, format_mob, format_session, format_step, format_transmission};
use super::{build_planner, parse_position};

#[derive(Debug, Args)]
pub struct DrillArgs {
    /// Crew manifest JSON file.
    #[arg(long)]
    manifest: PathBuf,

    /// Tracking id that stops being seen near the rail.
    #[arg(long, required_unless_present = "manual", conflicts_with = "manual")]
    disappear: Option<u64>,

    /// Seconds since the track was last seen.
    #[arg(long, default_value_t = 2.5)]
    elapsed: f64,

    /// Tracker confidence of the last sighting.
    #[arg(long, default_value_t = 0.9)]
    confidence: f64,

    /// Press the MOB button as this operator.
    #[arg(long)]
    manual: Option<String>,

    /// Who went overboard, for a manual trigger.
    #[arg(long, requires = "manual")]
    person: Option<String>,

    /// Vessel position as `lat:lon`.
    #[arg(long, value_parser = parse_position, default_value = "40.876:29.091")]
    position: Position,

    /// Vessel heading in degrees.
    #[arg(long, default_value_t = 45.0)]
    heading: f64,

    /// Vessel speed in knots.
    #[arg(long, default_value_t = 5.0)]
    speed: f64,

    /// Simulate a dead radio link.
    #[arg(long)]
    radio_offline: bool,

    /// Drop the first N radio calls, as a transient link loss.
    #[arg(long, default_value_t = 0, conflicts_with = "radio_offline")]
    radio_drop: u32,

    /// Simulate an unreachable autopilot.
    #[arg(long)]
    autopilot_offline: bool,

    /// Seconds to keep the emergency running before the all-clear.
    #[arg(long, default_value_t = 0)]
    hold: u64,

    /// Print the outcome as JSON.
    #[arg(long)]
    json: bool,
}

pub(super) fn cmd_drill(config: &Config, args: &DrillArgs) -> Result<(), String> {
    let crew = CrewManifest::load(&args.manifest)
        .map_err(|e| format!("failed to load manifest: {e}"))?
        .into_shared();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start runtime: {e}"))?;

    let autopilot = Arc::new(SimulatedAutopilot::new(config.emergency.approach_speed_kn));
    autopilot.set_offline(args.autopilot_offline);
    let radio = Arc::new(SimulatedRadio::new());
    radio.set_offline(args.radio_offline);
    radio.fail_next(args.radio_drop);
    let log = Arc::new(MemoryLogbook::new());
    let capabilities = Capabilities {
        autopilot: autopilot.clone(),
        radio: radio.clone(),
        audit: log.clone(),
    };
    let fix = NavigationFix {
        position: args.position,
        heading_deg: args.heading,
        speed_kn: args.speed,
        fixed_at: Timestamp::now(),
    };
    let planner = build_planner(config, None, None)?;
    let mut station = Station::new(
        config,
        planner,
        crew,
        capabilities,
        fix,
        runtime.handle().clone(),
    );

    if !args.json {
        print!("{}", manifest::lock(station.manifest()).summary());
        println!();
    }

    let request = trigger(args)?;
    let response = station
        .handle(request)
        .map_err(|e| format!("drill failed: {e}"))?;

    if args.hold > 0 {
        runtime.block_on(tokio::time::sleep(Duration::from_secs(args.hold)));
    }

    let ended = if station.coordinator().is_active() {
        match station.handle(Request::AllClear {
            recovered_by: "drill".into(),
            notes: "drill complete".into(),
        }) {
            Ok(Response::Emergency { session }) => Some(session),
            Ok(_) => None,
            Err(e) => return Err(format!("failed to stand down: {e}")),
        }
    } else {
        None
    };

    let commands = autopilot.commands();
    let transmissions = radio.transmissions();

    if args.json {
        let out = json!({
            "response": response,
            "session": ended,
            "autopilot": commands,
            "radio": transmissions,
            "audit": log.entries(),
        });
        println!("{out:#}");
        return Ok(());
    }

    match &response {
        Response::Mob { outcome } => print!("{}", format_mob(outcome)),
        Response::Ignored { reason } => println!("{reason}"),
        other => println!("{other:?}"),
    }
    if let Some(session) = &ended {
        println!();
        print!("{}", format_session(session));
    }

    println!("\nAutopilot:");
    if commands.is_empty() {
        println!("  (no commands acknowledged)");
    }
    for command in &commands {
        println!("  {}", format_command(command));
        if let AutopilotCommand::RecoveryManeuver {
            mob_position,
            initial_heading_deg,
            ..
        } = command
        {
            let turn = WilliamsonTurn::plan(
                *mob_position,
                *initial_heading_deg,
                config.emergency.approach_speed_kn,
            );
            for step in &turn.steps {
                println!("    {}", format_step(step));
            }
        }
    }

    println!("\nRadio:");
    if transmissions.is_empty() {
        println!("  (nothing transmitted)");
    }
    for transmission in &transmissions {
        println!("  {}", format_transmission(transmission));
    }
    let updates = transmissions.iter().filter(|t| t.is_status_update()).count();
    println!(
        "  {} mayday, {updates} status update{}",
        radio.mayday_count(),
        if updates == 1 { "" } else { "s" }
    );

    println!("\nAudit:");
    for event in log.events() {
        let flag = if event.is_critical() { "!" } else { " " };
        println!("  {flag} {}", event.name());
    }
    Ok(())
}

/// The request that sets the drill off.
fn trigger(args: &DrillArgs) -> Result<Request, String> {
    match (args.disappear, &args.manual) {
        (Some(tracking_id), _) => {
            let elapsed = SignedDuration::try_from_secs_f64(args.elapsed)
                .map_err(|e| format!("invalid --elapsed: {e}"))?;
            let last_seen = Timestamp::now()
                .checked_sub(elapsed)
                .map_err(|e| format!("invalid --elapsed: {e}"))?;
            Ok(Request::Disappearance(DisappearanceSignal {
                tracking_id: TrackingId(tracking_id),
                last_seen_near_edge: last_seen,
                elapsed,
                confidence: args.confidence,
            }))
        }
        (None, Some(operator)) => Ok(Request::ManualMob {
            position: None,
            operator: operator.clone(),
            person_id: args.person.clone(),
        }),
        (None, None) => Err("specify --disappear or --manual".to_string()),
    }
}

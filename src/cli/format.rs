//! Output formatting for CLI display.

use std::fmt::Write;

use crate::audit::AuditEntry;
use crate::autopilot::{AutopilotCommand, ManeuverStep, Side};
use crate::captain::OverrideRecord;
use crate::coordinator::{Advisory, MobResponse};
use crate::model::{DistressMessage, EmergencySession, VoyagePlan};
use crate::procedure::{self, RECOVERY_NOTES};
use crate::radio::Transmission;

/// Format a plan for human-readable display.
pub(super) fn format_plan(plan: &VoyagePlan) -> String {
    let mut out = String::new();
    let req = &plan.request;
    let _ = writeln!(
        out,
        "{} → {}  ({}, {} night{})",
        req.departure.name,
        req.destination().name,
        req.vessel.name,
        req.nights,
        if req.nights == 1 { "" } else { "s" }
    );
    let _ = writeln!(out, "Verdict: {}  {}", plan.verdict.class.as_str().to_uppercase(), plan.verdict.reason);
    let _ = writeln!(out, "Weather: {}", plan.weather_summary);

    if let Some(reason) = &plan.cancellation_reason {
        let _ = writeln!(out, "CANCELLED: {reason}");
        let _ = writeln!(out, "A captain override is required to sail this plan.");
    }

    let _ = writeln!(out);
    for (i, seg) in plan.segments.iter().enumerate() {
        let mark = if seg.recommended { ' ' } else { '!' };
        let _ = writeln!(
            out,
            "{mark} Day {}: {} → {}  {:.1} NM @ {:03.0}°  {:.1} h  comfort {:.1}",
            i + 1,
            seg.from.name,
            seg.to.name,
            seg.distance_nm,
            seg.bearing_deg,
            seg.estimated_hours,
            seg.comfort_score
        );
        for warning in &seg.warnings {
            let _ = writeln!(out, "    ! {warning}");
        }
    }
    for (i, anchorage) in plan.overnight_anchorages.iter().enumerate() {
        let _ = writeln!(
            out,
            "  Night {}: {} (rating {:.1})",
            i + 1,
            anchorage.name,
            anchorage.rating
        );
    }
    let _ = writeln!(
        out,
        "  Total: {:.1} NM, {:.1} h, mean comfort {:.1}",
        plan.totals.distance_nm, plan.totals.hours, plan.totals.mean_comfort
    );

    section(&mut out, "Recommendations", &plan.recommendations);
    section(&mut out, "Warnings", &plan.warnings);
    let faults: Vec<String> = plan.faults.iter().map(ToString::to_string).collect();
    section(&mut out, "Faults", &faults);

    if !plan.attempted_alternatives.is_empty() {
        let _ = writeln!(out, "\nAlternatives:");
        for attempt in &plan.attempted_alternatives {
            let _ = writeln!(
                out,
                "  {}: {}{}",
                attempt.kind,
                attempt.verdict,
                if attempt.accepted { " (accepted)" } else { "" }
            );
        }
    }
    out
}

fn section(out: &mut String, title: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}:");
    for line in lines {
        let _ = writeln!(out, "  - {line}");
    }
}

pub(super) fn format_override(record: &OverrideRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Override {} recorded by {} for plan {}",
        &record.id.to_string()[..8],
        record.operator_id,
        &record.plan_id.to_string()[..8]
    );
    let _ = writeln!(
        out,
        "Original verdict: {} ({})",
        record.original_class, record.original_cancellation_reason
    );
    let _ = writeln!(out, "Reason: {}", record.reason);
    if record.discouraged {
        let _ = writeln!(
            out,
            "WARNING: conditions are critical. Sailing is strongly discouraged without force majeure."
        );
    }
    let _ = writeln!(out, "Mitigations:");
    for line in &record.mitigations {
        let _ = writeln!(out, "  - {line}");
    }
    out
}

pub(super) fn format_mob(response: &MobResponse) -> String {
    match response {
        MobResponse::Autonomous { session } => format_session(session),
        MobResponse::Advisory(advisory) => format_advisory(advisory),
        MobResponse::Duplicate { session_id } => format!(
            "MOB already in progress (session {}); event recorded\n",
            &session_id.to_string()[..8]
        ),
    }
}

pub(super) fn format_session(session: &EmergencySession) -> String {
    let mut out = String::new();
    let person = session
        .person
        .as_ref()
        .map_or_else(|| "unidentified person".to_string(), |p| p.name.clone());
    let _ = writeln!(out, "Emergency {}: {person} overboard", session.short_id());
    let _ = writeln!(out, "  Position: {}", session.mob_position);
    let path: Vec<String> = session.path().iter().map(ToString::to_string).collect();
    let _ = writeln!(out, "  States:   {}", path.join(" → "));
    let _ = writeln!(
        out,
        "  Mayday:   {}",
        if session.mayday_sent { "sent" } else { "NOT DELIVERED" }
    );
    let _ = writeln!(out, "  Circling: {}", if session.circling { "yes" } else { "no" });
    if session.status_updates_sent > 0 {
        let _ = writeln!(out, "  Updates:  {}", session.status_updates_sent);
    }
    for fault in &session.faults {
        let _ = writeln!(out, "  Fault:    {fault}");
    }
    if let Some(resolution) = &session.resolution {
        let _ = writeln!(out, "  Resolved by {}: {}", resolution.by, resolution.notes);
    }
    out
}

pub(super) fn format_advisory(advisory: &Advisory) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "MAN OVERBOARD: {} at {} ({} still aboard)",
        advisory.person, advisory.position, advisory.onboard
    );
    for line in &advisory.checklist {
        let _ = writeln!(out, "  {line}");
    }
    let _ = writeln!(out, "Recovery:");
    for line in procedure::numbered(&RECOVERY_NOTES) {
        let _ = writeln!(out, "  {line}");
    }
    out
}

pub(super) fn format_command(command: &AutopilotCommand) -> String {
    match command {
        AutopilotCommand::RecoveryManeuver {
            mob_position,
            initial_heading_deg,
            initial_speed_kn,
        } => format!(
            "{} back to {mob_position} from {initial_heading_deg:03.0}° at {initial_speed_kn:.1} kn",
            command.label()
        ),
        AutopilotCommand::Circle {
            center,
            radius_m,
            speed_kn,
        } => format!(
            "{} {radius_m:.0} m around {center} at {speed_kn:.1} kn",
            command.label()
        ),
        AutopilotCommand::ResumeNormal => command.label().to_string(),
    }
}

pub(super) fn format_step(step: &ManeuverStep) -> String {
    match step {
        ManeuverStep::Hold { heading_deg, secs } => {
            format!("hold {heading_deg:03.0}° for {secs} s")
        }
        ManeuverStep::HardOver { side, through_deg } => {
            let side = match side {
                Side::Port => "port",
                Side::Starboard => "starboard",
            };
            format!("hard to {side} through {through_deg:.0}°")
        }
        ManeuverStep::Steady { heading_deg } => format!("steady on {heading_deg:03.0}°"),
        ManeuverStep::Approach { target, speed_kn } => {
            format!("approach {target} at {speed_kn:.1} kn")
        }
    }
}

pub(super) fn format_transmission(transmission: &Transmission) -> String {
    match transmission {
        Transmission::Distress(DistressMessage::Mayday {
            vessel_name,
            position,
            situation,
            persons_onboard,
            persons_in_water,
            ..
        }) => format!(
            "MAYDAY {vessel_name} at {position}: {situation} ({persons_onboard} aboard, {persons_in_water} in water)"
        ),
        Transmission::Distress(DistressMessage::StatusUpdate {
            vessel_name,
            position,
            update,
            ..
        }) => format!("status update #{update} from {vessel_name} at {position}"),
        Transmission::AllClear(msg) => {
            format!("all clear from {}: recovered by {}", msg.vessel_name, msg.recovered_by)
        }
        Transmission::Beacon { position } => format!("beacon at {position}"),
    }
}

pub(super) fn format_entry(entry: &AuditEntry) -> String {
    let flag = if entry.event.is_critical() { "!" } else { " " };
    let mut detail = serde_json::to_value(&entry.event).unwrap_or_default();
    if let Some(fields) = detail.as_object_mut() {
        fields.remove("event");
    }
    format!(
        "{:>5} {flag} {}  {:<20} {detail}",
        entry.seq,
        entry.at.strftime("%Y-%m-%d %H:%M:%S"),
        entry.event.name()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;
    use uuid::Uuid;

    use crate::audit::{AuditChain, AuditEvent};
    use crate::model::Position;

    #[test]
    fn circle_command_reads_naturally() {
        let line = format_command(&AutopilotCommand::Circle {
            center: Position::new(40.5, 29.25),
            radius_m: 50.0,
            speed_kn: 2.0,
        });
        assert_eq!(line, "circle 50 m around 40.500000°N, 29.250000°E at 2.0 kn");
    }

    #[test]
    fn advisory_lists_checklist_and_recovery() {
        let text = format_advisory(&Advisory {
            person: "Ece".into(),
            position: Position::new(40.5, 29.25),
            onboard: 2,
            checklist: vec!["1. SHOUT".into()],
        });
        assert!(text.starts_with("MAN OVERBOARD: Ece"));
        assert!(text.contains("(2 still aboard)"));
        assert!(text.contains("1. Approach the person from downwind"));
    }

    #[test]
    fn entry_line_carries_seq_name_and_fields() {
        let mut chain = AuditChain::new();
        let entry = chain.seal(
            AuditEvent::Cancelled {
                session_id: Uuid::nil(),
                reason: "false alarm".into(),
            },
            Timestamp::new(1_780_000_000, 0).unwrap(),
        );
        let line = format_entry(&entry);
        assert!(line.trim_start().starts_with("1 "));
        assert!(line.contains("cancelled"));
        assert!(line.contains("\"reason\":\"false alarm\""));
        assert!(!line.contains("\"event\""));
    }
}

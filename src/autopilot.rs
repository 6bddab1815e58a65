//! Autopilot capability and the recovery manoeuvre plan.
//!
//! The coordinator only sees [`AutopilotActuator`]. Hardware bindings live
//! outside this crate; [`SimulatedAutopilot`] stands in for them in drills and
//! tests and records every command it receives.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::{Position, normalize_degrees};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActuatorError {
    #[error("autopilot unreachable: {0}")]
    Unreachable(String),

    #[error("autopilot rejected {command}: {reason}")]
    Rejected { command: String, reason: String },
}

/// Commands understood by the autopilot. Acknowledged or failed, nothing more.
pub trait AutopilotActuator: Send + Sync {
    fn execute_recovery_maneuver(
        &self,
        mob_position: Position,
        initial_heading_deg: f64,
        initial_speed_kn: f64,
    ) -> Result<(), ActuatorError>;

    fn execute_circle(
        &self,
        center: Position,
        radius_m: f64,
        speed_kn: f64,
    ) -> Result<(), ActuatorError>;

    fn resume_normal(&self) -> Result<(), ActuatorError>;
}

/// A command as issued, for the drill report and for tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum AutopilotCommand {
    #[serde(rename_all = "camelCase")]
    RecoveryManeuver {
        mob_position: Position,
        initial_heading_deg: f64,
        initial_speed_kn: f64,
    },
    #[serde(rename_all = "camelCase")]
    Circle {
        center: Position,
        radius_m: f64,
        speed_kn: f64,
    },
    ResumeNormal,
}

impl AutopilotCommand {
    pub fn label(&self) -> &'static str {
        match self {
            Self::RecoveryManeuver { .. } => "recovery manoeuvre",
            Self::Circle { .. } => "circle",
            Self::ResumeNormal => "resume normal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Port,
    Starboard,
}

/// One leg of a Williamson turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum ManeuverStep {
    #[serde(rename_all = "camelCase")]
    Hold { heading_deg: f64, secs: u32 },
    #[serde(rename_all = "camelCase")]
    HardOver { side: Side, through_deg: f64 },
    #[serde(rename_all = "camelCase")]
    Steady { heading_deg: f64 },
    #[serde(rename_all = "camelCase")]
    Approach { target: Position, speed_kn: f64 },
}

/// Williamson turn back to a marked position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WilliamsonTurn {
    pub steps: Vec<ManeuverStep>,
}

impl WilliamsonTurn {
    /// Seconds held on the original heading before turning.
    pub const HOLD_SECS: u32 = 60;
    /// Total turn to port before steadying on the reciprocal.
    pub const TURN_DEG: f64 = 240.0;

    pub fn plan(mob_position: Position, initial_heading_deg: f64, approach_speed_kn: f64) -> Self {
        let heading = normalize_degrees(initial_heading_deg);
        Self {
            steps: vec![
                ManeuverStep::Hold {
                    heading_deg: heading,
                    secs: Self::HOLD_SECS,
                },
                ManeuverStep::HardOver {
                    side: Side::Port,
                    through_deg: Self::TURN_DEG,
                },
                ManeuverStep::Steady {
                    heading_deg: normalize_degrees(heading + 180.0),
                },
                ManeuverStep::Approach {
                    target: mob_position,
                    speed_kn: approach_speed_kn,
                },
            ],
        }
    }

    pub fn reciprocal_heading(&self) -> Option<f64> {
        self.steps.iter().find_map(|s| match s {
            ManeuverStep::Steady { heading_deg } => Some(*heading_deg),
            _ => None,
        })
    }
}

/// An in-process autopilot that records commands and can be taken offline.
#[derive(Debug, Default)]
pub struct SimulatedAutopilot {
    approach_speed_kn: f64,
    offline: AtomicBool,
    commands: Mutex<Vec<AutopilotCommand>>,
}

impl SimulatedAutopilot {
    pub fn new(approach_speed_kn: f64) -> Self {
        Self {
            approach_speed_kn,
            ..Self::default()
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Commands acknowledged so far. Refused commands are not recorded.
    pub fn commands(&self) -> Vec<AutopilotCommand> {
        self.commands
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn accept(&self, command: AutopilotCommand) -> Result<(), ActuatorError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ActuatorError::Unreachable(format!(
                "no link for {}",
                command.label()
            )));
        }
        info!(command = command.label(), "simulated autopilot");
        self.commands
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(command);
        Ok(())
    }
}

impl AutopilotActuator for SimulatedAutopilot {
    fn execute_recovery_maneuver(
        &self,
        mob_position: Position,
        initial_heading_deg: f64,
        initial_speed_kn: f64,
    ) -> Result<(), ActuatorError> {
        let turn = WilliamsonTurn::plan(mob_position, initial_heading_deg, self.approach_speed_kn);
        info!(
            reciprocal = turn.reciprocal_heading().unwrap_or(initial_heading_deg),
            steps = turn.steps.len(),
            "williamson turn planned"
        );
        self.accept(AutopilotCommand::RecoveryManeuver {
            mob_position,
            initial_heading_deg,
            initial_speed_kn,
        })
    }

    fn execute_circle(
        &self,
        center: Position,
        radius_m: f64,
        speed_kn: f64,
    ) -> Result<(), ActuatorError> {
        self.accept(AutopilotCommand::Circle {
            center,
            radius_m,
            speed_kn,
        })
    }

    fn resume_normal(&self) -> Result<(), ActuatorError> {
        self.accept(AutopilotCommand::ResumeNormal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn williamson_turn_steadies_on_reciprocal() {
        let mob = Position::new(40.85, 29.12);
        let turn = WilliamsonTurn::plan(mob, 350.0, 2.0);

        assert_eq!(turn.steps.len(), 4);
        assert_eq!(turn.reciprocal_heading(), Some(170.0));
        assert!(matches!(
            turn.steps[1],
            ManeuverStep::HardOver {
                side: Side::Port,
                ..
            }
        ));
        assert_eq!(
            turn.steps[3],
            ManeuverStep::Approach {
                target: mob,
                speed_kn: 2.0
            }
        );
    }

    #[test]
    fn simulated_autopilot_records_commands() {
        let autopilot = SimulatedAutopilot::new(2.0);
        let centre = Position::new(40.85, 29.12);

        autopilot.execute_recovery_maneuver(centre, 90.0, 6.0).unwrap();
        autopilot.execute_circle(centre, 50.0, 2.0).unwrap();
        autopilot.resume_normal().unwrap();

        let labels: Vec<_> = autopilot.commands().iter().map(|c| c.label()).collect();
        assert_eq!(labels, ["recovery manoeuvre", "circle", "resume normal"]);
    }

    #[test]
    fn offline_autopilot_refuses_and_records_nothing() {
        let autopilot = SimulatedAutopilot::new(2.0);
        autopilot.set_offline(true);

        let err = autopilot.resume_normal().unwrap_err();
        assert!(matches!(err, ActuatorError::Unreachable(_)));
        assert!(autopilot.commands().is_empty());
    }
}

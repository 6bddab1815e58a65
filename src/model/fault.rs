//! Recorded faults.
//!
//! A fault describes something that went wrong without stopping the work:
//! planning attaches faults to the plan, the emergency path writes them to
//! the logbook. Neither path aborts on a fault.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{SampleField, TrackingId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Fault {
    /// Forecast data was missing or unusable; the worst case was substituted.
    InvalidForecastData {
        day: usize,
        fields: Vec<SampleField>,
    },

    /// No candidate was sheltered from the night's wind.
    NoSuitableAnchorage { night: usize, detail: String },

    UnreachableActuator { command: String, error: String },

    UnreachableRadio { message: String, error: String },

    /// An MOB event arrived while a session was already active.
    DuplicateEmergencySession { session_id: Uuid },

    /// A disappearance named a tracking id that nobody on the manifest carries.
    ManifestInconsistency { tracking_id: TrackingId },
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidForecastData { day, fields } => {
                let fields: Vec<String> = fields.iter().map(ToString::to_string).collect();
                if fields.is_empty() {
                    write!(f, "day {day}: no forecast, worst case assumed")
                } else {
                    write!(f, "day {day}: missing or unusable {}, worst case assumed", fields.join(", "))
                }
            }
            Self::NoSuitableAnchorage { night, detail } => write!(f, "night {night}: {detail}"),
            Self::UnreachableActuator { command, error } => {
                write!(f, "autopilot unreachable for {command}: {error}")
            }
            Self::UnreachableRadio { message, error } => {
                write!(f, "radio unreachable for {message}: {error}")
            }
            Self::DuplicateEmergencySession { session_id } => {
                write!(f, "duplicate MOB event during session {session_id}")
            }
            Self::ManifestInconsistency { tracking_id } => {
                write!(f, "tracking id {tracking_id} is not on the manifest")
            }
        }
    }
}

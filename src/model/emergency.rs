//! Person-overboard events and emergency sessions.

use std::fmt;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Fault, Person, Position, TrackingId};

/// A sighting from the external person tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub tracking_id: TrackingId,

    /// Detection confidence, 0 to 1.
    pub confidence: f64,
    pub near_edge: bool,
    pub timestamp: Timestamp,
}

/// A tracked person who was last seen near the rail and has not been seen since.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisappearanceSignal {
    pub tracking_id: TrackingId,
    pub last_seen_near_edge: Timestamp,
    pub elapsed: SignedDuration,
    pub confidence: f64,
}

/// What raised an MOB event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "camelCase")]
pub enum MobSource {
    Tracker,
    Manual { operator: String },
}

/// A person has gone overboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobEvent {
    pub tracking_id: Option<TrackingId>,
    pub detected_at: Timestamp,
    pub last_known_position: Position,
    pub confidence: f64,
    pub source: MobSource,
}

/// The outcome of applying an MOB event to the manifest.
///
/// Both counts are taken under the same manifest lock that marked the person
/// overboard, so `onboard_before == onboard_after + 1` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobAssessment {
    pub event: MobEvent,

    /// `None` when the person in the water could not be identified.
    pub person: Option<Person>,
    pub onboard_before: usize,
    pub onboard_after: usize,
    pub unmanned: bool,
}

impl MobAssessment {
    pub fn person_label(&self) -> String {
        match &self.person {
            Some(p) => p.name.clone(),
            None => "unidentified person".into(),
        }
    }
}

/// Emergency response state. `Resolved` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmergencyState {
    Normal,
    Alerted,
    MaydaySent,
    Maneuvering,
    Circling,
    Resolved,
    Cancelled,
}

impl EmergencyState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Cancelled)
    }
}

impl fmt::Display for EmergencyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "NORMAL",
            Self::Alerted => "ALERTED",
            Self::MaydaySent => "MAYDAY_SENT",
            Self::Maneuvering => "MANEUVERING",
            Self::Circling => "CIRCLING",
            Self::Resolved => "RESOLVED",
            Self::Cancelled => "CANCELLED",
        })
    }
}

/// What the autopilot has been asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ManeuverState {
    NotStarted,
    RecoveryTurn,
    StationKeeping,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub from: EmergencyState,
    pub to: EmergencyState,
    pub at: Timestamp,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub by: String,
    pub notes: String,
    pub at: Timestamp,
}

/// One autonomous emergency response. At most one is active per vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencySession {
    pub id: Uuid,
    pub state: EmergencyState,
    pub mob_event: MobEvent,
    pub mob_position: Position,
    pub person: Option<Person>,
    pub started_at: Timestamp,
    pub mayday_sent: bool,
    pub maneuver_state: ManeuverState,
    pub circling: bool,
    pub transitions: Vec<Transition>,
    pub status_updates_sent: u32,
    pub duplicates: u32,
    #[serde(default)]
    pub faults: Vec<Fault>,
    #[serde(default)]
    pub resolution: Option<Resolution>,
}

impl EmergencySession {
    pub fn new(assessment: &MobAssessment, started_at: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: EmergencyState::Normal,
            mob_event: assessment.event.clone(),
            mob_position: assessment.event.last_known_position,
            person: assessment.person.clone(),
            started_at,
            mayday_sent: false,
            maneuver_state: ManeuverState::NotStarted,
            circling: false,
            transitions: Vec::new(),
            status_updates_sent: 0,
            duplicates: 0,
            faults: Vec::new(),
            resolution: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }

    /// Move to `to`, recording the transition. Returns the previous state.
    pub fn advance(&mut self, to: EmergencyState, at: Timestamp) -> EmergencyState {
        let from = self.state;
        self.state = to;
        self.transitions.push(Transition { from, to, at });
        from
    }

    /// The states this session has passed through, starting with `Normal`.
    pub fn path(&self) -> Vec<EmergencyState> {
        let mut path = vec![EmergencyState::Normal];
        path.extend(self.transitions.iter().map(|t| t.to));
        path
    }

    pub fn short_id(&self) -> String {
        self.id.to_string()[..8].to_string()
    }
}

/// A message for the distress radio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DistressMessage {
    #[serde(rename_all = "camelCase")]
    Mayday {
        vessel_name: String,
        mmsi: Option<String>,
        position: Position,
        situation: String,
        persons_onboard: usize,
        persons_in_water: usize,
    },

    /// Repeated while the vessel circles the person in the water.
    #[serde(rename_all = "camelCase")]
    StatusUpdate {
        vessel_name: String,
        mmsi: Option<String>,
        position: Position,
        situation: String,
        update: u32,
    },
}

impl DistressMessage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mayday { .. } => "mayday",
            Self::StatusUpdate { .. } => "status update",
        }
    }
}

/// Cancels a previously sent distress call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllClearMessage {
    pub vessel_name: String,
    pub mmsi: Option<String>,
    pub position: Position,
    pub recovered_by: String,
    pub notes: String,
}

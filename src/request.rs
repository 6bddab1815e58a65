//! The closed set of requests the station accepts, and its replies.
//!
//! Every input reaches the station as one of these variants, whether it comes
//! from a CLI subcommand or a JSON line on the monitor's stdin. Nothing at
//! this boundary is free text to be interpreted.

use serde::{Deserialize, Serialize};

use crate::captain::{CaptainOverride, OverrideRecord};
use crate::coordinator::{EmergencyStatus, MobResponse};
use crate::model::{
    DisappearanceSignal, EmergencySession, NavigationFix, Person, PlanRequest, Position,
    SafetyVerdict, TrackingEvent, TrackingId, VoyagePlan,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "camelCase")]
pub enum Request {
    PlanVoyage(PlanRequest),

    /// Override the cancellation of the station's current plan.
    CaptainOverride(CaptainOverride),

    #[serde(rename_all = "camelCase")]
    ManualMob {
        /// Defaults to the latest navigation fix.
        #[serde(default)]
        position: Option<Position>,
        operator: String,
        #[serde(default)]
        person_id: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    AllClear { recovered_by: String, notes: String },

    CancelEmergency { by: String, reason: String },

    EmergencyStatus,

    Embark { person: Person },

    #[serde(rename_all = "camelCase")]
    Disembark { person_id: String },

    #[serde(rename_all = "camelCase")]
    ReturnAboard { person_id: String },

    #[serde(rename_all = "camelCase")]
    LinkTracking {
        person_id: String,
        tracking_id: TrackingId,
    },

    Manifest,

    Track(TrackingEvent),

    Disappearance(DisappearanceSignal),

    Navigation(NavigationFix),
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlanVoyage(_) => "plan-voyage",
            Self::CaptainOverride(_) => "captain-override",
            Self::ManualMob { .. } => "manual-mob",
            Self::AllClear { .. } => "all-clear",
            Self::CancelEmergency { .. } => "cancel-emergency",
            Self::EmergencyStatus => "emergency-status",
            Self::Embark { .. } => "embark",
            Self::Disembark { .. } => "disembark",
            Self::ReturnAboard { .. } => "return-aboard",
            Self::LinkTracking { .. } => "link-tracking",
            Self::Manifest => "manifest",
            Self::Track(_) => "track",
            Self::Disappearance(_) => "disappearance",
            Self::Navigation(_) => "navigation",
        }
    }
}

/// Result of re-assessing the current plan against the latest forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reassessment {
    pub plan_id: uuid::Uuid,
    pub previous: SafetyVerdict,
    pub current: SafetyVerdict,
    pub worsened: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "camelCase")]
pub enum Response {
    Plan { plan: Box<VoyagePlan> },

    Override { record: OverrideRecord },

    Mob { outcome: MobResponse },

    /// The session as it stands after an all-clear or cancellation.
    Emergency { session: Box<EmergencySession> },

    Status { status: EmergencyStatus },

    Manifest { summary: String, onboard: usize },

    /// A sighting was taken in, or ignored for low confidence.
    Tracked { accepted: bool },

    /// A signal that did not amount to anything.
    Ignored { reason: String },

    Reassessed { reassessment: Reassessment },

    Ack,
}

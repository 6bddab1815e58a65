//! Voyage planning types: requests, segments, verdicts, and the plan itself.

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Anchorage, Fault, Position, WeatherSample};

/// How the vessel is driven, which determines its passage speed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Propulsion {
    #[default]
    Sail,
    Motor,
    MotorSail,
}

impl fmt::Display for Propulsion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sail => "sail",
            Self::Motor => "motor",
            Self::MotorSail => "motor-sail",
        })
    }
}

/// The vessel's identity and particulars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Vessel {
    pub name: String,
    pub mmsi: Option<String>,
    pub length_m: f64,
    pub propulsion: Propulsion,
}

impl Default for Vessel {
    fn default() -> Self {
        Self {
            name: "Unnamed".into(),
            mmsi: None,
            length_m: 12.0,
            propulsion: Propulsion::Sail,
        }
    }
}

/// A named point on the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub name: String,
    pub position: Position,
}

/// Inputs to a planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub vessel: Vessel,
    pub departure: Waypoint,

    /// Route waypoints; the last one is the destination.
    pub waypoints: Vec<Waypoint>,
    pub nights: u32,
    pub depart_at: Timestamp,
}

impl PlanRequest {
    /// The final waypoint, or the departure point for a round trip with no waypoints.
    pub fn destination(&self) -> &Waypoint {
        self.waypoints.last().unwrap_or(&self.departure)
    }
}

/// Safety classification, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SafetyClass {
    Safe,
    Caution,
    Dangerous,
    Critical,
}

impl SafetyClass {
    /// Whether a voyage with this verdict may start without an override.
    pub fn permits_departure(self) -> bool {
        matches!(self, Self::Safe | Self::Caution)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Caution => "caution",
            Self::Dangerous => "dangerous",
            Self::Critical => "critical",
        }
    }
}

impl std::str::FromStr for SafetyClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "safe" => Ok(Self::Safe),
            "caution" => Ok(Self::Caution),
            "dangerous" => Ok(Self::Dangerous),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown safety class: {other}")),
        }
    }
}

impl fmt::Display for SafetyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of assessing a forecast horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyVerdict {
    pub class: SafetyClass,
    pub reason: String,

    /// 1-based planning day on which the deciding condition first occurs.
    pub worst_day: Option<usize>,
    pub max_wind_kn: f64,
    pub max_wave_m: f64,
    pub min_visibility_nm: f64,
}

/// One leg of the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSegment {
    pub from: Waypoint,
    pub to: Waypoint,
    pub distance_nm: f64,
    pub bearing_deg: f64,
    pub estimated_hours: f64,
    pub weather: Option<WeatherSample>,
    pub comfort_score: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub recommended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTotals {
    pub distance_nm: f64,
    pub hours: f64,
    pub mean_comfort: f64,
}

/// How an alternative plan differs from the one it replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlternativeKind {
    Delay24h,
    Delay48h,
    Shortened,
}

impl fmt::Display for AlternativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Delay24h => "delay departure 24h",
            Self::Delay48h => "delay departure 48h",
            Self::Shortened => "shorten by one night",
        })
    }
}

/// Record of an alternative that was planned, whether or not it was kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptedAlternative {
    pub kind: AlternativeKind,
    pub verdict: SafetyClass,
    pub accepted: bool,
}

/// The root artifact of a planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoyagePlan {
    pub id: Uuid,
    pub created_at: Timestamp,
    pub request: PlanRequest,

    /// Set on plans produced as an alternative to another plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_kind: Option<AlternativeKind>,

    pub segments: Vec<RouteSegment>,
    pub overnight_anchorages: Vec<Anchorage>,
    pub totals: PlanTotals,
    pub verdict: SafetyVerdict,
    pub cancellation_reason: Option<String>,
    pub override_required: bool,
    pub weather_summary: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub faults: Vec<Fault>,

    /// Safer plans, in preference order. `None` when none were sought.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<VoyagePlan>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempted_alternatives: Vec<AttemptedAlternative>,
}

impl VoyagePlan {
    pub fn short_id(&self) -> String {
        self.id.to_string()[..8].to_string()
    }
}

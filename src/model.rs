//! Core data model for Lookout.
//!
//! Weather samples and anchorages feed voyage planning; persons, tracking
//! events and emergency sessions drive the person-overboard response.
//! Faults are recorded alongside both.

mod anchorage;
mod crew;
mod emergency;
mod fault;
mod position;
mod voyage;
mod weather;

pub use anchorage::{Anchorage, BottomType, DepthRange, Facility, HoldingQuality};
pub use crew::{Person, PersonStatus, Role, TrackingId};
pub use emergency::{
    AllClearMessage, DisappearanceSignal, DistressMessage, EmergencySession, EmergencyState,
    ManeuverState, MobAssessment, MobEvent, MobSource, Resolution, TrackingEvent, Transition,
};
pub use fault::Fault;
pub use position::{NavigationFix, Position, normalize_degrees};
pub use voyage::{
    AlternativeKind, AttemptedAlternative, PlanRequest, PlanTotals, Propulsion, RouteSegment,
    SafetyClass, SafetyVerdict, Vessel, VoyagePlan, Waypoint,
};
pub use weather::{
    ForecastRecord, SampleField, SeaState, WORST_CASE_VISIBILITY_NM, WORST_CASE_WAVE_M,
    WORST_CASE_WIND_KN, WeatherSample, WindDirection,
};

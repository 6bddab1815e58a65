//! Emergency response coordination.
//!
//! When a person goes overboard and nobody is left aboard, the coordinator
//! runs the whole response on its own:
//!
//! ```text
//! NORMAL -> ALERTED -> MAYDAY_SENT -> MANEUVERING -> CIRCLING -> RESOLVED
//!                                                             \-> CANCELLED
//! ```
//!
//! With crew still aboard it only hands back the standard checklist.
//!
//! At most one session is active per vessel. Session state lives behind a
//! single mutex that is held for the whole MOB sequence, so a second event
//! either sees the active session and is recorded as a duplicate, or runs
//! after the first has ended. External calls never abort the sequence: a
//! failed command is logged and audited and the next step is still attempted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditSink};
use crate::autopilot::AutopilotActuator;
use crate::config::EmergencySettings;
use crate::detector::Detection;
use crate::manifest::{self, SharedManifest};
use crate::model::{
    AllClearMessage, DistressMessage, EmergencySession, EmergencyState, Fault, ManeuverState,
    MobAssessment, NavigationFix, Person, Position, Resolution, Vessel,
};
use crate::procedure::{self, MOB_CHECKLIST};
use crate::radio::DistressRadio;
use crate::scheduler::PeriodicTask;

const UNMANNED_SITUATION: &str = "single-handed MOB, vessel unmanned";

#[derive(Debug, thiserror::Error)]
pub enum EmergencyError {
    #[error("no emergency session")]
    NoSession,
}

/// Standard procedure for a crewed vessel. Nothing is actuated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advisory {
    pub person: String,
    pub position: Position,
    pub onboard: usize,
    pub checklist: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "camelCase")]
pub enum MobResponse {
    /// The vessel is unmanned; the autonomous sequence ran.
    Autonomous { session: Box<EmergencySession> },

    Advisory(Advisory),

    /// A session was already active; the event was recorded only.
    #[serde(rename_all = "camelCase")]
    Duplicate { session_id: Uuid },
}

/// Snapshot of the emergency state for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyStatus {
    pub state: EmergencyState,
    pub active: bool,
    pub session_id: Option<Uuid>,
    pub person: Option<String>,
    pub mob_position: Option<Position>,
    pub elapsed_secs: i64,
    pub mayday_sent: bool,
    pub maneuver_state: Option<ManeuverState>,
    pub circling: bool,
    pub status_updates_sent: u32,
    pub duplicates: u32,
}

#[derive(Default)]
struct Sessions {
    current: Option<EmergencySession>,
    alerts: Option<PeriodicTask>,
}

struct Inner {
    vessel: Vessel,
    settings: EmergencySettings,
    manifest: SharedManifest,
    autopilot: Arc<dyn AutopilotActuator>,
    radio: Arc<dyn DistressRadio>,
    audit: Arc<dyn AuditSink>,
    runtime: Handle,
    sessions: Mutex<Sessions>,
}

/// The external systems the coordinator drives.
pub struct Capabilities {
    pub autopilot: Arc<dyn AutopilotActuator>,
    pub radio: Arc<dyn DistressRadio>,
    pub audit: Arc<dyn AuditSink>,
}

#[derive(Clone)]
pub struct EmergencyCoordinator {
    inner: Arc<Inner>,
}

impl EmergencyCoordinator {
    pub fn new(
        vessel: Vessel,
        settings: EmergencySettings,
        manifest: SharedManifest,
        capabilities: Capabilities,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                vessel,
                settings,
                manifest,
                autopilot: capabilities.autopilot,
                radio: capabilities.radio,
                audit: capabilities.audit,
                runtime,
                sessions: Mutex::new(Sessions::default()),
            }),
        }
    }

    /// React to a person going overboard.
    pub fn handle_mob(&self, detection: Detection, fix: &NavigationFix) -> MobResponse {
        let inner = &self.inner;
        let mut sessions = inner.lock();
        let assessment = detection.assessment;

        if let Some(active) = sessions.current.as_mut().filter(|s| s.is_active()) {
            active.duplicates += 1;
            let fault = Fault::DuplicateEmergencySession {
                session_id: active.id,
            };
            active.faults.push(fault.clone());
            info!(
                session_id = %active.id,
                duplicates = active.duplicates,
                "MOB event during active session recorded as duplicate"
            );
            inner.audit.record(AuditEvent::DuplicateSession {
                session_id: active.id,
                tracking_id: assessment.event.tracking_id,
            });
            inner.audit.record(AuditEvent::Fault {
                session_id: Some(active.id),
                fault,
                critical: false,
            });
            return MobResponse::Duplicate {
                session_id: active.id,
            };
        }

        inner.audit.record(AuditEvent::MobDetected {
            tracking_id: assessment.event.tracking_id,
            source: assessment.event.source.clone(),
            position: assessment.event.last_known_position,
            confidence: assessment.event.confidence,
        });
        inner.audit.record(AuditEvent::UnmannedAssessment {
            person: assessment.person_label(),
            onboard_before: assessment.onboard_before,
            onboard_after: assessment.onboard_after,
            unmanned: assessment.unmanned,
        });

        if !assessment.unmanned {
            if let Some(fault) = detection.fault {
                inner.audit.record(AuditEvent::Fault {
                    session_id: None,
                    fault,
                    critical: false,
                });
            }
            return MobResponse::Advisory(inner.advise(&assessment));
        }

        let mut session = EmergencySession::new(&assessment, Timestamp::now());
        info!(session_id = %session.id, "emergency session opened");
        inner.audit.record(AuditEvent::SessionOpened {
            session_id: session.id,
        });
        if let Some(fault) = detection.fault {
            inner.record_fault(&mut session, fault, false);
        }

        // 1. Mark the position and sound the alarm.
        inner.advance(&mut session, EmergencyState::Alerted);
        error!(
            session_id = %session.id,
            position = %session.mob_position,
            "MOB ALARM: vessel unmanned, person in the water"
        );

        // 2. Mayday and beacon.
        inner.send_mayday(&mut session);
        if let Err(e) = inner.radio.activate_beacon(session.mob_position) {
            error!(error = %e, "position beacon not activated");
            let fault = Fault::UnreachableRadio {
                message: "beacon".into(),
                error: e.to_string(),
            };
            inner.record_fault(&mut session, fault, true);
        }
        inner.advance(&mut session, EmergencyState::MaydaySent);

        // 3. Recovery turn.
        inner.advance(&mut session, EmergencyState::Maneuvering);
        match inner.autopilot.execute_recovery_maneuver(
            session.mob_position,
            fix.heading_deg,
            fix.speed_kn,
        ) {
            Ok(()) => session.maneuver_state = ManeuverState::RecoveryTurn,
            Err(e) => inner.actuator_failed(&mut session, "recovery manoeuvre", &e.to_string()),
        }

        // 4. Station-keeping circle.
        inner.advance(&mut session, EmergencyState::Circling);
        match inner.autopilot.execute_circle(
            session.mob_position,
            inner.settings.circle_radius_m,
            inner.settings.circle_speed_kn,
        ) {
            Ok(()) => {
                session.maneuver_state = ManeuverState::StationKeeping;
                session.circling = true;
            }
            Err(e) => inner.actuator_failed(&mut session, "circle", &e.to_string()),
        }

        // 5. Repeated status updates until the session ends.
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        sessions.alerts = Some(PeriodicTask::spawn(
            &inner.runtime,
            "distress-updates",
            inner.settings.alert_interval(),
            move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_alert_tick();
                }
            },
        ));

        let snapshot = session.clone();
        sessions.current = Some(session);
        MobResponse::Autonomous {
            session: Box::new(snapshot),
        }
    }

    /// Person recovered. Ends the active session as resolved.
    ///
    /// Calling this on an ended session changes nothing and returns it as is.
    pub fn all_clear(
        &self,
        recovered_by: &str,
        notes: &str,
    ) -> Result<EmergencySession, EmergencyError> {
        self.inner
            .end(EmergencyState::Resolved, recovered_by, notes)
    }

    /// False alarm or otherwise called off. Ends the active session as cancelled.
    pub fn cancel(&self, by: &str, reason: &str) -> Result<EmergencySession, EmergencyError> {
        self.inner.end(EmergencyState::Cancelled, by, reason)
    }

    /// The current or most recent session.
    pub fn session(&self) -> Option<EmergencySession> {
        self.inner.lock().current.clone()
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .lock()
            .current
            .as_ref()
            .is_some_and(EmergencySession::is_active)
    }

    pub fn status(&self, now: Timestamp) -> EmergencyStatus {
        let sessions = self.inner.lock();
        match &sessions.current {
            None => EmergencyStatus {
                state: EmergencyState::Normal,
                active: false,
                session_id: None,
                person: None,
                mob_position: None,
                elapsed_secs: 0,
                mayday_sent: false,
                maneuver_state: None,
                circling: false,
                status_updates_sent: 0,
                duplicates: 0,
            },
            Some(s) => EmergencyStatus {
                state: s.state,
                active: s.is_active(),
                session_id: Some(s.id),
                person: Some(
                    s.person
                        .as_ref()
                        .map_or_else(|| "unidentified person".to_string(), |p| p.name.clone()),
                ),
                mob_position: Some(s.mob_position),
                elapsed_secs: now.duration_since(s.started_at).as_secs(),
                mayday_sent: s.mayday_sent,
                maneuver_state: Some(s.maneuver_state),
                circling: s.circling,
                status_updates_sent: s.status_updates_sent,
                duplicates: s.duplicates,
            },
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advise(&self, assessment: &MobAssessment) -> Advisory {
        let advisory = Advisory {
            person: assessment.person_label(),
            position: assessment.event.last_known_position,
            onboard: assessment.onboard_after,
            checklist: procedure::numbered(&MOB_CHECKLIST),
        };
        warn!(
            person = %advisory.person,
            onboard = advisory.onboard,
            position = %advisory.position,
            "MOB with crew aboard: standard procedure"
        );
        self.audit.record(AuditEvent::AdvisoryIssued {
            person: advisory.person.clone(),
            position: advisory.position,
            onboard: advisory.onboard,
        });
        advisory
    }

    fn advance(&self, session: &mut EmergencySession, to: EmergencyState) {
        let from = session.advance(to, Timestamp::now());
        info!(session_id = %session.id, %from, %to, "emergency state");
        self.audit.record(AuditEvent::StateTransition {
            session_id: session.id,
            from,
            to,
        });
    }

    fn record_fault(&self, session: &mut EmergencySession, fault: Fault, critical: bool) {
        session.faults.push(fault.clone());
        self.audit.record(AuditEvent::Fault {
            session_id: Some(session.id),
            fault,
            critical,
        });
    }

    fn actuator_failed(&self, session: &mut EmergencySession, command: &str, error: &str) {
        error!(
            session_id = %session.id,
            command,
            position = %session.mob_position,
            at = %Timestamp::now(),
            error,
            "autopilot command not acknowledged, continuing"
        );
        let fault = Fault::UnreachableActuator {
            command: command.to_string(),
            error: error.to_string(),
        };
        self.record_fault(session, fault, true);
    }

    fn mayday(&self, session: &EmergencySession) -> DistressMessage {
        DistressMessage::Mayday {
            vessel_name: self.vessel.name.clone(),
            mmsi: self.vessel.mmsi.clone(),
            position: session.mob_position,
            situation: UNMANNED_SITUATION.to_string(),
            persons_onboard: 0,
            persons_in_water: 1,
        }
    }

    /// Transmit the Mayday unless it already went out, retrying up to the
    /// configured number of attempts.
    fn send_mayday(&self, session: &mut EmergencySession) {
        if session.mayday_sent {
            return;
        }
        let message = self.mayday(session);
        let attempts = self.settings.mayday_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.radio.send_distress(&message) {
                Ok(()) => {
                    session.mayday_sent = true;
                    info!(session_id = %session.id, attempt, "mayday transmitted");
                    self.audit.record(AuditEvent::MaydayTransmitted {
                        session_id: session.id,
                        attempts: attempt,
                    });
                    return;
                }
                Err(e) => {
                    warn!(session_id = %session.id, attempt, error = %e, "mayday attempt failed");
                    last_error = e.to_string();
                }
            }
        }

        error!(
            session_id = %session.id,
            attempts,
            position = %session.mob_position,
            "MAYDAY NOT DELIVERED"
        );
        self.audit.record(AuditEvent::MaydayUndelivered {
            session_id: session.id,
            attempts,
            error: last_error.clone(),
        });
        let fault = Fault::UnreachableRadio {
            message: "mayday".into(),
            error: last_error,
        };
        self.record_fault(session, fault, true);
    }

    /// One tick of the repeated alert: retry an undelivered Mayday, else send
    /// the next status update.
    fn on_alert_tick(&self) {
        let mut sessions = self.lock();
        let Some(session) = sessions.current.as_mut() else {
            return;
        };
        if session.state != EmergencyState::Circling {
            return;
        }
        if !session.mayday_sent {
            self.send_mayday(session);
            return;
        }

        let update = session.status_updates_sent + 1;
        let message = DistressMessage::StatusUpdate {
            vessel_name: self.vessel.name.clone(),
            mmsi: self.vessel.mmsi.clone(),
            position: session.mob_position,
            situation: format!(
                "{UNMANNED_SITUATION}; vessel circling the marked position, {} min elapsed",
                Timestamp::now().duration_since(session.started_at).as_secs() / 60
            ),
            update,
        };
        match self.radio.send_distress(&message) {
            Ok(()) => {
                session.status_updates_sent = update;
                info!(session_id = %session.id, update, "distress status update sent");
                self.audit.record(AuditEvent::StatusUpdateSent {
                    session_id: session.id,
                    update,
                });
            }
            Err(e) => {
                error!(session_id = %session.id, update, error = %e, "status update not sent");
                let fault = Fault::UnreachableRadio {
                    message: message.label().to_string(),
                    error: e.to_string(),
                };
                self.record_fault(session, fault, false);
            }
        }
    }

    fn end(
        &self,
        to: EmergencyState,
        by: &str,
        notes: &str,
    ) -> Result<EmergencySession, EmergencyError> {
        let mut sessions = self.lock();
        if let Some(task) = sessions.alerts.take() {
            task.cancel();
        }
        let session = sessions.current.as_mut().ok_or(EmergencyError::NoSession)?;
        if !session.is_active() {
            info!(session_id = %session.id, state = %session.state, "session already ended");
            return Ok(session.clone());
        }

        if let Some(person) = &session.person {
            self.bring_aboard(person);
        }

        if let Err(e) = self.autopilot.resume_normal() {
            self.actuator_failed(session, "resume normal", &e.to_string());
        }
        session.maneuver_state = ManeuverState::Released;
        session.circling = false;

        if session.mayday_sent {
            let message = AllClearMessage {
                vessel_name: self.vessel.name.clone(),
                mmsi: self.vessel.mmsi.clone(),
                position: session.mob_position,
                recovered_by: by.to_string(),
                notes: notes.to_string(),
            };
            if let Err(e) = self.radio.send_all_clear(&message) {
                error!(session_id = %session.id, error = %e, "all-clear not sent");
                let fault = Fault::UnreachableRadio {
                    message: "all-clear".into(),
                    error: e.to_string(),
                };
                self.record_fault(session, fault, true);
            }
        }

        session.resolution = Some(Resolution {
            by: by.to_string(),
            notes: notes.to_string(),
            at: Timestamp::now(),
        });
        self.advance(session, to);
        self.audit.record(match to {
            EmergencyState::Cancelled => AuditEvent::Cancelled {
                session_id: session.id,
                reason: notes.to_string(),
            },
            _ => AuditEvent::AllClear {
                session_id: session.id,
                recovered_by: by.to_string(),
                notes: notes.to_string(),
            },
        });
        info!(session_id = %session.id, state = %to, by, "emergency ended");
        Ok(session.clone())
    }

    fn bring_aboard(&self, person: &Person) {
        if let Err(e) = manifest::lock(&self.manifest).return_aboard(&person.id) {
            warn!(person = %person.name, error = %e, "could not mark person aboard");
        }
    }
}

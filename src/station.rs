//! The onboard station: one owner for the planner, the crew manifest, the
//! MOB detector and the emergency coordinator of a single vessel.
//!
//! Callers construct a station and pass it around; there is no global
//! instance. [`Station::handle`] is the single entry point for requests.

use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::audit::{AuditEvent, AuditSink};
use crate::captain::OverrideError;
use crate::config::Config;
use crate::coordinator::{Capabilities, EmergencyCoordinator, EmergencyError};
use crate::detector::{Detection, MobDetector};
use crate::forecast::{self, MAX_HORIZON_DAYS};
use crate::manifest::{self, ManifestError, SharedManifest};
use crate::model::{NavigationFix, VoyagePlan};
use crate::planner::{PlanError, RoutePlanner};
use crate::request::{Reassessment, Request, Response};

#[derive(Debug, thiserror::Error)]
pub enum StationError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Override(#[from] OverrideError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Emergency(#[from] EmergencyError),

    #[error("no voyage plan loaded")]
    NoPlan,
}

pub type Result<T> = core::result::Result<T, StationError>;

pub struct Station {
    planner: RoutePlanner,
    manifest: SharedManifest,
    detector: MobDetector,
    coordinator: EmergencyCoordinator,
    audit: Arc<dyn AuditSink>,
    fix: NavigationFix,
    plan: Option<VoyagePlan>,
}

impl Station {
    pub fn new(
        config: &Config,
        planner: RoutePlanner,
        manifest: SharedManifest,
        capabilities: Capabilities,
        fix: NavigationFix,
        runtime: Handle,
    ) -> Self {
        let audit = Arc::clone(&capabilities.audit);
        let detector = MobDetector::new(Arc::clone(&manifest), &config.emergency);
        let coordinator = EmergencyCoordinator::new(
            config.vessel.clone(),
            config.emergency,
            Arc::clone(&manifest),
            capabilities,
            runtime,
        );
        Self {
            planner,
            manifest,
            detector,
            coordinator,
            audit,
            fix,
            plan: None,
        }
    }

    pub fn coordinator(&self) -> &EmergencyCoordinator {
        &self.coordinator
    }

    pub fn manifest(&self) -> &SharedManifest {
        &self.manifest
    }

    pub fn plan(&self) -> Option<&VoyagePlan> {
        self.plan.as_ref()
    }

    /// Make `plan` the one overrides and re-assessments apply to.
    pub fn set_plan(&mut self, plan: VoyagePlan) {
        self.plan = Some(plan);
    }

    pub fn fix(&self) -> &NavigationFix {
        &self.fix
    }

    pub fn handle(&mut self, request: Request) -> Result<Response> {
        match request {
            Request::PlanVoyage(req) => {
                let plan = self.planner.plan(&req)?;
                self.audit.record(AuditEvent::plan_assessed(&plan));
                self.plan = Some(plan.clone());
                Ok(Response::Plan {
                    plan: Box::new(plan),
                })
            }
            Request::CaptainOverride(captain) => {
                let plan = self.plan.as_ref().ok_or(StationError::NoPlan)?;
                let record = captain.apply(plan, self.audit.as_ref())?;
                Ok(Response::Override { record })
            }
            Request::ManualMob {
                position,
                operator,
                person_id,
            } => {
                let position = position.unwrap_or(self.fix.position);
                let detection =
                    self.detector
                        .manual(position, &operator, person_id.as_deref(), Timestamp::now());
                Ok(self.respond_to_mob(detection))
            }
            Request::AllClear {
                recovered_by,
                notes,
            } => {
                let session = self.coordinator.all_clear(&recovered_by, &notes)?;
                Ok(Response::Emergency {
                    session: Box::new(session),
                })
            }
            Request::CancelEmergency { by, reason } => {
                let session = self.coordinator.cancel(&by, &reason)?;
                Ok(Response::Emergency {
                    session: Box::new(session),
                })
            }
            Request::EmergencyStatus => Ok(Response::Status {
                status: self.coordinator.status(Timestamp::now()),
            }),
            Request::Embark { person } => {
                manifest::lock(&self.manifest).embark(person)?;
                Ok(self.manifest_response())
            }
            Request::Disembark { person_id } => {
                manifest::lock(&self.manifest).disembark(&person_id)?;
                Ok(self.manifest_response())
            }
            Request::ReturnAboard { person_id } => {
                manifest::lock(&self.manifest).return_aboard(&person_id)?;
                Ok(self.manifest_response())
            }
            Request::LinkTracking {
                person_id,
                tracking_id,
            } => {
                manifest::lock(&self.manifest).link_tracking(&person_id, tracking_id)?;
                Ok(self.manifest_response())
            }
            Request::Manifest => Ok(self.manifest_response()),
            Request::Track(event) => Ok(Response::Tracked {
                accepted: self.detector.observe(&event),
            }),
            Request::Disappearance(signal) => {
                match self.detector.on_disappearance(&signal, self.fix.position) {
                    Some(detection) => Ok(self.respond_to_mob(detection)),
                    None => Ok(Response::Ignored {
                        reason: format!(
                            "disappearance of {} does not meet the detection threshold",
                            signal.tracking_id
                        ),
                    }),
                }
            }
            Request::Navigation(fix) => {
                self.fix = fix;
                Ok(Response::Ack)
            }
        }
    }

    /// Look for tracks that have gone missing near the edge and respond to each.
    pub fn scan(&mut self, now: Timestamp) -> Vec<Response> {
        let signals = self.detector.scan(now);
        let mut responses = Vec::new();
        for signal in signals {
            if let Some(detection) = self.detector.on_disappearance(&signal, self.fix.position) {
                responses.push(self.respond_to_mob(detection));
            }
        }
        responses
    }

    /// Re-assess the current plan against the forecast for what is left of it.
    ///
    /// Returns `None` when there is no plan or the plan is already over.
    pub fn reassess(&self, now: Timestamp) -> Option<Reassessment> {
        let plan = self.plan.as_ref()?;
        let request = &plan.request;
        let end = forecast::day_start(request.depart_at, request.nights.saturating_add(1));
        let start = now.max(request.depart_at);
        if start >= end {
            return None;
        }
        let remaining_secs = end.duration_since(start).as_secs();
        let day_secs = SignedDuration::from_hours(24).as_secs();
        let days = u32::try_from((remaining_secs + day_secs - 1) / day_secs)
            .unwrap_or(MAX_HORIZON_DAYS)
            .clamp(1, MAX_HORIZON_DAYS);

        let daily = forecast::fetch_daily(self.planner.forecast(), start, days);
        let current = self.planner.assessor().assess(&daily.days);
        let worsened = current.class > plan.verdict.class;
        if worsened {
            warn!(
                plan_id = %plan.id,
                was = %plan.verdict.class,
                now = %current.class,
                reason = %current.reason,
                "conditions have worsened"
            );
        } else {
            info!(plan_id = %plan.id, verdict = %current.class, "plan re-assessed");
        }
        self.audit.record(AuditEvent::Reassessment {
            plan_id: plan.id,
            class: current.class,
            worsened,
        });
        Some(Reassessment {
            plan_id: plan.id,
            previous: plan.verdict.clone(),
            current,
            worsened,
        })
    }

    fn respond_to_mob(&self, detection: Detection) -> Response {
        Response::Mob {
            outcome: self.coordinator.handle_mob(detection, &self.fix),
        }
    }

    fn manifest_response(&self) -> Response {
        let manifest = manifest::lock(&self.manifest);
        Response::Manifest {
            summary: manifest.summary(),
            onboard: manifest.onboard_count(),
        }
    }
}

//! Person-overboard detection.
//!
//! The detector follows tracker sightings and notices when someone last seen
//! near the rail has not been seen for longer than the disappearance
//! threshold. Turning a disappearance into an MOB event marks the person
//! overboard and counts who is left under one manifest lock.

use std::collections::HashMap;

use jiff::{SignedDuration, Timestamp};
use tracing::{debug, error, warn};

use crate::config::EmergencySettings;
use crate::manifest::{self, SharedManifest};
use crate::model::{
    DisappearanceSignal, Fault, MobAssessment, MobEvent, MobSource, Position, TrackingEvent,
    TrackingId,
};

/// An MOB event applied to the manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub assessment: MobAssessment,

    /// Set when the tracking id is not on the manifest.
    pub fault: Option<Fault>,
}

/// Tracks away from the edge are forgotten after this long without a sighting.
const TRACK_EXPIRY: SignedDuration = SignedDuration::from_secs(600);

#[derive(Debug, Clone, Copy)]
struct Track {
    last_seen: Timestamp,
    near_edge: bool,
    confidence: f64,
}

pub struct MobDetector {
    manifest: SharedManifest,
    threshold: SignedDuration,
    min_confidence: f64,
    tracks: HashMap<TrackingId, Track>,
}

impl MobDetector {
    pub fn new(manifest: SharedManifest, settings: &EmergencySettings) -> Self {
        let threshold = SignedDuration::try_from_secs_f64(settings.disappearance_threshold_secs)
            .unwrap_or(SignedDuration::from_secs(2));
        Self {
            manifest,
            threshold,
            min_confidence: settings.min_confidence,
            tracks: HashMap::new(),
        }
    }

    pub fn manifest(&self) -> &SharedManifest {
        &self.manifest
    }

    /// Take in one tracker sighting. Returns false when it was ignored for
    /// low confidence.
    pub fn observe(&mut self, event: &TrackingEvent) -> bool {
        if event.confidence < self.min_confidence {
            debug!(
                tracking_id = %event.tracking_id,
                confidence = event.confidence,
                "sighting below confidence threshold"
            );
            return false;
        }
        let track = self.tracks.entry(event.tracking_id).or_insert(Track {
            last_seen: event.timestamp,
            near_edge: event.near_edge,
            confidence: event.confidence,
        });
        if event.timestamp >= track.last_seen {
            track.last_seen = event.timestamp;
            track.near_edge = event.near_edge;
            track.confidence = event.confidence;
        }
        true
    }

    /// Tracks last seen near the edge and missing for longer than the
    /// threshold. Each disappearance is reported once: the track is dropped,
    /// and a later sighting starts a new one. Stale tracks away from the edge
    /// expire.
    pub fn scan(&mut self, now: Timestamp) -> Vec<DisappearanceSignal> {
        let threshold = self.threshold;
        let mut signals = Vec::new();
        self.tracks.retain(|id, track| {
            let elapsed = now.duration_since(track.last_seen);
            if track.near_edge && elapsed > threshold {
                signals.push(DisappearanceSignal {
                    tracking_id: *id,
                    last_seen_near_edge: track.last_seen,
                    elapsed,
                    confidence: track.confidence,
                });
                return false;
            }
            elapsed <= TRACK_EXPIRY
        });
        signals.sort_by_key(|s| s.tracking_id);
        signals
    }

    /// Whether an externally supplied signal qualifies as a disappearance.
    pub fn qualifies(&self, signal: &DisappearanceSignal) -> bool {
        signal.elapsed > self.threshold && signal.confidence >= self.min_confidence
    }

    /// Turn a disappearance into an MOB event at `position`.
    ///
    /// Returns `None` when the signal does not qualify.
    pub fn on_disappearance(
        &mut self,
        signal: &DisappearanceSignal,
        position: Position,
    ) -> Option<Detection> {
        if !self.qualifies(signal) {
            debug!(
                tracking_id = %signal.tracking_id,
                elapsed_ms = signal.elapsed.as_millis(),
                "disappearance below threshold"
            );
            return None;
        }
        self.tracks.remove(&signal.tracking_id);
        let event = MobEvent {
            tracking_id: Some(signal.tracking_id),
            detected_at: signal
                .last_seen_near_edge
                .checked_add(signal.elapsed)
                .unwrap_or(signal.last_seen_near_edge),
            last_known_position: position,
            confidence: signal.confidence,
            source: MobSource::Tracker,
        };
        Some(self.apply(event, None))
    }

    /// A person-overboard button press.
    pub fn manual(
        &self,
        position: Position,
        operator: &str,
        person_id: Option<&str>,
        at: Timestamp,
    ) -> Detection {
        let event = MobEvent {
            tracking_id: None,
            detected_at: at,
            last_known_position: position,
            confidence: 1.0,
            source: MobSource::Manual {
                operator: operator.to_string(),
            },
        };
        self.apply(event, person_id)
    }

    fn apply(&self, event: MobEvent, person_id: Option<&str>) -> Detection {
        let mark = manifest::lock(&self.manifest).mark_overboard(
            person_id,
            event.tracking_id,
            event.detected_at,
        );

        let fault = match (&mark.person, event.tracking_id) {
            (None, Some(tracking_id)) => {
                warn!(%tracking_id, "overboard tracking id is not on the manifest");
                Some(Fault::ManifestInconsistency { tracking_id })
            }
            (None, None) => {
                if let Some(id) = person_id {
                    warn!(person = id, "overboard person is not on the manifest");
                }
                None
            }
            _ => None,
        };

        let assessment = MobAssessment {
            event,
            person: mark.person,
            onboard_before: mark.onboard_before,
            onboard_after: mark.onboard_after,
            unmanned: mark.onboard_after == 0,
        };
        error!(
            person = %assessment.person_label(),
            position = %assessment.event.last_known_position,
            onboard = assessment.onboard_after,
            unmanned = assessment.unmanned,
            "person overboard"
        );
        Detection { assessment, fault }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::manifest::CrewManifest;
    use crate::model::{Person, PersonStatus, Role};

    fn t0() -> Timestamp {
        "2026-07-01T10:00:00Z".parse().unwrap()
    }

    fn millis(ms: i64) -> Timestamp {
        t0() + SignedDuration::from_millis(ms)
    }

    fn position() -> Position {
        Position::new(40.85, 29.12)
    }

    fn detector(persons: Vec<Person>) -> MobDetector {
        let manifest = CrewManifest::with_persons("Poyraz", persons)
            .unwrap()
            .into_shared();
        MobDetector::new(manifest, &EmergencySettings::default())
    }

    fn solo() -> MobDetector {
        detector(vec![
            Person::aboard("deniz", "Deniz", Role::Captain).with_tracking(TrackingId(1)),
        ])
    }

    fn sighting(id: u64, near_edge: bool, confidence: f64, at: Timestamp) -> TrackingEvent {
        TrackingEvent {
            tracking_id: TrackingId(id),
            confidence,
            near_edge,
            timestamp: at,
        }
    }

    #[test]
    fn scan_flags_near_edge_track_once_past_threshold() {
        let mut d = solo();
        assert!(d.observe(&sighting(1, true, 0.9, t0())));

        assert!(d.scan(millis(1_500)).is_empty());
        let signals = d.scan(millis(2_500));
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].elapsed, SignedDuration::from_millis(2_500));

        assert!(d.scan(millis(5_000)).is_empty());
    }

    #[test]
    fn tracks_away_from_edge_are_not_flagged() {
        let mut d = solo();
        d.observe(&sighting(1, false, 0.9, t0()));
        assert!(d.scan(millis(60_000)).is_empty());
    }

    #[test]
    fn tracks_are_dropped_once_reported_or_stale() {
        let mut d = solo();
        d.observe(&sighting(1, true, 0.9, t0()));
        d.observe(&sighting(2, false, 0.9, t0()));
        d.observe(&sighting(3, false, 0.9, millis(590_000)));
        assert_eq!(d.tracks.len(), 3);

        assert_eq!(d.scan(millis(3_000)).len(), 1);
        assert_eq!(d.tracks.len(), 2);

        assert!(d.scan(millis(601_000)).is_empty());
        assert_eq!(d.tracks.keys().copied().collect::<Vec<_>>(), vec![TrackingId(3)]);
    }

    #[test]
    fn low_confidence_sightings_are_ignored() {
        let mut d = solo();
        assert!(!d.observe(&sighting(1, true, 0.5, t0())));
        assert!(d.scan(millis(10_000)).is_empty());
    }

    #[test]
    fn reappearance_resets_the_track() {
        let mut d = solo();
        d.observe(&sighting(1, true, 0.9, t0()));
        assert_eq!(d.scan(millis(3_000)).len(), 1);

        d.observe(&sighting(1, true, 0.9, millis(4_000)));
        assert!(d.scan(millis(5_000)).is_empty());
        assert_eq!(d.scan(millis(6_500)).len(), 1);
    }

    #[test]
    fn single_handed_disappearance_leaves_vessel_unmanned() {
        let mut d = solo();
        let signal = DisappearanceSignal {
            tracking_id: TrackingId(1),
            last_seen_near_edge: t0(),
            elapsed: SignedDuration::from_millis(2_500),
            confidence: 0.9,
        };

        let detection = d.on_disappearance(&signal, position()).unwrap();
        let a = &detection.assessment;
        assert!(a.unmanned);
        assert_eq!(a.onboard_before, 1);
        assert_eq!(a.onboard_after, 0);
        assert_eq!(a.person.as_ref().unwrap().id, "deniz");
        assert_eq!(a.event.detected_at, millis(2_500));
        assert!(detection.fault.is_none());

        let manifest = manifest::lock(d.manifest());
        assert_eq!(manifest.person("deniz").unwrap().status, PersonStatus::Mob);
    }

    #[test]
    fn crewed_disappearance_is_not_unmanned() {
        let mut d = detector(vec![
            Person::aboard("deniz", "Deniz", Role::Captain).with_tracking(TrackingId(1)),
            Person::aboard("ece", "Ece", Role::Crew).with_tracking(TrackingId(2)),
        ]);
        let signal = DisappearanceSignal {
            tracking_id: TrackingId(2),
            last_seen_near_edge: t0(),
            elapsed: SignedDuration::from_secs(3),
            confidence: 0.8,
        };
        let a = d.on_disappearance(&signal, position()).unwrap().assessment;
        assert!(!a.unmanned);
        assert_eq!(a.onboard_before, 2);
        assert_eq!(a.onboard_after, 1);
    }

    #[test]
    fn short_or_weak_signals_do_not_qualify() {
        let mut d = solo();
        let mut signal = DisappearanceSignal {
            tracking_id: TrackingId(1),
            last_seen_near_edge: t0(),
            elapsed: SignedDuration::from_millis(1_900),
            confidence: 0.9,
        };
        assert!(d.on_disappearance(&signal, position()).is_none());

        signal.elapsed = SignedDuration::from_secs(3);
        signal.confidence = 0.6;
        assert!(d.on_disappearance(&signal, position()).is_none());
    }

    #[test]
    fn unknown_tracking_id_is_an_unidentified_mob() {
        let mut d = detector(vec![Person {
            status: PersonStatus::Ashore,
            ..Person::aboard("deniz", "Deniz", Role::Captain)
        }]);
        let signal = DisappearanceSignal {
            tracking_id: TrackingId(42),
            last_seen_near_edge: t0(),
            elapsed: SignedDuration::from_secs(3),
            confidence: 0.9,
        };

        let detection = d.on_disappearance(&signal, position()).unwrap();
        assert_eq!(
            detection.fault,
            Some(Fault::ManifestInconsistency {
                tracking_id: TrackingId(42)
            })
        );
        assert!(detection.assessment.person.is_none());
        assert!(detection.assessment.unmanned);
        assert_eq!(detection.assessment.person_label(), "unidentified person");
    }

    #[test]
    fn manual_trigger_names_the_person() {
        let d = detector(vec![
            Person::aboard("deniz", "Deniz", Role::Captain),
            Person::aboard("ece", "Ece", Role::Crew),
        ]);
        let detection = d.manual(position(), "deniz", Some("ece"), t0());

        assert_eq!(detection.assessment.person.unwrap().id, "ece");
        assert!(!detection.assessment.unmanned);
        assert!(matches!(
            detection.assessment.event.source,
            MobSource::Manual { .. }
        ));
    }
}

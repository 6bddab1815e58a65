//! Audit trail.
//!
//! Every decision that matters after the fact (plan verdicts, overrides,
//! each step of an emergency) is recorded as an [`AuditEvent`]. Entries are
//! hash-chained: each carries the previous entry's hash, so a truncated or
//! edited logbook is detectable with [`verify_chain`].

use std::sync::{Mutex, PoisonError};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::model::{EmergencyState, Fault, MobSource, Position, SafetyClass, TrackingId, VoyagePlan};

/// `prev_hash` of the first entry.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum AuditEvent {
    #[serde(rename_all = "camelCase")]
    PlanAssessed {
        plan_id: Uuid,
        class: SafetyClass,
        reason: String,
        alternatives_accepted: usize,
    },

    #[serde(rename_all = "camelCase")]
    CaptainOverride {
        override_id: Uuid,
        plan_id: Uuid,
        operator: String,
        reason: String,
        force_majeure: bool,
        discouraged: bool,
    },

    #[serde(rename_all = "camelCase")]
    MobDetected {
        tracking_id: Option<TrackingId>,
        source: MobSource,
        position: Position,
        confidence: f64,
    },

    #[serde(rename_all = "camelCase")]
    UnmannedAssessment {
        person: String,
        onboard_before: usize,
        onboard_after: usize,
        unmanned: bool,
    },

    #[serde(rename_all = "camelCase")]
    SessionOpened { session_id: Uuid },

    #[serde(rename_all = "camelCase")]
    StateTransition {
        session_id: Uuid,
        from: EmergencyState,
        to: EmergencyState,
    },

    #[serde(rename_all = "camelCase")]
    DuplicateSession {
        session_id: Uuid,
        tracking_id: Option<TrackingId>,
    },

    #[serde(rename_all = "camelCase")]
    Fault {
        session_id: Option<Uuid>,
        fault: Fault,
        critical: bool,
    },

    #[serde(rename_all = "camelCase")]
    MaydayTransmitted { session_id: Uuid, attempts: u32 },

    #[serde(rename_all = "camelCase")]
    MaydayUndelivered {
        session_id: Uuid,
        attempts: u32,
        error: String,
    },

    #[serde(rename_all = "camelCase")]
    StatusUpdateSent { session_id: Uuid, update: u32 },

    #[serde(rename_all = "camelCase")]
    AdvisoryIssued {
        person: String,
        position: Position,
        onboard: usize,
    },

    #[serde(rename_all = "camelCase")]
    AllClear {
        session_id: Uuid,
        recovered_by: String,
        notes: String,
    },

    #[serde(rename_all = "camelCase")]
    Cancelled { session_id: Uuid, reason: String },

    #[serde(rename_all = "camelCase")]
    Reassessment {
        plan_id: Uuid,
        class: SafetyClass,
        worsened: bool,
    },
}

impl AuditEvent {
    pub fn plan_assessed(plan: &VoyagePlan) -> Self {
        Self::PlanAssessed {
            plan_id: plan.id,
            class: plan.verdict.class,
            reason: plan.verdict.reason.clone(),
            alternatives_accepted: plan.alternatives.as_ref().map_or(0, Vec::len),
        }
    }

    /// Short name for listings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlanAssessed { .. } => "plan-assessed",
            Self::CaptainOverride { .. } => "captain-override",
            Self::MobDetected { .. } => "mob-detected",
            Self::UnmannedAssessment { .. } => "unmanned-assessment",
            Self::SessionOpened { .. } => "session-opened",
            Self::StateTransition { .. } => "state-transition",
            Self::DuplicateSession { .. } => "duplicate-session",
            Self::Fault { .. } => "fault",
            Self::MaydayTransmitted { .. } => "mayday-transmitted",
            Self::MaydayUndelivered { .. } => "mayday-undelivered",
            Self::StatusUpdateSent { .. } => "status-update-sent",
            Self::AdvisoryIssued { .. } => "advisory-issued",
            Self::AllClear { .. } => "all-clear",
            Self::Cancelled { .. } => "cancelled",
            Self::Reassessment { .. } => "reassessment",
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::MaydayUndelivered { .. } | Self::Fault { critical: true, .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub seq: u64,
    pub at: Timestamp,
    pub prev_hash: String,
    pub hash: String,
    pub event: AuditEvent,
}

/// The hashed part of an entry, in a fixed field order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Unsealed<'a> {
    seq: u64,
    at: Timestamp,
    prev_hash: &'a str,
    event: &'a AuditEvent,
}

fn digest(seq: u64, at: Timestamp, prev_hash: &str, event: &AuditEvent) -> String {
    let body = Unsealed {
        seq,
        at,
        prev_hash,
        event,
    };
    // Serialising plain data into a Vec cannot fail.
    let bytes = serde_json::to_vec(&body).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

/// Running head of a hash chain.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditChain {
    next_seq: u64,
    last_hash: String,
}

impl AuditChain {
    pub fn new() -> Self {
        Self {
            next_seq: 1,
            last_hash: GENESIS_HASH.to_string(),
        }
    }

    /// Continue the chain after `last`.
    pub fn resume(last: Option<&AuditEntry>) -> Self {
        match last {
            Some(entry) => Self {
                next_seq: entry.seq + 1,
                last_hash: entry.hash.clone(),
            },
            None => Self::new(),
        }
    }

    pub fn seal(&mut self, event: AuditEvent, at: Timestamp) -> AuditEntry {
        let hash = digest(self.next_seq, at, &self.last_hash, &event);
        let entry = AuditEntry {
            seq: self.next_seq,
            at,
            prev_hash: std::mem::replace(&mut self.last_hash, hash.clone()),
            hash,
            event,
        };
        self.next_seq += 1;
        entry
    }
}

impl Default for AuditChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Recompute the chain. Returns the sequence number of the first entry that
/// does not fit, or `None` when the chain is intact.
pub fn verify_chain(entries: &[AuditEntry]) -> Option<u64> {
    let mut expected_seq = 1;
    let mut prev_hash = GENESIS_HASH;
    for entry in entries {
        let recomputed = digest(entry.seq, entry.at, &entry.prev_hash, &entry.event);
        if entry.seq != expected_seq || entry.prev_hash != prev_hash || entry.hash != recomputed {
            return Some(entry.seq);
        }
        expected_seq += 1;
        prev_hash = &entry.hash;
    }
    None
}

/// Where audit events go.
///
/// Recording never fails from the caller's point of view: the emergency path
/// must not stop because a disk is full. A sink that cannot persist an event
/// logs the loss at error level.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// An in-memory logbook, used by drills and tests.
#[derive(Debug, Default)]
pub struct MemoryLogbook {
    inner: Mutex<(AuditChain, Vec<AuditEntry>)>,
}

impl MemoryLogbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .1
            .clone()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.entries().into_iter().map(|e| e.event).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.name() == name).count()
    }
}

impl AuditSink for MemoryLogbook {
    fn record(&self, event: AuditEvent) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = inner.0.seal(event, Timestamp::now());
        inner.1.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened() -> AuditEvent {
        AuditEvent::SessionOpened {
            session_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn entries_chain_by_hash() {
        let log = MemoryLogbook::new();
        log.record(opened());
        log.record(opened());
        log.record(opened());

        let entries = log.entries();
        assert_eq!(entries[0].prev_hash, GENESIS_HASH);
        assert_eq!(entries[1].prev_hash, entries[0].hash);
        assert_eq!(entries[2].seq, 3);
        assert_eq!(entries[0].hash.len(), 64);
        assert_eq!(verify_chain(&entries), None);
    }

    #[test]
    fn tampering_is_detected_at_the_edited_entry() {
        let log = MemoryLogbook::new();
        for _ in 0..4 {
            log.record(opened());
        }
        let mut entries = log.entries();
        entries[2].event = AuditEvent::Cancelled {
            session_id: Uuid::nil(),
            reason: "edited".into(),
        };
        assert_eq!(verify_chain(&entries), Some(3));
    }

    #[test]
    fn removed_entry_breaks_the_chain() {
        let log = MemoryLogbook::new();
        for _ in 0..3 {
            log.record(opened());
        }
        let mut entries = log.entries();
        entries.remove(1);
        assert_eq!(verify_chain(&entries), Some(3));
    }

    #[test]
    fn resume_continues_after_last_entry() {
        let mut chain = AuditChain::new();
        let first = chain.seal(opened(), Timestamp::UNIX_EPOCH);

        let mut resumed = AuditChain::resume(Some(&first));
        let second = resumed.seal(opened(), Timestamp::UNIX_EPOCH);

        assert_eq!(second.seq, 2);
        assert_eq!(verify_chain(&[first, second]), None);
    }

    #[test]
    fn undelivered_mayday_is_critical() {
        let event = AuditEvent::MaydayUndelivered {
            session_id: Uuid::nil(),
            attempts: 3,
            error: "no carrier".into(),
        };
        assert!(event.is_critical());
        assert!(!opened().is_critical());
    }
}

//! Crew manifest: who is aboard, and how the tracker knows them.
//!
//! The manifest is shared between the station and the MOB detector behind a
//! single mutex. Every status change goes through that lock, which is what
//! keeps an embark or disembark from interleaving with the count taken when
//! someone goes overboard.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::{fs, io};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::{Person, PersonStatus, TrackingId};

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("person not on manifest: {0}")]
    UnknownPerson(String),

    #[error("person already on manifest: {0}")]
    DuplicatePerson(String),

    #[error("{0} is not aboard")]
    NotAboard(String),

    #[error("tracking id {tracking_id} already belongs to {person}")]
    TrackingIdInUse {
        tracking_id: TrackingId,
        person: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, ManifestError>;

/// The manifest as shared between the station and the detector.
pub type SharedManifest = Arc<Mutex<CrewManifest>>;

/// Lock the shared manifest.
///
/// A poisoned lock is recovered: the manifest is plain data and an emergency
/// must not stop because another thread panicked while holding it.
pub fn lock(manifest: &SharedManifest) -> MutexGuard<'_, CrewManifest> {
    manifest.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counts taken around an overboard mark, under one lock.
#[derive(Debug, Clone, PartialEq)]
pub struct OverboardMark {
    pub person: Option<Person>,
    pub onboard_before: usize,
    pub onboard_after: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewManifest {
    vessel: String,
    persons: Vec<Person>,
}

impl CrewManifest {
    pub fn new(vessel: impl Into<String>) -> Self {
        Self {
            vessel: vessel.into(),
            persons: Vec::new(),
        }
    }

    /// Build a manifest, rejecting duplicate person or tracking ids.
    pub fn with_persons(vessel: impl Into<String>, persons: Vec<Person>) -> Result<Self> {
        let mut manifest = Self::new(vessel);
        for person in persons {
            manifest.insert(person)?;
        }
        info!(
            vessel = %manifest.vessel,
            onboard = manifest.onboard_count(),
            "manifest created"
        );
        manifest.warn_if_single_handed();
        Ok(manifest)
    }

    /// Load a manifest from JSON: `{"vessel": ..., "persons": [...]}`.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let raw: Self = serde_json::from_str(&json)?;
        Self::with_persons(raw.vessel, raw.persons)
    }

    pub fn into_shared(self) -> SharedManifest {
        Arc::new(Mutex::new(self))
    }

    pub fn vessel(&self) -> &str {
        &self.vessel
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    pub fn person(&self, id: &str) -> Option<&Person> {
        self.persons.iter().find(|p| p.id == id)
    }

    pub fn onboard_count(&self) -> usize {
        self.persons.iter().filter(|p| p.is_onboard()).count()
    }

    pub fn is_single_handed(&self) -> bool {
        self.onboard_count() == 1
    }

    pub fn lookup_by_tracking_id(&self, tracking_id: TrackingId) -> Option<&Person> {
        self.persons
            .iter()
            .find(|p| p.tracking_id == Some(tracking_id))
    }

    /// Add a person who has come aboard.
    pub fn embark(&mut self, mut person: Person) -> Result<()> {
        person.status = PersonStatus::Onboard;
        person.last_seen = Some(Timestamp::now());
        let name = person.name.clone();
        self.insert(person)?;
        info!(person = %name, onboard = self.onboard_count(), "embarked");
        self.warn_if_single_handed();
        Ok(())
    }

    /// Mark a person as gone ashore.
    pub fn disembark(&mut self, id: &str) -> Result<()> {
        let person = self.find_mut(id)?;
        if person.status != PersonStatus::Onboard {
            return Err(ManifestError::NotAboard(person.name.clone()));
        }
        person.status = PersonStatus::Ashore;
        let name = person.name.clone();
        info!(person = %name, onboard = self.onboard_count(), "went ashore");
        self.warn_if_single_handed();
        Ok(())
    }

    /// Mark a person as back aboard, from ashore or from the water.
    pub fn return_aboard(&mut self, id: &str) -> Result<()> {
        let person = self.find_mut(id)?;
        person.status = PersonStatus::Onboard;
        person.last_seen = Some(Timestamp::now());
        let name = person.name.clone();
        info!(person = %name, onboard = self.onboard_count(), "returned aboard");
        Ok(())
    }

    /// Associate a person with a tracker id.
    pub fn link_tracking(&mut self, id: &str, tracking_id: TrackingId) -> Result<()> {
        if let Some(other) = self
            .persons
            .iter()
            .find(|p| p.tracking_id == Some(tracking_id) && p.id != id)
        {
            return Err(ManifestError::TrackingIdInUse {
                tracking_id,
                person: other.name.clone(),
            });
        }
        let person = self.find_mut(id)?;
        person.tracking_id = Some(tracking_id);
        info!(person = %person.name, %tracking_id, "tracking linked");
        Ok(())
    }

    /// Mark the person overboard and count who is left, in one step.
    ///
    /// The person is looked up by `person_id` first, then by `tracking_id`.
    /// An unidentified person is not on the manifest, so nothing is mutated
    /// and they are counted as one extra soul that was aboard.
    pub fn mark_overboard(
        &mut self,
        person_id: Option<&str>,
        tracking_id: Option<TrackingId>,
        at: Timestamp,
    ) -> OverboardMark {
        let index = person_id
            .and_then(|id| self.persons.iter().position(|p| p.id == id))
            .or_else(|| {
                tracking_id.and_then(|t| self.persons.iter().position(|p| p.tracking_id == Some(t)))
            });

        let person = index.map(|i| {
            let p = &mut self.persons[i];
            p.status = PersonStatus::Mob;
            p.last_seen = Some(at);
            p.clone()
        });

        let onboard_after = self.onboard_count();
        OverboardMark {
            person,
            onboard_before: onboard_after + 1,
            onboard_after,
        }
    }

    /// Human-readable manifest listing.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Crew manifest: {}\nOnboard: {}\n",
            self.vessel,
            self.onboard_count()
        );
        for p in &self.persons {
            out.push_str(&format!(
                "  [{}] {} ({})",
                p.status.as_str(),
                p.name,
                p.role.as_str()
            ));
            if let Some(t) = p.tracking_id {
                out.push_str(&format!(" tracked as {t}"));
            }
            out.push('\n');
        }
        if self.is_single_handed() {
            out.push_str("SINGLE-HANDED: enhanced MOB monitoring active\n");
        }
        out
    }

    fn insert(&mut self, person: Person) -> Result<()> {
        if self.person(&person.id).is_some() {
            return Err(ManifestError::DuplicatePerson(person.id));
        }
        if let Some(tracking_id) = person.tracking_id
            && let Some(other) = self.lookup_by_tracking_id(tracking_id)
        {
            return Err(ManifestError::TrackingIdInUse {
                tracking_id,
                person: other.name.clone(),
            });
        }
        self.persons.push(person);
        Ok(())
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut Person> {
        self.persons
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ManifestError::UnknownPerson(id.to_string()))
    }

    fn warn_if_single_handed(&self) {
        if self.is_single_handed() {
            warn!(vessel = %self.vessel, "single-handed: one person aboard");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    use tempfile::TempDir;

    use crate::model::Role;

    fn sample_manifest() -> CrewManifest {
        CrewManifest::with_persons(
            "Poyraz",
            vec![
                Person::aboard("deniz", "Deniz", Role::Captain).with_tracking(TrackingId(1)),
                Person::aboard("ece", "Ece", Role::Crew).with_tracking(TrackingId(2)),
                Person::aboard("can", "Can", Role::Child),
            ],
        )
        .unwrap()
    }

    #[test]
    fn counts_only_persons_aboard() {
        let mut m = sample_manifest();
        assert_eq!(m.onboard_count(), 3);

        m.disembark("ece").unwrap();
        m.disembark("can").unwrap();
        assert_eq!(m.onboard_count(), 1);
        assert!(m.is_single_handed());

        m.return_aboard("ece").unwrap();
        assert_eq!(m.onboard_count(), 2);
        assert_eq!(m.person("ece").unwrap().status, PersonStatus::Onboard);
    }

    #[test]
    fn disembark_requires_being_aboard() {
        let mut m = sample_manifest();
        m.disembark("ece").unwrap();
        let err = m.disembark("ece").unwrap_err();
        assert!(matches!(err, ManifestError::NotAboard(_)));
    }

    #[test]
    fn unknown_person_is_an_error() {
        let mut m = sample_manifest();
        assert!(matches!(
            m.return_aboard("nobody").unwrap_err(),
            ManifestError::UnknownPerson(_)
        ));
    }

    #[test]
    fn embark_rejects_duplicates() {
        let mut m = sample_manifest();
        let err = m
            .embark(Person::aboard("deniz", "Deniz", Role::Captain))
            .unwrap_err();
        assert!(matches!(err, ManifestError::DuplicatePerson(_)));

        m.embark(Person::aboard("mert", "Mert", Role::Guest)).unwrap();
        assert_eq!(m.onboard_count(), 4);
    }

    #[test]
    fn tracking_ids_are_unique() {
        let mut m = sample_manifest();
        let err = m.link_tracking("can", TrackingId(1)).unwrap_err();
        assert!(matches!(err, ManifestError::TrackingIdInUse { .. }));

        m.link_tracking("can", TrackingId(3)).unwrap();
        assert_eq!(m.lookup_by_tracking_id(TrackingId(3)).unwrap().id, "can");
    }

    #[test]
    fn overboard_mark_counts_around_the_mutation() {
        let mut m = sample_manifest();
        let mark = m.mark_overboard(None, Some(TrackingId(2)), Timestamp::UNIX_EPOCH);

        assert_eq!(mark.person.unwrap().id, "ece");
        assert_eq!(mark.onboard_before, 3);
        assert_eq!(mark.onboard_after, 2);
        assert_eq!(m.person("ece").unwrap().status, PersonStatus::Mob);
    }

    #[test]
    fn unidentified_overboard_leaves_manifest_untouched() {
        let mut m = sample_manifest();
        let mark = m.mark_overboard(None, Some(TrackingId(99)), Timestamp::UNIX_EPOCH);

        assert!(mark.person.is_none());
        assert_eq!(mark.onboard_after, 3);
        assert_eq!(mark.onboard_before, 4);
    }

    #[test]
    fn concurrent_disembark_and_overboard_never_misclassify() {
        // Two aboard. One goes ashore while the other goes overboard: whichever
        // order the lock serialises them in, the overboard count sees a
        // consistent manifest.
        for _ in 0..50 {
            let shared = CrewManifest::with_persons(
                "Poyraz",
                vec![
                    Person::aboard("deniz", "Deniz", Role::Captain).with_tracking(TrackingId(1)),
                    Person::aboard("ece", "Ece", Role::Crew),
                ],
            )
            .unwrap()
            .into_shared();

            let mark = thread::scope(|s| {
                let ashore = s.spawn(|| lock(&shared).disembark("ece"));
                let overboard = s.spawn(|| {
                    lock(&shared).mark_overboard(None, Some(TrackingId(1)), Timestamp::now())
                });
                ashore.join().unwrap().unwrap();
                overboard.join().unwrap()
            });

            assert_eq!(mark.onboard_before, mark.onboard_after + 1);
            assert!(mark.onboard_after <= 1);
            assert_eq!(lock(&shared).onboard_count(), 0);
        }
    }

    #[test]
    fn summary_flags_single_handed() {
        let mut m = sample_manifest();
        m.disembark("ece").unwrap();
        m.disembark("can").unwrap();
        let summary = m.summary();
        assert!(summary.contains("Onboard: 1"));
        assert!(summary.contains("[onboard] Deniz (captain) tracked as #1"));
        assert!(summary.contains("SINGLE-HANDED"));
    }

    #[test]
    fn load_from_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crew.json");
        fs::write(&path, serde_json::to_string(&sample_manifest()).unwrap()).unwrap();

        let loaded = CrewManifest::load(&path).unwrap();
        assert_eq!(loaded, sample_manifest());
    }
}

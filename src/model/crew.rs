//! Crew types: persons aboard and their tracking identity.

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Identifier assigned to a person by the external camera tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingId(pub u64);

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Captain,
    Crew,
    Guest,
    Child,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Captain => "captain",
            Self::Crew => "crew",
            Self::Guest => "guest",
            Self::Child => "child",
        }
    }
}

/// Where a person is, as far as the manifest knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PersonStatus {
    Onboard,
    Ashore,
    Mob,
    Unknown,
}

impl PersonStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Onboard => "onboard",
            Self::Ashore => "ashore",
            Self::Mob => "MOB",
            Self::Unknown => "unknown",
        }
    }
}

/// A person on the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub status: PersonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<TrackingId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<Timestamp>,
}

impl Person {
    /// A person who is aboard and not yet linked to a tracker.
    pub fn aboard(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            status: PersonStatus::Onboard,
            tracking_id: None,
            last_seen: None,
        }
    }

    #[cfg(test)]
    pub fn with_tracking(mut self, tracking_id: TrackingId) -> Self {
        self.tracking_id = Some(tracking_id);
        self
    }

    pub fn is_onboard(&self) -> bool {
        self.status == PersonStatus::Onboard
    }
}

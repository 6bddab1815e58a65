//! Anchorages: static reference data with wind-protection metadata.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Position, WindDirection};

/// How well an anchor sets and stays in the seabed. Ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HoldingQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BottomType {
    Sand,
    Mud,
    SandMud,
    Rock,
    Weed,
}

/// Shore-side or mooring facilities available at an anchorage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Facility {
    MooringBuoys,
    Water,
    Restaurant,
    Electricity,
}

/// Charted depth band in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthRange {
    pub min_m: f64,
    pub max_m: f64,
}

/// A candidate overnight anchorage.
///
/// `protected_from` and `exposed_to` together cover all eight compass points
/// without overlap; catalogs are checked with [`Anchorage::check_partition`]
/// when loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchorage {
    pub id: String,
    pub name: String,
    pub position: Position,
    pub depth_range: DepthRange,
    pub bottom_type: BottomType,
    pub holding_quality: HoldingQuality,
    pub protected_from: BTreeSet<WindDirection>,
    pub exposed_to: BTreeSet<WindDirection>,
    #[serde(default)]
    pub facilities: BTreeSet<Facility>,

    /// Visitor rating, 0 to 5.
    pub rating: f64,
    pub max_vessel_length_m: f64,
}

impl Anchorage {
    pub fn is_protected_from(&self, direction: WindDirection) -> bool {
        self.protected_from.contains(&direction)
    }

    pub fn has(&self, facility: Facility) -> bool {
        self.facilities.contains(&facility)
    }

    pub fn accepts_length(&self, length_m: f64) -> bool {
        length_m <= self.max_vessel_length_m
    }

    /// Check that the protection sets partition the compass.
    ///
    /// Returns a description of the first problem found.
    pub fn check_partition(&self) -> Result<(), String> {
        if let Some(dir) = self.protected_from.intersection(&self.exposed_to).next() {
            return Err(format!("{dir} is both protected and exposed"));
        }
        let missing: Vec<&str> = WindDirection::ALL
            .iter()
            .filter(|d| !self.protected_from.contains(d) && !self.exposed_to.contains(d))
            .map(|d| d.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(format!("no protection data for {}", missing.join(", ")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use WindDirection::*;

    fn sample_anchorage() -> Anchorage {
        Anchorage {
            id: "test_bay".into(),
            name: "Test Bay".into(),
            position: Position::new(40.85, 29.12),
            depth_range: DepthRange {
                min_m: 5.0,
                max_m: 12.0,
            },
            bottom_type: BottomType::Sand,
            holding_quality: HoldingQuality::Good,
            protected_from: [N, NE, NW].into(),
            exposed_to: [E, SE, S, SW, W].into(),
            facilities: [Facility::Restaurant].into(),
            rating: 4.0,
            max_vessel_length_m: 20.0,
        }
    }

    #[test]
    fn valid_partition_passes() {
        assert!(sample_anchorage().check_partition().is_ok());
    }

    #[test]
    fn overlap_is_rejected() {
        let mut a = sample_anchorage();
        a.exposed_to.insert(N);
        let err = a.check_partition().unwrap_err();
        assert!(err.contains("N is both"), "{err}");
    }

    #[test]
    fn gap_is_rejected() {
        let mut a = sample_anchorage();
        a.exposed_to.remove(&W);
        a.exposed_to.remove(&E);
        let err = a.check_partition().unwrap_err();
        assert_eq!(err, "no protection data for E, W");
    }

    #[test]
    fn holding_quality_is_ordered() {
        assert!(HoldingQuality::Poor < HoldingQuality::Fair);
        assert!(HoldingQuality::Good < HoldingQuality::Excellent);
    }

    #[test]
    fn length_limit_is_inclusive() {
        let a = sample_anchorage();
        assert!(a.accepts_length(20.0));
        assert!(!a.accepts_length(20.5));
    }
}

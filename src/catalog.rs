//! Anchorage catalog: read-only reference data, loaded once per planning run.

use std::collections::HashSet;
use std::path::Path;
use std::{fs, io};

use crate::model::{
    Anchorage, BottomType, DepthRange, Facility, HoldingQuality, Position, WindDirection,
};

const FEET_TO_METRES: f64 = 0.3048;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("anchorage {id}: {reason}")]
    InvalidAnchorage { id: String, reason: String },

    #[error("duplicate anchorage id: {0}")]
    DuplicateId(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A validated set of anchorages.
#[derive(Debug, Clone, Default)]
pub struct AnchorageCatalog {
    anchorages: Vec<Anchorage>,
}

impl AnchorageCatalog {
    /// Build a catalog, checking ids are unique and every protection set
    /// partitions the compass.
    pub fn new(anchorages: Vec<Anchorage>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for a in &anchorages {
            if !seen.insert(a.id.as_str()) {
                return Err(CatalogError::DuplicateId(a.id.clone()));
            }
            a.check_partition()
                .map_err(|reason| CatalogError::InvalidAnchorage {
                    id: a.id.clone(),
                    reason,
                })?;
            if !(0.0..=5.0).contains(&a.rating) {
                return Err(CatalogError::InvalidAnchorage {
                    id: a.id.clone(),
                    reason: format!("rating {} is outside 0-5", a.rating),
                });
            }
        }
        Ok(Self { anchorages })
    }

    /// Load a JSON array of anchorages.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path)?;
        Self::new(serde_json::from_str(&json)?)
    }

    pub fn anchorages(&self) -> &[Anchorage] {
        &self.anchorages
    }

    /// Anchorages that accept a vessel of the given length.
    pub fn for_length(&self, length_m: f64) -> Vec<Anchorage> {
        self.anchorages
            .iter()
            .filter(|a| a.accepts_length(length_m))
            .cloned()
            .collect()
    }

    /// The Princes' Islands anchorages in the Sea of Marmara.
    pub fn princes_islands() -> Self {
        use WindDirection::*;

        let entry = |id: &str,
                     name: &str,
                     (lat, lon): (f64, f64),
                     (min_m, max_m): (f64, f64),
                     bottom_type: BottomType,
                     holding_quality: HoldingQuality,
                     protected: &[WindDirection],
                     facilities: &[Facility],
                     max_length_ft: f64,
                     rating: f64| {
            let protected_from = protected.iter().copied().collect();
            let exposed_to = WindDirection::ALL
                .into_iter()
                .filter(|d| !protected.contains(d))
                .collect();
            Anchorage {
                id: id.into(),
                name: name.into(),
                position: Position::new(lat, lon),
                depth_range: DepthRange { min_m, max_m },
                bottom_type,
                holding_quality,
                protected_from,
                exposed_to,
                facilities: facilities.iter().copied().collect(),
                rating,
                max_vessel_length_m: (max_length_ft * FEET_TO_METRES * 10.0).round() / 10.0,
            }
        };

        Self {
            anchorages: vec![
                entry(
                    "buyukada_yorukali",
                    "Yörükali Bay",
                    (40.8515, 29.1202),
                    (5.0, 12.0),
                    BottomType::SandMud,
                    HoldingQuality::Excellent,
                    &[N, NE, NW],
                    &[Facility::Restaurant],
                    80.0,
                    4.3,
                ),
                entry(
                    "buyukada_dilburnu",
                    "Dilburnu",
                    (40.8485, 29.1145),
                    (6.0, 15.0),
                    BottomType::Sand,
                    HoldingQuality::Good,
                    &[E, NE, SE],
                    &[],
                    70.0,
                    4.0,
                ),
                entry(
                    "heybeliada_degirmenburnu",
                    "Değirmenburnu Bay",
                    (40.8702, 29.0947),
                    (4.0, 10.0),
                    BottomType::Sand,
                    HoldingQuality::Excellent,
                    &[W, SW, NW],
                    &[Facility::Restaurant],
                    65.0,
                    4.7,
                ),
                entry(
                    "heybeliada_cam_limani",
                    "Çam Limanı",
                    (40.8725, 29.0890),
                    (5.0, 12.0),
                    BottomType::Sand,
                    HoldingQuality::Good,
                    &[N, NE, E],
                    &[],
                    60.0,
                    4.2,
                ),
                entry(
                    "burgazada_madam_koyu",
                    "Madam Bay",
                    (40.8795, 29.0695),
                    (3.0, 8.0),
                    BottomType::Sand,
                    HoldingQuality::Good,
                    &[N, NE, NW],
                    &[Facility::Restaurant],
                    55.0,
                    4.5,
                ),
                entry(
                    "burgazada_kalpazankaya",
                    "Kalpazankaya Bay",
                    (40.8810, 29.0640),
                    (4.0, 10.0),
                    BottomType::SandMud,
                    HoldingQuality::Excellent,
                    &[E, SE, NE],
                    &[],
                    50.0,
                    4.1,
                ),
            ],
        }
    }
}

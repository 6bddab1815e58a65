//! Overnight anchorage selection.
//!
//! Candidates must be sheltered from the night's wind. When none is, the
//! least exposed candidate is returned with a warning so planning can go on.

use std::cmp::Ordering;

use crate::config::AnchorageWeights;
use crate::model::{Anchorage, Facility, WeatherSample};

/// The chosen anchorage for one night.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub anchorage: Anchorage,
    pub score: f64,

    /// True when no candidate was sheltered and the least exposed one was used.
    pub fallback: bool,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct AnchorageSelector {
    weights: AnchorageWeights,
}

impl AnchorageSelector {
    pub fn new(weights: AnchorageWeights) -> Self {
        Self { weights }
    }

    /// Pick tonight's anchorage from candidates already filtered by vessel length.
    ///
    /// Returns `None` only when `candidates` is empty.
    pub fn select(&self, candidates: &[Anchorage], tonight: &WeatherSample) -> Option<Selection> {
        if candidates.is_empty() {
            return None;
        }

        let sheltered: Vec<&Anchorage> = match tonight.wind_direction {
            Some(dir) => candidates.iter().filter(|a| a.is_protected_from(dir)).collect(),
            None => Vec::new(),
        };

        if !sheltered.is_empty() {
            let best = sheltered
                .into_iter()
                .map(|a| (a, self.score(a, tonight)))
                .max_by(|(a, sa), (b, sb)| {
                    sa.total_cmp(sb).then_with(|| prefer_rating_then_id(a, b))
                })?;
            return Some(Selection {
                anchorage: best.0.clone(),
                score: best.1,
                fallback: false,
                warning: None,
            });
        }

        let fallback = candidates.iter().max_by(|a, b| {
            b.exposed_to
                .len()
                .cmp(&a.exposed_to.len())
                .then_with(|| prefer_rating_then_id(a, b))
        })?;

        let wind = match tonight.wind_direction {
            Some(dir) => format!("{dir} wind"),
            None => "wind from an unknown direction".to_string(),
        };
        let warning = format!(
            "no anchorage sheltered from {wind}; using {} (exposed to {} directions)",
            fallback.name,
            fallback.exposed_to.len()
        );
        tracing::warn!(anchorage = %fallback.id, "{warning}");

        Some(Selection {
            anchorage: fallback.clone(),
            score: self.score(fallback, tonight),
            fallback: true,
            warning: Some(warning),
        })
    }

    /// Heuristic suitability score. Higher is better.
    pub fn score(&self, anchorage: &Anchorage, tonight: &WeatherSample) -> f64 {
        let w = &self.weights;
        let mut score = 0.0;

        if tonight
            .wind_direction
            .is_some_and(|dir| anchorage.is_protected_from(dir))
        {
            score += w.shelter;
        }
        score += w.holding(anchorage.holding_quality);
        score += anchorage.rating * w.rating_multiplier;
        if anchorage.has(Facility::Water) {
            score += w.water;
        }
        if anchorage.has(Facility::Restaurant) {
            score += w.restaurant;
        }
        let depth = anchorage.depth_range.min_m;
        if depth >= w.comfortable_depth_min_m && depth <= w.comfortable_depth_max_m {
            score += w.comfortable_depth;
        }
        score
    }
}

impl Default for AnchorageSelector {
    fn default() -> Self {
        Self::new(AnchorageWeights::default())
    }
}

/// `Greater` when `a` is preferred: higher rating, then lower id.
fn prefer_rating_then_id(a: &Anchorage, b: &Anchorage) -> Ordering {
    a.rating.total_cmp(&b.rating).then_with(|| b.id.cmp(&a.id))
}

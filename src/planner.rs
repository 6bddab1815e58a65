//! Multi-day voyage planning.
//!
//! A plan runs departure → one anchorage per night → destination. The leg
//! sailed on planning day *d* uses day *d*'s worst-case forecast. Overall
//! safety comes from the whole horizon, independent of leg comfort; an
//! unsafe plan gets up to three alternatives, each planned once with no
//! further search.

use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::AnchorageCatalog;
use crate::config::SafetyThresholds;
use crate::forecast::{self, ForecastSource, MAX_HORIZON_DAYS};
use crate::model::{
    AlternativeKind, Anchorage, AttemptedAlternative, Facility, Fault, PlanRequest, PlanTotals,
    Propulsion, RouteSegment, SafetyClass, VoyagePlan, Waypoint, WeatherSample,
};
use crate::safety::SafetyAssessor;
use crate::selector::AnchorageSelector;

/// Average passage speed under engine.
pub const MOTOR_SPEED_KN: f64 = 8.0;

/// Visibility below which a passage is uncomfortable.
pub const POOR_VISIBILITY_NM: f64 = 2.0;

/// Segments at or above this comfort score are recommended.
pub const RECOMMENDED_COMFORT: f64 = 6.0;

/// Comfort assumed for a leg without any forecast.
const UNKNOWN_WEATHER_COMFORT: f64 = 7.0;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("{nights} nights need more forecast days than the {max} available", max = MAX_HORIZON_DAYS)]
    HorizonTooLong { nights: u32 },

    #[error("vessel length must be positive, got {0} m")]
    InvalidLength(f64),
}

/// Plans voyages for one vessel against a fixed catalog and forecast source.
pub struct RoutePlanner {
    assessor: SafetyAssessor,
    selector: AnchorageSelector,
    catalog: AnchorageCatalog,
    forecast: Arc<dyn ForecastSource>,
}

impl RoutePlanner {
    pub fn new(
        assessor: SafetyAssessor,
        selector: AnchorageSelector,
        catalog: AnchorageCatalog,
        forecast: Arc<dyn ForecastSource>,
    ) -> Self {
        Self {
            assessor,
            selector,
            catalog,
            forecast,
        }
    }

    pub fn assessor(&self) -> &SafetyAssessor {
        &self.assessor
    }

    pub fn forecast(&self) -> &dyn ForecastSource {
        self.forecast.as_ref()
    }

    /// Plan a voyage, seeking alternatives when the verdict blocks departure.
    pub fn plan(&self, request: &PlanRequest) -> Result<VoyagePlan, PlanError> {
        if request.nights >= MAX_HORIZON_DAYS {
            return Err(PlanError::HorizonTooLong {
                nights: request.nights,
            });
        }
        if request.vessel.length_m <= 0.0 || !request.vessel.length_m.is_finite() {
            return Err(PlanError::InvalidLength(request.vessel.length_m));
        }

        let mut plan = self.build(request, None);
        info!(
            plan_id = %plan.id,
            vessel = %request.vessel.name,
            nights = request.nights,
            verdict = %plan.verdict.class,
            "voyage planned"
        );

        if plan.override_required {
            warn!(plan_id = %plan.id, reason = %plan.verdict.reason, "voyage unsafe, seeking alternatives");
            let mut accepted = Vec::new();
            for (kind, alt_request) in alternative_requests(request) {
                let alt = self.build(&alt_request, Some(kind));
                let ok = alt.verdict.class.permits_departure();
                info!(kind = %kind, verdict = %alt.verdict.class, accepted = ok, "alternative planned");
                plan.attempted_alternatives.push(AttemptedAlternative {
                    kind,
                    verdict: alt.verdict.class,
                    accepted: ok,
                });
                if ok {
                    accepted.push(alt);
                }
            }
            plan.alternatives = Some(accepted);
        }

        Ok(plan)
    }

    /// One planning pass with no alternative search.
    fn build(&self, request: &PlanRequest, kind: Option<AlternativeKind>) -> VoyagePlan {
        let days = request.nights.saturating_add(1);
        let daily = forecast::fetch_daily(self.forecast.as_ref(), request.depart_at, days);
        let mut faults = daily.faults;
        let mut warnings = Vec::new();

        let candidates = self.catalog.for_length(request.vessel.length_m);
        let mut segments = Vec::new();
        let mut anchorages: Vec<Anchorage> = Vec::new();
        let mut current = request.departure.clone();

        for night in 0..request.nights as usize {
            let tonight = daily.days.get(night);
            let selection = tonight.and_then(|w| self.selector.select(&candidates, w));
            let Some(selection) = selection else {
                let detail = format!(
                    "no anchorage in the catalog takes a {:.1} m vessel",
                    request.vessel.length_m
                );
                warnings.push(format!("Night {}: {detail}", night + 1));
                faults.push(Fault::NoSuitableAnchorage {
                    night: night + 1,
                    detail,
                });
                continue;
            };

            if let Some(w) = &selection.warning {
                warnings.push(format!("Night {}: {w}", night + 1));
                faults.push(Fault::NoSuitableAnchorage {
                    night: night + 1,
                    detail: w.clone(),
                });
            }

            let to = Waypoint {
                name: selection.anchorage.name.clone(),
                position: selection.anchorage.position,
            };
            let segment = self.segment(&current, &to, tonight, request.vessel.propulsion);
            warnings.extend(segment.warnings.iter().cloned());
            segments.push(segment);
            anchorages.push(selection.anchorage);
            current = to;
        }

        let last_leg = self.segment(
            &current,
            request.destination(),
            daily.days.get(request.nights as usize),
            request.vessel.propulsion,
        );
        warnings.extend(last_leg.warnings.iter().cloned());
        segments.push(last_leg);

        let verdict = self.assessor.assess(&daily.days);
        let override_required = !verdict.class.permits_departure();
        let cancellation_reason = match verdict.class {
            SafetyClass::Critical => Some(format!(
                "Critical: {}. Do not sail; an override is strongly discouraged.",
                verdict.reason
            )),
            SafetyClass::Dangerous => Some(format!(
                "Dangerous: {}. Cancellation recommended.",
                verdict.reason
            )),
            SafetyClass::Safe | SafetyClass::Caution => None,
        };

        VoyagePlan {
            id: Uuid::new_v4(),
            created_at: Timestamp::now(),
            request: request.clone(),
            alternative_kind: kind,
            totals: totals(&segments),
            weather_summary: summarize_weather(&daily.days),
            recommendations: recommendations(request.vessel.propulsion, &daily.days, &anchorages),
            segments,
            overnight_anchorages: anchorages,
            verdict,
            cancellation_reason,
            override_required,
            warnings,
            faults,
            alternatives: None,
            attempted_alternatives: Vec::new(),
        }
    }

    fn segment(
        &self,
        from: &Waypoint,
        to: &Waypoint,
        weather: Option<&WeatherSample>,
        propulsion: Propulsion,
    ) -> RouteSegment {
        let distance_nm = from.position.distance_nm(&to.position);
        let speed = passage_speed(propulsion, weather);
        let (comfort_score, warnings) = comfort(self.assessor.thresholds(), weather);

        RouteSegment {
            from: from.clone(),
            to: to.clone(),
            distance_nm,
            bearing_deg: from.position.bearing_to(&to.position),
            estimated_hours: distance_nm / speed,
            weather: weather.cloned(),
            comfort_score,
            warnings,
            recommended: comfort_score >= RECOMMENDED_COMFORT,
        }
    }
}

/// The alternatives to try, in preference order.
fn alternative_requests(request: &PlanRequest) -> Vec<(AlternativeKind, PlanRequest)> {
    let mut out = Vec::new();
    for (kind, hours) in [(AlternativeKind::Delay24h, 24), (AlternativeKind::Delay48h, 48)] {
        if let Ok(depart_at) = request.depart_at.checked_add(SignedDuration::from_hours(hours)) {
            out.push((
                kind,
                PlanRequest {
                    depart_at,
                    ..request.clone()
                },
            ));
        }
    }
    if request.waypoints.len() > 1 && request.nights > 0 {
        let mut shorter = request.clone();
        shorter.waypoints.pop();
        shorter.nights -= 1;
        out.push((AlternativeKind::Shortened, shorter));
    }
    out
}

/// Expected boat speed in knots.
///
/// Sailing speed peaks in 10-15 kn of wind and drops off in light air and
/// once reefed above 20 kn.
pub fn passage_speed(propulsion: Propulsion, weather: Option<&WeatherSample>) -> f64 {
    match (propulsion, weather) {
        (Propulsion::Sail, Some(w)) => {
            let wind = w.wind_speed_kn;
            if wind < 5.0 {
                3.0
            } else if wind < 10.0 {
                4.5
            } else if wind <= 15.0 {
                6.5
            } else if wind <= 20.0 {
                6.0
            } else {
                5.0
            }
        }
        _ => MOTOR_SPEED_KN,
    }
}

/// Passage comfort from 0 to 10, with the reasons for each deduction.
pub fn comfort(t: &SafetyThresholds, weather: Option<&WeatherSample>) -> (f64, Vec<String>) {
    let Some(w) = weather else {
        return (UNKNOWN_WEATHER_COMFORT, Vec::new());
    };

    let mut score: f64 = 10.0;
    let mut warnings = Vec::new();

    if !w.is_complete() {
        warnings.push("Forecast incomplete; worst case assumed".to_string());
    }
    if w.wind_speed_kn > t.dangerous_wind_kn {
        score -= 4.0;
        warnings.push(format!("Strong wind: {:.0} kn", w.wind_speed_kn));
    } else if w.wind_speed_kn > t.moderate_wind_kn {
        score -= 2.0;
        warnings.push(format!("Fresh wind: {:.0} kn", w.wind_speed_kn));
    }
    if w.wave_height_m > t.dangerous_wave_m {
        score -= 4.0;
        warnings.push(format!("High waves: {:.1} m", w.wave_height_m));
    } else if w.wave_height_m > t.moderate_wave_m {
        score -= 2.0;
        warnings.push(format!("Moderate waves: {:.1} m", w.wave_height_m));
    }
    if w.precipitation {
        score -= 1.0;
        warnings.push("Rain expected".to_string());
    }
    if w.visibility_nm < POOR_VISIBILITY_NM {
        score -= 3.0;
        warnings.push(format!("Poor visibility: {:.1} NM", w.visibility_nm));
    }

    (score.max(0.0), warnings)
}

fn totals(segments: &[RouteSegment]) -> PlanTotals {
    let distance_nm = segments.iter().map(|s| s.distance_nm).sum();
    let hours = segments.iter().map(|s| s.estimated_hours).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean_comfort = if segments.is_empty() {
        0.0
    } else {
        segments.iter().map(|s| s.comfort_score).sum::<f64>() / segments.len() as f64
    };
    PlanTotals {
        distance_nm,
        hours,
        mean_comfort,
    }
}

#[allow(clippy::cast_precision_loss)]
fn summarize_weather(days: &[WeatherSample]) -> String {
    if days.is_empty() {
        return "No forecast available".to_string();
    }
    let n = days.len() as f64;
    let mean_wind = days.iter().map(|d| d.wind_speed_kn).sum::<f64>() / n;
    let max_wind = days.iter().map(|d| d.wind_speed_kn).fold(f64::MIN, f64::max);
    let mean_wave = days.iter().map(|d| d.wave_height_m).sum::<f64>() / n;
    let missing = days.iter().filter(|d| !d.is_complete()).count();

    let mut summary = format!(
        "{}-day forecast: mean wind {mean_wind:.0} kn (max {max_wind:.0}), mean waves {mean_wave:.1} m",
        days.len()
    );
    if missing > 0 {
        summary.push_str(&format!(", {missing} day(s) with incomplete data"));
    }
    summary
}

#[allow(clippy::cast_precision_loss)]
fn recommendations(
    propulsion: Propulsion,
    days: &[WeatherSample],
    anchorages: &[Anchorage],
) -> Vec<String> {
    let mut out = Vec::new();

    if !days.is_empty() {
        let mean_wind = days.iter().map(|d| d.wind_speed_kn).sum::<f64>() / days.len() as f64;
        let max_wind = days.iter().map(|d| d.wind_speed_kn).fold(f64::MIN, f64::max);
        if max_wind > 25.0 {
            out.push(format!("{max_wind:.0} kn of wind expected; consider postponing"));
        } else if mean_wind < 10.0 && propulsion == Propulsion::Sail {
            out.push("Light wind; expect to motor".to_string());
        } else if (15.0..=20.0).contains(&mean_wind) && propulsion == Propulsion::Sail {
            out.push("Ideal sailing conditions".to_string());
        }
    }

    let mut seen: Vec<&str> = Vec::new();
    for a in anchorages {
        if seen.contains(&a.id.as_str()) {
            continue;
        }
        seen.push(&a.id);
        if a.rating >= 4.5 {
            out.push(format!("{} is a highly rated anchorage", a.name));
        }
        if a.has(Facility::Restaurant) {
            out.push(format!("{} has a restaurant ashore", a.name));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::forecast::StaticForecast;
    use crate::model::{ForecastRecord, Position, Vessel, WindDirection};

    fn depart() -> Timestamp {
        "2026-07-01T06:00:00Z".parse().unwrap()
    }

    fn record(day: i64, wind: f64, dir: WindDirection, wave: f64) -> ForecastRecord {
        ForecastRecord {
            time: depart() + SignedDuration::from_hours(24 * day + 4),
            wind_speed_kn: Some(wind),
            wind_direction: Some(dir),
            gust_speed_kn: None,
            wave_height_m: Some(wave),
            visibility_nm: Some(10.0),
            precipitation: Some(false),
            sea_state: None,
        }
    }

    fn planner(records: Vec<ForecastRecord>) -> RoutePlanner {
        RoutePlanner::new(
            SafetyAssessor::default(),
            AnchorageSelector::default(),
            AnchorageCatalog::princes_islands(),
            Arc::new(StaticForecast::new(records)),
        )
    }

    fn request(nights: u32) -> PlanRequest {
        PlanRequest {
            vessel: Vessel {
                name: "Poyraz".into(),
                mmsi: None,
                length_m: 12.0,
                propulsion: Propulsion::Sail,
            },
            departure: Waypoint {
                name: "Kalamış Marina".into(),
                position: Position::new(40.9780, 29.0370),
            },
            waypoints: vec![
                Waypoint {
                    name: "Heybeliada".into(),
                    position: Position::new(40.8760, 29.0930),
                },
                Waypoint {
                    name: "Büyükada".into(),
                    position: Position::new(40.8580, 29.1280),
                },
            ],
            nights,
            depart_at: depart(),
        }
    }

    fn fair_week() -> Vec<ForecastRecord> {
        (0..7).map(|d| record(d, 12.0, WindDirection::NE, 0.6)).collect()
    }

    #[test]
    fn fair_forecast_is_safe_with_one_anchorage_per_night() {
        let plan = planner(fair_week()).plan(&request(2)).unwrap();

        assert_eq!(plan.verdict.class, SafetyClass::Safe);
        assert!(!plan.override_required);
        assert!(plan.cancellation_reason.is_none());
        assert!(plan.alternatives.is_none());
        assert_eq!(plan.overnight_anchorages.len(), 2);
        assert_eq!(plan.segments.len(), 3);
        assert_eq!(plan.segments[2].to.name, "Büyükada");
        for a in &plan.overnight_anchorages {
            assert!(a.is_protected_from(WindDirection::NE));
        }
        assert!(plan.faults.is_empty());
    }

    #[test]
    fn segments_chain_from_departure() {
        let plan = planner(fair_week()).plan(&request(2)).unwrap();
        assert_eq!(plan.segments[0].from.name, "Kalamış Marina");
        for pair in plan.segments.windows(2) {
            assert_eq!(pair[0].to, pair[1].from);
        }
        let sum: f64 = plan.segments.iter().map(|s| s.distance_nm).sum();
        assert!((plan.totals.distance_nm - sum).abs() < 1e-9);
        // 12 kn of wind: 6.5 kn under sail.
        let s = &plan.segments[0];
        assert!((s.estimated_hours - s.distance_nm / 6.5).abs() < 1e-9);
    }

    #[test]
    fn strong_wind_on_day_three_is_dangerous_with_delays_attempted() {
        let records = vec![
            record(0, 12.0, WindDirection::NE, 0.6),
            record(1, 14.0, WindDirection::NE, 0.7),
            record(2, 32.0, WindDirection::NE, 1.0),
            record(3, 12.0, WindDirection::NE, 0.6),
            record(4, 12.0, WindDirection::NE, 0.6),
            record(5, 12.0, WindDirection::NE, 0.6),
        ];
        let plan = planner(records).plan(&request(3)).unwrap();

        assert_eq!(plan.verdict.class, SafetyClass::Dangerous);
        assert!(plan.override_required);
        let reason = plan.cancellation_reason.as_deref().unwrap();
        assert!(reason.contains("day 3"), "{reason}");

        let kinds: Vec<AlternativeKind> =
            plan.attempted_alternatives.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AlternativeKind::Delay24h,
                AlternativeKind::Delay48h,
                AlternativeKind::Shortened
            ]
        );
        // Every alternative still crosses the windy day, so none is kept.
        assert!(plan.attempted_alternatives.iter().all(|a| !a.accepted));
        assert_eq!(plan.alternatives, Some(Vec::new()));
    }

    #[test]
    fn delay_that_clears_the_weather_is_attached() {
        let records = vec![
            record(0, 33.0, WindDirection::N, 1.0),
            record(1, 12.0, WindDirection::N, 0.5),
            record(2, 12.0, WindDirection::N, 0.5),
        ];
        let plan = planner(records).plan(&request(1)).unwrap();

        assert_eq!(plan.verdict.class, SafetyClass::Dangerous);
        let alternatives = plan.alternatives.unwrap();
        assert_eq!(alternatives[0].alternative_kind, Some(AlternativeKind::Delay24h));
        assert_eq!(alternatives[0].verdict.class, SafetyClass::Safe);
        assert!(alternatives[0].alternatives.is_none());
        assert_eq!(
            alternatives[0].request.depart_at,
            depart() + SignedDuration::from_hours(24)
        );
        // The 48h delay runs past the end of the forecast.
        assert!(!plan.attempted_alternatives[1].accepted);
    }

    #[test]
    fn shortened_alternative_drops_last_waypoint_and_a_night() {
        let alts = alternative_requests(&request(2));
        let (kind, shorter) = &alts[2];
        assert_eq!(*kind, AlternativeKind::Shortened);
        assert_eq!(shorter.nights, 1);
        assert_eq!(shorter.destination().name, "Heybeliada");

        let mut single = request(2);
        single.waypoints.truncate(1);
        assert_eq!(alternative_requests(&single).len(), 2);
    }

    #[test]
    fn no_shelter_degrades_with_fault() {
        let records: Vec<ForecastRecord> =
            (0..3).map(|d| record(d, 12.0, WindDirection::S, 0.6)).collect();
        let plan = planner(records).plan(&request(2)).unwrap();

        assert_eq!(plan.overnight_anchorages.len(), 2);
        assert!(plan
            .faults
            .iter()
            .any(|f| matches!(f, Fault::NoSuitableAnchorage { night: 1, .. })));
        assert!(plan.warnings.iter().any(|w| w.contains("no anchorage sheltered")));
    }

    #[test]
    fn oversized_vessel_plans_without_anchorages() {
        let mut req = request(1);
        req.vessel.length_m = 40.0;
        let plan = planner(fair_week()).plan(&req).unwrap();

        assert!(plan.overnight_anchorages.is_empty());
        assert_eq!(plan.segments.len(), 1);
        assert!(matches!(plan.faults[0], Fault::NoSuitableAnchorage { .. }));
    }

    #[test]
    fn missing_forecast_blocks_departure() {
        let plan = planner(Vec::new()).plan(&request(1)).unwrap();
        assert!(plan.verdict.class >= SafetyClass::Dangerous);
        assert!(plan.override_required);
        assert!(plan
            .faults
            .iter()
            .any(|f| matches!(f, Fault::InvalidForecastData { .. })));
    }

    #[test]
    fn horizon_is_capped() {
        let err = planner(fair_week()).plan(&request(7)).unwrap_err();
        assert!(matches!(err, PlanError::HorizonTooLong { nights: 7 }));
    }

    #[test]
    fn absurd_night_count_is_refused_not_wrapped() {
        let err = planner(fair_week()).plan(&request(u32::MAX)).unwrap_err();
        assert!(matches!(err, PlanError::HorizonTooLong { nights: u32::MAX }));
        assert_eq!(
            err.to_string(),
            "4294967295 nights need more forecast days than the 7 available"
        );
    }

    #[test]
    fn comfort_penalties_stack_and_floor_at_zero() {
        let t = SafetyThresholds::default();
        let mut w = WeatherSample::from_record(&record(0, 22.0, WindDirection::N, 1.6));
        assert_eq!(comfort(&t, Some(&w)).0, 6.0);

        w.wind_speed_kn = 31.0;
        w.wave_height_m = 2.6;
        w.precipitation = true;
        w.visibility_nm = 1.5;
        let (score, warnings) = comfort(&t, Some(&w));
        assert_eq!(score, 0.0);
        assert_eq!(warnings.len(), 4);

        assert_eq!(comfort(&t, None).0, 7.0);
    }

    #[test]
    fn sail_speed_curve() {
        let mut w = WeatherSample::from_record(&record(0, 4.0, WindDirection::N, 0.5));
        let speed = |w: &WeatherSample| passage_speed(Propulsion::Sail, Some(w));
        assert_eq!(speed(&w), 3.0);
        w.wind_speed_kn = 7.0;
        assert_eq!(speed(&w), 4.5);
        w.wind_speed_kn = 12.0;
        assert_eq!(speed(&w), 6.5);
        w.wind_speed_kn = 18.0;
        assert_eq!(speed(&w), 6.0);
        w.wind_speed_kn = 24.0;
        assert_eq!(speed(&w), 5.0);
        assert_eq!(passage_speed(Propulsion::MotorSail, Some(&w)), MOTOR_SPEED_KN);
    }
}

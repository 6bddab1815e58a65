//! Voyage safety assessment.
//!
//! Classifies a forecast horizon, one worst-case sample per planning day,
//! into a [`SafetyVerdict`]. Classification only looks at the horizon's
//! maximum wind, maximum wave and minimum visibility, so worsening any single
//! measure can never improve the verdict.

use crate::config::SafetyThresholds;
use crate::model::{
    SafetyClass, SafetyVerdict, WORST_CASE_VISIBILITY_NM, WORST_CASE_WAVE_M, WORST_CASE_WIND_KN,
    WeatherSample,
};

/// Sea comfort for a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ComfortBand {
    Comfortable,
    Moderate,
    Rough,
}

#[derive(Debug, Clone, Copy)]
pub struct SafetyAssessor {
    thresholds: SafetyThresholds,
}

impl SafetyAssessor {
    pub fn new(thresholds: SafetyThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SafetyThresholds {
        &self.thresholds
    }

    /// Classify a forecast horizon. `days[0]` is the first planning day.
    pub fn assess(&self, days: &[WeatherSample]) -> SafetyVerdict {
        if days.is_empty() {
            return SafetyVerdict {
                class: SafetyClass::Dangerous,
                reason: "no forecast data for the planning horizon".into(),
                worst_day: None,
                max_wind_kn: WORST_CASE_WIND_KN,
                max_wave_m: WORST_CASE_WAVE_M,
                min_visibility_nm: WORST_CASE_VISIBILITY_NM,
            };
        }

        let max_wind_kn = days.iter().map(|s| s.wind_speed_kn).fold(f64::MIN, f64::max);
        let max_wave_m = days.iter().map(|s| s.wave_height_m).fold(f64::MIN, f64::max);
        let min_visibility_nm = days.iter().map(|s| s.visibility_nm).fold(f64::MAX, f64::min);

        let t = &self.thresholds;
        let (class, headline) =
            if max_wind_kn >= t.critical_wind_kn || max_wave_m >= t.critical_wave_m {
                (SafetyClass::Critical, "critical conditions")
            } else if max_wind_kn >= t.dangerous_wind_kn
                || max_wave_m >= t.dangerous_wave_m
                || min_visibility_nm < t.minimum_visibility_nm
            {
                (SafetyClass::Dangerous, "dangerous conditions")
            } else if self.comfort_band_of(max_wind_kn, max_wave_m) == ComfortBand::Rough {
                (SafetyClass::Caution, "rough conditions")
            } else {
                (SafetyClass::Safe, "")
            };

        let (worst_day, reason) = match days
            .iter()
            .position(|s| self.sample_class(s) >= class && class > SafetyClass::Safe)
        {
            Some(i) => {
                let day = i + 1;
                let triggers = self.triggers(&days[i], class);
                (Some(day), format!("{headline} on day {day}: {triggers}"))
            }
            None => (
                None,
                format!(
                    "conditions within limits: wind up to {max_wind_kn:.0} kn, \
                     waves up to {max_wave_m:.1} m"
                ),
            ),
        };

        SafetyVerdict {
            class,
            reason,
            worst_day,
            max_wind_kn,
            max_wave_m,
            min_visibility_nm,
        }
    }

    /// Comfort band for a sample, ignoring visibility.
    pub fn comfort_band(&self, sample: &WeatherSample) -> ComfortBand {
        self.comfort_band_of(sample.wind_speed_kn, sample.wave_height_m)
    }

    fn comfort_band_of(&self, wind_kn: f64, wave_m: f64) -> ComfortBand {
        let t = &self.thresholds;
        if wind_kn < t.comfortable_wind_kn && wave_m < t.comfortable_wave_m {
            ComfortBand::Comfortable
        } else if wind_kn < t.moderate_wind_kn && wave_m < t.moderate_wave_m {
            ComfortBand::Moderate
        } else {
            ComfortBand::Rough
        }
    }

    /// Classification of a single day on its own.
    fn sample_class(&self, s: &WeatherSample) -> SafetyClass {
        let t = &self.thresholds;
        if s.wind_speed_kn >= t.critical_wind_kn || s.wave_height_m >= t.critical_wave_m {
            SafetyClass::Critical
        } else if s.wind_speed_kn >= t.dangerous_wind_kn
            || s.wave_height_m >= t.dangerous_wave_m
            || s.visibility_nm < t.minimum_visibility_nm
        {
            SafetyClass::Dangerous
        } else if self.comfort_band(s) == ComfortBand::Rough {
            SafetyClass::Caution
        } else {
            SafetyClass::Safe
        }
    }

    /// The measures on `s` that reach `class`.
    fn triggers(&self, s: &WeatherSample, class: SafetyClass) -> String {
        let t = &self.thresholds;
        let (wind_limit, wave_limit) = match class {
            SafetyClass::Critical => (t.critical_wind_kn, t.critical_wave_m),
            SafetyClass::Dangerous => (t.dangerous_wind_kn, t.dangerous_wave_m),
            _ => (t.moderate_wind_kn, t.moderate_wave_m),
        };

        let mut parts = Vec::new();
        if !s.is_complete() {
            parts.push("forecast incomplete, worst case assumed".to_string());
        }
        if s.wind_speed_kn >= wind_limit {
            parts.push(format!("wind {:.0} kn", s.wind_speed_kn));
        }
        if s.wave_height_m >= wave_limit {
            parts.push(format!("waves {:.1} m", s.wave_height_m));
        }
        if class == SafetyClass::Dangerous && s.visibility_nm < t.minimum_visibility_nm {
            parts.push(format!("visibility {:.1} NM", s.visibility_nm));
        }
        parts.join(", ")
    }
}

impl Default for SafetyAssessor {
    fn default() -> Self {
        Self::new(SafetyThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;
    use proptest::prelude::*;

    use crate::model::{SeaState, WindDirection};

    fn day(wind_kn: f64, wave_m: f64, visibility_nm: f64) -> WeatherSample {
        WeatherSample {
            time: Timestamp::UNIX_EPOCH,
            wind_speed_kn: wind_kn,
            wind_direction: Some(WindDirection::N),
            gust_speed_kn: None,
            wave_height_m: wave_m,
            visibility_nm,
            precipitation: false,
            sea_state: SeaState::from_wave_height(wave_m),
            substituted: vec![],
        }
    }

    fn assess(days: &[WeatherSample]) -> SafetyVerdict {
        SafetyAssessor::default().assess(days)
    }

    #[test]
    fn calm_forecast_is_safe() {
        let verdict = assess(&[day(8.0, 0.3, 10.0), day(12.0, 0.6, 10.0)]);
        assert_eq!(verdict.class, SafetyClass::Safe);
        assert_eq!(verdict.worst_day, None);
    }

    #[test]
    fn moderate_band_is_still_safe() {
        let verdict = assess(&[day(18.0, 1.2, 10.0)]);
        assert_eq!(verdict.class, SafetyClass::Safe);
    }

    #[test]
    fn outside_moderate_band_is_caution() {
        let verdict = assess(&[day(10.0, 0.5, 10.0), day(22.0, 1.0, 10.0)]);
        assert_eq!(verdict.class, SafetyClass::Caution);
        assert_eq!(verdict.worst_day, Some(2));
    }

    #[test]
    fn strong_wind_on_day_three_is_dangerous() {
        let verdict = assess(&[
            day(12.0, 0.5, 10.0),
            day(14.0, 0.8, 10.0),
            day(32.0, 1.0, 10.0),
            day(15.0, 0.8, 10.0),
        ]);
        assert_eq!(verdict.class, SafetyClass::Dangerous);
        assert_eq!(verdict.worst_day, Some(3));
        assert!(verdict.reason.contains("day 3"), "{}", verdict.reason);
        assert!(verdict.reason.contains("wind 32 kn"), "{}", verdict.reason);
    }

    #[test]
    fn poor_visibility_is_dangerous() {
        let verdict = assess(&[day(10.0, 0.5, 0.5)]);
        assert_eq!(verdict.class, SafetyClass::Dangerous);
        assert!(verdict.reason.contains("visibility 0.5 NM"));
    }

    #[test]
    fn storm_is_critical() {
        let verdict = assess(&[day(31.0, 1.0, 10.0), day(36.0, 2.0, 10.0)]);
        assert_eq!(verdict.class, SafetyClass::Critical);
        assert_eq!(verdict.worst_day, Some(2));

        let verdict = assess(&[day(10.0, 3.2, 10.0)]);
        assert_eq!(verdict.class, SafetyClass::Critical);
        assert!(verdict.reason.contains("waves 3.2 m"));
    }

    #[test]
    fn empty_forecast_blocks_departure() {
        let verdict = assess(&[]);
        assert_eq!(verdict.class, SafetyClass::Dangerous);
        assert!(!verdict.class.permits_departure());
    }

    #[test]
    fn missing_day_is_treated_as_worst_case() {
        let verdict = assess(&[
            day(10.0, 0.5, 10.0),
            WeatherSample::missing(Timestamp::UNIX_EPOCH),
        ]);
        assert_eq!(verdict.class, SafetyClass::Critical);
        assert_eq!(verdict.worst_day, Some(2));
        assert!(verdict.reason.contains("worst case assumed"));
    }

    #[test]
    fn thresholds_are_inclusive() {
        assert_eq!(assess(&[day(30.0, 0.5, 10.0)]).class, SafetyClass::Dangerous);
        assert_eq!(assess(&[day(35.0, 0.5, 10.0)]).class, SafetyClass::Critical);
        assert_eq!(assess(&[day(10.0, 2.5, 10.0)]).class, SafetyClass::Dangerous);
        assert_eq!(assess(&[day(10.0, 0.5, 1.0)]).class, SafetyClass::Safe);
    }

    fn arb_day() -> impl Strategy<Value = (f64, f64, f64)> {
        (0.0..45.0f64, 0.0..4.0f64, 0.0..12.0f64)
    }

    proptest! {
        #[test]
        fn worsening_a_measure_never_improves_the_verdict(
            days in prop::collection::vec(arb_day(), 1..7),
            index in any::<prop::sample::Index>(),
            extra_wind in 0.0..20.0f64,
            extra_wave in 0.0..2.0f64,
            lost_visibility in 0.0..12.0f64,
        ) {
            let base: Vec<WeatherSample> =
                days.iter().map(|&(w, h, v)| day(w, h, v)).collect();
            let mut worse = base.clone();
            let i = index.index(worse.len());
            worse[i].wind_speed_kn += extra_wind;
            worse[i].wave_height_m += extra_wave;
            worse[i].visibility_nm = (worse[i].visibility_nm - lost_visibility).max(0.0);

            prop_assert!(assess(&worse).class >= assess(&base).class);
        }
    }
}

//! Weather types: compass points, raw forecast records, and normalised samples.

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Wind speed substituted for a missing measurement. Exceeds every threshold.
pub const WORST_CASE_WIND_KN: f64 = 999.0;

/// Wave height substituted for a missing measurement. Exceeds every threshold.
pub const WORST_CASE_WAVE_M: f64 = 99.0;

/// Visibility substituted for a missing measurement.
pub const WORST_CASE_VISIBILITY_NM: f64 = 0.0;

/// One of the eight compass points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WindDirection {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl WindDirection {
    pub const ALL: [WindDirection; 8] = [
        Self::N,
        Self::NE,
        Self::E,
        Self::SE,
        Self::S,
        Self::SW,
        Self::W,
        Self::NW,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::N => "N",
            Self::NE => "NE",
            Self::E => "E",
            Self::SE => "SE",
            Self::S => "S",
            Self::SW => "SW",
            Self::W => "W",
            Self::NW => "NW",
        }
    }
}

impl fmt::Display for WindDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualitative sea state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeaState {
    Calm,
    Moderate,
    Rough,
    VeryRough,
}

impl SeaState {
    /// Sea state implied by a significant wave height.
    pub fn from_wave_height(wave_height_m: f64) -> Self {
        if wave_height_m < 0.5 {
            Self::Calm
        } else if wave_height_m < 1.5 {
            Self::Moderate
        } else if wave_height_m < 2.5 {
            Self::Rough
        } else {
            Self::VeryRough
        }
    }
}

/// A field of a forecast record that can be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SampleField {
    WindSpeed,
    WindDirection,
    WaveHeight,
    Visibility,
    Precipitation,
}

impl fmt::Display for SampleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WindSpeed => "wind speed",
            Self::WindDirection => "wind direction",
            Self::WaveHeight => "wave height",
            Self::Visibility => "visibility",
            Self::Precipitation => "precipitation",
        })
    }
}

/// A forecast record as delivered by the forecast provider.
///
/// Every measure is optional here; [`WeatherSample::from_record`] turns a
/// record into a complete sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastRecord {
    pub time: Timestamp,
    #[serde(default)]
    pub wind_speed_kn: Option<f64>,
    #[serde(default)]
    pub wind_direction: Option<WindDirection>,
    #[serde(default)]
    pub gust_speed_kn: Option<f64>,
    #[serde(default)]
    pub wave_height_m: Option<f64>,
    #[serde(default)]
    pub visibility_nm: Option<f64>,
    #[serde(default)]
    pub precipitation: Option<bool>,
    #[serde(default)]
    pub sea_state: Option<SeaState>,
}

/// A complete, immutable forecast sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSample {
    pub time: Timestamp,
    pub wind_speed_kn: f64,

    /// `None` when the direction is unknown; no anchorage counts as sheltered
    /// from an unknown wind.
    pub wind_direction: Option<WindDirection>,
    pub gust_speed_kn: Option<f64>,
    pub wave_height_m: f64,
    pub visibility_nm: f64,
    pub precipitation: bool,
    pub sea_state: SeaState,

    /// Fields that were missing or unusable and replaced by their worst case.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub substituted: Vec<SampleField>,
}

impl WeatherSample {
    /// Normalise a raw record, substituting the worst case for anything
    /// missing, non-finite or negative.
    pub fn from_record(record: &ForecastRecord) -> Self {
        let mut substituted = Vec::new();

        let wind_speed_kn = measure(record.wind_speed_kn).unwrap_or_else(|| {
            substituted.push(SampleField::WindSpeed);
            WORST_CASE_WIND_KN
        });
        if record.wind_direction.is_none() {
            substituted.push(SampleField::WindDirection);
        }
        let wave_height_m = measure(record.wave_height_m).unwrap_or_else(|| {
            substituted.push(SampleField::WaveHeight);
            WORST_CASE_WAVE_M
        });
        let visibility_nm = measure(record.visibility_nm).unwrap_or_else(|| {
            substituted.push(SampleField::Visibility);
            WORST_CASE_VISIBILITY_NM
        });
        let precipitation = record.precipitation.unwrap_or_else(|| {
            substituted.push(SampleField::Precipitation);
            true
        });

        Self {
            time: record.time,
            wind_speed_kn,
            wind_direction: record.wind_direction,
            gust_speed_kn: measure(record.gust_speed_kn),
            wave_height_m,
            visibility_nm,
            precipitation,
            sea_state: record
                .sea_state
                .unwrap_or_else(|| SeaState::from_wave_height(wave_height_m)),
            substituted,
        }
    }

    /// A sample standing in for a period with no forecast at all.
    pub fn missing(time: Timestamp) -> Self {
        Self::from_record(&ForecastRecord {
            time,
            wind_speed_kn: None,
            wind_direction: None,
            gust_speed_kn: None,
            wave_height_m: None,
            visibility_nm: None,
            precipitation: None,
            sea_state: None,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.substituted.is_empty()
    }
}

/// A usable physical measure: finite and not below zero.
fn measure(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

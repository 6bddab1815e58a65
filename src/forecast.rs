//! Forecast input and normalisation into planning days.

use std::path::Path;
use std::{fs, io};

use jiff::{SignedDuration, Timestamp};

use crate::model::{Fault, ForecastRecord, WeatherSample};

/// Longest horizon a forecast source is asked for.
pub const MAX_HORIZON_DAYS: u32 = 7;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("forecast horizon of {0} days exceeds the {max}-day limit", max = MAX_HORIZON_DAYS)]
    HorizonTooLong(u32),

    #[error("forecast unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Supplies raw forecast records for a window.
pub trait ForecastSource: Send + Sync {
    /// Records with `start <= time < start + days`.
    fn records(&self, start: Timestamp, days: u32) -> Result<Vec<ForecastRecord>, ForecastError>;
}

/// A fixed forecast, typically loaded from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct StaticForecast {
    records: Vec<ForecastRecord>,
}

impl StaticForecast {
    pub fn new(mut records: Vec<ForecastRecord>) -> Self {
        records.sort_by_key(|r| r.time);
        Self { records }
    }

    /// Load a JSON array of forecast records.
    pub fn load(path: &Path) -> Result<Self, ForecastError> {
        let json = fs::read_to_string(path)?;
        let records: Vec<ForecastRecord> = serde_json::from_str(&json)?;
        Ok(Self::new(records))
    }
}

impl ForecastSource for StaticForecast {
    fn records(&self, start: Timestamp, days: u32) -> Result<Vec<ForecastRecord>, ForecastError> {
        if days > MAX_HORIZON_DAYS {
            return Err(ForecastError::HorizonTooLong(days));
        }
        let end = day_start(start, days);
        Ok(self
            .records
            .iter()
            .filter(|r| r.time >= start && r.time < end)
            .cloned()
            .collect())
    }
}

/// One worst-case sample per planning day, plus the faults found on the way.
#[derive(Debug, Clone, Default)]
pub struct DailyForecast {
    pub days: Vec<WeatherSample>,
    pub faults: Vec<Fault>,
}

/// Bucket records into `days` planning days from `start` and summarise each
/// day by its worst measures.
///
/// A day without records becomes a fully missing sample. Records outside the
/// window are ignored.
pub fn daily_worst(records: &[ForecastRecord], start: Timestamp, days: u32) -> DailyForecast {
    let mut buckets: Vec<Vec<WeatherSample>> = vec![Vec::new(); days as usize];
    for record in records {
        let offset = record.time.duration_since(start).as_secs();
        if offset < 0 {
            continue;
        }
        let Ok(index) = usize::try_from(offset / SECONDS_PER_DAY) else {
            continue;
        };
        if let Some(bucket) = buckets.get_mut(index) {
            bucket.push(WeatherSample::from_record(record));
        }
    }

    let mut out = DailyForecast::default();
    for (i, bucket) in buckets.into_iter().enumerate() {
        let day = i + 1;
        let time = day_start(start, u32::try_from(i).unwrap_or(u32::MAX));
        match worst_of(&bucket, time) {
            Some(sample) => {
                if !sample.is_complete() {
                    out.faults.push(Fault::InvalidForecastData {
                        day,
                        fields: sample.substituted.clone(),
                    });
                }
                out.days.push(sample);
            }
            None => {
                out.faults.push(Fault::InvalidForecastData {
                    day,
                    fields: Vec::new(),
                });
                out.days.push(WeatherSample::missing(time));
            }
        }
    }
    out
}

/// Fetch and normalise a window from a source.
///
/// A failing source yields an all-missing forecast, so the caller ends up
/// with a blocking verdict instead of an error.
pub fn fetch_daily(source: &dyn ForecastSource, start: Timestamp, days: u32) -> DailyForecast {
    match source.records(start, days) {
        Ok(records) => daily_worst(&records, start, days),
        Err(e) => {
            tracing::warn!(error = %e, "forecast unavailable, assuming worst case");
            daily_worst(&[], start, days)
        }
    }
}

/// Start of planning day `day` (0-based).
pub fn day_start(start: Timestamp, day: u32) -> Timestamp {
    start
        .checked_add(SignedDuration::from_hours(24 * i64::from(day)))
        .unwrap_or(Timestamp::MAX)
}

fn worst_of(samples: &[WeatherSample], time: Timestamp) -> Option<WeatherSample> {
    let windiest = samples
        .iter()
        .max_by(|a, b| a.wind_speed_kn.total_cmp(&b.wind_speed_kn))?;

    let mut substituted = Vec::new();
    for s in samples {
        for field in &s.substituted {
            if !substituted.contains(field) {
                substituted.push(*field);
            }
        }
    }

    let wave_height_m = samples
        .iter()
        .map(|s| s.wave_height_m)
        .fold(f64::MIN, f64::max);

    Some(WeatherSample {
        time,
        wind_speed_kn: windiest.wind_speed_kn,
        wind_direction: windiest.wind_direction,
        gust_speed_kn: samples
            .iter()
            .filter_map(|s| s.gust_speed_kn)
            .max_by(f64::total_cmp),
        wave_height_m,
        visibility_nm: samples
            .iter()
            .map(|s| s.visibility_nm)
            .fold(f64::MAX, f64::min),
        precipitation: samples.iter().any(|s| s.precipitation),
        sea_state: samples
            .iter()
            .map(|s| s.sea_state)
            .max()
            .unwrap_or(windiest.sea_state),
        substituted,
    })
}

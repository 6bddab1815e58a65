//! Lookout configuration.
//!
//! Resolved through a chain, first match wins:
//!
//! 1. `--config <path>`: explicit per-invocation file
//! 2. `LOOKOUT_CONFIG` env var
//! 3. `~/.lookout/config.toml`
//! 4. built-in defaults
//!
//! Every section has defaults, so a partial file is valid. Explicitly named
//! files must exist; the home file is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use serde::{Deserialize, Serialize};

use crate::model::{HoldingQuality, Vessel};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "LOOKOUT_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config at {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// Lookout configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub vessel: Vessel,
    pub safety: SafetyThresholds,
    pub anchorage: AnchorageWeights,
    pub emergency: EmergencySettings,
    pub monitor: MonitorSettings,

    /// Overrides the storage root, `~/.lookout/` by default.
    pub storage_root: Option<PathBuf>,
}

/// Forecast thresholds for voyage safety and passage comfort.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SafetyThresholds {
    pub dangerous_wind_kn: f64,
    pub critical_wind_kn: f64,
    pub dangerous_wave_m: f64,
    pub critical_wave_m: f64,
    pub minimum_visibility_nm: f64,
    pub comfortable_wind_kn: f64,
    pub moderate_wind_kn: f64,
    pub comfortable_wave_m: f64,
    pub moderate_wave_m: f64,
}

impl Default for SafetyThresholds {
    fn default() -> Self {
        Self {
            dangerous_wind_kn: 30.0,
            critical_wind_kn: 35.0,
            dangerous_wave_m: 2.5,
            critical_wave_m: 3.0,
            minimum_visibility_nm: 1.0,
            comfortable_wind_kn: 15.0,
            moderate_wind_kn: 20.0,
            comfortable_wave_m: 1.0,
            moderate_wave_m: 1.5,
        }
    }
}

/// Anchorage scoring weights.
///
/// These are tuning constants. Changing them reorders candidates but never
/// admits an anchorage that is exposed to the night's wind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AnchorageWeights {
    pub shelter: f64,
    pub holding_excellent: f64,
    pub holding_good: f64,
    pub holding_fair: f64,
    pub holding_poor: f64,
    pub rating_multiplier: f64,
    pub water: f64,
    pub restaurant: f64,
    pub comfortable_depth: f64,
    pub comfortable_depth_min_m: f64,
    pub comfortable_depth_max_m: f64,
}

impl AnchorageWeights {
    pub fn holding(&self, quality: HoldingQuality) -> f64 {
        match quality {
            HoldingQuality::Excellent => self.holding_excellent,
            HoldingQuality::Good => self.holding_good,
            HoldingQuality::Fair => self.holding_fair,
            HoldingQuality::Poor => self.holding_poor,
        }
    }
}

impl Default for AnchorageWeights {
    fn default() -> Self {
        Self {
            shelter: 50.0,
            holding_excellent: 20.0,
            holding_good: 15.0,
            holding_fair: 10.0,
            holding_poor: 5.0,
            rating_multiplier: 5.0,
            water: 3.0,
            restaurant: 2.0,
            comfortable_depth: 5.0,
            comfortable_depth_min_m: 6.0,
            comfortable_depth_max_m: 12.0,
        }
    }
}

/// Emergency response parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EmergencySettings {
    pub circle_radius_m: f64,
    pub circle_speed_kn: f64,
    pub alert_interval_secs: u64,
    pub disappearance_threshold_secs: f64,
    pub min_confidence: f64,
    pub mayday_attempts: u32,
    pub approach_speed_kn: f64,
}

impl EmergencySettings {
    pub fn alert_interval(&self) -> Duration {
        Duration::from_secs(self.alert_interval_secs.max(1))
    }
}

impl Default for EmergencySettings {
    fn default() -> Self {
        Self {
            circle_radius_m: 50.0,
            circle_speed_kn: 2.0,
            alert_interval_secs: 300,
            disappearance_threshold_secs: 2.0,
            min_confidence: 0.7,
            mayday_attempts: 3,
            approach_speed_kn: 2.0,
        }
    }
}

/// Monitoring loop cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MonitorSettings {
    pub scan_interval_millis: u64,
    pub housekeeping_interval_secs: u64,
}

impl MonitorSettings {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_millis.max(1))
    }

    pub fn housekeeping_interval(&self) -> Duration {
        Duration::from_secs(self.housekeeping_interval_secs.max(1))
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            scan_interval_millis: 500,
            housekeeping_interval_secs: 60,
        }
    }
}

impl Config {
    /// Resolve the configuration through the chain described above.
    ///
    /// Returns the config and the file it came from, if any.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        // 1. Explicit --config flag.
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        // 2. LOOKOUT_CONFIG environment variable.
        if let Ok(path) = env::var(CONFIG_ENV)
            && !path.is_empty()
        {
            let path = PathBuf::from(path);
            return Ok((Self::load(&path)?, Some(path)));
        }

        // 3. ~/.lookout/config.toml, if present.
        if let Some(path) = Self::default_path()
            && path.is_file()
        {
            return Ok((Self::load(&path)?, Some(path)));
        }

        // 4. Defaults.
        Ok((Self::default(), None))
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate().map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    /// The home config file path: `~/.lookout/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".lookout").join("config.toml"))
    }

    fn validate(&self) -> Result<(), String> {
        let s = &self.safety;
        if s.dangerous_wind_kn > s.critical_wind_kn {
            return Err("safety.dangerous-wind-kn exceeds critical-wind-kn".into());
        }
        if s.dangerous_wave_m > s.critical_wave_m {
            return Err("safety.dangerous-wave-m exceeds critical-wave-m".into());
        }
        if s.comfortable_wind_kn > s.moderate_wind_kn || s.comfortable_wave_m > s.moderate_wave_m {
            return Err("safety comfort bands are out of order".into());
        }
        if !(0.0..=1.0).contains(&self.emergency.min_confidence) {
            return Err("emergency.min-confidence must be between 0 and 1".into());
        }
        if self.emergency.mayday_attempts == 0 {
            return Err("emergency.mayday-attempts must be at least 1".into());
        }
        if self.vessel.length_m <= 0.0 {
            return Err("vessel.length-m must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::model::Propulsion;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = Config::default();
        assert_eq!(config.safety.dangerous_wind_kn, 30.0);
        assert_eq!(config.safety.critical_wave_m, 3.0);
        assert_eq!(config.anchorage.shelter, 50.0);
        assert_eq!(config.emergency.alert_interval(), Duration::from_secs(300));
        assert_eq!(config.emergency.min_confidence, 0.7);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
[vessel]
name = "Poyraz"
length-m = 11.5
propulsion = "motor-sail"

[emergency]
alert-interval-secs = 120
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.vessel.name, "Poyraz");
        assert_eq!(config.vessel.propulsion, Propulsion::MotorSail);
        assert_eq!(config.emergency.alert_interval_secs, 120);
        assert_eq!(config.emergency.circle_radius_m, 50.0);
        assert_eq!(config.safety, SafetyThresholds::default());
    }

    #[test]
    fn explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[vessel]\nname = \"Lodos\"\n");

        let (config, source) = Config::resolve(Some(&path)).unwrap();
        assert_eq!(config.vessel.name, "Lodos");
        assert_eq!(source, Some(path));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::resolve(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[safety\n");
        assert!(matches!(
            Config::load(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[safety]\ndangerous-wind-kn = 40.0\n");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("dangerous-wind-kn"));
    }
}

//! Session configuration.
//!
//! [`SessionConfig`] gathers the tuning of every subsystem so a whole session
//! can be described in one JSON file. Missing fields take their defaults:
//!
//! ```
//! use squall::config::SessionConfig;
//!
//! let config = SessionConfig::from_json(r#"{ "seed": 7, "rain": { "capacity": 200 } }"#).unwrap();
//! assert_eq!(config.seed, Some(7));
//! assert_eq!(config.rain.capacity, 200);
//! assert_eq!(config.splash.capacity, 64);
//! ```

use crate::error::LoadError;
use crate::fog::FogConfig;
use crate::rain::RainConfig;
use crate::splash::SplashConfig;
use crate::storm::StormConfig;
use crate::time::DEFAULT_MAX_DT;
use crate::water::WaterConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tuning for a whole [`StormSession`](crate::StormSession).
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Rain pool, spawn rate and motion.
    pub rain: RainConfig,
    /// Splash pool and decal lifecycle.
    pub splash: SplashConfig,
    /// Water smoothing, tile grid and depth range.
    pub water: WaterConfig,
    /// Fog opacity response.
    pub fog: FogConfig,
    /// Calibration applied to storm data replayed by the session.
    pub storm: StormConfig,
    /// Largest frame step, seconds. Applies to every subsystem.
    pub max_dt: f32,
    /// Floor height used until the ground reports one.
    pub default_floor: f32,
    /// Seed for reproducible runs; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rain: RainConfig::default(),
            splash: SplashConfig::default(),
            water: WaterConfig::default(),
            fog: FogConfig::default(),
            storm: StormConfig::default(),
            max_dt: DEFAULT_MAX_DT,
            default_floor: 0.0,
            seed: None,
        }
    }
}

impl SessionConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rain config.
    pub fn rain(mut self, rain: RainConfig) -> Self {
        self.rain = rain;
        self
    }

    /// Set the splash config.
    pub fn splash(mut self, splash: SplashConfig) -> Self {
        self.splash = splash;
        self
    }

    /// Set the water config.
    pub fn water(mut self, water: WaterConfig) -> Self {
        self.water = water;
        self
    }

    /// Set the fog config.
    pub fn fog(mut self, fog: FogConfig) -> Self {
        self.fog = fog;
        self
    }

    /// Set the storm data calibration.
    pub fn storm(mut self, storm: StormConfig) -> Self {
        self.storm = storm;
        self
    }

    /// Set the largest frame step, in seconds.
    pub fn max_dt(mut self, seconds: f32) -> Self {
        self.max_dt = seconds;
        self
    }

    /// Set the floor height used while the ground reports none.
    pub fn default_floor(mut self, height: f32) -> Self {
        self.default_floor = height;
        self
    }

    /// Seed every random generator for a reproducible run.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Clamp every value into range and push `max_dt` down into the rain
    /// config.
    pub fn sanitized(mut self) -> Self {
        self.max_dt = if self.max_dt.is_finite() && self.max_dt > 0.0 {
            self.max_dt
        } else {
            DEFAULT_MAX_DT
        };
        if !self.default_floor.is_finite() {
            self.default_floor = 0.0;
        }
        self.rain = self.rain.max_dt(self.max_dt).sanitized();
        self.splash = self.splash.sanitized();
        self.water = self.water.sanitized();
        self.fog = self.fog.sanitized();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::water::ConformConfig;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(SessionConfig::from_json("{}").unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_json_round_trip_keeps_nested_values() {
        let config = SessionConfig::new()
            .seed(3)
            .default_floor(-0.5)
            .water(WaterConfig::default().conform(ConformConfig::default()));
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(SessionConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_sanitized_shares_max_dt() {
        let config = SessionConfig::new().max_dt(0.1).sanitized();
        assert_eq!(config.rain.max_dt, 0.1);
        let config = SessionConfig::new().max_dt(-1.0).sanitized();
        assert_eq!(config.max_dt, DEFAULT_MAX_DT);
    }

    #[test]
    fn test_storm_calibration_from_json() {
        let config = SessionConfig::from_json(
            r#"{ "storm": { "use_anomaly": false, "baselines": { "levee": 1.5 }, "world_yaw_deg": 20.0 } }"#,
        )
        .unwrap();
        assert!(!config.storm.use_anomaly);
        assert_eq!(config.storm.baselines.get("levee"), Some(&1.5));
        assert_eq!(config.storm.world_yaw_deg, 20.0);
        assert!(SessionConfig::default().storm.use_anomaly);
    }

    #[test]
    fn test_bad_json_is_reported() {
        let err = SessionConfig::from_json(r#"{ "max_dt": "fast" }"#).unwrap_err();
        assert!(matches!(err, LoadError::Json(_)));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("squall-config-{}.json", std::process::id()));
        let config = SessionConfig::new().seed(42);
        config.save(&path).unwrap();
        let loaded = SessionConfig::load(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, config);
    }
}

//! Storm time series.
//!
//! A [`StormBundle`] holds per-site series sampled on a shared time axis,
//! loaded from JSON:
//!
//! ```json
//! {
//!   "time_utc": [1630281600, 1630285200],
//!   "sites": [{
//!     "id": "grand_isle", "lat": 29.26, "lon": -89.96,
//!     "zeta_m": [0.4, 0.9], "rain_mm_h": [12.0, 30.5],
//!     "wind_speed_mps": [18.0, 27.0], "wind_dir_deg": [120.0, 135.0]
//!   }]
//! }
//! ```
//!
//! [`StormData`] selects one site and turns a time index into a
//! [`WeatherSample`]. Anything else that can produce samples implements
//! [`SampleProvider`].

use crate::error::LoadError;
use crate::session::FrameInput;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One measurement site.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StormSite {
    /// Unique within a bundle.
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    /// Water level, meters.
    pub zeta_m: Vec<f64>,
    /// Rain rate, mm/h.
    pub rain_mm_h: Vec<f64>,
    pub wind_speed_mps: Vec<f64>,
    /// Direction the wind blows from, degrees clockwise from north.
    pub wind_dir_deg: Vec<f64>,
    /// Rotation of the model grid at this site, degrees.
    #[serde(default)]
    pub grid_angle_deg: Option<f64>,
}

/// Every site on a shared time axis.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StormBundle {
    /// Unix seconds.
    pub time_utc: Vec<i64>,
    pub sites: Vec<StormSite>,
}

/// Weather at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WeatherSample {
    pub rain_mm_per_hour: f32,
    pub wind_speed_mps: f32,
    pub wind_dir_from_deg: f32,
    /// Water depth above the floor, meters.
    pub water_depth_m: f32,
}

impl WeatherSample {
    /// Replace non-finite values with 0, clamp rain and wind to be
    /// non-negative and depth into `[min_depth, max_depth]`.
    pub fn sanitized(self, min_depth: f32, max_depth: f32) -> Self {
        let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
        Self {
            rain_mm_per_hour: finite(self.rain_mm_per_hour).max(0.0),
            wind_speed_mps: finite(self.wind_speed_mps).max(0.0),
            wind_dir_from_deg: finite(self.wind_dir_from_deg).rem_euclid(360.0),
            water_depth_m: finite(self.water_depth_m).clamp(min_depth, max_depth.max(min_depth)),
        }
    }
}

/// Source of weather samples indexed by time step.
pub trait SampleProvider {
    /// Number of time steps.
    fn len(&self) -> usize;

    /// Sample at `index`, clamped into range. `None` only when empty.
    fn sample(&self, index: usize) -> Option<WeatherSample>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SampleProvider for [WeatherSample] {
    fn len(&self) -> usize {
        <[WeatherSample]>::len(self)
    }

    fn sample(&self, index: usize) -> Option<WeatherSample> {
        let last = <[WeatherSample]>::len(self).checked_sub(1)?;
        self.get(index.min(last)).copied()
    }
}

impl SampleProvider for Vec<WeatherSample> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn sample(&self, index: usize) -> Option<WeatherSample> {
        SampleProvider::sample(self.as_slice(), index)
    }
}

impl<P: SampleProvider + ?Sized> SampleProvider for &P {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn sample(&self, index: usize) -> Option<WeatherSample> {
        (**self).sample(index)
    }
}

/// Site whose water levels ship with a baseline in [`StormConfig::default`].
pub const NEW_ORLEANS_SITE: &str = "new_orleans_french_quarter";

/// How raw storm series are calibrated before they drive a session.
///
/// Water levels in a bundle are absolute (datum-relative) heights. In anomaly
/// mode a per-site baseline is subtracted so that the replay shows the surge
/// above normal water rather than the datum offset. The default carries the
/// baseline for the French Quarter gauge, whose normal level sits about 7 m
/// above datum.
///
/// ```
/// use squall::storm::{StormConfig, NEW_ORLEANS_SITE};
///
/// let config = StormConfig::default().baseline("grand_isle", 0.3);
/// assert!(config.use_anomaly);
/// assert_eq!(config.baselines[NEW_ORLEANS_SITE], 7.0);
/// assert_eq!(config.baselines["grand_isle"], 0.3);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StormConfig {
    /// Subtract per-site baselines from water levels.
    pub use_anomaly: bool,
    /// Baseline water level per site id, meters. Missing sites use 0.
    pub baselines: HashMap<String, f64>,
    /// Rotation from data north to world +Z, degrees.
    pub world_yaw_deg: f32,
}

impl Default for StormConfig {
    fn default() -> Self {
        Self {
            use_anomaly: true,
            baselines: HashMap::from([(NEW_ORLEANS_SITE.to_string(), 7.0)]),
            world_yaw_deg: 0.0,
        }
    }
}

impl StormConfig {
    /// Enable or disable anomaly mode.
    pub fn anomaly(mut self, enabled: bool) -> Self {
        self.use_anomaly = enabled;
        self
    }

    /// Set the baseline for `site_id`, replacing any earlier one.
    pub fn baseline(mut self, site_id: impl Into<String>, meters: f64) -> Self {
        self.baselines.insert(site_id.into(), meters);
        self
    }

    /// Set the world yaw calibration.
    pub fn world_yaw(mut self, degrees: f32) -> Self {
        self.world_yaw_deg = degrees;
        self
    }
}

/// A storm bundle with one site selected.
#[derive(Clone, Debug)]
pub struct StormData {
    bundle: StormBundle,
    site: usize,
    calibration: StormConfig,
}

impl StormData {
    /// Wrap `bundle`, selecting its first site and calibrated with
    /// [`StormConfig::default`].
    pub fn from_bundle(bundle: StormBundle) -> Result<Self, LoadError> {
        if bundle.sites.is_empty() || bundle.time_utc.is_empty() {
            return Err(LoadError::EmptyBundle);
        }
        log::info!(
            "storm bundle: {} sites, {} time steps",
            bundle.sites.len(),
            bundle.time_utc.len()
        );
        Ok(Self {
            bundle,
            site: 0,
            calibration: StormConfig::default(),
        })
    }

    /// Parse a bundle from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        Self::from_bundle(serde_json::from_str(json)?)
    }

    /// Load a bundle from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// The selected site.
    #[inline]
    pub fn site(&self) -> &StormSite {
        &self.bundle.sites[self.site]
    }

    /// Ids of every site in the bundle, in file order.
    pub fn site_ids(&self) -> impl Iterator<Item = &str> {
        self.bundle.sites.iter().map(|s| s.id.as_str())
    }

    /// Select the site with `id`. The selection is unchanged on error.
    pub fn select_site(&mut self, id: &str) -> Result<(), LoadError> {
        let index = self
            .bundle
            .sites
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| LoadError::UnknownSite(id.to_string()))?;
        self.site = index;
        log::debug!("selected site {}", id);
        Ok(())
    }

    /// Replace the calibration.
    pub fn with_config(mut self, config: StormConfig) -> Self {
        self.set_config(config);
        self
    }

    /// Replace the calibration in place.
    pub fn set_config(&mut self, config: StormConfig) {
        log::debug!(
            "storm calibration: anomaly {}, {} baselines, yaw {:.1}°",
            config.use_anomaly,
            config.baselines.len(),
            config.world_yaw_deg
        );
        self.calibration = config;
    }

    #[inline]
    pub fn config(&self) -> &StormConfig {
        &self.calibration
    }

    /// Set the baseline subtracted from `site_id`'s water level in anomaly mode.
    pub fn with_baseline(mut self, site_id: impl Into<String>, meters: f64) -> Self {
        self.set_baseline(site_id, meters);
        self
    }

    /// In-place form of [`with_baseline`](Self::with_baseline).
    pub fn set_baseline(&mut self, site_id: impl Into<String>, meters: f64) {
        self.calibration.baselines.insert(site_id.into(), meters);
    }

    /// Switch between anomaly and absolute water levels.
    pub fn set_use_anomaly(&mut self, enabled: bool) {
        self.calibration.use_anomaly = enabled;
    }

    #[inline]
    pub fn use_anomaly(&self) -> bool {
        self.calibration.use_anomaly
    }

    /// Set the yaw carried by [`frame_input`](Self::frame_input).
    pub fn set_world_yaw_deg(&mut self, degrees: f32) {
        self.calibration.world_yaw_deg = degrees;
    }

    #[inline]
    pub fn world_yaw_deg(&self) -> f32 {
        self.calibration.world_yaw_deg
    }

    /// Frame input showing time step `index` with this data's yaw
    /// calibration.
    pub fn frame_input(&self, index: usize) -> FrameInput {
        FrameInput::at(index).yaw(self.calibration.world_yaw_deg)
    }

    /// Time of step `index` (clamped), Unix seconds.
    pub fn time_utc(&self, index: usize) -> i64 {
        let times = &self.bundle.time_utc;
        times[index.min(times.len() - 1)]
    }

    /// Water level of the selected site at `index`, baseline removed in
    /// anomaly mode.
    pub fn water_level(&self, index: usize) -> f64 {
        let index = self.clamp_index(index);
        let site = self.site();
        let raw = series_at(&site.zeta_m, index);
        if !self.calibration.use_anomaly {
            return raw;
        }
        raw - self.calibration.baselines.get(&site.id).copied().unwrap_or(0.0)
    }

    fn clamp_index(&self, index: usize) -> usize {
        index.min(self.bundle.time_utc.len() - 1)
    }
}

impl SampleProvider for StormData {
    fn len(&self) -> usize {
        self.bundle.time_utc.len()
    }

    fn sample(&self, index: usize) -> Option<WeatherSample> {
        let index = self.clamp_index(index);
        let site = self.site();
        Some(WeatherSample {
            rain_mm_per_hour: series_at(&site.rain_mm_h, index) as f32,
            wind_speed_mps: series_at(&site.wind_speed_mps, index) as f32,
            wind_dir_from_deg: series_at(&site.wind_dir_deg, index) as f32,
            water_depth_m: self.water_level(index) as f32,
        })
    }
}

/// Value at `index`, holding the last value past a short series.
fn series_at(series: &[f64], index: usize) -> f64 {
    series
        .get(index)
        .or_else(|| series.last())
        .copied()
        .unwrap_or(0.0)
}

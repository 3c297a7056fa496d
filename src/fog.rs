//! Rain-driven fog veil.
//!
//! One proxy whose opacity eases toward a level set by the rain rate.

use crate::time::clamp_delta;
use crate::visuals::ProxyPose;
use crate::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Opacity below which the veil is hidden.
const VISIBLE_ALPHA: f32 = 1e-3;

/// Tuning for [`Fog`].
///
/// The target opacity is `rain × alpha_per_mm`, capped at `max_alpha`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    /// Opacity ceiling.
    pub max_alpha: f32,
    /// Target opacity per mm/h of rain.
    pub alpha_per_mm: f32,
    /// First-order response rate, 1/s.
    pub response: f32,
    /// Size of the veil volume.
    pub extent: Vec3,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            max_alpha: 0.25,
            alpha_per_mm: 0.006,
            response: 3.0,
            extent: Vec3::new(8.0, 4.0, 8.0),
        }
    }
}

impl FogConfig {
    /// Clamp every field into range; `max_alpha` is capped at 1.
    pub fn sanitized(mut self) -> Self {
        let pos = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        self.max_alpha = pos(self.max_alpha).min(1.0);
        self.alpha_per_mm = pos(self.alpha_per_mm);
        self.response = pos(self.response);
        self.extent = self.extent.max(Vec3::ZERO);
        self
    }
}

/// A single veil proxy easing toward a rain-driven opacity.
#[derive(Clone, Debug)]
pub struct Fog {
    config: FogConfig,
    alpha: f32,
    target: f32,
}

impl Fog {
    /// Create a clear veil.
    pub fn new(config: FogConfig) -> Self {
        Self {
            config: config.sanitized(),
            alpha: 0.0,
            target: 0.0,
        }
    }

    #[inline]
    pub fn config(&self) -> &FogConfig {
        &self.config
    }

    /// Current opacity.
    #[inline]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Opacity the veil is easing toward.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Retarget from a rain rate in mm/h.
    pub fn set_rain(&mut self, rain_mm_per_hour: f32) {
        let rain = if rain_mm_per_hour.is_finite() {
            rain_mm_per_hour.max(0.0)
        } else {
            0.0
        };
        self.target = (rain * self.config.alpha_per_mm).min(self.config.max_alpha);
    }

    /// Ease toward the target for `dt` seconds. The step never passes the
    /// target, even for huge `dt`.
    pub fn advance(&mut self, dt: f32) {
        let k = (clamp_delta(dt, f32::MAX) * self.config.response).min(1.0);
        self.alpha += (self.target - self.alpha) * k;
    }

    /// Pose of the veil with its base at `base`.
    pub fn pose(&self, base: Vec3) -> ProxyPose {
        if self.alpha < VISIBLE_ALPHA {
            return ProxyPose::HIDDEN;
        }
        let extent = self.config.extent;
        ProxyPose::visible(
            base + Vec3::Y * (extent.y * 0.5),
            Quat::IDENTITY,
            extent,
            self.alpha,
        )
    }
}

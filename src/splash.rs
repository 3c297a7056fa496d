//! Splash decals left by rain hits.
//!
//! A decal is a flat ripple on the ground that fades in, holds, fades out and
//! grows outward over a fixed [`Lifecycle`]. Its appearance is a pure
//! function of its age.

use crate::lifecycle::Lifecycle;
use crate::pool::{Acquired, ParticlePool};
use crate::spawn;
use crate::time::clamp_delta;
use crate::visuals::ProxyPose;
use crate::{Quat, Vec3};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Tuning for a [`SplashSystem`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplashConfig {
    /// Pool size.
    pub capacity: usize,
    /// Opacity and growth over the decal's life.
    pub lifecycle: Lifecycle,
    /// Smallest starting radius.
    pub radius_min: f32,
    /// Largest starting radius.
    pub radius_max: f32,
    /// Lift above the hit point, against z-fighting with the ground.
    pub surface_offset: f32,
}

impl Default for SplashConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            lifecycle: Lifecycle::default(),
            radius_min: 0.02,
            radius_max: 0.03,
            surface_offset: 0.002,
        }
    }
}

impl SplashConfig {
    /// Set the pool size. When full, the oldest decal is replaced.
    pub fn capacity(mut self, n: usize) -> Self {
        self.capacity = n;
        self
    }

    /// Set the fade and growth curve.
    pub fn lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Set the range each decal's starting radius is drawn from.
    pub fn radius(mut self, min: f32, max: f32) -> Self {
        self.radius_min = min;
        self.radius_max = max;
        self
    }

    /// Clamp every field into range. A `radius_max` below `radius_min` is
    /// raised to it.
    pub fn sanitized(mut self) -> Self {
        let pos = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        self.lifecycle = self.lifecycle.sanitized();
        self.radius_min = pos(self.radius_min);
        self.radius_max = pos(self.radius_max).max(self.radius_min);
        self.surface_offset = pos(self.surface_offset);
        self
    }
}

/// Payload of a splash slot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SplashDecal {
    /// Center, already lifted by `surface_offset`.
    pub position: Vec3,
    /// Seconds since spawn.
    pub age: f32,
    /// Radius at age zero, before growth.
    pub base_radius: f32,
}

/// Pooled splash decals.
#[derive(Debug)]
pub struct SplashSystem {
    config: SplashConfig,
    pool: ParticlePool<SplashDecal>,
    rng: SmallRng,
}

impl SplashSystem {
    /// Create a system seeded from OS entropy.
    pub fn new(config: SplashConfig) -> Self {
        Self::with_rng(config, SmallRng::from_entropy())
    }

    /// Create a system with a fixed seed, for reproducible runs.
    pub fn with_seed(config: SplashConfig, seed: u64) -> Self {
        Self::with_rng(config, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(config: SplashConfig, rng: SmallRng) -> Self {
        let config = config.sanitized();
        Self {
            pool: ParticlePool::new(config.capacity),
            config,
            rng,
        }
    }

    #[inline]
    pub fn config(&self) -> &SplashConfig {
        &self.config
    }

    #[inline]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.config.lifecycle
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Live decals as `(slot, decal)`.
    pub fn decals(&self) -> impl Iterator<Item = (usize, &SplashDecal)> {
        self.pool.iter()
    }

    /// Every slot in index order, `None` for free ones.
    pub fn slots(&self) -> impl Iterator<Item = Option<&SplashDecal>> {
        self.pool.slots()
    }

    /// Start a decal at `position`.
    ///
    /// When the pool is full the oldest decal is replaced. Returns `None`
    /// only if the pool has no capacity at all.
    pub fn spawn(&mut self, position: Vec3) -> Option<Acquired> {
        let base_radius =
            spawn::in_range(&mut self.rng, self.config.radius_min, self.config.radius_max);
        self.pool.insert(SplashDecal {
            position: position + Vec3::Y * self.config.surface_offset,
            age: 0.0,
            base_radius,
        })
    }

    /// Age every decal by `dt`, releasing the ones that reach their lifetime.
    ///
    /// Returns the number released.
    pub fn advance(&mut self, dt: f32) -> usize {
        let dt = clamp_delta(dt, f32::MAX);
        let lifecycle = self.config.lifecycle;
        self.pool.retain(|_, decal| {
            decal.age += dt;
            !lifecycle.is_expired(decal.age)
        })
    }

    /// Release every decal.
    pub fn clear(&mut self) {
        self.pool.clear();
    }

    #[inline]
    /// Current opacity of `decal`.
    pub fn opacity(&self, decal: &SplashDecal) -> f32 {
        self.config.lifecycle.opacity(decal.age)
    }

    /// Current radius of `decal`.
    #[inline]
    pub fn radius(&self, decal: &SplashDecal) -> f32 {
        decal.base_radius * self.config.lifecycle.scale(decal.age)
    }

    /// Pose for the visual proxy of `decal`: a flat disc lying on the ground.
    pub fn decal_pose(&self, decal: &SplashDecal) -> ProxyPose {
        let diameter = 2.0 * self.radius(decal);
        ProxyPose::visible(
            decal.position,
            Quat::IDENTITY,
            Vec3::new(diameter, 1.0, diameter),
            self.opacity(decal),
        )
    }
}

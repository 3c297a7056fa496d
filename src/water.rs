//! Rising and falling water surface.
//!
//! The surface is a grid of flat tiles sharing one height. That height
//! follows its target through a critically damped spring:
//!
//! ```text
//! ω = 2 / smoothing_time
//! a = -ω²·(current - target) - 2ω·velocity
//! velocity += a·dt
//! current  += velocity·dt
//! ```
//!
//! so the water glides to each new level without bouncing past it, however
//! often the target changes.
//!
//! Tiles can optionally be conformed to the ground under them (see
//! [`ConformConfig`]). Conforming only lifts individual tiles for display; it
//! never touches the shared height.

use crate::ground::Ground;
use crate::time::clamp_delta;
use crate::visuals::ProxyPose;
use crate::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

const MIN_SMOOTHING_TIME: f32 = 0.001;
/// Largest ω·dt taken in one integration substep.
const MAX_SUBSTEP: f32 = 0.5;
const MAX_SUBSTEPS: u32 = 32;

/// Per-tile ground probing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConformConfig {
    /// Raycast every this many frames.
    pub interval_frames: u32,
    /// Ray start above the water surface.
    pub ray_up: f32,
    /// Ray end below the water surface.
    pub ray_down: f32,
    /// Fraction of the way each raycast moves a tile's ground estimate.
    pub blend: f32,
}

impl Default for ConformConfig {
    fn default() -> Self {
        Self {
            interval_frames: 4,
            ray_up: 1.5,
            ray_down: 1.5,
            blend: 0.6,
        }
    }
}

/// Tuning for a [`WaterField`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterConfig {
    /// Time scale of the damped response, in seconds.
    pub smoothing_time: f32,
    /// Side length of the square field.
    pub field_size: f32,
    /// Side length of one tile.
    pub tile_size: f32,
    /// Lift of every tile above the computed level.
    pub surface_offset: f32,
    /// Depth range applied to incoming samples.
    pub min_depth: f32,
    pub max_depth: f32,
    /// Tile opacity.
    pub opacity: f32,
    /// Ground conforming; `None` keeps the field flat.
    pub conform: Option<ConformConfig>,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            smoothing_time: 0.35,
            field_size: 8.0,
            tile_size: 0.35,
            surface_offset: 0.01,
            min_depth: 0.01,
            max_depth: 5.0,
            opacity: 0.42,
            conform: None,
        }
    }
}

impl WaterConfig {
    /// Set how long a level change takes to settle, seconds.
    pub fn smoothing_time(mut self, seconds: f32) -> Self {
        self.smoothing_time = seconds;
        self
    }

    /// Set the field and tile sizes.
    pub fn grid(mut self, field_size: f32, tile_size: f32) -> Self {
        self.field_size = field_size;
        self.tile_size = tile_size;
        self
    }

    /// Enable ground conforming.
    pub fn conform(mut self, conform: ConformConfig) -> Self {
        self.conform = Some(conform);
        self
    }

    pub fn sanitized(mut self) -> Self {
        let pos = |v: f32, d: f32| if v.is_finite() { v.max(0.0) } else { d };
        self.smoothing_time = pos(self.smoothing_time, 0.35).max(MIN_SMOOTHING_TIME);
        self.field_size = pos(self.field_size, 0.0);
        self.tile_size = pos(self.tile_size, 0.35).max(0.01);
        self.surface_offset = pos(self.surface_offset, 0.0);
        if !self.min_depth.is_finite() {
            self.min_depth = 0.0;
        }
        if !self.max_depth.is_finite() || self.max_depth < self.min_depth {
            self.max_depth = self.min_depth;
        }
        self.opacity = pos(self.opacity, 1.0).min(1.0);
        if let Some(conform) = self.conform.as_mut() {
            conform.interval_frames = conform.interval_frames.max(1);
            conform.ray_up = pos(conform.ray_up, 0.0);
            conform.ray_down = pos(conform.ray_down, 0.0);
            conform.blend = pos(conform.blend, 1.0).min(1.0);
        }
        self
    }

    /// World height of water `depth` meters above `floor`, depth clamped
    /// into `[min_depth, max_depth]`.
    pub fn level_for(&self, floor: f32, depth: f32) -> f32 {
        let depth = if depth.is_finite() { depth } else { 0.0 };
        floor + depth.clamp(self.min_depth, self.max_depth)
    }
}

#[derive(Clone, Copy, Debug)]
struct Tile {
    center: Vec2,
    /// Blended ground height under the tile, once sampled.
    ground: Option<f32>,
}

/// Damped water surface.
#[derive(Clone, Debug)]
pub struct WaterField {
    config: WaterConfig,
    current: f32,
    target: f32,
    velocity: f32,
    tiles: Vec<Tile>,
    frame: u64,
}

impl WaterField {
    /// Create a field at rest at height 0.
    pub fn new(config: WaterConfig) -> Self {
        let config = config.sanitized();
        let per_side = (config.field_size / config.tile_size).ceil().max(1.0) as usize;
        let origin = -(per_side as f32) * config.tile_size * 0.5;
        let half = config.tile_size * 0.5;

        let mut tiles = Vec::with_capacity(per_side * per_side);
        for row in 0..per_side {
            for col in 0..per_side {
                tiles.push(Tile {
                    center: Vec2::new(
                        origin + col as f32 * config.tile_size + half,
                        origin + row as f32 * config.tile_size + half,
                    ),
                    ground: None,
                });
            }
        }

        Self {
            config,
            current: 0.0,
            target: 0.0,
            velocity: 0.0,
            tiles,
            frame: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &WaterConfig {
        &self.config
    }

    /// Current shared height.
    #[inline]
    pub fn height(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Rate of change of the height.
    #[inline]
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    #[inline]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Set the level to move toward. `current` is untouched until
    /// [`advance`](Self::advance).
    pub fn set_target(&mut self, height: f32) {
        if height.is_finite() {
            self.target = height;
        }
    }

    /// Jump straight to `height` with no motion.
    pub fn reset(&mut self, height: f32) {
        let height = if height.is_finite() { height } else { 0.0 };
        self.current = height;
        self.target = height;
        self.velocity = 0.0;
        for tile in &mut self.tiles {
            tile.ground = None;
        }
    }

    /// Move the height toward the target by `dt` seconds.
    ///
    /// Long steps are split into substeps; the height never crosses the
    /// target, it stops on it.
    pub fn advance(&mut self, dt: f32) {
        let dt = clamp_delta(dt, f32::MAX);
        if dt <= 0.0 {
            return;
        }
        let omega = 2.0 / self.config.smoothing_time;
        let substeps = ((omega * dt) / MAX_SUBSTEP).ceil().clamp(1.0, MAX_SUBSTEPS as f32) as u32;
        let h = dt / substeps as f32;

        for _ in 0..substeps {
            let offset = self.current - self.target;
            let accel = -omega * omega * offset - 2.0 * omega * self.velocity;
            self.velocity += accel * h;
            self.current += self.velocity * h;

            if (self.current - self.target) * offset < 0.0 {
                self.current = self.target;
                self.velocity = 0.0;
            }
        }
    }

    /// Raycast the ground under each tile, if conforming is enabled and this
    /// is a probing frame. Call once per frame.
    ///
    /// Returns the number of raycasts that hit.
    pub fn conform<G: Ground + ?Sized>(&mut self, ground: &G) -> usize {
        self.frame += 1;
        let Some(conform) = self.config.conform.clone() else {
            return 0;
        };
        if self.frame % u64::from(conform.interval_frames) != 0 {
            return 0;
        }

        let top = self.current + conform.ray_up;
        let bottom = self.current - conform.ray_down;
        let mut hits = 0;
        for tile in &mut self.tiles {
            let from = Vec3::new(tile.center.x, top, tile.center.y);
            let to = Vec3::new(tile.center.x, bottom, tile.center.y);
            if let Some(hit) = ground.raycast_ground(from, to) {
                tile.ground = Some(match tile.ground {
                    Some(g) => g + (hit.y - g) * conform.blend,
                    None => hit.y,
                });
                hits += 1;
            }
        }
        hits
    }

    /// Display height of tile `index`: the shared level, raised to the ground
    /// under the tile if that is higher, plus the surface offset.
    pub fn tile_height(&self, index: usize) -> Option<f32> {
        let tile = self.tiles.get(index)?;
        let base = match tile.ground {
            Some(g) => self.current.max(g),
            None => self.current,
        };
        Some(base + self.config.surface_offset)
    }

    /// Pose for the visual proxy of tile `index`.
    pub fn tile_pose(&self, index: usize) -> Option<ProxyPose> {
        let tile = self.tiles.get(index)?;
        let y = self.tile_height(index)?;
        let size = self.config.tile_size;
        Some(ProxyPose::visible(
            Vec3::new(tile.center.x, y, tile.center.y),
            Quat::IDENTITY,
            Vec3::new(size, 1.0, size),
            self.config.opacity,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground::{GroundPlane, NoGround};

    #[test]
    fn test_set_target_has_no_immediate_effect() {
        let mut water = WaterField::new(WaterConfig::default());
        water.set_target(2.0);
        assert_eq!(water.height(), 0.0);
        assert_eq!(water.target(), 2.0);
        water.advance(0.0);
        assert_eq!(water.height(), 0.0);
    }

    #[test]
    fn test_step_response_is_monotonic_and_settles() {
        let smoothing = 0.35;
        let mut water = WaterField::new(WaterConfig::default().smoothing_time(smoothing));
        water.set_target(1.0);

        let dt = 1.0 / 60.0;
        let frames = (5.0 * smoothing / dt).ceil() as usize;
        let mut prev = water.height();
        for _ in 0..frames {
            water.advance(dt);
            assert!(water.height() >= prev, "height went backwards");
            assert!(water.height() <= 1.0, "overshoot to {}", water.height());
            prev = water.height();
        }
        assert!((water.height() - 1.0).abs() < 0.01, "height {}", water.height());
    }

    #[test]
    fn test_large_steps_do_not_overshoot() {
        let mut water = WaterField::new(WaterConfig::default().smoothing_time(0.05));
        water.set_target(-3.0);
        for _ in 0..20 {
            water.advance(0.05);
            assert!(water.height() >= -3.0);
        }
        assert!((water.height() + 3.0).abs() < 0.01);
    }

    #[test]
    fn test_moving_target_stays_continuous() {
        let mut water = WaterField::new(WaterConfig::default());
        let dt = 1.0 / 60.0;
        let mut prev = water.height();
        for i in 0..600 {
            water.set_target((i as f32 * 0.05).sin() * 2.0);
            water.advance(dt);
            // Bounded per-frame motion: no jumps.
            assert!((water.height() - prev).abs() < 0.2);
            prev = water.height();
        }
    }

    #[test]
    fn test_level_for_clamps_depth() {
        let config = WaterConfig::default();
        assert!((config.level_for(1.0, -2.0) - 1.01).abs() < 1e-6);
        assert!((config.level_for(0.0, 9.0) - 5.0).abs() < 1e-6);
        assert!((config.level_for(0.0, f32::NAN) - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_tile_grid_layout() {
        let water = WaterField::new(WaterConfig::default().grid(1.0, 0.5));
        assert_eq!(water.tile_count(), 4);
        let pose = water.tile_pose(0).unwrap();
        assert_eq!(pose.position, [-0.25, 0.01, -0.25]);
        assert_eq!(pose.scale, [0.5, 1.0, 0.5]);
        assert!(water.tile_pose(4).is_none());
    }

    #[test]
    fn test_conform_raises_tiles_to_ground() {
        let config = WaterConfig::default().grid(1.0, 0.5).conform(ConformConfig {
            interval_frames: 2,
            blend: 0.5,
            ..ConformConfig::default()
        });
        let mut water = WaterField::new(config);
        let ground = GroundPlane::new(0.4);

        assert_eq!(water.conform(&ground), 0);
        assert_eq!(water.conform(&ground), 4);
        assert!((water.tile_height(0).unwrap() - 0.41).abs() < 1e-6);
        // Shared level is untouched.
        assert_eq!(water.height(), 0.0);

        // Misses keep the last estimate.
        water.conform(&NoGround);
        assert_eq!(water.conform(&NoGround), 0);
        assert!((water.tile_height(3).unwrap() - 0.41).abs() < 1e-6);
    }

    #[test]
    fn test_conform_disabled_by_default() {
        let mut water = WaterField::new(WaterConfig::default());
        for _ in 0..8 {
            assert_eq!(water.conform(&GroundPlane::new(0.5)), 0);
        }
        assert_eq!(water.tile_height(0), Some(0.01));
    }
}

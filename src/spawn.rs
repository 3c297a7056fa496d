//! Spawn placement helpers.
//!
//! Rain drops are born somewhere inside a horizontal [`SpawnArea`] centred on
//! the scene origin. The same area, grown by a margin, is used to decide when
//! a drifting drop has left the scene.

use crate::{Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Horizontal region (XZ plane) in which particles are spawned.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SpawnArea {
    /// Axis-aligned rectangle with the given half-extents on X and Z.
    Rect { half_extents: Vec2 },
    /// Disc of the given radius.
    Disc { radius: f32 },
}

impl Default for SpawnArea {
    fn default() -> Self {
        SpawnArea::Rect {
            half_extents: Vec2::splat(3.0),
        }
    }
}

impl SpawnArea {
    /// Random point inside the area, at height `y`.
    ///
    /// Distribution is uniform over the area.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, y: f32) -> Vec3 {
        match *self {
            SpawnArea::Rect { half_extents } => Vec3::new(
                symmetric(rng, half_extents.x),
                y,
                symmetric(rng, half_extents.y),
            ),
            SpawnArea::Disc { radius } => {
                let theta = rng.gen_range(0.0..TAU);
                // sqrt for uniform disk
                let r = radius.max(0.0) * rng.gen::<f32>().sqrt();
                Vec3::new(r * theta.cos(), y, r * theta.sin())
            }
        }
    }

    /// Whether `p` lies within the area grown by `margin` (Y is ignored).
    pub fn contains(&self, p: Vec3, margin: f32) -> bool {
        match *self {
            SpawnArea::Rect { half_extents } => {
                p.x.abs() <= half_extents.x + margin && p.z.abs() <= half_extents.y + margin
            }
            SpawnArea::Disc { radius } => {
                let r = radius + margin;
                p.x * p.x + p.z * p.z <= r * r
            }
        }
    }
}

/// Random value in `[-half, half]`; zero when `half` is not positive.
#[inline]
pub fn symmetric<R: Rng + ?Sized>(rng: &mut R, half: f32) -> f32 {
    if half > 0.0 {
        rng.gen_range(-half..=half)
    } else {
        0.0
    }
}

/// Random value in `[min, max]`, tolerating `min >= max`.
#[inline]
pub fn in_range<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..=max)
    } else {
        min
    }
}

/// Round `expected` to an integer so that the long-run mean equals `expected`.
///
/// The integer part is always taken; the fractional part becomes the
/// probability of one extra unit.
pub fn stochastic_round<R: Rng + ?Sized>(rng: &mut R, expected: f32) -> usize {
    if !expected.is_finite() || expected <= 0.0 {
        return 0;
    }
    let whole = expected.floor();
    let frac = expected - whole;
    let extra = if rng.gen::<f32>() < frac { 1 } else { 0 };
    whole as usize + extra
}

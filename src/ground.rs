//! Ground reference used for collisions.
//!
//! The engine never detects the ground itself. Whatever does (plane
//! detection, a scene mesh, a fixed number) implements [`Ground`], and the
//! engine queries it defensively: a missing floor height falls back to a
//! default, and a missing geometric query falls back to a height test.

use crate::Vec3;
use std::sync::atomic::{AtomicU32, Ordering};

/// Source of the ground plane.
pub trait Ground {
    /// Last known floor height in world space, if any has been detected.
    fn floor_height(&self) -> Option<f32>;

    /// First ground intersection on the segment `from → to`, if any.
    ///
    /// The default reports no geometry, leaving collision to the floor-height
    /// fallback.
    fn raycast_ground(&self, from: Vec3, to: Vec3) -> Option<Vec3> {
        let _ = (from, to);
        None
    }
}

/// No ground detected.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoGround;

impl Ground for NoGround {
    fn floor_height(&self) -> Option<f32> {
        None
    }
}

/// Infinite horizontal plane at a fixed height.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundPlane {
    pub height: f32,
}

impl GroundPlane {
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

impl Ground for GroundPlane {
    fn floor_height(&self) -> Option<f32> {
        Some(self.height)
    }

    fn raycast_ground(&self, from: Vec3, to: Vec3) -> Option<Vec3> {
        segment_plane(from, to, self.height)
    }
}

/// Floor height shared with a sensing thread.
///
/// The writer stores the latest value; the frame loop reads a snapshot with
/// a single atomic load. No value yet reads as `None`.
///
/// ```
/// use squall::{Ground, SharedFloor};
/// use std::sync::Arc;
///
/// let floor = Arc::new(SharedFloor::new());
/// assert_eq!(floor.floor_height(), None);
///
/// let writer = Arc::clone(&floor);
/// std::thread::spawn(move || writer.set(-1.25)).join().unwrap();
/// assert_eq!(floor.floor_height(), Some(-1.25));
/// ```
#[derive(Debug)]
pub struct SharedFloor {
    /// `f32` bits; NaN means unknown.
    bits: AtomicU32,
}

impl SharedFloor {
    pub fn new() -> Self {
        Self {
            bits: AtomicU32::new(f32::NAN.to_bits()),
        }
    }

    /// Publish a new floor height. Non-finite values clear it.
    pub fn set(&self, height: f32) {
        let height = if height.is_finite() { height } else { f32::NAN };
        self.bits.store(height.to_bits(), Ordering::Relaxed);
    }

    /// Forget the floor height (e.g. tracking lost).
    pub fn clear(&self) {
        self.set(f32::NAN);
    }
}

impl Default for SharedFloor {
    fn default() -> Self {
        Self::new()
    }
}

impl Ground for SharedFloor {
    fn floor_height(&self) -> Option<f32> {
        let h = f32::from_bits(self.bits.load(Ordering::Relaxed));
        h.is_finite().then_some(h)
    }
}

impl<G: Ground + ?Sized> Ground for &G {
    fn floor_height(&self) -> Option<f32> {
        (**self).floor_height()
    }

    fn raycast_ground(&self, from: Vec3, to: Vec3) -> Option<Vec3> {
        (**self).raycast_ground(from, to)
    }
}

impl<G: Ground + ?Sized> Ground for std::sync::Arc<G> {
    fn floor_height(&self) -> Option<f32> {
        (**self).floor_height()
    }

    fn raycast_ground(&self, from: Vec3, to: Vec3) -> Option<Vec3> {
        (**self).raycast_ground(from, to)
    }
}

/// Intersection of the segment `from → to` with the plane `y = height`,
/// crossing from above.
pub(crate) fn segment_plane(from: Vec3, to: Vec3, height: f32) -> Option<Vec3> {
    if from.y < height || to.y > height || from.y == to.y {
        return None;
    }
    let t = (from.y - height) / (from.y - to.y);
    let mut hit = from.lerp(to, t);
    hit.y = height;
    Some(hit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_raycast_hits_crossing_segment() {
        let plane = GroundPlane::new(0.5);
        let hit = plane
            .raycast_ground(Vec3::new(0.0, 1.5, 0.0), Vec3::new(2.0, -0.5, 0.0))
            .unwrap();
        assert!((hit.x - 1.0).abs() < 1e-6);
        assert_eq!(hit.y, 0.5);
    }

    #[test]
    fn test_plane_raycast_misses() {
        let plane = GroundPlane::new(0.0);
        // Entirely above.
        assert!(plane
            .raycast_ground(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 1.0, 0.0))
            .is_none());
        // Moving upward.
        assert!(plane
            .raycast_ground(Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0))
            .is_none());
    }

    #[test]
    fn test_no_ground_has_nothing() {
        assert_eq!(NoGround.floor_height(), None);
        assert!(NoGround
            .raycast_ground(Vec3::Y, Vec3::NEG_Y)
            .is_none());
    }

    #[test]
    fn test_shared_floor_rejects_non_finite() {
        let floor = SharedFloor::new();
        floor.set(0.75);
        assert_eq!(floor.floor_height(), Some(0.75));
        floor.set(f32::INFINITY);
        assert_eq!(floor.floor_height(), None);
        floor.set(-2.0);
        floor.clear();
        assert_eq!(floor.floor_height(), None);
    }
}

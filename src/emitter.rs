//! Rate-driven particle emission.
//!
//! An [`Emitter`] turns a continuous rate (particles per second) into a whole
//! number of spawns per frame. Fractions are carried stochastically, so the
//! long-run average matches the rate exactly even when a frame's share is
//! below one particle.
//!
//! # Example
//!
//! ```
//! use rand::rngs::SmallRng;
//! use rand::SeedableRng;
//! use squall::Emitter;
//!
//! let mut rng = SmallRng::seed_from_u64(0);
//! let mut emitter = Emitter::new(120.0);
//! let n = emitter.emit(0.25, &mut rng);
//! assert_eq!(n, 30);
//! assert_eq!(emitter.emitted(), 30);
//! ```

use crate::spawn::stochastic_round;
use rand::Rng;

/// Continuous emitter with stochastic rounding.
#[derive(Clone, Debug, Default)]
pub struct Emitter {
    /// Particles per second.
    rate: f32,
    /// Particles emitted since creation.
    emitted: u64,
}

impl Emitter {
    /// Create an emitter with the given rate (particles per second).
    pub fn new(rate: f32) -> Self {
        let mut emitter = Self::default();
        emitter.set_rate(rate);
        emitter
    }

    /// Change the rate. Negative and non-finite rates become zero.
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = if rate.is_finite() { rate.max(0.0) } else { 0.0 };
    }

    #[inline]
    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Total particles emitted so far.
    #[inline]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Number of particles to spawn for a frame of length `dt`.
    pub fn emit<R: Rng + ?Sized>(&mut self, dt: f32, rng: &mut R) -> usize {
        if dt <= 0.0 {
            return 0;
        }
        let count = stochastic_round(rng, self.rate * dt);
        self.emitted += count as u64;
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_rate_clamping() {
        assert_eq!(Emitter::new(-5.0).rate(), 0.0);
        assert_eq!(Emitter::new(f32::INFINITY).rate(), 0.0);
        assert_eq!(Emitter::new(30.0).rate(), 30.0);
    }

    #[test]
    fn test_no_emission_without_time() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut emitter = Emitter::new(1000.0);
        assert_eq!(emitter.emit(0.0, &mut rng), 0);
        assert_eq!(emitter.emit(-1.0, &mut rng), 0);
        assert_eq!(emitter.emitted(), 0);
    }

    #[test]
    fn test_low_rate_still_emits_on_average() {
        // 3 particles/s at 120 fps is 0.025 per frame.
        let mut rng = SmallRng::seed_from_u64(9);
        let mut emitter = Emitter::new(3.0);
        for _ in 0..12_000 {
            emitter.emit(1.0 / 120.0, &mut rng);
        }
        let expected = 300.0;
        let got = emitter.emitted() as f32;
        assert!((got - expected).abs() < expected * 0.15, "emitted {}", got);
    }
}

//! Age-driven appearance curves.
//!
//! Short-lived particles (splash decals) have no state beyond their age; their
//! opacity and scale are pure functions of it, described by a [`Lifecycle`].
//!
//! ```text
//! opacity
//!  base ─┐    ┌──────────────┐
//!        │   /                \
//!     0 ─┴──/──────────────────\──> age
//!        0  fade_in   lifetime-fade_out  lifetime
//! ```

use serde::{Deserialize, Serialize};

/// Fade and growth curve over a fixed lifetime.
///
/// # Example
///
/// ```
/// use squall::Lifecycle;
///
/// let l = Lifecycle::new(1.0).fade_in(0.1).fade_out(0.4).base_alpha(0.8);
/// assert_eq!(l.opacity(0.0), 0.0);
/// assert_eq!(l.opacity(0.5), 0.8);
/// assert_eq!(l.opacity(1.0), 0.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lifecycle {
    /// Total lifetime in seconds.
    pub lifetime: f32,
    /// Duration of the opening linear fade.
    pub fade_in: f32,
    /// Duration of the closing linear fade.
    pub fade_out: f32,
    /// Opacity held between the two fades.
    pub base_alpha: f32,
    /// Relative size gain reached at the end of life.
    pub growth: f32,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            lifetime: 0.6,
            fade_in: 0.05,
            fade_out: 0.35,
            base_alpha: 0.6,
            growth: 1.2,
        }
    }
}

impl Lifecycle {
    /// Curve with the given lifetime and no fades or growth.
    pub fn new(lifetime: f32) -> Self {
        Self {
            lifetime,
            fade_in: 0.0,
            fade_out: 0.0,
            base_alpha: 1.0,
            growth: 0.0,
        }
    }

    /// Set the opening fade, seconds.
    pub fn fade_in(mut self, seconds: f32) -> Self {
        self.fade_in = seconds;
        self
    }

    /// Set the closing fade, seconds.
    pub fn fade_out(mut self, seconds: f32) -> Self {
        self.fade_out = seconds;
        self
    }

    pub fn base_alpha(mut self, alpha: f32) -> Self {
        self.base_alpha = alpha;
        self
    }

    /// Set the size gain reached at the end of life. `1.0` doubles the size.
    pub fn growth(mut self, factor: f32) -> Self {
        self.growth = factor;
        self
    }

    /// Clamp every field into range.
    ///
    /// Negative durations become zero, alpha is clamped to `[0, 1]`, and if
    /// the two fades together exceed the lifetime they are shrunk
    /// proportionally to fit. Builders store values as given; the curve
    /// functions apply this on every call, so the order of builder calls
    /// never matters.
    pub fn sanitized(mut self) -> Self {
        let finite_or = |v: f32, d: f32| if v.is_finite() { v } else { d };
        self.lifetime = finite_or(self.lifetime, 0.0).max(0.0);
        self.fade_in = finite_or(self.fade_in, 0.0).max(0.0);
        self.fade_out = finite_or(self.fade_out, 0.0).max(0.0);
        self.base_alpha = finite_or(self.base_alpha, 1.0).clamp(0.0, 1.0);
        self.growth = finite_or(self.growth, 0.0).max(0.0);

        let fades = self.fade_in + self.fade_out;
        if fades > self.lifetime && fades > 0.0 {
            let k = self.lifetime / fades;
            self.fade_in *= k;
            self.fade_out *= k;
        }
        self
    }

    /// Whether a particle of this age has expired.
    #[inline]
    pub fn is_expired(&self, age: f32) -> bool {
        !(age < self.sanitized().lifetime)
    }

    /// Opacity at `age`.
    pub fn opacity(&self, age: f32) -> f32 {
        let l = self.sanitized();
        if age < 0.0 || l.is_expired(age) {
            return 0.0;
        }
        if age < l.fade_in {
            return l.base_alpha * age / l.fade_in;
        }
        let fade_start = l.lifetime - l.fade_out;
        if age < fade_start {
            l.base_alpha
        } else {
            l.base_alpha * (l.lifetime - age) / l.fade_out
        }
    }

    /// Scale multiplier at `age`, growing monotonically from 1 to `1 + growth`.
    pub fn scale(&self, age: f32) -> f32 {
        let l = self.sanitized();
        let t = if l.lifetime > 0.0 {
            (age / l.lifetime).clamp(0.0, 1.0)
        } else {
            1.0
        };
        1.0 + l.growth * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splash_curve() -> Lifecycle {
        Lifecycle::new(0.6)
            .fade_in(0.05)
            .fade_out(0.35)
            .base_alpha(0.6)
            .growth(1.2)
    }

    #[test]
    fn test_opacity_endpoints() {
        let l = splash_curve();
        assert_eq!(l.opacity(0.0), 0.0);
        assert!((l.opacity(0.05) - 0.6).abs() < 1e-6);
        assert!((l.opacity(0.2) - 0.6).abs() < 1e-6);
        assert_eq!(l.opacity(0.6), 0.0);
        assert_eq!(l.opacity(5.0), 0.0);
    }

    #[test]
    fn test_opacity_ramps_are_linear() {
        let l = splash_curve();
        assert!((l.opacity(0.025) - 0.3).abs() < 1e-5);
        // Halfway through the closing fade.
        assert!((l.opacity(0.425) - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_scale_grows_monotonically() {
        let l = splash_curve();
        let mut prev = l.scale(0.0);
        assert_eq!(prev, 1.0);
        for i in 1..=60 {
            let s = l.scale(i as f32 * 0.01);
            assert!(s >= prev);
            prev = s;
        }
        assert!((l.scale(0.6) - 2.2).abs() < 1e-5);
        assert!((l.scale(10.0) - 2.2).abs() < 1e-5);
    }

    #[test]
    fn test_sanitize_fits_fades_into_lifetime() {
        let l = Lifecycle::new(1.0).fade_in(1.0).fade_out(3.0).sanitized();
        assert!((l.fade_in - 0.25).abs() < 1e-6);
        assert!((l.fade_out - 0.75).abs() < 1e-6);
        // Peak is reached exactly where the fades meet.
        assert!((l.opacity(0.25) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_builder_order_does_not_matter() {
        let a = Lifecycle::new(0.6).fade_out(0.35).fade_in(0.5);
        let b = Lifecycle::new(0.6).fade_in(0.5).fade_out(0.35);
        assert_eq!(a, b);
        assert_eq!(a.fade_out, 0.35);
        assert_eq!(a.sanitized(), b.sanitized());
        for i in 0..=12 {
            let age = i as f32 * 0.05;
            assert_eq!(a.opacity(age), b.opacity(age));
        }

        // Setting the lifetime last still fits both fades into it.
        let late = Lifecycle { lifetime: 0.3, ..Lifecycle::new(2.0).fade_in(0.2).fade_out(0.4) };
        let fitted = late.sanitized();
        assert!((fitted.fade_in - 0.1).abs() < 1e-6);
        assert!((fitted.fade_out - 0.2).abs() < 1e-6);
        assert_eq!(late.opacity(0.3), 0.0);
        assert!((late.opacity(0.1) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_curves_sanitize_raw_fields() {
        let raw = Lifecycle {
            lifetime: 1.0,
            fade_in: -1.0,
            fade_out: f32::NAN,
            base_alpha: 3.0,
            growth: -2.0,
        };
        assert_eq!(raw.opacity(0.0), 1.0);
        assert_eq!(raw.opacity(0.99), 1.0);
        assert_eq!(raw.scale(0.5), 1.0);
        assert!(raw.is_expired(1.0));
        assert!(Lifecycle::new(f32::NAN).is_expired(0.0));
    }

    #[test]
    fn test_no_fades_holds_alpha() {
        let l = Lifecycle::new(1.0).base_alpha(0.5);
        assert_eq!(l.opacity(0.0), 0.5);
        assert_eq!(l.opacity(0.999), 0.5);
        assert_eq!(l.opacity(1.0), 0.0);
    }
}

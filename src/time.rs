//! Frame timing.
//!
//! The simulation itself never reads a clock: every `advance` takes an
//! explicit `dt`. [`FrameClock`] is the convenience that produces that `dt`
//! from a monotonic clock, clamped so that a stall (app backgrounded,
//! debugger break) cannot make the simulation jump.
//!
//! # Example
//!
//! ```ignore
//! use squall::time::FrameClock;
//!
//! let mut clock = FrameClock::new(0.05);
//!
//! // In your frame callback:
//! let dt = clock.update();
//! session.step(dt, input, &storm, &ground);
//! ```

use std::time::{Duration, Instant};

/// Default cap on a single frame step, in seconds.
pub const DEFAULT_MAX_DT: f32 = 0.05;

/// Clamp a frame delta into `[0, max_dt]`. Non-finite deltas become zero.
#[inline]
pub fn clamp_delta(dt: f32, max_dt: f32) -> f32 {
    if dt.is_finite() {
        dt.clamp(0.0, max_dt.max(0.0))
    } else {
        0.0
    }
}

/// Monotonic frame clock with a clamped delta.
#[derive(Debug)]
pub struct FrameClock {
    /// When the clock was created.
    start: Instant,
    /// When the last frame occurred.
    last_frame: Instant,
    /// Clamped time since last frame in seconds.
    delta_secs: f32,
    /// Largest delta handed out.
    max_delta: f32,
    /// Total frames since start.
    frame_count: u64,
    /// Whether time is paused.
    paused: bool,
    /// Fixed delta time for deterministic replays (optional).
    fixed_delta: Option<f32>,
    /// Time scale multiplier (1.0 = normal speed).
    time_scale: f32,
}

impl FrameClock {
    /// Create a clock starting now, capping each delta at `max_delta` seconds.
    pub fn new(max_delta: f32) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            delta_secs: 0.0,
            max_delta: clamp_delta(max_delta, f32::MAX),
            frame_count: 0,
            paused: false,
            fixed_delta: None,
            time_scale: 1.0,
        }
    }

    /// Advance to the current instant. Call once per frame.
    ///
    /// Returns the clamped delta time in seconds.
    pub fn update(&mut self) -> f32 {
        let now = Instant::now();
        let raw = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if self.paused {
            self.delta_secs = 0.0;
            return 0.0;
        }

        let scaled = self.fixed_delta.unwrap_or(raw) * self.time_scale;
        self.delta_secs = clamp_delta(scaled, self.max_delta);
        if scaled > self.max_delta {
            log::debug!(
                "frame delta {:.3}s exceeds {:.3}s, clamping",
                scaled,
                self.max_delta
            );
        }
        self.frame_count += 1;
        self.delta_secs
    }

    /// Clamped time since last frame in seconds.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    #[inline]
    pub fn max_delta(&self) -> f32 {
        self.max_delta
    }

    /// Total frames since start (paused frames excluded).
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Wall time since the clock was created.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop handing out time; `update` returns 0 until resumed.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume after a pause. The paused interval is not replayed.
    pub fn resume(&mut self) {
        if self.paused {
            self.last_frame = Instant::now();
            self.paused = false;
        }
    }

    /// Use a fixed delta per update instead of wall time.
    ///
    /// Pass `None` to return to real frame timing.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }

    /// Set time scale multiplier. Negative values clamp to 0.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DT)
    }
}

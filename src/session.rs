//! Frame driver.
//!
//! [`StormSession`] owns every subsystem and runs them once per frame:
//!
//! 1. Read the floor height from the ground, falling back to the configured
//!    default.
//! 2. If the time index changed, read a new sample from the provider.
//!    Otherwise reuse the cached one. A changed yaw calibration re-derives
//!    rain parameters; a changed floor re-targets the water.
//! 3. Age splashes.
//! 4. Advance rain; every hit spawns a splash before `advance` returns.
//! 5. Advance water and fog.
//!
//! Nothing in this path allocates or fails.
//!
//! # Example
//!
//! ```
//! use squall::prelude::*;
//!
//! let samples = vec![WeatherSample {
//!     rain_mm_per_hour: 20.0,
//!     wind_speed_mps: 10.0,
//!     wind_dir_from_deg: 90.0,
//!     water_depth_m: 0.3,
//! }];
//! let mut session = StormSession::new(SessionConfig::default().seed(1));
//! let ground = GroundPlane::new(0.0);
//!
//! for _ in 0..120 {
//!     session.step(1.0 / 60.0, FrameInput::at(0), &samples, &ground);
//! }
//! assert!(session.rain().active_count() > 0);
//!
//! let mut poses = PoseBuffer::new();
//! session.publish(&mut poses);
//! assert_eq!(poses.poses(ProxyLayer::Rain).len(), session.rain().capacity());
//! ```

use crate::config::SessionConfig;
use crate::fog::Fog;
use crate::ground::Ground;
use crate::rain::{RainSimulator, RainStep};
use crate::splash::SplashSystem;
use crate::storm::{SampleProvider, WeatherSample};
use crate::time::{clamp_delta, FrameClock};
use crate::visuals::{ProxyLayer, ProxyPose, ProxySink};
use crate::water::WaterField;
use crate::Vec3;

/// Per-frame external input.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Time step of the storm series to show.
    pub index: usize,
    /// Rotation from data north to world +Z, degrees.
    pub world_yaw_deg: f32,
}

impl FrameInput {
    /// Show time step `index` with no yaw.
    pub fn at(index: usize) -> Self {
        Self {
            index,
            world_yaw_deg: 0.0,
        }
    }

    /// Set the world yaw calibration.
    pub fn yaw(mut self, degrees: f32) -> Self {
        self.world_yaw_deg = degrees;
        self
    }
}

/// What happened during one [`StormSession::step`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameReport {
    /// Step actually simulated, after clamping.
    pub dt: f32,
    /// Floor height used this frame.
    pub floor: f32,
    /// A new sample was read from the provider.
    pub refreshed: bool,
    pub rain: RainStep,
    pub splashes_spawned: usize,
    pub splashes_expired: usize,
    /// Ground raycasts that hit while conforming water tiles.
    pub conform_hits: usize,
}

/// Rain, splashes, water and fog driven by one storm series.
#[derive(Debug)]
pub struct StormSession {
    config: SessionConfig,
    rain: RainSimulator,
    splashes: SplashSystem,
    water: WaterField,
    fog: Fog,
    sample: WeatherSample,
    cached_index: Option<usize>,
    cached_yaw: f32,
    cached_floor: f32,
    frame: u64,
}

impl StormSession {
    /// Create a session; `config` is sanitized first.
    pub fn new(config: SessionConfig) -> Self {
        let config = config.sanitized();
        let (rain, splashes) = match config.seed {
            Some(seed) => (
                RainSimulator::with_seed(config.rain.clone(), seed),
                SplashSystem::with_seed(config.splash.clone(), seed.wrapping_add(1)),
            ),
            None => (
                RainSimulator::new(config.rain.clone()),
                SplashSystem::new(config.splash.clone()),
            ),
        };
        let mut water = WaterField::new(config.water.clone());
        water.reset(config.water.level_for(config.default_floor, 0.0));
        let fog = Fog::new(config.fog.clone());

        log::info!(
            "storm session: {} rain slots, {} splash slots, {} water tiles, max dt {:.3}s",
            rain.capacity(),
            splashes.capacity(),
            water.tile_count(),
            config.max_dt
        );

        Self {
            config,
            rain,
            splashes,
            water,
            fog,
            sample: WeatherSample::default(),
            cached_index: None,
            cached_yaw: 0.0,
            cached_floor: f32::NAN,
            frame: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[inline]
    pub fn rain(&self) -> &RainSimulator {
        &self.rain
    }

    #[inline]
    pub fn splashes(&self) -> &SplashSystem {
        &self.splashes
    }

    #[inline]
    pub fn water(&self) -> &WaterField {
        &self.water
    }

    #[inline]
    pub fn fog(&self) -> &Fog {
        &self.fog
    }

    /// The sample currently driving the simulation.
    #[inline]
    pub fn sample(&self) -> &WeatherSample {
        &self.sample
    }

    /// Time index of the cached sample, if any has been read.
    #[inline]
    pub fn cached_index(&self) -> Option<usize> {
        self.cached_index
    }

    /// Frames stepped so far.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Run one frame of `dt` seconds.
    pub fn step<S, G>(&mut self, dt: f32, input: FrameInput, samples: &S, ground: &G) -> FrameReport
    where
        S: SampleProvider + ?Sized,
        G: Ground + ?Sized,
    {
        let dt = clamp_delta(dt, self.config.max_dt);
        let floor = ground
            .floor_height()
            .filter(|h| h.is_finite())
            .unwrap_or(self.config.default_floor);
        let refreshed = self.refresh(input, floor, samples);

        let splashes_expired = self.splashes.advance(dt);

        let splashes = &mut self.splashes;
        let mut splashes_spawned = 0;
        let rain = self.rain.advance(dt, floor, ground, |point| {
            if splashes.spawn(point).is_some() {
                splashes_spawned += 1;
            }
        });

        self.water.advance(dt);
        let conform_hits = self.water.conform(ground);
        self.fog.advance(dt);
        self.frame += 1;

        FrameReport {
            dt,
            floor,
            refreshed,
            rain,
            splashes_spawned,
            splashes_expired,
            conform_hits,
        }
    }

    /// Run one frame timed by `clock`.
    pub fn tick<S, G>(
        &mut self,
        clock: &mut FrameClock,
        input: FrameInput,
        samples: &S,
        ground: &G,
    ) -> FrameReport
    where
        S: SampleProvider + ?Sized,
        G: Ground + ?Sized,
    {
        let dt = clock.update();
        self.step(dt, input, samples, ground)
    }

    /// Bring cached parameters up to date. Returns whether a sample was read.
    fn refresh<S>(&mut self, input: FrameInput, floor: f32, samples: &S) -> bool
    where
        S: SampleProvider + ?Sized,
    {
        let yaw = if input.world_yaw_deg.is_finite() {
            input.world_yaw_deg
        } else {
            0.0
        };

        let index_changed = self.cached_index != Some(input.index);
        if index_changed {
            let water = &self.config.water;
            self.sample = samples
                .sample(input.index)
                .unwrap_or_default()
                .sanitized(water.min_depth, water.max_depth);
            self.cached_index = Some(input.index);
            log::debug!(
                "index {}: rain {:.1} mm/h, wind {:.1} m/s from {:.0}°, depth {:.2} m",
                input.index,
                self.sample.rain_mm_per_hour,
                self.sample.wind_speed_mps,
                self.sample.wind_dir_from_deg,
                self.sample.water_depth_m
            );
        }

        if index_changed || yaw != self.cached_yaw {
            self.rain.configure(
                self.sample.rain_mm_per_hour,
                self.sample.wind_speed_mps,
                self.sample.wind_dir_from_deg,
                yaw,
            );
            self.fog.set_rain(self.sample.rain_mm_per_hour);
            self.cached_yaw = yaw;
        }

        if index_changed || floor != self.cached_floor {
            let level = self.config.water.level_for(floor, self.sample.water_depth_m);
            self.water.set_target(level);
            self.cached_floor = floor;
        }

        index_changed
    }

    /// Send a pose for every proxy slot to `sink`. Free slots are sent
    /// hidden, so slot `i` of a layer always maps to the same proxy.
    pub fn publish<K: ProxySink + ?Sized>(&self, sink: &mut K) {
        for (index, slot) in self.rain.slots().enumerate() {
            let pose = slot.map_or(ProxyPose::HIDDEN, |drop| self.rain.drop_pose(drop));
            sink.set_pose(ProxyLayer::Rain, index, &pose);
        }

        for (index, slot) in self.splashes.slots().enumerate() {
            let pose = slot.map_or(ProxyPose::HIDDEN, |decal| self.splashes.decal_pose(decal));
            sink.set_pose(ProxyLayer::Splash, index, &pose);
        }

        for index in 0..self.water.tile_count() {
            let pose = self.water.tile_pose(index).unwrap_or(ProxyPose::HIDDEN);
            sink.set_pose(ProxyLayer::Water, index, &pose);
        }

        let base = Vec3::new(0.0, self.cached_floor_or_default(), 0.0);
        sink.set_pose(ProxyLayer::Fog, 0, &self.fog.pose(base));
    }

    fn cached_floor_or_default(&self) -> f32 {
        if self.cached_floor.is_finite() {
            self.cached_floor
        } else {
            self.config.default_floor
        }
    }

    /// Drop every live particle and forget the cached sample. The water
    /// level is kept.
    pub fn clear(&mut self) {
        self.rain.clear();
        self.splashes.clear();
        self.cached_index = None;
    }
}

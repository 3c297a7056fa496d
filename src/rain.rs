//! Pooled rain drops.
//!
//! Drops are born at the top of the scene, fall at a fixed terminal speed
//! while the wind pushes them sideways, and die when they reach the ground.
//! Every death by collision is reported once through the `on_hit` callback,
//! which is how splashes get spawned.
//!
//! # Frame order
//!
//! [`RainSimulator::advance`] runs, in order:
//!
//! 1. **Spawn** - `spawn_rate × dt` new drops, stochastically rounded
//! 2. **Integrate** - one explicit Euler step per live drop
//! 3. **Collide** - segment raycast against the ground, with a floor-height
//!    fallback; hits are reported and released in the same pass
//! 4. **Cap** - excess drops over the derived target are released
//!
//! # Wind convention
//!
//! Weather data gives the direction the wind blows *from* (0° = from the
//! north). Drops move *toward* `from + 180°`, rotated by the world yaw
//! calibration. Bearing 0° is world `+Z`, 90° is world `+X`.

use crate::emitter::Emitter;
use crate::ground::Ground;
use crate::pool::ParticlePool;
use crate::spawn::{self, SpawnArea};
use crate::time::clamp_delta;
use crate::visuals::ProxyPose;
use crate::{Quat, Vec3};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Horizontal drift per m/s of wind speed.
///
/// Calibration constant picked by eye so that storm-force wind reads as
/// slanted rain without sweeping every drop out of the room. Not physics.
pub const WIND_DRIFT_FACTOR: f32 = 0.6;

/// Tuning for a [`RainSimulator`].
///
/// # Example
///
/// ```
/// use squall::{RainConfig, SpawnArea};
///
/// let config = RainConfig::default()
///     .capacity(1000)
///     .spawn_rate(10.0, 30.0)
///     .area(SpawnArea::Disc { radius: 2.5 })
///     .fall_speed(6.0);
/// assert_eq!(config.capacity, 1000);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RainConfig {
    /// Pool size; the hard cap on live drops.
    pub capacity: usize,
    /// Drops per second with no rain.
    pub base_rate: f32,
    /// Additional drops per second for each mm/h of rain.
    pub rate_per_mm_per_hour: f32,
    /// Where drops are born, in the XZ plane.
    pub area: SpawnArea,
    /// Spawn height above the floor.
    pub top_margin: f32,
    /// How far outside the area a drop may drift before it is culled.
    pub exit_margin: f32,
    /// Terminal fall speed (m/s, positive).
    pub fall_speed: f32,
    /// Per-drop fall speed variation, as a fraction of `fall_speed`.
    pub fall_jitter: f32,
    /// Per-drop horizontal velocity variation (m/s).
    pub wind_jitter: f32,
    /// Horizontal drift per m/s of wind.
    pub wind_drift: f32,
    /// How far below the floor a drop may sink before the fallback test
    /// counts it as a hit.
    pub floor_tolerance: f32,
    /// Streak length at `fall_speed`.
    pub streak_length: f32,
    /// Visual width of a drop.
    pub drop_width: f32,
    /// Largest step accepted by `advance`.
    pub max_dt: f32,
    /// Allowed live drops relative to the expected steady-state count.
    pub cap_headroom: f32,
}

impl Default for RainConfig {
    fn default() -> Self {
        Self {
            capacity: 400,
            base_rate: 0.0,
            rate_per_mm_per_hour: 22.5,
            area: SpawnArea::default(),
            top_margin: 3.0,
            exit_margin: 1.0,
            fall_speed: 4.5,
            fall_jitter: 0.1,
            wind_jitter: 0.15,
            wind_drift: WIND_DRIFT_FACTOR,
            floor_tolerance: 0.01,
            streak_length: 0.12,
            drop_width: 0.004,
            max_dt: 0.05,
            cap_headroom: 1.5,
        }
    }
}

impl RainConfig {
    /// Set the pool size. Memory for every slot is allocated up front.
    pub fn capacity(mut self, n: usize) -> Self {
        self.capacity = n;
        self
    }

    /// Set the spawn rate as `base + rain_mm_per_hour × per_mm`.
    /// Set the spawn rate as `base + per_mm × rain` drops per second.
    pub fn spawn_rate(mut self, base: f32, per_mm: f32) -> Self {
        self.base_rate = base;
        self.rate_per_mm_per_hour = per_mm;
        self
    }

    /// Set the spawn footprint around the viewer.
    pub fn area(mut self, area: SpawnArea) -> Self {
        self.area = area;
        self
    }

    /// Set the spawn height above the floor. Together with `fall_speed`
    /// this fixes the flight time and so the steady-state drop count.
    pub fn top_margin(mut self, meters: f32) -> Self {
        self.top_margin = meters;
        self
    }

    /// Set the terminal fall speed, m/s.
    pub fn fall_speed(mut self, speed: f32) -> Self {
        self.fall_speed = speed;
        self
    }

    /// Set per-drop variation: horizontal m/s and vertical fraction.
    pub fn jitter(mut self, wind: f32, fall: f32) -> Self {
        self.wind_jitter = wind;
        self.fall_jitter = fall;
        self
    }

    /// Set the largest step `advance` integrates; longer frames are clamped.
    pub fn max_dt(mut self, seconds: f32) -> Self {
        self.max_dt = seconds;
        self
    }

    /// Clamp fields into usable ranges.
    ///
    /// Jitter is bounded so that every drop still falls.
    pub fn sanitized(mut self) -> Self {
        let pos = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        self.base_rate = pos(self.base_rate);
        self.rate_per_mm_per_hour = pos(self.rate_per_mm_per_hour);
        self.top_margin = pos(self.top_margin);
        self.exit_margin = pos(self.exit_margin);
        self.fall_speed = pos(self.fall_speed).max(0.1);
        self.fall_jitter = pos(self.fall_jitter).min(0.9);
        self.wind_jitter = pos(self.wind_jitter);
        self.wind_drift = pos(self.wind_drift);
        self.floor_tolerance = pos(self.floor_tolerance);
        self.streak_length = pos(self.streak_length);
        self.drop_width = pos(self.drop_width);
        self.max_dt = pos(self.max_dt);
        self.cap_headroom = pos(self.cap_headroom).max(1.0);
        self
    }

    /// Seconds a drop at terminal speed needs from spawn to floor.
    #[inline]
    pub fn flight_time(&self) -> f32 {
        self.top_margin / self.fall_speed
    }
}

/// Payload of a rain slot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RainDrop {
    pub position: Vec3,
    /// World-space velocity, m/s. Constant over the drop's flight.
    pub velocity: Vec3,
    /// Length of the rendered streak.
    pub streak_length: f32,
}

/// Parameters derived by [`RainSimulator::configure`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RainParams {
    pub rain_mm_per_hour: f32,
    pub wind_speed_mps: f32,
    /// Direction of motion, degrees in `[0, 360)`.
    pub bearing_deg: f32,
    /// Drops per second.
    pub spawn_rate: f32,
    pub horizontal_velocity: Vec3,
    /// Live drops above this count are released.
    pub target_active: usize,
}

/// What happened during one [`RainSimulator::advance`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RainStep {
    pub spawned: usize,
    /// Spawns that had to evict a live drop.
    pub recycled: usize,
    pub hits: usize,
    /// Drops culled for leaving the scene bounds.
    pub exited: usize,
    /// Drops released by cap enforcement.
    pub trimmed: usize,
}

/// Motion bearing for wind blowing from `from_deg`, in `[0, 360)`.
///
/// ```
/// use squall::rain::motion_bearing_deg;
///
/// assert_eq!(motion_bearing_deg(0.0, 0.0), 180.0);
/// assert_eq!(motion_bearing_deg(90.0, 90.0), 0.0);
/// ```
pub fn motion_bearing_deg(from_deg: f32, world_yaw_deg: f32) -> f32 {
    let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
    let bearing = (finite(from_deg) + 180.0 + finite(world_yaw_deg)).rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Pooled rain-drop simulator.
#[derive(Debug)]
pub struct RainSimulator {
    config: RainConfig,
    pool: ParticlePool<RainDrop>,
    emitter: Emitter,
    params: RainParams,
    rng: SmallRng,
}

impl RainSimulator {
    /// Create a simulator seeded from OS entropy.
    pub fn new(config: RainConfig) -> Self {
        Self::with_rng(config, SmallRng::from_entropy())
    }

    /// Create a simulator with a fixed seed, for reproducible runs.
    pub fn with_seed(config: RainConfig, seed: u64) -> Self {
        Self::with_rng(config, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(config: RainConfig, rng: SmallRng) -> Self {
        let config = config.sanitized();
        let pool = ParticlePool::new(config.capacity);
        let mut sim = Self {
            config,
            pool,
            emitter: Emitter::default(),
            params: RainParams::default(),
            rng,
        };
        sim.configure(0.0, 0.0, 0.0, 0.0);
        sim
    }

    #[inline]
    pub fn config(&self) -> &RainConfig {
        &self.config
    }

    /// Parameters from the last [`configure`](Self::configure).
    #[inline]
    pub fn params(&self) -> &RainParams {
        &self.params
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Total drops spawned since creation.
    #[inline]
    pub fn spawned_total(&self) -> u64 {
        self.emitter.emitted()
    }

    /// Live drops as `(slot, drop)`.
    pub fn drops(&self) -> impl Iterator<Item = (usize, &RainDrop)> {
        self.pool.iter()
    }

    /// Every slot in index order, `None` for free ones.
    pub fn slots(&self) -> impl Iterator<Item = Option<&RainDrop>> {
        self.pool.slots()
    }

    /// Update the weather driving the rain.
    ///
    /// Negative or non-finite magnitudes are treated as zero. Has no effect
    /// on live drops until the next [`advance`](Self::advance).
    pub fn configure(
        &mut self,
        rain_mm_per_hour: f32,
        wind_speed_mps: f32,
        wind_dir_from_deg: f32,
        world_yaw_deg: f32,
    ) {
        let non_negative = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        let rain = non_negative(rain_mm_per_hour);
        let wind = non_negative(wind_speed_mps);

        let bearing_deg = motion_bearing_deg(wind_dir_from_deg, world_yaw_deg);
        let (sin, cos) = bearing_deg.to_radians().sin_cos();
        let drift = wind * self.config.wind_drift;
        let horizontal_velocity = Vec3::new(sin * drift, 0.0, cos * drift);

        let capacity = self.pool.capacity() as f32;
        let spawn_rate =
            (self.config.base_rate + rain * self.config.rate_per_mm_per_hour).min(capacity);
        let steady = spawn_rate * self.config.flight_time() * self.config.cap_headroom;
        let target_active = (steady.ceil() as usize).min(self.pool.capacity());

        self.emitter.set_rate(spawn_rate);
        self.params = RainParams {
            rain_mm_per_hour: rain,
            wind_speed_mps: wind,
            bearing_deg,
            spawn_rate,
            horizontal_velocity,
            target_active,
        };
    }

    /// Advance all drops by `dt` seconds.
    ///
    /// `on_hit` is called once with the impact point of every drop that
    /// reaches the ground this frame; that drop is already released when the
    /// call returns.
    pub fn advance<G, F>(&mut self, dt: f32, floor_height: f32, ground: &G, mut on_hit: F) -> RainStep
    where
        G: Ground + ?Sized,
        F: FnMut(Vec3),
    {
        let mut step = RainStep::default();
        let dt = clamp_delta(dt, self.config.max_dt);
        if dt <= 0.0 {
            return step;
        }
        let floor = if floor_height.is_finite() { floor_height } else { 0.0 };

        self.spawn(dt, floor, &mut step);

        let tolerance = self.config.floor_tolerance;
        let ceiling = floor + self.config.top_margin + self.config.exit_margin;
        let area = self.config.area;
        let margin = self.config.exit_margin + self.drift_distance();
        let mut hits = 0;
        let mut exited = 0;

        self.pool.retain(|_, drop| {
            let from = drop.position;
            let to = from + drop.velocity * dt;

            let hit = ground
                .raycast_ground(from, to)
                .or_else(|| floor_fallback(from, to, floor, tolerance));
            if let Some(point) = hit {
                on_hit(point);
                hits += 1;
                return false;
            }

            drop.position = to;
            if to.y > ceiling || !area.contains(to, margin) {
                exited += 1;
                return false;
            }
            true
        });

        step.hits = hits;
        step.exited = exited;
        step.trimmed = self.pool.release_excess(self.params.target_active);
        step
    }

    /// Release every drop.
    pub fn clear(&mut self) {
        self.pool.clear();
    }

    /// Pose for the visual proxy of `drop`.
    ///
    /// The proxy's local +Y is aligned against the velocity so the streak
    /// trails behind the drop.
    pub fn drop_pose(&self, drop: &RainDrop) -> ProxyPose {
        let back = (-drop.velocity).normalize_or_zero();
        let rotation = if back == Vec3::ZERO {
            Quat::IDENTITY
        } else {
            Quat::from_rotation_arc(Vec3::Y, back)
        };
        let w = self.config.drop_width;
        ProxyPose::visible(
            drop.position,
            rotation,
            Vec3::new(w, drop.streak_length, w),
            1.0,
        )
    }

    /// Horizontal distance a drop drifts over its nominal flight.
    fn drift_distance(&self) -> f32 {
        self.params.horizontal_velocity.length() * self.config.flight_time()
    }

    fn spawn(&mut self, dt: f32, floor: f32, step: &mut RainStep) {
        let count = self.emitter.emit(dt, &mut self.rng);
        if count == 0 {
            return;
        }

        let top = floor + self.config.top_margin;
        let wind = self.params.horizontal_velocity;
        // Spawn upwind so drops land inside the area.
        let upwind = -wind * self.config.flight_time();
        let fall = self.config.fall_speed;

        for _ in 0..count {
            let position = self.config.area.sample(&mut self.rng, top) + upwind;
            let jitter = Vec3::new(
                spawn::symmetric(&mut self.rng, self.config.wind_jitter),
                0.0,
                spawn::symmetric(&mut self.rng, self.config.wind_jitter),
            );
            let vertical = -fall * (1.0 + spawn::symmetric(&mut self.rng, self.config.fall_jitter));
            let velocity = wind + jitter + Vec3::new(0.0, vertical, 0.0);
            let streak_length = self.config.streak_length * velocity.length() / fall;

            let drop = RainDrop {
                position,
                velocity,
                streak_length,
            };
            match self.pool.insert(drop) {
                Some(acquired) => {
                    step.spawned += 1;
                    if acquired.recycled {
                        step.recycled += 1;
                    }
                }
                None => break,
            }
        }
    }
}

/// Height-threshold collision used when the ground has no geometric query.
fn floor_fallback(from: Vec3, to: Vec3, floor: f32, tolerance: f32) -> Option<Vec3> {
    if to.y >= floor - tolerance {
        return None;
    }
    let t = if from.y > to.y {
        ((from.y - floor) / (from.y - to.y)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut point = from.lerp(to, t);
    point.y = floor;
    Some(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground::{GroundPlane, NoGround};

    fn calm_config() -> RainConfig {
        RainConfig::default().jitter(0.0, 0.0)
    }

    #[test]
    fn test_bearing_conversion() {
        assert_eq!(motion_bearing_deg(0.0, 0.0), 180.0);
        assert_eq!(motion_bearing_deg(90.0, 90.0), 0.0);
        assert_eq!(motion_bearing_deg(270.0, -180.0), 270.0);
        assert_eq!(motion_bearing_deg(f32::NAN, 0.0), 180.0);
        let b = motion_bearing_deg(-180.0, -1e-6);
        assert!((0.0..360.0).contains(&b));
    }

    #[test]
    fn test_configure_wind_from_north_blows_south() {
        let mut rain = RainSimulator::with_seed(calm_config(), 1);
        rain.configure(10.0, 10.0, 0.0, 0.0);
        let v = rain.params().horizontal_velocity;
        assert!((v.z + 6.0).abs() < 1e-4, "velocity {:?}", v);
        assert!(v.x.abs() < 1e-4);
        assert_eq!(rain.params().bearing_deg, 180.0);
    }

    #[test]
    fn test_configure_clamps_negative_inputs() {
        let mut rain = RainSimulator::with_seed(calm_config(), 1);
        rain.configure(-4.0, -8.0, 45.0, 0.0);
        let p = rain.params();
        assert_eq!(p.rain_mm_per_hour, 0.0);
        assert_eq!(p.wind_speed_mps, 0.0);
        assert_eq!(p.spawn_rate, 0.0);
        assert_eq!(p.horizontal_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_spawn_rate_clamped_to_capacity() {
        let mut rain = RainSimulator::with_seed(calm_config().capacity(50), 1);
        rain.configure(1000.0, 0.0, 0.0, 0.0);
        assert_eq!(rain.params().spawn_rate, 50.0);
        assert!(rain.params().target_active <= 50);
    }

    #[test]
    fn test_drops_fall_and_stay_in_band() {
        let config = calm_config();
        let top = config.top_margin;
        let mut rain = RainSimulator::with_seed(config, 3);
        rain.configure(20.0, 5.0, 270.0, 0.0);
        for _ in 0..300 {
            rain.advance(1.0 / 60.0, 0.0, &NoGround, |_| {});
            for (_, drop) in rain.drops() {
                assert!(drop.velocity.y < 0.0);
                assert!(drop.position.y >= -0.01 - 1e-6);
                assert!(drop.position.y <= top + 1.0);
            }
        }
        assert!(rain.active_count() > 0);
    }

    #[test]
    fn test_every_hit_releases_its_drop() {
        let mut rain = RainSimulator::with_seed(calm_config(), 4);
        rain.configure(15.0, 0.0, 0.0, 0.0);
        let mut total_hits = 0;
        for _ in 0..600 {
            let before = rain.active_count();
            let mut reported = 0;
            let step = rain.advance(1.0 / 60.0, 0.0, &NoGround, |p| {
                assert!(p.y.abs() < 1e-6);
                reported += 1;
            });
            assert_eq!(reported, step.hits);
            assert_eq!(
                rain.active_count(),
                before + step.spawned - step.recycled - step.hits - step.exited - step.trimmed
            );
            total_hits += reported;
        }
        assert!(total_hits > 0);
    }

    #[test]
    fn test_raycast_hit_point_is_used() {
        let config = calm_config().spawn_rate(0.0, 0.0);
        let mut rain = RainSimulator::with_seed(config, 5);
        let acquired = rain
            .pool
            .insert(RainDrop {
                position: Vec3::new(0.0, 0.1, 0.0),
                velocity: Vec3::new(2.0, -4.0, 0.0),
                streak_length: 0.1,
            })
            .unwrap();
        rain.params.target_active = 10;

        let mut hits = Vec::new();
        rain.advance(0.05, 0.0, &GroundPlane::new(0.0), |p| hits.push(p));
        assert_eq!(hits.len(), 1);
        assert!((hits[0].x - 0.05).abs() < 1e-5);
        assert!(!rain.pool.is_active(acquired.index));
    }

    #[test]
    fn test_dt_is_clamped() {
        let config = calm_config().spawn_rate(0.0, 0.0);
        let max_dt = config.max_dt;
        let drop = RainDrop {
            position: Vec3::new(0.0, 2.0, 0.0),
            velocity: Vec3::new(0.5, -1.0, 0.0),
            streak_length: 0.1,
        };

        let mut a = RainSimulator::with_seed(config.clone(), 6);
        a.params.target_active = 10;
        a.pool.insert(drop);
        a.advance(5.0, 0.0, &NoGround, |_| {});

        let mut b = RainSimulator::with_seed(config, 6);
        b.params.target_active = 10;
        b.pool.insert(drop);
        b.advance(max_dt, 0.0, &NoGround, |_| {});

        let pa = a.drops().next().unwrap().1.position;
        let pb = b.drops().next().unwrap().1.position;
        assert_eq!(pa, pb);
        assert!((pa.y - (2.0 - max_dt)).abs() < 1e-6);
    }

    #[test]
    fn test_intensity_drop_trims_excess() {
        let mut rain = RainSimulator::with_seed(calm_config(), 7);
        rain.configure(15.0, 0.0, 0.0, 0.0);
        for _ in 0..120 {
            rain.advance(1.0 / 60.0, 0.0, &NoGround, |_| {});
        }
        assert!(rain.active_count() > 10);

        rain.configure(0.0, 0.0, 0.0, 0.0);
        let step = rain.advance(1.0 / 60.0, 0.0, &NoGround, |_| {});
        assert!(step.trimmed > 0);
        assert_eq!(rain.active_count(), 0);
    }

    #[test]
    fn test_drop_pose_tilts_with_wind() {
        let rain = RainSimulator::with_seed(calm_config(), 8);
        let drop = RainDrop {
            position: Vec3::ONE,
            velocity: Vec3::new(3.0, -3.0, 0.0),
            streak_length: 0.2,
        };
        let pose = rain.drop_pose(&drop);
        let up = Quat::from_array(pose.rotation) * Vec3::Y;
        assert!((up - Vec3::new(-1.0, 1.0, 0.0).normalize()).length() < 1e-4);
        assert_eq!(pose.scale[1], 0.2);
        assert_eq!(pose.visible, 1);
    }
}

//! # squall - storm weather particles and surfaces
//!
//! Real-time rain, splash, water and fog simulation for replaying storm time
//! series (rain rate, wind, water level) around a viewer.
//!
//! squall owns no rendering resources. It simulates fixed pools of particles
//! and describes each frame as a set of numeric poses for a bounded number of
//! visual proxies; a renderer draws them however it likes.
//!
//! ## Quick Start
//!
//! ```no_run
//! use squall::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storm = StormData::load("ida_sites.json")?;
//!     let mut session = StormSession::new(SessionConfig::default());
//!     let ground = GroundPlane::new(0.0);
//!     let mut clock = FrameClock::default();
//!     let mut poses = PoseBuffer::new();
//!
//!     loop {
//!         session.tick(&mut clock, FrameInput::at(0), &storm, &ground);
//!         session.publish(&mut poses);
//!         // upload poses.bytes(ProxyLayer::Rain) ...
//!     }
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Pools
//!
//! Every particle kind lives in a [`ParticlePool`]: a fixed number of slots
//! allocated once. When a pool is full the oldest particle is recycled, so
//! heavy weather degrades gracefully instead of failing.
//!
//! ### Subsystems
//!
//! - [`RainSimulator`] - wind-driven drops that collide with the ground
//! - [`SplashSystem`] - ripple decals spawned by rain hits
//! - [`WaterField`] - a flat water surface easing toward the storm's level
//! - [`Fog`] - a veil that thickens with the rain
//!
//! [`StormSession`] wires them together and runs them once per frame.
//!
//! ### Ground
//!
//! Collisions and water levels are relative to a floor supplied through the
//! [`Ground`] trait. [`SharedFloor`] lets a sensing thread publish the floor
//! height without locking.
//!
//! ### Storm data
//!
//! [`StormData`] loads a JSON bundle of per-site series. Anything else can
//! drive a session by implementing [`SampleProvider`].

pub mod config;
mod emitter;
pub mod error;
pub mod fog;
pub mod ground;
pub mod lifecycle;
pub mod pool;
pub mod rain;
pub mod session;
pub mod spawn;
pub mod splash;
pub mod storm;
pub mod time;
pub mod visuals;
pub mod water;

pub use bytemuck;
pub use config::SessionConfig;
pub use emitter::Emitter;
pub use error::LoadError;
pub use fog::{Fog, FogConfig};
pub use glam::{Quat, Vec2, Vec3};
pub use ground::{Ground, GroundPlane, NoGround, SharedFloor};
pub use lifecycle::Lifecycle;
pub use pool::{Acquired, ParticlePool};
pub use rain::{RainConfig, RainDrop, RainParams, RainSimulator, RainStep};
pub use session::{FrameInput, FrameReport, StormSession};
pub use spawn::SpawnArea;
pub use splash::{SplashConfig, SplashDecal, SplashSystem};
pub use storm::{SampleProvider, StormBundle, StormConfig, StormData, StormSite, WeatherSample};
pub use time::FrameClock;
pub use visuals::{PoseBuffer, ProxyLayer, ProxyPose, ProxySink};
pub use water::{ConformConfig, WaterConfig, WaterField};

/// Convenient re-exports for common usage.
///
/// # Usage
///
/// ```ignore
/// use squall::prelude::*;
/// ```
///
/// This imports the session and its inputs, the ground types, storm data,
/// the pose sink types and the glam vector types.
pub mod prelude {
    pub use crate::config::SessionConfig;
    pub use crate::fog::FogConfig;
    pub use crate::ground::{Ground, GroundPlane, NoGround, SharedFloor};
    pub use crate::lifecycle::Lifecycle;
    pub use crate::rain::RainConfig;
    pub use crate::session::{FrameInput, FrameReport, StormSession};
    pub use crate::spawn::SpawnArea;
    pub use crate::splash::SplashConfig;
    pub use crate::storm::{SampleProvider, StormConfig, StormData, WeatherSample};
    pub use crate::time::FrameClock;
    pub use crate::visuals::{PoseBuffer, ProxyLayer, ProxyPose, ProxySink};
    pub use crate::water::{ConformConfig, WaterConfig};
    pub use crate::{Quat, Vec2, Vec3};
}

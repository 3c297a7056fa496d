//! Pose output for visual proxies.
//!
//! The engine owns no meshes or materials. Each frame it describes every
//! proxy slot with a [`ProxyPose`] and hands it to a [`ProxySink`]; the
//! rendering layer decides what a proxy looks like.
//!
//! Proxies are assumed unit-sized: a pose's `scale` carries the real
//! dimensions (drop width and streak length, splash radius, tile size).
//!
//! Poses are plain `#[repr(C)]` data, so a sink can hand a whole layer to a
//! GPU instance buffer without conversion:
//!
//! ```
//! use squall::visuals::{PoseBuffer, ProxyLayer, ProxyPose, ProxySink};
//!
//! let mut buffer = PoseBuffer::new();
//! buffer.set_pose(ProxyLayer::Rain, 2, &ProxyPose::HIDDEN);
//! assert_eq!(buffer.poses(ProxyLayer::Rain).len(), 3);
//! assert_eq!(buffer.bytes(ProxyLayer::Rain).len(), 3 * std::mem::size_of::<ProxyPose>());
//! ```

use crate::{Quat, Vec3};
use bytemuck::{Pod, Zeroable};

/// Group of proxies sharing one visual representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProxyLayer {
    Rain,
    Splash,
    Water,
    Fog,
}

impl ProxyLayer {
    #[inline]
    fn slot(self) -> usize {
        self as usize
    }
}

/// Pose of one visual proxy.
///
/// 48 bytes, no padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ProxyPose {
    /// World-space position.
    pub position: [f32; 3],
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
    /// Orientation quaternion, `[x, y, z, w]`.
    pub rotation: [f32; 4],
    /// Per-axis size.
    pub scale: [f32; 3],
    /// 0 = hidden, 1 = visible.
    pub visible: u32,
}

impl ProxyPose {
    /// Pose of an unused slot.
    pub const HIDDEN: ProxyPose = ProxyPose {
        position: [0.0; 3],
        opacity: 0.0,
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [0.0; 3],
        visible: 0,
    };

    /// Pose of a shown proxy.
    pub fn visible(position: Vec3, rotation: Quat, scale: Vec3, opacity: f32) -> Self {
        Self {
            position: position.to_array(),
            opacity: opacity.clamp(0.0, 1.0),
            rotation: rotation.to_array(),
            scale: scale.to_array(),
            visible: 1,
        }
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible != 0
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

impl Default for ProxyPose {
    fn default() -> Self {
        Self::HIDDEN
    }
}

/// Consumer of proxy poses.
///
/// Calls are idempotent: the same `(layer, index, pose)` may be sent every
/// frame, and the sink should simply overwrite.
pub trait ProxySink {
    fn set_pose(&mut self, layer: ProxyLayer, index: usize, pose: &ProxyPose);
}

/// Sink that keeps one pose array per layer.
#[derive(Clone, Debug, Default)]
pub struct PoseBuffer {
    layers: [Vec<ProxyPose>; 4],
}

impl PoseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size a layer so steady-state frames never allocate.
    pub fn reserve(&mut self, layer: ProxyLayer, count: usize) {
        let poses = &mut self.layers[layer.slot()];
        if poses.len() < count {
            poses.resize(count, ProxyPose::HIDDEN);
        }
    }

    /// Poses published for `layer`, one per slot.
    pub fn poses(&self, layer: ProxyLayer) -> &[ProxyPose] {
        &self.layers[layer.slot()]
    }

    /// Raw bytes of a layer, ready for an instance buffer upload.
    pub fn bytes(&self, layer: ProxyLayer) -> &[u8] {
        bytemuck::cast_slice(self.poses(layer))
    }

    /// Number of visible proxies in a layer.
    pub fn visible_count(&self, layer: ProxyLayer) -> usize {
        self.poses(layer).iter().filter(|p| p.is_visible()).count()
    }
}

impl ProxySink for PoseBuffer {
    fn set_pose(&mut self, layer: ProxyLayer, index: usize, pose: &ProxyPose) {
        self.reserve(layer, index + 1);
        self.layers[layer.slot()][index] = *pose;
    }
}

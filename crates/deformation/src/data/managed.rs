//! Interchange representation used at the data-source and render-sink boundary.

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::bounds::Bounds;
use crate::channels::ChannelSet;

/// Plain per-channel arrays exchanged with the source asset and the renderer.
///
/// A deformable keeps one of these as its immutable rest pose and one as the
/// render target that commits write into. Channels the mesh doesn't carry are
/// left empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagedMeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// xyz = tangent, w = bitangent sign
    pub tangents: Vec<Vec4>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<Vec4>,
    /// Triangle list, three entries per triangle
    pub indices: Vec<u32>,
    pub bounds: Bounds,
}

impl ManagedMeshData {
    /// Create mesh data from positions and a triangle list.
    ///
    /// Bounds are computed from the positions; other channels start empty.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let bounds = Bounds::from_points(&positions);
        Self {
            positions,
            indices,
            bounds,
            ..Default::default()
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }

    pub fn with_tangents(mut self, tangents: Vec<Vec4>) -> Self {
        self.tangents = tangents;
        self
    }

    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = uvs;
        self
    }

    pub fn with_colors(mut self, colors: Vec<Vec4>) -> Self {
        self.colors = colors;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Channels whose arrays are present and sized consistently.
    ///
    /// A per-vertex channel counts only if its length equals the position
    /// count. The mask snapshot is sourced from positions.
    pub fn available(&self) -> ChannelSet {
        let count = self.vertex_count();
        let mut available = ChannelSet::BOUNDS;
        if count > 0 {
            available |= ChannelSet::POSITIONS | ChannelSet::MASK_POSITIONS;
            if self.normals.len() == count {
                available |= ChannelSet::NORMALS;
            }
            if self.tangents.len() == count {
                available |= ChannelSet::TANGENTS;
            }
            if self.uvs.len() == count {
                available |= ChannelSet::UVS;
            }
            if self.colors.len() == count {
                available |= ChannelSet::COLORS;
            }
        }
        if !self.indices.is_empty() && self.indices.len() % 3 == 0 {
            available |= ChannelSet::INDICES;
        }
        available
    }

    /// Requested channels that are absent or mis-sized.
    pub fn missing(&self, channels: ChannelSet) -> ChannelSet {
        channels.difference(self.available())
    }

    /// Whether every requested channel is present.
    pub fn is_valid(&self, channels: ChannelSet) -> bool {
        self.missing(channels).is_empty()
    }

    /// Recompute the bounds record from the positions.
    pub fn recalculate_bounds(&mut self) {
        self.bounds = Bounds::from_points(&self.positions);
    }
}

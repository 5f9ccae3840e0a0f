//! Tightly packed, worker-visible mesh buffers.

use glam::{Vec2, Vec3, Vec4};

use super::bounds::Bounds;
use super::managed::ManagedMeshData;
use crate::channels::ChannelSet;

/// Fixed-capacity buffers for one mesh.
///
/// Sized once at creation and never resized: per-vertex channels hold exactly
/// `vertex_count` entries, indices hold `index_count` entries. Accessors hand
/// out slices, so buffer lengths can't change after construction. Channels
/// not requested at creation stay unallocated and are reported as missing.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeMeshData {
    vertex_count: usize,
    index_count: usize,
    allocated: ChannelSet,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    tangents: Vec<Vec4>,
    uvs: Vec<Vec2>,
    colors: Vec<Vec4>,
    mask_positions: Vec<Vec3>,
    indices: Vec<u32>,
    bounds: Bounds,
}

impl NativeMeshData {
    /// Allocate zeroed buffers for the requested channels.
    pub fn new(vertex_count: usize, index_count: usize, channels: ChannelSet) -> Self {
        let alloc = |channel: ChannelSet, len: usize| if channels.contains(channel) { len } else { 0 };
        Self {
            vertex_count,
            index_count,
            allocated: channels,
            positions: vec![Vec3::ZERO; alloc(ChannelSet::POSITIONS, vertex_count)],
            normals: vec![Vec3::ZERO; alloc(ChannelSet::NORMALS, vertex_count)],
            tangents: vec![Vec4::ZERO; alloc(ChannelSet::TANGENTS, vertex_count)],
            uvs: vec![Vec2::ZERO; alloc(ChannelSet::UVS, vertex_count)],
            colors: vec![Vec4::ZERO; alloc(ChannelSet::COLORS, vertex_count)],
            mask_positions: vec![Vec3::ZERO; alloc(ChannelSet::MASK_POSITIONS, vertex_count)],
            indices: vec![0; alloc(ChannelSet::INDICES, index_count)],
            bounds: Bounds::default(),
        }
    }

    /// Allocate buffers matching a managed mesh and fill them from it.
    ///
    /// Only channels the managed mesh actually carries are allocated; the
    /// mask snapshot is always allocated and seeded from the positions.
    pub fn from_managed(managed: &ManagedMeshData) -> Self {
        let channels = managed.available() | ChannelSet::MASK_POSITIONS;
        let mut native = Self::new(managed.vertex_count(), managed.index_count(), channels);
        native.fill_from_managed(channels, managed);
        native
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    pub fn triangle_count(&self) -> usize {
        self.index_count / 3
    }

    /// Channels allocated at creation.
    pub fn allocated(&self) -> ChannelSet {
        self.allocated
    }

    /// Requested channels that aren't allocated.
    pub fn missing(&self, channels: ChannelSet) -> ChannelSet {
        channels.difference(self.allocated)
    }

    /// Whether every requested channel is allocated.
    pub fn is_valid(&self, channels: ChannelSet) -> bool {
        self.missing(channels).is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [Vec3] {
        &mut self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn normals_mut(&mut self) -> &mut [Vec3] {
        &mut self.normals
    }

    pub fn tangents(&self) -> &[Vec4] {
        &self.tangents
    }

    pub fn tangents_mut(&mut self) -> &mut [Vec4] {
        &mut self.tangents
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn uvs_mut(&mut self) -> &mut [Vec2] {
        &mut self.uvs
    }

    pub fn colors(&self) -> &[Vec4] {
        &self.colors
    }

    pub fn colors_mut(&mut self) -> &mut [Vec4] {
        &mut self.colors
    }

    pub fn mask_positions(&self) -> &[Vec3] {
        &self.mask_positions
    }

    pub fn mask_positions_mut(&mut self) -> &mut [Vec3] {
        &mut self.mask_positions
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn indices_mut(&mut self) -> &mut [u32] {
        &mut self.indices
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    /// Split borrow: positions and indices for reading, normals for writing.
    pub fn normal_inputs_mut(&mut self) -> (&[Vec3], &[u32], &mut [Vec3]) {
        (&self.positions, &self.indices, &mut self.normals)
    }

    /// Split borrow: normals for reading, positions for writing.
    pub fn displacement_inputs_mut(&mut self) -> (&[Vec3], &mut [Vec3]) {
        (&self.normals, &mut self.positions)
    }

    /// Split borrow: mask snapshot and colors for reading, positions for writing.
    pub fn mask_inputs_mut(&mut self) -> (&[Vec3], &[Vec4], &mut [Vec3]) {
        (&self.mask_positions, &self.colors, &mut self.positions)
    }

    /// Unchecked channel copy; callers validate first.
    pub(crate) fn fill_from_managed(&mut self, channels: ChannelSet, from: &ManagedMeshData) {
        if channels.contains(ChannelSet::POSITIONS) {
            self.positions.copy_from_slice(&from.positions);
        }
        if channels.contains(ChannelSet::NORMALS) {
            self.normals.copy_from_slice(&from.normals);
        }
        if channels.contains(ChannelSet::TANGENTS) {
            self.tangents.copy_from_slice(&from.tangents);
        }
        if channels.contains(ChannelSet::UVS) {
            self.uvs.copy_from_slice(&from.uvs);
        }
        if channels.contains(ChannelSet::COLORS) {
            self.colors.copy_from_slice(&from.colors);
        }
        if channels.contains(ChannelSet::MASK_POSITIONS) {
            self.mask_positions.copy_from_slice(&from.positions);
        }
        if channels.contains(ChannelSet::INDICES) {
            self.indices.copy_from_slice(&from.indices);
        }
        if channels.contains(ChannelSet::BOUNDS) {
            self.bounds = from.bounds;
        }
    }

    /// Unchecked channel copy; callers validate first.
    pub(crate) fn fill_from_native(&mut self, channels: ChannelSet, from: &NativeMeshData) {
        if channels.contains(ChannelSet::POSITIONS) {
            self.positions.copy_from_slice(&from.positions);
        }
        if channels.contains(ChannelSet::NORMALS) {
            self.normals.copy_from_slice(&from.normals);
        }
        if channels.contains(ChannelSet::TANGENTS) {
            self.tangents.copy_from_slice(&from.tangents);
        }
        if channels.contains(ChannelSet::UVS) {
            self.uvs.copy_from_slice(&from.uvs);
        }
        if channels.contains(ChannelSet::COLORS) {
            self.colors.copy_from_slice(&from.colors);
        }
        if channels.contains(ChannelSet::MASK_POSITIONS) {
            self.mask_positions.copy_from_slice(&from.mask_positions);
        }
        if channels.contains(ChannelSet::INDICES) {
            self.indices.copy_from_slice(&from.indices);
        }
        if channels.contains(ChannelSet::BOUNDS) {
            self.bounds = from.bounds;
        }
    }

    /// Unchecked channel copy into a managed mesh; callers validate first.
    pub(crate) fn write_to_managed(&self, channels: ChannelSet, to: &mut ManagedMeshData) {
        if channels.contains(ChannelSet::POSITIONS) {
            to.positions.copy_from_slice(&self.positions);
        }
        if channels.contains(ChannelSet::NORMALS) {
            to.normals.copy_from_slice(&self.normals);
        }
        if channels.contains(ChannelSet::TANGENTS) {
            to.tangents.copy_from_slice(&self.tangents);
        }
        if channels.contains(ChannelSet::UVS) {
            to.uvs.copy_from_slice(&self.uvs);
        }
        if channels.contains(ChannelSet::COLORS) {
            to.colors.copy_from_slice(&self.colors);
        }
        if channels.contains(ChannelSet::INDICES) {
            to.indices.copy_from_slice(&self.indices);
        }
        if channels.contains(ChannelSet::BOUNDS) {
            to.bounds = self.bounds;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_respects_channels() {
        let data = NativeMeshData::new(4, 6, ChannelSet::POSITIONS | ChannelSet::INDICES);
        assert_eq!(data.positions().len(), 4);
        assert_eq!(data.indices().len(), 6);
        assert!(data.normals().is_empty());
        assert_eq!(data.missing(ChannelSet::POSITIONS | ChannelSet::NORMALS), ChannelSet::NORMALS);
        assert_eq!(data.triangle_count(), 2);
    }

    #[test]
    fn test_from_managed_seeds_mask() {
        let managed = ManagedMeshData::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2])
            .with_normals(vec![Vec3::Z; 3]);
        let native = NativeMeshData::from_managed(&managed);

        assert!(native.is_valid(ChannelSet::POSITIONS | ChannelSet::NORMALS | ChannelSet::MASK_POSITIONS));
        assert!(!native.is_valid(ChannelSet::UVS));
        assert_eq!(native.positions(), managed.positions.as_slice());
        assert_eq!(native.mask_positions(), managed.positions.as_slice());
        assert_eq!(native.indices(), &[0, 1, 2]);
        assert_eq!(native.bounds(), managed.bounds);
    }
}

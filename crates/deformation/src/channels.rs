//! Channel identity for partial synchronization.
//!
//! Every per-vertex or per-mesh data stream is one bit of [`ChannelSet`].
//! Operations declare the subset they read and the subset they write so that
//! copies and resets never touch channels nobody uses.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Set of mesh data channels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ChannelSet: u32 {
        /// Vertex positions.
        const POSITIONS = 1 << 0;
        /// Vertex normals.
        const NORMALS = 1 << 1;
        /// Vertex tangents (xyz + handedness in w).
        const TANGENTS = 1 << 2;
        /// First UV set.
        const UVS = 1 << 3;
        /// Vertex colors.
        const COLORS = 1 << 4;
        /// Position snapshot used by masking stages.
        const MASK_POSITIONS = 1 << 5;
        /// Triangle indices.
        const INDICES = 1 << 6;
        /// Single bounds record.
        const BOUNDS = 1 << 7;
        /// Every channel.
        const ALL = Self::POSITIONS.bits()
            | Self::NORMALS.bits()
            | Self::TANGENTS.bits()
            | Self::UVS.bits()
            | Self::COLORS.bits()
            | Self::MASK_POSITIONS.bits()
            | Self::INDICES.bits()
            | Self::BOUNDS.bits();
    }
}

impl ChannelSet {
    /// Channels stored once per vertex.
    pub const PER_VERTEX: Self = Self::POSITIONS
        .union(Self::NORMALS)
        .union(Self::TANGENTS)
        .union(Self::UVS)
        .union(Self::COLORS)
        .union(Self::MASK_POSITIONS);

    /// Channels present on the managed (interchange) side.
    ///
    /// The mask snapshot only exists on worker-visible buffers; copying it from
    /// managed data sources the managed positions.
    pub const MANAGED: Self = Self::ALL.difference(Self::MASK_POSITIONS);

    /// Human-readable channel names, for diagnostics.
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

/// Read/write declaration of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageChannels {
    /// Channels the stage reads
    pub reads: ChannelSet,
    /// Channels the stage writes
    pub writes: ChannelSet,
}

impl StageChannels {
    pub const fn new(reads: ChannelSet, writes: ChannelSet) -> Self {
        Self { reads, writes }
    }

    /// Stage that reads and writes the same channels.
    pub const fn read_write(channels: ChannelSet) -> Self {
        Self {
            reads: channels,
            writes: channels,
        }
    }

    /// Every channel the stage touches.
    pub fn touched(&self) -> ChannelSet {
        self.reads | self.writes
    }
}

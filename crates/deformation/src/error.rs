//! Error types for synchronization, recalculation, jobs and point caches.

use crate::channels::ChannelSet;

/// Errors raised by the data synchronizer.
///
/// Any of these aborts the whole copy; no channel is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("Source buffers are invalid, missing channels {missing:?}")]
    InvalidSource { missing: ChannelSet },

    #[error("Destination buffers are invalid, missing channels {missing:?}")]
    InvalidDestination { missing: ChannelSet },

    #[error("Vertex count mismatch on {channel:?}: source has {source_len}, destination has {destination_len}")]
    VertexCountMismatch {
        channel: ChannelSet,
        source_len: usize,
        destination_len: usize,
    },

    #[error("Index count mismatch: source has {source_len}, destination has {destination_len}")]
    IndexCountMismatch {
        source_len: usize,
        destination_len: usize,
    },
}

/// Errors raised by normal recalculation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalsError {
    #[error("Mesh data is missing channels {0:?}")]
    MissingChannels(ChannelSet),

    #[error("Index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("Index count {0} is not a multiple of three")]
    NotTriangles(usize),
}

/// Errors raised by the job system.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    /// A job in the completed handle's upstream chain panicked.
    #[error("Job '{label}' panicked")]
    Panicked { label: String },

    #[error("Failed to build worker pool: {0}")]
    PoolBuild(String),
}

/// Errors raised when assembling point-cache frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameLayoutError {
    #[error("Point count {points} is not a whole number of {frame_size}-point frames")]
    PartialFrame { points: usize, frame_size: usize },

    #[error("Frame size must be non-zero when points are present")]
    ZeroFrameSize,
}

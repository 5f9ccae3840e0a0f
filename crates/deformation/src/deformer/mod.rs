//! Deformer stages and chains.
//!
//! A [`Deformer`] is a policy object: it holds parameters, declares the
//! channels it reads and writes, and turns one invocation into a job on the
//! deformable's [`MeshLease`]. Parameters are copied into the job, so a stage
//! can be edited or removed while its previous job is still running.

mod axis;
pub mod builtin;
mod chain;
mod registry;

pub use axis::Axis;
pub use chain::DeformerChain;
pub use registry::{DeformerInfo, DeformerRegistry};

use crate::channels::StageChannels;
use crate::jobs::{JobHandle, MeshLease};

/// Scene clock for one issued chain.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds since the scheduler started
    pub time: f32,
    /// Seconds since the previous tick
    pub delta_time: f32,
    /// Tick counter
    pub frame: u64,
}

/// Everything a stage needs to schedule its job.
pub struct StageContext<'a> {
    /// Write grant over the deformable's native buffers
    pub lease: &'a mut MeshLease,
    pub clock: FrameTime,
}

impl StageContext<'_> {
    pub fn vertex_count(&self) -> usize {
        self.lease.vertex_count()
    }
}

/// One transformation step in a deformer chain.
pub trait Deformer: Send + Sync {
    /// Display name used in job labels and diagnostics.
    fn name(&self) -> &str;

    /// Channels this stage reads and writes.
    fn channels(&self) -> StageChannels;

    /// Whether the stage should run with its current parameters.
    fn can_process(&self) -> bool {
        true
    }

    /// Schedule this stage after `dependency`, returning the new handle.
    fn schedule(&self, ctx: &mut StageContext<'_>, dependency: JobHandle) -> JobHandle;
}

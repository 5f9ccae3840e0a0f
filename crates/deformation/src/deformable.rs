//! A mesh instance with its buffers, deformer chain and outstanding work.

use std::sync::Arc;

use deform_config::UpdateMode;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use crate::channels::ChannelSet;
use crate::data::{self, ManagedMeshData, NativeMeshData};
use crate::deformer::{DeformerChain, FrameTime, StageContext};
use crate::error::{JobError, SyncError};
use crate::jobs::{JobHandle, JobSystem, MeshLease};

/// One deformed mesh.
///
/// Owns an immutable rest pose, a render target that commits write into, the
/// worker-visible buffers and at most one outstanding chain. Every issued
/// chain starts from the rest pose, so a commit always shows exactly one
/// chain's worth of deformation.
pub struct Deformable {
    name: String,
    rest: Arc<ManagedMeshData>,
    target: ManagedMeshData,
    native: Arc<Mutex<NativeMeshData>>,
    chain: DeformerChain,
    update_mode: UpdateMode,
    handle: JobHandle,
    /// Channels the last issued chain's stages write
    written: ChannelSet,
    /// Channels the last commit has to copy
    dirty: ChannelSet,
}

impl Deformable {
    pub fn new(name: impl Into<String>, source: ManagedMeshData) -> Self {
        let native = NativeMeshData::from_managed(&source);
        Self {
            name: name.into(),
            target: source.clone(),
            rest: Arc::new(source),
            native: Arc::new(Mutex::new(native)),
            chain: DeformerChain::new(),
            update_mode: UpdateMode::default(),
            handle: JobHandle::completed(),
            written: ChannelSet::empty(),
            dirty: ChannelSet::empty(),
        }
    }

    pub fn with_chain(mut self, chain: DeformerChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_update_mode(mut self, mode: UpdateMode) -> Self {
        self.update_mode = mode;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The undeformed source mesh.
    pub fn rest(&self) -> &ManagedMeshData {
        &self.rest
    }

    /// Render-facing mesh as of the last commit.
    pub fn target(&self) -> &ManagedMeshData {
        &self.target
    }

    /// Lock the worker-visible buffers, waiting for a running job to release them.
    pub fn native(&self) -> MutexGuard<'_, NativeMeshData> {
        self.native.lock()
    }

    pub fn chain(&self) -> &DeformerChain {
        &self.chain
    }

    /// Edits apply to the next issued chain.
    pub fn chain_mut(&mut self) -> &mut DeformerChain {
        &mut self.chain
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    pub fn set_update_mode(&mut self, mode: UpdateMode) {
        self.update_mode = mode;
    }

    pub fn dirty(&self) -> ChannelSet {
        self.dirty
    }

    /// Whether issued work hasn't been completed yet.
    pub fn is_outstanding(&self) -> bool {
        !self.handle.is_completed()
    }

    /// Whether an issued chain hasn't been released by [`complete`](Self::complete)
    /// yet, finished or not.
    pub fn has_unreleased_chain(&self) -> bool {
        self.handle.label().is_some()
    }

    /// Handle of the last issued chain.
    pub fn handle(&self) -> &JobHandle {
        &self.handle
    }

    /// Whether the scheduler should commit and issue for this deformable.
    pub fn can_update(&self) -> bool {
        self.update_mode != UpdateMode::Paused && self.rest.vertex_count() > 0
    }

    /// Block until the outstanding chain has finished.
    pub fn complete(&mut self) -> Result<(), JobError> {
        let handle = std::mem::take(&mut self.handle);
        handle.complete()
    }

    /// Copy the dirty channels of the last chain into the render target.
    pub fn commit(&mut self) -> Result<(), SyncError> {
        self.commit_channels(self.dirty)
    }

    /// Copy `channels` from the native buffers into the render target.
    ///
    /// # Panics
    ///
    /// If a chain is still outstanding.
    pub fn commit_channels(&mut self, channels: ChannelSet) -> Result<(), SyncError> {
        assert!(
            !self.is_outstanding(),
            "deformable '{}' committed while its chain is in flight",
            self.name
        );
        if channels.is_empty() {
            return Ok(());
        }
        let native = self.native.lock();
        data::copy(channels, &*native, &mut self.target)?;
        trace!("Committed {:?} for '{}'", channels.names(), self.name);
        Ok(())
    }

    /// Schedule this frame's chain, starting from the rest pose.
    ///
    /// Jobs are batched until the job system is flushed. Returns an error,
    /// without scheduling anything, if the buffers lack a channel the chain
    /// touches.
    ///
    /// # Panics
    ///
    /// If the previous chain hasn't been completed.
    pub fn issue(&mut self, jobs: &JobSystem, clock: FrameTime) -> Result<JobHandle, SyncError> {
        assert!(
            !self.is_outstanding(),
            "deformable '{}' issued a chain while the previous one is in flight",
            self.name
        );

        let writes = self.chain.writes();
        // Channels the previous chain changed but this one doesn't are
        // restored once so the target returns to the rest pose.
        let restored = self.written.difference(writes);
        let mut reset = (self.chain.touched() | restored) & ChannelSet::MANAGED;
        if self.chain.reads().contains(ChannelSet::MASK_POSITIONS) {
            reset |= ChannelSet::MASK_POSITIONS;
        }

        let missing = self.rest.missing(reset);
        if !missing.is_empty() {
            return Err(SyncError::InvalidSource { missing });
        }
        let missing = self.native.lock().missing(reset);
        if !missing.is_empty() {
            return Err(SyncError::InvalidDestination { missing });
        }

        let mut lease = MeshLease::new(jobs.clone(), self.native.clone());
        let rest = self.rest.clone();
        let name = self.name.clone();
        let start = lease.schedule(format!("{}: reset", self.name), JobHandle::completed(), move |buffers| {
            if let Err(e) = data::copy(reset, &*rest, buffers) {
                warn!("Reset of '{}' failed: {}", name, e);
            }
        });

        let mut ctx = StageContext {
            lease: &mut lease,
            clock,
        };
        self.handle = self.chain.schedule(&mut ctx, start);
        self.written = writes;
        self.dirty = (writes | restored) & ChannelSet::MANAGED;
        trace!("Issued {} stages for '{}'", self.chain.len(), self.name);
        Ok(self.handle.clone())
    }

    /// Replace the source mesh.
    ///
    /// Completes in-flight work first. Buffers are reallocated when the
    /// vertex count, index count or channel layout changes and reused
    /// otherwise.
    pub fn rebuild(&mut self, source: ManagedMeshData) {
        if let Err(e) = self.complete() {
            warn!("Chain of '{}' failed before rebuild: {}", self.name, e);
        }

        let channels = source.available() | ChannelSet::MASK_POSITIONS;
        {
            let mut native = self.native.lock();
            let reusable = native.vertex_count() == source.vertex_count()
                && native.index_count() == source.index_count()
                && native.allocated() == channels;
            if reusable {
                native.fill_from_managed(channels, &source);
            } else {
                debug!(
                    "Reallocating buffers for '{}': {} -> {} vertices",
                    self.name,
                    native.vertex_count(),
                    source.vertex_count()
                );
                *native = NativeMeshData::from_managed(&source);
            }
        }
        self.target = source.clone();
        self.rest = Arc::new(source);
        self.written = ChannelSet::empty();
        self.dirty = ChannelSet::empty();
    }

    /// Synchronously restore the rest pose into both buffers.
    pub fn reset_to_rest(&mut self) {
        if let Err(e) = self.complete() {
            warn!("Chain of '{}' failed before reset: {}", self.name, e);
        }
        let channels = self.rest.available() | ChannelSet::MASK_POSITIONS;
        self.native.lock().fill_from_managed(channels, &self.rest);
        self.target = (*self.rest).clone();
        self.written = ChannelSet::empty();
        self.dirty = ChannelSet::empty();
    }
}

impl Drop for Deformable {
    fn drop(&mut self) {
        if self.is_outstanding() {
            if let Err(e) = self.complete() {
                warn!("Chain of '{}' failed during teardown: {}", self.name, e);
            }
        }
    }
}

impl std::fmt::Debug for Deformable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deformable")
            .field("name", &self.name)
            .field("vertices", &self.rest.vertex_count())
            .field("chain", &self.chain)
            .field("update_mode", &self.update_mode)
            .field("outstanding", &self.is_outstanding())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deformer::builtin::{Offset, RecalculateBounds, RecalculateNormals, VertexColorMask};
    use glam::{Vec3, Vec4};

    fn quad() -> ManagedMeshData {
        ManagedMeshData::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            vec![0, 1, 2, 0, 2, 3],
        )
        .with_normals(vec![Vec3::Z; 4])
    }

    fn run(deformable: &mut Deformable, jobs: &JobSystem) {
        deformable.issue(jobs, FrameTime::default()).unwrap();
        deformable.complete().unwrap();
        deformable.commit().unwrap();
    }

    #[test]
    fn test_each_chain_starts_from_rest() {
        let jobs = JobSystem::new(2).unwrap();
        let chain = DeformerChain::new().with(Offset::new(Vec3::Z)).with(RecalculateBounds);
        let mut deformable = Deformable::new("quad", quad()).with_chain(chain);

        for _ in 0..3 {
            run(&mut deformable, &jobs);
            for (p, r) in deformable.target().positions.iter().zip(&deformable.rest().positions) {
                assert_eq!(*p, *r + Vec3::Z);
            }
        }
        assert_eq!(deformable.target().bounds.min.z, 1.0);
        assert_eq!(deformable.dirty(), ChannelSet::POSITIONS | ChannelSet::BOUNDS);
    }

    #[test]
    fn test_commit_leaves_clean_channels() {
        let jobs = JobSystem::new(2).unwrap();
        let mut deformable =
            Deformable::new("quad", quad()).with_chain(DeformerChain::new().with(Offset::new(Vec3::X)));
        // Scribble on the native normals; they aren't dirty, so they never reach the target.
        deformable.native().normals_mut()[0] = Vec3::NEG_Z;
        run(&mut deformable, &jobs);
        assert_eq!(deformable.target().normals, vec![Vec3::Z; 4]);
    }

    #[test]
    fn test_commit_without_chain_is_masked_pass_through() {
        let mut deformable = Deformable::new("quad", quad());
        {
            let mut native = deformable.native();
            native.positions_mut()[2] = Vec3::splat(3.0);
            native.normals_mut()[2] = Vec3::X;
        }
        deformable.commit_channels(ChannelSet::POSITIONS).unwrap();
        assert_eq!(deformable.target().positions[2], Vec3::splat(3.0));
        assert_eq!(deformable.target().normals, deformable.rest().normals);
    }

    #[test]
    fn test_removed_stage_restores_channel() {
        let jobs = JobSystem::new(2).unwrap();
        let mut deformable = Deformable::new("quad", quad())
            .with_chain(DeformerChain::new().with(Offset::new(Vec3::X)));
        run(&mut deformable, &jobs);
        assert_ne!(deformable.target().positions, deformable.rest().positions);

        deformable.chain_mut().clear();
        run(&mut deformable, &jobs);
        assert_eq!(deformable.target().positions, deformable.rest().positions);

        run(&mut deformable, &jobs);
        assert_eq!(deformable.dirty(), ChannelSet::empty());
    }

    #[test]
    fn test_missing_channel_rejects_issue() {
        let jobs = JobSystem::new(1).unwrap();
        // No colors on the mesh.
        let mut deformable = Deformable::new("quad", quad())
            .with_chain(DeformerChain::new().with(VertexColorMask::default()));
        let err = deformable.issue(&jobs, FrameTime::default()).unwrap_err();
        assert_eq!(
            err,
            SyncError::InvalidSource {
                missing: ChannelSet::COLORS
            }
        );
        assert!(!deformable.is_outstanding());
    }

    #[test]
    fn test_mask_reads_rest_snapshot() {
        let jobs = JobSystem::new(2).unwrap();
        let mesh = quad().with_colors(vec![Vec4::ZERO; 4]);
        let chain = DeformerChain::new()
            .with(Offset::new(Vec3::X))
            .with(VertexColorMask::default());
        let mut deformable = Deformable::new("quad", mesh).with_chain(chain);
        run(&mut deformable, &jobs);
        // Zero weight everywhere: fully masked back to rest.
        assert_eq!(deformable.target().positions, deformable.rest().positions);
    }

    #[test]
    #[should_panic(expected = "in flight")]
    fn test_issue_twice_panics() {
        let jobs = JobSystem::new(1).unwrap();
        let mut deformable =
            Deformable::new("quad", quad()).with_chain(DeformerChain::new().with(Offset::new(Vec3::X)));
        deformable.issue(&jobs, FrameTime::default()).unwrap();
        // Not flushed, so the first chain can't have finished.
        let _ = deformable.issue(&jobs, FrameTime::default());
    }

    #[test]
    fn test_rebuild_reallocates_on_count_change() {
        let jobs = JobSystem::new(2).unwrap();
        let chain = DeformerChain::new()
            .with(Offset::new(Vec3::Y))
            .with(RecalculateNormals::default());
        let mut deformable = Deformable::new("mesh", quad()).with_chain(chain);
        run(&mut deformable, &jobs);

        let triangle = ManagedMeshData::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2])
            .with_normals(vec![Vec3::Z; 3]);
        deformable.rebuild(triangle.clone());
        assert_eq!(deformable.native().vertex_count(), 3);
        assert_eq!(deformable.target(), &triangle);

        run(&mut deformable, &jobs);
        assert_eq!(deformable.target().positions[1], Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_reset_to_rest() {
        let jobs = JobSystem::new(2).unwrap();
        let mut deformable =
            Deformable::new("quad", quad()).with_chain(DeformerChain::new().with(Offset::new(Vec3::X)));
        deformable.issue(&jobs, FrameTime::default()).unwrap();
        deformable.reset_to_rest();
        assert!(!deformable.is_outstanding());
        assert_eq!(deformable.native().positions(), deformable.rest().positions.as_slice());
        assert_eq!(deformable.target(), deformable.rest());
    }

    #[test]
    fn test_drop_completes_outstanding_work() {
        let jobs = JobSystem::new(1).unwrap();
        let mut deformable =
            Deformable::new("quad", quad()).with_chain(DeformerChain::new().with(Offset::new(Vec3::X)));
        let handle = deformable.issue(&jobs, FrameTime::default()).unwrap();
        drop(deformable);
        assert!(handle.is_completed());
    }
}
